//! Core data types for the crossing core
//!
//! Ledger entries implement SSZ serialization for deterministic encoding.
//! All amounts are integer counts of an issue's smallest unit.
//!
//! ## Types
//!
//! - [`Amount`], [`Amounts`], [`Issue`], [`Book`]: what is exchanged
//! - [`Quality`]: exchange rate, totally ordered
//! - [`Key`] and [`keylet`]: ledger addressing
//! - [`LedgerEntry`] and its variants: what the ledger stores
//! - [`Fill`]: one consumed offer
//! - [`Transaction`]: inbound requests

mod amount;
mod entry;
mod fill;
mod keys;
mod quality;
mod tx;

pub use amount::{
    AccountId, Amount, AmountError, Amounts, Book, Currency, Issue, Rate, ISSUED_SCALE,
    MAX_NATIVE_DROPS, NATIVE_CODE, NATIVE_SCALE,
};
pub(crate) use amount::mul_div_ceil;
pub use entry::{AccountRoot, DirectoryNode, LedgerEntry, Offer, TrustLine, OFFER_PASSIVE, OFFER_SELL};
pub use fill::Fill;
pub use keys::{keylet, Key};
pub use quality::Quality;
pub use tx::{
    OfferCancel, OfferCreate, Transaction, TxKind, OFFER_CREATE_FLAGS, TF_FILL_OR_KILL,
    TF_IMMEDIATE_OR_CANCEL, TF_PASSIVE, TF_SELL,
};
