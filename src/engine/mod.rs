//! Transaction engine: offer crossing and the apply boundary.
//!
//! ## Design Principles
//!
//! 1. **Determinism**: same ledger and transaction, same result and state root
//! 2. **Integer Math**: amounts and qualities never touch floating point
//! 3. **Synchronous Execution**: one transaction runs to completion at a time
//! 4. **Quality-Time Priority**: best rate first, then placement order
//!
//! ## Crossing Rules
//!
//! - An offer-create first crosses resting offers that pay at least its own
//!   rate, directly or bridged through the native asset
//! - **Partial fills** are supported on both sides
//! - The unfilled remainder rests on the book unless the transaction is
//!   immediate-or-cancel or fill-or-kill
//!
//! ## Example
//!
//! ```
//! use ledger_crossing::config::{FeeSchedule, LedgerConfig};
//! use ledger_crossing::engine::apply;
//! use ledger_crossing::ledger::Ledger;
//! use ledger_crossing::types::{AccountId, Amount, Issue, OfferCreate, Transaction};
//!
//! let mut config = LedgerConfig::default();
//! config.fees = FeeSchedule { base_fee: 10, reserve_base: 1_000, reserve_increment: 100 };
//!
//! let gateway = AccountId(100);
//! let usd = Issue::issued("USD", gateway).unwrap();
//! let (alice, bob) = (AccountId(1), AccountId(2));
//!
//! let mut ledger = Ledger::new(config.ledger_info(1, 0));
//! ledger.create_account(gateway, 1_000_000).unwrap();
//! ledger.create_account(alice, 1_000_000).unwrap();
//! ledger.create_account(bob, 1_000_000).unwrap();
//! ledger.create_trust_line(alice, usd, 500).unwrap();
//! ledger.create_trust_line(bob, usd, 0).unwrap();
//!
//! // Alice gives 50 USD for 100 drops
//! let sell = OfferCreate::new(Amount::native(100), Amount::new(usd, 50));
//! let outcome = apply(&mut ledger, &Transaction::offer_create(alice, 1, 10, sell));
//! assert_eq!(outcome.token(), "tesSUCCESS");
//!
//! // Bob takes it
//! let buy = OfferCreate::new(Amount::new(usd, 50), Amount::native(100));
//! let outcome = apply(&mut ledger, &Transaction::offer_create(bob, 1, 10, buy));
//! assert_eq!(outcome.token(), "tesSUCCESS");
//! assert_eq!(outcome.fills.len(), 1);
//! ```

pub mod cancel_offer;
pub mod create_offer;
pub mod taker;
pub mod transactor;

pub use taker::{CrossOutcome, CrossType, Taker};
pub use transactor::{apply, preclaim, preflight, ApplyOutcome};
