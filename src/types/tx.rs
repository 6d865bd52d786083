//! Inbound transaction records.
//!
//! A [`Transaction`] carries the common fields every transaction has
//! (source account, sequence, fee) and a [`TxKind`] with the fields of one
//! specific transaction type. `TxKind` is closed: the apply boundary
//! dispatches on it with a single `match`.

use crate::types::{AccountId, Amount};

/// Do not consume offers at exactly the requested quality.
pub const TF_PASSIVE: u32 = 0x0001_0000;
/// Cross what is available now and never place a remainder.
pub const TF_IMMEDIATE_OR_CANCEL: u32 = 0x0002_0000;
/// Either fill completely or have no effect.
pub const TF_FILL_OR_KILL: u32 = 0x0004_0000;
/// Sell all of `taker_gets`, even if that yields more than `taker_pays`.
pub const TF_SELL: u32 = 0x0008_0000;

/// Flags an offer-create may carry.
pub const OFFER_CREATE_FLAGS: u32 =
    TF_PASSIVE | TF_IMMEDIATE_OR_CANCEL | TF_FILL_OR_KILL | TF_SELL;

/// Request to exchange `taker_gets` for `taker_pays`, crossing the book
/// first and placing any remainder as a standing offer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OfferCreate {
    /// What the submitter wants to receive
    pub taker_pays: Amount,
    /// What the submitter is willing to give
    pub taker_gets: Amount,
    pub flags: u32,
    /// Close time after which the placed offer is dead
    pub expiration: Option<u32>,
    /// Sequence of an earlier offer by the same account to cancel first
    pub offer_sequence: Option<u32>,
}

impl OfferCreate {
    pub fn new(taker_pays: Amount, taker_gets: Amount) -> Self {
        Self {
            taker_pays,
            taker_gets,
            flags: 0,
            expiration: None,
            offer_sequence: None,
        }
    }

    pub fn with_flags(mut self, flags: u32) -> Self {
        self.flags = flags;
        self
    }

    pub fn with_expiration(mut self, expiration: u32) -> Self {
        self.expiration = Some(expiration);
        self
    }

    pub fn replacing(mut self, offer_sequence: u32) -> Self {
        self.offer_sequence = Some(offer_sequence);
        self
    }

    pub fn is_passive(&self) -> bool {
        self.flags & TF_PASSIVE != 0
    }

    pub fn is_immediate_or_cancel(&self) -> bool {
        self.flags & TF_IMMEDIATE_OR_CANCEL != 0
    }

    pub fn is_fill_or_kill(&self) -> bool {
        self.flags & TF_FILL_OR_KILL != 0
    }

    pub fn is_sell(&self) -> bool {
        self.flags & TF_SELL != 0
    }
}

/// Request to remove one of the account's offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OfferCancel {
    pub offer_sequence: u32,
}

/// Transaction-type specific fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxKind {
    OfferCreate(OfferCreate),
    OfferCancel(OfferCancel),
}

impl TxKind {
    pub fn name(&self) -> &'static str {
        match self {
            TxKind::OfferCreate(_) => "OfferCreate",
            TxKind::OfferCancel(_) => "OfferCancel",
        }
    }
}

/// A signed, submitted transaction (signature checking happens upstream).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub account: AccountId,
    pub sequence: u32,
    /// Fee in drops
    pub fee: u64,
    pub kind: TxKind,
}

impl Transaction {
    pub fn offer_create(account: AccountId, sequence: u32, fee: u64, create: OfferCreate) -> Self {
        Self { account, sequence, fee, kind: TxKind::OfferCreate(create) }
    }

    pub fn offer_cancel(account: AccountId, sequence: u32, fee: u64, offer_sequence: u32) -> Self {
        Self {
            account,
            sequence,
            fee,
            kind: TxKind::OfferCancel(OfferCancel { offer_sequence }),
        }
    }
}
