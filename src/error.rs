//! Error types for the crossing core.
//!
//! ## Layers
//!
//! - [`AmountError`] and [`ViewError`] come from the arithmetic and view layers.
//! - [`EngineError`] is an internal failure: something the ledger state or the
//!   code itself got wrong. It is never an expected outcome of a transaction.
//! - [`TxError`] is the outcome classification a transaction reports to the
//!   ledger-building process.
//!
//! ## Outcome classes
//!
//! | Class | Token prefix | Fee claimed | Ledger effect |
//! |-------|--------------|-------------|---------------|
//! | `Malformed` | `tem` | no | none |
//! | `Rejected` | `ter` / `tef` / `tel` | no | none |
//! | `Claimed` | `tec` | yes | fee, sequence, dead-offer cleanup |
//! | `Internal` | `tef` | yes | fee, sequence |

use thiserror::Error;

use crate::ledger::ViewError;
use crate::types::{AmountError, Key};

// ============================================================================
// Internal failures
// ============================================================================

/// An unexpected failure while computing a transaction's effect.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("amount arithmetic: {0}")]
    Amount(#[from] AmountError),

    #[error("view: {0}")]
    View(#[from] ViewError),

    /// A directory and the object it lists disagree.
    #[error("dangling directory link: {item} in {directory}")]
    DanglingLink { directory: Key, item: Key },

    #[error("ledger entry {0} is missing")]
    MissingEntry(Key),

    #[error("ledger entry {0} has the wrong type")]
    WrongEntryType(Key),

    #[error("insufficient {what} held by account {account}")]
    Overdraft { account: u64, what: &'static str },

    #[error("encoding failed: {0}")]
    Encoding(String),

    #[error("invariant violated: {0}")]
    Logic(&'static str),

    /// A panic caught at the transaction boundary.
    #[error("panic during apply: {0}")]
    Panic(String),
}

// ============================================================================
// Transaction outcomes
// ============================================================================

/// Structurally invalid transaction. Rejected before any view is touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Malformed {
    #[error("malformed expiration")]
    BadExpiration,
    #[error("malformed offer amounts")]
    BadOffer,
    #[error("offer exchanges an asset for itself")]
    Redundant,
    #[error("issued currency uses the native code")]
    BadCurrency,
    #[error("issued amount has no issuer")]
    BadIssuer,
    #[error("invalid flag combination")]
    InvalidFlags,
    #[error("malformed offer sequence")]
    BadSequence,
    #[error("malformed fee")]
    BadFee,
}

/// Valid transaction that failed against ledger state. The fee is claimed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Claimed {
    #[error("fill-or-kill offer could not be filled")]
    Killed,
    #[error("insufficient reserve to place offer")]
    InsufficientReserveOffer,
    #[error("offer is unfunded")]
    UnfundedOffer,
    #[error("no trust line for the requested asset")]
    NoLine,
    #[error("issuer of the requested asset does not exist")]
    NoIssuer,
    #[error("offer would cross the account's own offer")]
    OfferCrossSelf,
}

/// Transaction that cannot be applied to this ledger at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Rejected {
    #[error("source account does not exist")]
    NoAccount,
    #[error("sequence already used")]
    PastSequence,
    #[error("sequence not yet valid")]
    PreSequence,
    #[error("fee below the ledger's base fee")]
    InsufficientFee,
    #[error("balance cannot pay the fee")]
    InsufficientBalance,
}

/// The outcome classification of one transaction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TxError {
    #[error("malformed: {0}")]
    Malformed(#[from] Malformed),

    #[error("claimed: {0}")]
    Claimed(#[from] Claimed),

    #[error("rejected: {0}")]
    Rejected(#[from] Rejected),

    #[error("internal failure: {0}")]
    Internal(#[from] EngineError),
}

impl From<AmountError> for TxError {
    fn from(e: AmountError) -> Self {
        TxError::Internal(EngineError::Amount(e))
    }
}

impl From<ViewError> for TxError {
    fn from(e: ViewError) -> Self {
        TxError::Internal(EngineError::View(e))
    }
}

impl TxError {
    /// Stable result token, as reported in logs and metadata.
    pub fn token(&self) -> &'static str {
        match self {
            TxError::Malformed(m) => match m {
                Malformed::BadExpiration => "temBAD_EXPIRATION",
                Malformed::BadOffer => "temBAD_OFFER",
                Malformed::Redundant => "temREDUNDANT",
                Malformed::BadCurrency => "temBAD_CURRENCY",
                Malformed::BadIssuer => "temBAD_ISSUER",
                Malformed::InvalidFlags => "temINVALID_FLAG",
                Malformed::BadSequence => "temBAD_SEQUENCE",
                Malformed::BadFee => "temBAD_FEE",
            },
            TxError::Claimed(c) => match c {
                Claimed::Killed => "tecKILLED",
                Claimed::InsufficientReserveOffer => "tecINSUF_RESERVE_OFFER",
                Claimed::UnfundedOffer => "tecUNFUNDED_OFFER",
                Claimed::NoLine => "tecNO_LINE",
                Claimed::NoIssuer => "tecNO_ISSUER",
                Claimed::OfferCrossSelf => "tecOFFER_CROSS_SELF",
            },
            TxError::Rejected(r) => match r {
                Rejected::NoAccount => "terNO_ACCOUNT",
                Rejected::PastSequence => "tefPAST_SEQ",
                Rejected::PreSequence => "terPRE_SEQ",
                Rejected::InsufficientFee => "telINSUF_FEE_P",
                Rejected::InsufficientBalance => "terINSUF_FEE_B",
            },
            TxError::Internal(_) => "tefEXCEPTION",
        }
    }

    /// Whether this outcome still charges the submitted fee.
    pub fn claims_fee(&self) -> bool {
        matches!(self, TxError::Claimed(_) | TxError::Internal(_))
    }
}
