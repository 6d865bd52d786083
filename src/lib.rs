//! # Ledger Crossing
//!
//! Offer-crossing transaction core for an in-memory ledger.
//!
//! ## Architecture
//!
//! The core consists of:
//! - **Types**: amounts, qualities, ledger entries and transactions
//! - **Ledger**: committed state, copy-on-write sandboxes, directories
//! - **OrderBook**: lazy best-first traversal of offer books
//! - **Engine**: the taker, offer-create/cancel and the apply boundary
//!
//! ## Design Principles
//!
//! 1. **Determinism**: identical ledger and transaction give identical state
//! 2. **No Floating Point**: integer amounts, exact 128-bit ratios
//! 3. **Explicit Commit**: views never write through to their base
//! 4. **Contained Failure**: internal errors charge the fee and nothing else

// ============================================================================
// Module declarations
// ============================================================================

/// Error and outcome classifications
pub mod error;

/// Fee schedule, feature flags, engine limits
pub mod config;

/// Core data types: Amount, Quality, Offer, Transaction
pub mod types;

/// Ledger state, sandboxes and bookkeeping
pub mod ledger;

/// Order-book traversal
pub mod orderbook;

/// Crossing engine and transaction apply
pub mod engine;

// ============================================================================
// Re-exports for convenience
// ============================================================================

pub use config::{Feature, LedgerConfig};
pub use engine::{apply, ApplyOutcome};
pub use error::{Claimed, EngineError, Malformed, Rejected, TxError};
pub use ledger::{ledger_data, Ledger, Sandbox};
pub use types::{AccountId, Amount, Fill, Issue, OfferCreate, Quality, Transaction};
