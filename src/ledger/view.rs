//! View traits over ledger state.
//!
//! ## Layers
//!
//! ```text
//! Ledger (committed)  <-  Sandbox (tx context)  <-  Sandbox (primary / cancel)
//! ```
//!
//! - [`ReadView`]: keyed reads, ordered successor search, ledger header.
//! - [`RawView`]: unconditional writes, used only to commit a change set.
//! - [`ApplyView`]: the checked mutation API transactors use.
//!
//! Reads always return owned copies. A mutable handle from
//! [`ApplyView::peek`] refers to the view's own copy, never to its parent.

use std::collections::BTreeSet;

use thiserror::Error;

use crate::config::{Feature, FeeSchedule};
use crate::error::EngineError;
use crate::types::{
    keylet, AccountId, AccountRoot, DirectoryNode, Key, LedgerEntry, Offer, TrustLine,
};

/// Misuse of the view API.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ViewError {
    #[error("entry {0} already exists")]
    AlreadyExists(Key),
    #[error("entry {0} does not exist")]
    Missing(Key),
}

/// Enabled feature set of a ledger.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Rules {
    enabled: BTreeSet<Feature>,
}

impl Rules {
    pub fn new(enabled: BTreeSet<Feature>) -> Self {
        Self { enabled }
    }

    pub fn enabled(&self, feature: Feature) -> bool {
        self.enabled.contains(&feature)
    }
}

/// Ledger-wide context for policy decisions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerInfo {
    pub seq: u32,
    /// Close time of the parent ledger; offers expire relative to it
    pub parent_close_time: u32,
    pub fees: FeeSchedule,
    pub rules: Rules,
    pub max_offers_stepped: u32,
}

// ============================================================================
// Traits
// ============================================================================

pub trait ReadView {
    fn info(&self) -> &LedgerInfo;

    fn read(&self, key: &Key) -> Option<LedgerEntry>;

    fn exists(&self, key: &Key) -> bool {
        self.read(key).is_some()
    }

    /// First key strictly after `key`, and strictly before `last` if given.
    fn succ(&self, key: &Key, last: Option<&Key>) -> Option<Key>;
}

pub trait RawView: ReadView {
    fn raw_insert(&mut self, key: Key, entry: LedgerEntry) -> Result<(), ViewError>;
    fn raw_replace(&mut self, key: Key, entry: LedgerEntry) -> Result<(), ViewError>;
    fn raw_erase(&mut self, key: &Key) -> Result<(), ViewError>;
}

pub trait ApplyView: ReadView {
    /// Mutable handle to the view's copy of an entry, if it exists.
    fn peek(&mut self, key: &Key) -> Option<&mut LedgerEntry>;

    /// Create an entry. Fails if one already exists.
    fn insert(&mut self, key: Key, entry: LedgerEntry) -> Result<(), ViewError>;

    /// Delete an entry. Fails if none exists.
    fn erase(&mut self, key: &Key) -> Result<(), ViewError>;
}

// ============================================================================
// Typed access helpers
// ============================================================================

pub fn read_account<V: ReadView + ?Sized>(view: &V, id: AccountId) -> Option<AccountRoot> {
    match view.read(&keylet::account(id)) {
        Some(LedgerEntry::Account(a)) => Some(a),
        _ => None,
    }
}

pub fn read_trust_line<V: ReadView + ?Sized>(view: &V, key: &Key) -> Option<TrustLine> {
    match view.read(key) {
        Some(LedgerEntry::TrustLine(t)) => Some(t),
        _ => None,
    }
}

pub fn read_offer<V: ReadView + ?Sized>(view: &V, key: &Key) -> Result<Option<Offer>, EngineError> {
    match view.read(key) {
        None => Ok(None),
        Some(LedgerEntry::Offer(o)) => Ok(Some(o)),
        Some(_) => Err(EngineError::WrongEntryType(*key)),
    }
}

pub fn read_directory<V: ReadView + ?Sized>(
    view: &V,
    key: &Key,
) -> Result<Option<DirectoryNode>, EngineError> {
    match view.read(key) {
        None => Ok(None),
        Some(LedgerEntry::Directory(d)) => Ok(Some(d)),
        Some(_) => Err(EngineError::WrongEntryType(*key)),
    }
}

pub fn peek_account<V: ApplyView + ?Sized>(
    view: &mut V,
    id: AccountId,
) -> Result<&mut AccountRoot, EngineError> {
    let key = keylet::account(id);
    view.peek(&key)
        .ok_or(EngineError::MissingEntry(key))?
        .as_account_mut()
        .ok_or(EngineError::WrongEntryType(key))
}

pub fn peek_offer<'v, V: ApplyView + ?Sized>(
    view: &'v mut V,
    key: &Key,
) -> Result<&'v mut Offer, EngineError> {
    view.peek(key)
        .ok_or(EngineError::MissingEntry(*key))?
        .as_offer_mut()
        .ok_or(EngineError::WrongEntryType(*key))
}

pub fn peek_directory<'v, V: ApplyView + ?Sized>(
    view: &'v mut V,
    key: &Key,
) -> Result<&'v mut DirectoryNode, EngineError> {
    view.peek(key)
        .ok_or(EngineError::MissingEntry(*key))?
        .as_directory_mut()
        .ok_or(EngineError::WrongEntryType(*key))
}
