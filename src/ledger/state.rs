//! Committed ledger state.
//!
//! ## Architecture
//!
//! - **Slab**: arena holding every entry, O(1) access by slot
//! - **BTreeMap**: key to slot index, giving ordered successor queries
//!
//! Per slab docs (https://docs.rs/slab/0.4.11):
//! - `Slab::with_capacity(n)` pre-allocates n slots
//! - Keys are reused after removal
//! - O(1) insert, remove, and lookup
//!
//! The ledger only changes through [`RawView`], i.e. by committing a
//! [`ChangeSet`](crate::ledger::ChangeSet) produced by a sandbox.
//!
//! ## State root
//!
//! SHA-256 over every `(key, encoded entry)` pair in key order. Two ledgers
//! holding the same entries always have the same root.
//!
//! ## Example
//!
//! ```
//! use ledger_crossing::config::LedgerConfig;
//! use ledger_crossing::ledger::{Ledger, ReadView};
//! use ledger_crossing::types::{keylet, AccountId};
//!
//! let mut ledger = Ledger::new(LedgerConfig::default().ledger_info(1, 0));
//! ledger.create_account(AccountId(1), 50_000_000).unwrap();
//! assert!(ledger.exists(&keylet::account(AccountId(1))));
//! ```

use std::collections::BTreeMap;
use std::ops::Bound;

use sha2::{Digest, Sha256};
use slab::Slab;

use crate::error::EngineError;
use crate::ledger::{LedgerInfo, RawView, ReadView, ViewError};
use crate::types::{keylet, AccountId, AccountRoot, Issue, Key, LedgerEntry, TrustLine};

/// An immutable-by-default, fully committed ledger.
#[derive(Debug, Clone)]
pub struct Ledger {
    info: LedgerInfo,

    /// Entry storage
    /// Key: slab index, Value: (ledger key, entry)
    entries: Slab<(Key, LedgerEntry)>,

    /// Ledger key to slab index, in key order
    index: BTreeMap<Key, usize>,
}

impl Ledger {
    pub fn new(info: LedgerInfo) -> Self {
        Self { info, entries: Slab::new(), index: BTreeMap::new() }
    }

    pub fn with_capacity(info: LedgerInfo, capacity: usize) -> Self {
        Self { info, entries: Slab::with_capacity(capacity), index: BTreeMap::new() }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.entries.capacity()
    }

    /// Close this ledger at `close_time` and open its successor.
    ///
    /// State carries over; only the header changes.
    pub fn advance(&mut self, close_time: u32) {
        self.info.seq += 1;
        self.info.parent_close_time = close_time;
    }

    pub fn get(&self, key: &Key) -> Option<&LedgerEntry> {
        let slot = *self.index.get(key)?;
        self.entries.get(slot).map(|(_, e)| e)
    }

    /// All entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&Key, &LedgerEntry)> + '_ {
        self.index
            .iter()
            .filter_map(move |(k, slot)| self.entries.get(*slot).map(|(_, e)| (k, e)))
    }

    /// Entries strictly after `marker` (or from the start), in key order.
    pub fn iter_from(
        &self,
        marker: Option<Key>,
    ) -> impl Iterator<Item = (&Key, &LedgerEntry)> + '_ {
        let lower = match marker {
            Some(k) => Bound::Excluded(k),
            None => Bound::Unbounded,
        };
        self.index
            .range((lower, Bound::Unbounded))
            .filter_map(move |(k, slot)| self.entries.get(*slot).map(|(_, e)| (k, e)))
    }

    // ========================================================================
    // State root
    // ========================================================================

    pub fn state_root(&self) -> Result<[u8; 32], EngineError> {
        let mut hasher = Sha256::new();
        for (key, entry) in self.iter() {
            hasher.update(key.as_bytes());
            hasher.update(entry.encode()?);
        }
        Ok(hasher.finalize().into())
    }

    pub fn state_root_hex(&self) -> Result<String, EngineError> {
        Ok(hex::encode(self.state_root()?))
    }

    // ========================================================================
    // Genesis helpers
    // ========================================================================

    pub fn create_account(&mut self, id: AccountId, balance: u64) -> Result<(), ViewError> {
        let root = AccountRoot::new(id, balance);
        self.raw_insert(root.key(), LedgerEntry::Account(root))
    }

    /// Set the transfer fee on currencies issued by `id` (10^9 = none).
    pub fn set_transfer_rate(&mut self, id: AccountId, rate: u32) -> Result<(), ViewError> {
        let key = keylet::account(id);
        let mut root = match self.get(&key) {
            Some(LedgerEntry::Account(a)) => a.clone(),
            _ => return Err(ViewError::Missing(key)),
        };
        root.transfer_rate = rate;
        self.raw_replace(key, LedgerEntry::Account(root))
    }

    pub fn create_trust_line(
        &mut self,
        holder: AccountId,
        issue: Issue,
        balance: u64,
    ) -> Result<(), ViewError> {
        let line = TrustLine::new(holder, issue, balance);
        self.raw_insert(line.key(), LedgerEntry::TrustLine(line))
    }
}

impl ReadView for Ledger {
    fn info(&self) -> &LedgerInfo {
        &self.info
    }

    fn read(&self, key: &Key) -> Option<LedgerEntry> {
        self.get(key).cloned()
    }

    fn exists(&self, key: &Key) -> bool {
        self.index.contains_key(key)
    }

    fn succ(&self, key: &Key, last: Option<&Key>) -> Option<Key> {
        let (next, _) = self
            .index
            .range((Bound::Excluded(*key), Bound::Unbounded))
            .next()?;
        match last {
            Some(l) if next >= l => None,
            _ => Some(*next),
        }
    }
}

impl RawView for Ledger {
    fn raw_insert(&mut self, key: Key, entry: LedgerEntry) -> Result<(), ViewError> {
        if self.index.contains_key(&key) {
            return Err(ViewError::AlreadyExists(key));
        }
        let slot = self.entries.insert((key, entry));
        self.index.insert(key, slot);
        Ok(())
    }

    fn raw_replace(&mut self, key: Key, entry: LedgerEntry) -> Result<(), ViewError> {
        let slot = *self.index.get(&key).ok_or(ViewError::Missing(key))?;
        match self.entries.get_mut(slot) {
            Some(stored) => {
                stored.1 = entry;
                Ok(())
            }
            None => Err(ViewError::Missing(key)),
        }
    }

    fn raw_erase(&mut self, key: &Key) -> Result<(), ViewError> {
        let slot = self.index.remove(key).ok_or(ViewError::Missing(*key))?;
        self.entries.try_remove(slot).ok_or(ViewError::Missing(*key))?;
        Ok(())
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
