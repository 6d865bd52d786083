//! Transactional overlay over any read-only view.
//!
//! ## Design
//!
//! A [`Sandbox`] records, per key, one [`Change`] relative to its base:
//!
//! | Change | Meaning |
//! |--------|---------|
//! | `Insert` | key absent in the base, present here |
//! | `Modify` | key present in the base, replaced here |
//! | `Erase` | key present in the base, deleted here |
//!
//! Reads consult the overlay first and fall through to the base. The base is
//! never touched: [`Sandbox::into_changes`] detaches the recorded
//! [`ChangeSet`], which the owner of the base may then [`ChangeSet::apply`].
//! Dropping a sandbox (or calling [`Sandbox::discard`]) forgets everything.
//!
//! A sandbox is itself a [`RawView`], so change sets from a nested sandbox
//! can be committed into it.

use std::collections::BTreeMap;
use std::ops::Bound;

use crate::ledger::{ApplyView, LedgerInfo, RawView, ReadView, ViewError};
use crate::types::{Key, LedgerEntry};

/// One recorded change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    Insert(LedgerEntry),
    Modify(LedgerEntry),
    Erase,
}

/// Ordered, detached set of changes ready to be committed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    items: BTreeMap<Key, Change>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn get(&self, key: &Key) -> Option<&Change> {
        self.items.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Key, &Change)> {
        self.items.iter()
    }

    /// Check every change against `target` without writing anything.
    pub fn validate<V: ReadView + ?Sized>(&self, target: &V) -> Result<(), ViewError> {
        for (key, change) in &self.items {
            match (change, target.exists(key)) {
                (Change::Insert(_), true) => return Err(ViewError::AlreadyExists(*key)),
                (Change::Modify(_) | Change::Erase, false) => return Err(ViewError::Missing(*key)),
                _ => {}
            }
        }
        Ok(())
    }

    /// Commit every change to `target`, in key order.
    ///
    /// All or nothing: the set is validated first, so a conflicting change
    /// leaves `target` untouched.
    pub fn apply(self, target: &mut dyn RawView) -> Result<(), ViewError> {
        self.validate(&*target)?;
        for (key, change) in self.items {
            match change {
                Change::Insert(entry) => target.raw_insert(key, entry)?,
                Change::Modify(entry) => target.raw_replace(key, entry)?,
                Change::Erase => target.raw_erase(&key)?,
            }
        }
        Ok(())
    }
}

/// Copy-on-write overlay over a read-only base.
pub struct Sandbox<'a> {
    base: &'a dyn ReadView,
    items: BTreeMap<Key, Change>,
}

impl<'a> Sandbox<'a> {
    pub fn new(base: &'a dyn ReadView) -> Self {
        Self { base, items: BTreeMap::new() }
    }

    /// Number of keys touched so far.
    pub fn touched(&self) -> usize {
        self.items.len()
    }

    pub fn into_changes(self) -> ChangeSet {
        ChangeSet { items: self.items }
    }

    pub fn discard(self) {}

    /// First overlay key in `(key, last)` that is not erased.
    fn overlay_succ(&self, key: &Key, last: Option<&Key>) -> Option<Key> {
        self.items
            .range((Bound::Excluded(*key), Bound::Unbounded))
            .take_while(|(k, _)| last.map_or(true, |l| *k < l))
            .find(|(_, c)| !matches!(c, Change::Erase))
            .map(|(k, _)| *k)
    }

    /// First base key in `(key, last)` not erased by the overlay.
    fn base_succ(&self, key: &Key, last: Option<&Key>) -> Option<Key> {
        let mut from = *key;
        loop {
            let next = self.base.succ(&from, last)?;
            match self.items.get(&next) {
                Some(Change::Erase) => from = next,
                _ => return Some(next),
            }
        }
    }
}

impl ReadView for Sandbox<'_> {
    fn info(&self) -> &LedgerInfo {
        self.base.info()
    }

    fn read(&self, key: &Key) -> Option<LedgerEntry> {
        match self.items.get(key) {
            Some(Change::Insert(e)) | Some(Change::Modify(e)) => Some(e.clone()),
            Some(Change::Erase) => None,
            None => self.base.read(key),
        }
    }

    fn exists(&self, key: &Key) -> bool {
        match self.items.get(key) {
            Some(Change::Erase) => false,
            Some(_) => true,
            None => self.base.exists(key),
        }
    }

    fn succ(&self, key: &Key, last: Option<&Key>) -> Option<Key> {
        match (self.base_succ(key, last), self.overlay_succ(key, last)) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }
}

impl ApplyView for Sandbox<'_> {
    fn peek(&mut self, key: &Key) -> Option<&mut LedgerEntry> {
        if !self.items.contains_key(key) {
            let entry = self.base.read(key)?;
            self.items.insert(*key, Change::Modify(entry));
        }
        match self.items.get_mut(key) {
            Some(Change::Insert(e)) | Some(Change::Modify(e)) => Some(e),
            _ => None,
        }
    }

    fn insert(&mut self, key: Key, entry: LedgerEntry) -> Result<(), ViewError> {
        let change = match self.items.get(&key) {
            Some(Change::Erase) => Change::Modify(entry),
            Some(_) => return Err(ViewError::AlreadyExists(key)),
            None if self.base.exists(&key) => return Err(ViewError::AlreadyExists(key)),
            None => Change::Insert(entry),
        };
        self.items.insert(key, change);
        Ok(())
    }

    fn erase(&mut self, key: &Key) -> Result<(), ViewError> {
        match self.items.get(key) {
            Some(Change::Insert(_)) => {
                self.items.remove(key);
            }
            Some(Change::Modify(_)) => {
                self.items.insert(*key, Change::Erase);
            }
            Some(Change::Erase) => return Err(ViewError::Missing(*key)),
            None if self.base.exists(key) => {
                self.items.insert(*key, Change::Erase);
            }
            None => return Err(ViewError::Missing(*key)),
        }
        Ok(())
    }
}

impl RawView for Sandbox<'_> {
    fn raw_insert(&mut self, key: Key, entry: LedgerEntry) -> Result<(), ViewError> {
        self.insert(key, entry)
    }

    fn raw_replace(&mut self, key: Key, entry: LedgerEntry) -> Result<(), ViewError> {
        match self.items.get_mut(&key) {
            Some(Change::Insert(e)) | Some(Change::Modify(e)) => {
                *e = entry;
                Ok(())
            }
            Some(Change::Erase) => Err(ViewError::Missing(key)),
            None if self.base.exists(&key) => {
                self.items.insert(key, Change::Modify(entry));
                Ok(())
            }
            None => Err(ViewError::Missing(key)),
        }
    }

    fn raw_erase(&mut self, key: &Key) -> Result<(), ViewError> {
        self.erase(key)
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LedgerConfig;
    use crate::ledger::Ledger;
    use crate::types::{keylet, AccountId, AccountRoot};

    fn account(id: u64, balance: u64) -> (Key, LedgerEntry) {
        let a = AccountRoot::new(AccountId(id), balance);
        (a.key(), LedgerEntry::Account(a))
    }

    fn base() -> Ledger {
        let mut ledger = Ledger::new(LedgerConfig::default().ledger_info(1, 0));
        for id in 1..=3 {
            let (k, e) = account(id, 100);
            ledger.raw_insert(k, e).unwrap();
        }
        ledger
    }

    fn balance(view: &dyn ReadView, id: u64) -> u64 {
        view.read(&keylet::account(AccountId(id)))
            .and_then(|e| e.as_account().map(|a| a.balance))
            .unwrap()
    }

    #[test]
    fn test_reads_fall_through() {
        let ledger = base();
        let sb = Sandbox::new(&ledger);
        assert_eq!(balance(&sb, 1), 100);
        assert!(sb.exists(&keylet::account(AccountId(2))));
        assert!(!sb.exists(&keylet::account(AccountId(9))));
    }

    #[test]
    fn test_peek_does_not_touch_base() {
        let ledger = base();
        let mut sb = Sandbox::new(&ledger);
        sb.peek(&keylet::account(AccountId(1)))
            .and_then(|e| e.as_account_mut())
            .unwrap()
            .balance = 5;
        assert_eq!(balance(&sb, 1), 5);
        assert_eq!(balance(&ledger, 1), 100);
    }

    #[test]
    fn test_apply_commits_and_discard_forgets() {
        let mut ledger = base();
        let root_before = ledger.state_root().unwrap();

        let mut sb = Sandbox::new(&ledger);
        sb.erase(&keylet::account(AccountId(2))).unwrap();
        sb.discard();
        assert_eq!(ledger.state_root().unwrap(), root_before);

        let changes = {
            let mut sb = Sandbox::new(&ledger);
            sb.erase(&keylet::account(AccountId(2))).unwrap();
            let (k, e) = account(4, 7);
            sb.insert(k, e).unwrap();
            sb.into_changes()
        };
        assert_eq!(changes.len(), 2);
        changes.apply(&mut ledger).unwrap();
        assert!(!ledger.exists(&keylet::account(AccountId(2))));
        assert_eq!(balance(&ledger, 4), 7);
    }

    #[test]
    fn test_conflicting_change_set_writes_nothing() {
        let ledger = base();
        let changes = {
            let mut sb = Sandbox::new(&ledger);
            for id in 1..=3 {
                sb.peek(&keylet::account(AccountId(id)))
                    .and_then(|e| e.as_account_mut())
                    .unwrap()
                    .balance = 7;
            }
            let (k, e) = account(9, 1);
            sb.insert(k, e).unwrap();
            sb.into_changes()
        };

        // the target already holds account 9
        let mut target = base();
        let (k, e) = account(9, 500);
        target.raw_insert(k, e).unwrap();
        let before = target.state_root().unwrap();

        assert_eq!(changes.validate(&target), Err(ViewError::AlreadyExists(k)));
        assert_eq!(changes.apply(&mut target), Err(ViewError::AlreadyExists(k)));
        assert_eq!(target.state_root().unwrap(), before);
        assert_eq!(balance(&target, 1), 100);
    }

    #[test]
    fn test_insert_erase_rules() {
        let ledger = base();
        let mut sb = Sandbox::new(&ledger);
        let (k1, e1) = account(1, 1);
        assert_eq!(sb.insert(k1, e1.clone()), Err(ViewError::AlreadyExists(k1)));

        // erase then re-insert is a modification of the base entry
        sb.erase(&k1).unwrap();
        assert_eq!(sb.erase(&k1), Err(ViewError::Missing(k1)));
        sb.insert(k1, e1.clone()).unwrap();
        assert_eq!(sb.into_changes().get(&k1), Some(&Change::Modify(e1)));

        // insert then erase leaves nothing behind
        let mut sb = Sandbox::new(&ledger);
        let (k9, e9) = account(9, 1);
        sb.insert(k9, e9).unwrap();
        sb.erase(&k9).unwrap();
        assert!(sb.into_changes().is_empty());
    }

    #[test]
    fn test_succ_merges_overlay_and_base() {
        let ledger = base();
        let mut keys: Vec<Key> = (1..=4).map(|i| keylet::account(AccountId(i))).collect();
        keys.sort();

        let mut sb = Sandbox::new(&ledger);
        let (k4, e4) = account(4, 1);
        sb.insert(k4, e4).unwrap();
        let erased = keylet::account(AccountId(2));
        sb.erase(&erased).unwrap();

        let mut seen = Vec::new();
        let mut cursor = Key([0u8; 32]);
        while let Some(k) = sb.succ(&cursor, None) {
            seen.push(k);
            cursor = k;
        }
        let expected: Vec<Key> = keys.into_iter().filter(|k| *k != erased).collect();
        assert_eq!(seen, expected);
    }

    #[test]
    fn test_nested_sandbox_commits_into_parent() {
        let ledger = base();
        let mut outer = Sandbox::new(&ledger);
        let changes = {
            let mut inner = Sandbox::new(&outer);
            inner
                .peek(&keylet::account(AccountId(3)))
                .and_then(|e| e.as_account_mut())
                .unwrap()
                .balance = 42;
            inner.into_changes()
        };
        changes.apply(&mut outer).unwrap();
        assert_eq!(balance(&outer, 3), 42);
        assert_eq!(balance(&ledger, 3), 100);
    }
}
