//! Owned-object bookkeeping: owner counts, offer placement and removal.
//!
//! Every owned object is listed in its owner's directory and counted in the
//! owner's `owner_count`. Both must change together. An offer is also listed
//! in the book directory for its quality; the page numbers returned by
//! [`dir_add`] are stored on the offer so removal can go straight to them.

use tracing::trace;

use crate::error::EngineError;
use crate::ledger::{dir_add, dir_remove, peek_account, read_offer, ApplyView};
use crate::types::{keylet, AccountId, Key, LedgerEntry, Offer};

/// Add `delta` to the account's owner count.
pub fn adjust_owner_count<V: ApplyView + ?Sized>(
    view: &mut V,
    account: AccountId,
    delta: i32,
) -> Result<(), EngineError> {
    let root = peek_account(view, account)?;
    root.owner_count = root
        .owner_count
        .checked_add_signed(delta)
        .ok_or(EngineError::Logic("owner count out of range"))?;
    Ok(())
}

/// Link a new offer into its owner's and its book's directories, store it,
/// and charge its owner one more reserve increment.
///
/// The caller is responsible for having checked the reserve.
pub fn offer_place<V: ApplyView + ?Sized>(view: &mut V, mut offer: Offer) -> Result<Key, EngineError> {
    let key = offer.key();
    let owner = offer.owner();

    offer.owner_node = dir_add(view, &keylet::owner_dir(owner), key, |d| d.owner = owner.0)?;
    let rate = offer.quality_bits;
    offer.book_node = dir_add(view, &offer.book_directory(), key, |d| d.exchange_rate = rate)?;
    adjust_owner_count(view, owner, 1)?;
    view.insert(key, LedgerEntry::Offer(offer))?;

    trace!(owner = %owner, offer = %key, "offer placed");
    Ok(key)
}

/// Delete an offer: unlink it from both directories, erase it, and release
/// its owner's reserve.
pub fn offer_delete<V: ApplyView + ?Sized>(view: &mut V, key: &Key) -> Result<(), EngineError> {
    let offer = read_offer(view, key)?.ok_or(EngineError::MissingEntry(*key))?;
    let owner = offer.owner();

    dir_remove(view, &keylet::owner_dir(owner), offer.owner_node, key)?;
    dir_remove(view, &offer.book_directory(), offer.book_node, key)?;
    view.erase(key)?;
    adjust_owner_count(view, owner, -1)?;

    trace!(owner = %owner, sequence = offer.sequence, "offer deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LedgerConfig;
    use crate::ledger::{read_account, Ledger, ReadView, Sandbox};

    #[test]
    fn test_adjust_owner_count() {
        let mut l = Ledger::new(LedgerConfig::default().ledger_info(1, 0));
        l.create_account(AccountId(1), 100).unwrap();
        let mut sb = Sandbox::new(&l);
        adjust_owner_count(&mut sb, AccountId(1), 2).unwrap();
        adjust_owner_count(&mut sb, AccountId(1), -1).unwrap();
        assert_eq!(read_account(&sb, AccountId(1)).unwrap().owner_count, 1);
        assert!(adjust_owner_count(&mut sb, AccountId(1), -2).is_err());
        assert!(adjust_owner_count(&mut sb, AccountId(9), 1).is_err());
    }

    #[test]
    fn test_place_then_delete_restores_state() {
        use crate::ledger::{dir_entries, read_offer};
        use crate::types::{Amount, Issue};

        let mut l = Ledger::new(LedgerConfig::default().ledger_info(1, 0));
        l.create_account(AccountId(1), 100_000_000).unwrap();
        let root = l.state_root().unwrap();

        let usd = Issue::issued("USD", AccountId(9)).unwrap();
        let offer = Offer::new(AccountId(1), 1, Amount::new(usd, 10), Amount::native(5), None, 0);
        let mut sb = Sandbox::new(&l);
        let key = offer_place(&mut sb, offer.clone()).unwrap();
        assert_eq!(read_account(&sb, AccountId(1)).unwrap().owner_count, 1);
        assert_eq!(dir_entries(&sb, &keylet::owner_dir(AccountId(1))).unwrap(), vec![key]);
        assert_eq!(dir_entries(&sb, &offer.book_directory()).unwrap(), vec![key]);
        assert!(read_offer(&sb, &key).unwrap().is_some());

        offer_delete(&mut sb, &key).unwrap();
        let changes = sb.into_changes();
        changes.apply(&mut l).unwrap();
        assert_eq!(l.state_root().unwrap(), root);
    }

    #[test]
    fn test_offer_delete_missing() {
        let l = Ledger::new(LedgerConfig::default().ledger_info(1, 0));
        let mut sb = Sandbox::new(&l);
        let key = keylet::offer(AccountId(1), 1);
        assert_eq!(
            offer_delete(&mut sb, &key),
            Err(EngineError::MissingEntry(key))
        );
        assert!(!sb.exists(&key));
    }
}
