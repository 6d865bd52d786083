//! Offer-cancel: remove one of the submitter's own offers.
//!
//! A missing offer is not an error; it may already have been consumed or
//! pruned.

use tracing::debug;

use crate::error::{Malformed, TxError};
use crate::engine::create_offer::check_fee;
use crate::ledger::{offer_delete, ReadView, Sandbox};
use crate::types::{keylet, OfferCancel, Transaction};

pub fn preflight(tx: &Transaction, cancel: &OfferCancel) -> Result<(), Malformed> {
    if cancel.offer_sequence == 0 || cancel.offer_sequence >= tx.sequence {
        return Err(Malformed::BadSequence);
    }
    check_fee(tx)
}

pub fn apply(ctx: &mut Sandbox<'_>, tx: &Transaction, cancel: &OfferCancel) -> Result<(), TxError> {
    let key = keylet::offer(tx.account, cancel.offer_sequence);
    if ctx.exists(&key) {
        offer_delete(ctx, &key)?;
        debug!(account = %tx.account, sequence = cancel.offer_sequence, "offer cancelled");
    } else {
        debug!(account = %tx.account, sequence = cancel.offer_sequence, "no offer to cancel");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AccountId;

    #[test]
    fn test_preflight_sequence() {
        let tx = Transaction::offer_cancel(AccountId(1), 5, 10, 4);
        assert_eq!(preflight(&tx, &OfferCancel { offer_sequence: 4 }), Ok(()));
        assert_eq!(
            preflight(&tx, &OfferCancel { offer_sequence: 0 }),
            Err(Malformed::BadSequence)
        );
        assert_eq!(
            preflight(&tx, &OfferCancel { offer_sequence: 5 }),
            Err(Malformed::BadSequence)
        );
    }
}
