//! The transaction apply boundary.
//!
//! ## Flow
//!
//! ```text
//! preflight (tem) -> preclaim (ter/tef/tel) -> charge fee -> kind handler
//! ```
//!
//! Malformed and rejected transactions leave the ledger untouched. Once the
//! fee is charged, the outcome is committed: the full effect on success, or
//! whatever the handler kept for a claimed failure.
//!
//! Internal errors and panics are contained here. The handler's work is
//! thrown away and only the fee and sequence are applied, so one bad
//! transaction never poisons the ones after it.

use std::panic::{catch_unwind, AssertUnwindSafe};

use tracing::{debug, error, warn};

use crate::error::{EngineError, Rejected, TxError};
use crate::engine::{cancel_offer, create_offer};
use crate::ledger::{peek_account, read_account, ApplyView, ChangeSet, RawView, ReadView, Sandbox};
use crate::types::{Fill, Transaction, TxKind};

/// What applying one transaction did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplyOutcome {
    pub result: Result<(), TxError>,
    /// Whether any change (at least the fee) reached the view
    pub applied: bool,
    pub fills: Vec<Fill>,
}

impl ApplyOutcome {
    fn not_applied(error: TxError) -> Self {
        Self { result: Err(error), applied: false, fills: Vec::new() }
    }

    /// Result token, `tesSUCCESS` on success.
    pub fn token(&self) -> &'static str {
        match &self.result {
            Ok(()) => "tesSUCCESS",
            Err(e) => e.token(),
        }
    }
}

/// Static checks that need no ledger state.
pub fn preflight(tx: &Transaction) -> Result<(), TxError> {
    match &tx.kind {
        TxKind::OfferCreate(create) => create_offer::preflight(tx, create)?,
        TxKind::OfferCancel(cancel) => cancel_offer::preflight(tx, cancel)?,
    }
    Ok(())
}

/// Checks against the source account before anything is charged.
pub fn preclaim<V: ReadView + ?Sized>(view: &V, tx: &Transaction) -> Result<(), Rejected> {
    let root = read_account(view, tx.account).ok_or(Rejected::NoAccount)?;
    if tx.sequence < root.sequence {
        return Err(Rejected::PastSequence);
    }
    if tx.sequence > root.sequence {
        return Err(Rejected::PreSequence);
    }
    if tx.fee < view.info().fees.base_fee {
        return Err(Rejected::InsufficientFee);
    }
    if root.balance < tx.fee {
        return Err(Rejected::InsufficientBalance);
    }
    Ok(())
}

/// Apply one transaction to `view`.
///
/// Never panics and never leaves a partial effect behind.
pub fn apply<V: RawView>(view: &mut V, tx: &Transaction) -> ApplyOutcome {
    if let Err(e) = preflight(tx) {
        debug!(account = %tx.account, kind = tx.kind.name(), result = e.token(), "preflight failed");
        return ApplyOutcome::not_applied(e);
    }
    if let Err(e) = preclaim(&*view, tx) {
        let e = TxError::Rejected(e);
        debug!(account = %tx.account, kind = tx.kind.name(), result = e.token(), "preclaim failed");
        return ApplyOutcome::not_applied(e);
    }

    let attempt = catch_unwind(AssertUnwindSafe(|| {
        let mut ctx = Sandbox::new(&*view);
        let result = execute(&mut ctx, tx);
        (result, ctx.into_changes())
    }));

    let failure = match attempt {
        Ok((Ok(fills), changes)) => match changes.apply(view) {
            Ok(()) => {
                debug!(account = %tx.account, kind = tx.kind.name(), fills = fills.len(), "applied");
                return ApplyOutcome { result: Ok(()), applied: true, fills };
            }
            Err(e) => EngineError::View(e),
        },
        Ok((Err(TxError::Internal(e)), _)) => e,
        Ok((Err(e), changes)) => match changes.apply(view) {
            Ok(()) => {
                debug!(account = %tx.account, kind = tx.kind.name(), result = e.token(), "claimed");
                return ApplyOutcome { result: Err(e), applied: true, fills: Vec::new() };
            }
            Err(e) => EngineError::View(e),
        },
        Err(payload) => EngineError::Panic(panic_message(payload.as_ref())),
    };

    error!(account = %tx.account, sequence = tx.sequence, error = %failure, "transaction failed internally");
    let applied = match charge_fee_only(view, tx) {
        Ok(()) => true,
        Err(e) => {
            warn!(account = %tx.account, error = %e, "could not charge fee after internal failure");
            false
        }
    };
    ApplyOutcome { result: Err(TxError::Internal(failure)), applied, fills: Vec::new() }
}

/// Charge the fee, then run the kind handler, all inside `ctx`.
fn execute(ctx: &mut Sandbox<'_>, tx: &Transaction) -> Result<Vec<Fill>, TxError> {
    pay_fee(ctx, tx)?;
    match &tx.kind {
        TxKind::OfferCreate(create) => create_offer::apply(ctx, tx, create),
        TxKind::OfferCancel(cancel) => cancel_offer::apply(ctx, tx, cancel).map(|()| Vec::new()),
    }
}

/// Burn the fee and consume the sequence number.
fn pay_fee<V: ApplyView + ?Sized>(view: &mut V, tx: &Transaction) -> Result<(), EngineError> {
    let root = peek_account(view, tx.account)?;
    root.balance = root
        .balance
        .checked_sub(tx.fee)
        .ok_or(EngineError::Overdraft { account: tx.account.0, what: "fee" })?;
    root.sequence = root
        .sequence
        .checked_add(1)
        .ok_or(EngineError::Logic("sequence exhausted"))?;
    Ok(())
}

fn charge_fee_only<V: RawView>(view: &mut V, tx: &Transaction) -> Result<(), EngineError> {
    let changes: ChangeSet = {
        let mut ctx = Sandbox::new(&*view);
        pay_fee(&mut ctx, tx)?;
        ctx.into_changes()
    };
    changes.apply(view)?;
    Ok(())
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LedgerConfig;
    use crate::error::Malformed;
    use crate::ledger::Ledger;
    use crate::types::{AccountId, Amount, Issue, OfferCreate};

    const ALICE: AccountId = AccountId(1);

    fn ledger() -> Ledger {
        let mut l = Ledger::new(LedgerConfig::default().ledger_info(1, 0));
        l.create_account(ALICE, 100_000_000).unwrap();
        l
    }

    #[test]
    fn test_preclaim() {
        let l = ledger();
        let ok = Transaction::offer_cancel(ALICE, 1, 10, 0);
        assert_eq!(preclaim(&l, &ok), Ok(()));
        let ghost = Transaction::offer_cancel(AccountId(9), 1, 10, 0);
        assert_eq!(preclaim(&l, &ghost), Err(Rejected::NoAccount));
        let future = Transaction::offer_cancel(ALICE, 2, 10, 1);
        assert_eq!(preclaim(&l, &future), Err(Rejected::PreSequence));
        let cheap = Transaction::offer_cancel(ALICE, 1, 9, 0);
        assert_eq!(preclaim(&l, &cheap), Err(Rejected::InsufficientFee));
        let rich = Transaction::offer_cancel(ALICE, 1, 200_000_000, 0);
        assert_eq!(preclaim(&l, &rich), Err(Rejected::InsufficientBalance));
    }

    #[test]
    fn test_malformed_touches_nothing() {
        let mut l = ledger();
        let root = l.state_root().unwrap();
        let tx = Transaction::offer_cancel(ALICE, 1, 10, 0);
        let outcome = apply(&mut l, &tx);
        assert_eq!(outcome.result, Err(TxError::Malformed(Malformed::BadSequence)));
        assert!(!outcome.applied);
        assert_eq!(l.state_root().unwrap(), root);
    }

    #[test]
    fn test_cancel_missing_offer_charges_fee() {
        let mut l = ledger();
        let mut root = read_account(&l, ALICE).unwrap();
        root.sequence = 3;
        l.raw_replace(root.key(), crate::types::LedgerEntry::Account(root)).unwrap();

        let tx = Transaction::offer_cancel(ALICE, 3, 10, 2);
        let outcome = apply(&mut l, &tx);
        assert_eq!(outcome.result, Ok(()));
        assert!(outcome.applied);
        let root = read_account(&l, ALICE).unwrap();
        assert_eq!(root.balance, 100_000_000 - 10);
        assert_eq!(root.sequence, 4);
    }

    #[test]
    fn test_internal_error_charges_fee_only() {
        use crate::ledger::dir_add;
        use crate::types::{keylet, Book, Quality};

        let mut l = ledger();
        let gw = AccountId(50);
        let usd = Issue::issued("USD", gw).unwrap();
        l.create_account(gw, 100_000_000).unwrap();
        l.create_trust_line(ALICE, usd, 0).unwrap();

        // a book directory listing an offer that does not exist
        let quality = Quality::from_ratio(1, 1).unwrap();
        let directory = keylet::quality(&Book::new(Issue::Native, usd), &quality);
        let changes = {
            let mut sb = Sandbox::new(&l);
            dir_add(&mut sb, &directory, keylet::offer(gw, 9), |d| {
                d.exchange_rate = quality.to_key_bits()
            })
            .unwrap();
            sb.into_changes()
        };
        changes.apply(&mut l).unwrap();

        let fee_only = {
            let mut copy = read_account(&l, ALICE).unwrap();
            copy.balance -= 10;
            copy.sequence += 1;
            copy
        };
        let create = OfferCreate::new(Amount::new(usd, 100), Amount::native(1_000));
        let tx = Transaction::offer_create(ALICE, 1, 10, create);
        let outcome = apply(&mut l, &tx);

        assert!(outcome.applied);
        assert_eq!(outcome.token(), "tefEXCEPTION");
        assert!(matches!(
            outcome.result,
            Err(TxError::Internal(EngineError::DanglingLink { .. }))
        ));
        assert_eq!(read_account(&l, ALICE).unwrap(), fee_only);
        assert!(l.get(&keylet::offer(ALICE, 1)).is_none());
    }

    #[test]
    fn test_panic_message() {
        let payload: Box<dyn std::any::Any + Send> = Box::new("boom");
        assert_eq!(panic_message(payload.as_ref()), "boom");
        let payload: Box<dyn std::any::Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(payload.as_ref()), "bang");
        let payload: Box<dyn std::any::Any + Send> = Box::new(7u8);
        assert_eq!(panic_message(payload.as_ref()), "unknown panic");
    }
}
