//! Balances, spendable funds and value transfer.
//!
//! ## Funds
//!
//! What an account can spend of an issue:
//!
//! - native: balance minus the reserve for its current owner count, never
//!   below zero
//! - issued, held by the issuer: unlimited (the issuer mints on demand)
//! - issued, anyone else: the trust-line balance
//!
//! ## Transfer fees
//!
//! When an issued amount moves between two accounts neither of which is the
//! issuer, the sender is charged `amount * rate`, rounded up. The receiver
//! gets exactly `amount`; the difference is destroyed.

use tracing::trace;

use crate::error::EngineError;
use crate::ledger::{peek_account, read_account, read_trust_line, ApplyView, ReadView};
use crate::types::{keylet, AccountId, Amount, Issue, Rate};

/// Spendable amount of `issue` held by `account`.
pub fn account_funds<V: ReadView + ?Sized>(view: &V, account: AccountId, issue: Issue) -> Amount {
    match issue {
        Issue::Native => {
            let Some(root) = read_account(view, account) else {
                return Amount::zero(issue);
            };
            let reserve = view.info().fees.account_reserve(root.owner_count);
            let spendable = root.balance.saturating_sub(reserve);
            Amount::native(spendable.min(i64::MAX as u64) as i64)
        }
        Issue::Issued { currency, issuer } => {
            if account == issuer {
                return Amount::new(issue, issue.max_value());
            }
            let key = keylet::trust_line(account, currency.to_raw(), issuer);
            let held = read_trust_line(view, &key).map_or(0, |t| t.balance);
            Amount::new(issue, held.min(i64::MAX as u64) as i64)
        }
    }
}

/// Transfer fee rate of an issue; parity for the native asset.
pub fn transfer_rate<V: ReadView + ?Sized>(view: &V, issue: Issue) -> Rate {
    match issue.issuer() {
        None => Rate::PARITY,
        Some(issuer) => read_account(view, issuer)
            .map_or(Rate::PARITY, |root| Rate::from_raw(root.transfer_rate)),
    }
}

/// Rate charged when `issue` moves from `from` to `to`.
pub fn effective_rate<V: ReadView + ?Sized>(
    view: &V,
    issue: Issue,
    from: AccountId,
    to: AccountId,
) -> Rate {
    match issue.issuer() {
        Some(issuer) if from != issuer && to != issuer => transfer_rate(view, issue),
        _ => Rate::PARITY,
    }
}

/// Credit an existing trust line. Lines are owned objects and are never
/// created implicitly by a transfer.
fn credit_line<V: ApplyView + ?Sized>(
    view: &mut V,
    holder: AccountId,
    issue: Issue,
    value: i64,
) -> Result<(), EngineError> {
    let (currency, issuer) = issue.to_raw();
    let key = keylet::trust_line(holder, currency, AccountId(issuer));
    let line = view
        .peek(&key)
        .ok_or(EngineError::MissingEntry(key))?
        .as_trust_line_mut()
        .ok_or(EngineError::WrongEntryType(key))?;
    line.balance = line
        .balance
        .checked_add(value as u64)
        .filter(|b| *b <= i64::MAX as u64)
        .ok_or(EngineError::Amount(crate::types::AmountError::Overflow))?;
    Ok(())
}

fn debit_line<V: ApplyView + ?Sized>(
    view: &mut V,
    holder: AccountId,
    issue: Issue,
    value: i64,
) -> Result<(), EngineError> {
    let (currency, issuer) = issue.to_raw();
    let key = keylet::trust_line(holder, currency, AccountId(issuer));
    let overdraft = EngineError::Overdraft { account: holder.0, what: "issued balance" };
    let line = view
        .peek(&key)
        .ok_or(overdraft.clone())?
        .as_trust_line_mut()
        .ok_or(EngineError::WrongEntryType(key))?;
    line.balance = line.balance.checked_sub(value as u64).ok_or(overdraft)?;
    Ok(())
}

/// Move `amount` from `from` to `to`, charging any transfer fee to `from`.
pub fn account_send<V: ApplyView + ?Sized>(
    view: &mut V,
    from: AccountId,
    to: AccountId,
    amount: Amount,
) -> Result<(), EngineError> {
    if amount.value < 0 {
        return Err(EngineError::Amount(crate::types::AmountError::Negative));
    }
    if amount.value == 0 || from == to {
        return Ok(());
    }
    match amount.issue {
        Issue::Native => {
            let value = amount.value as u64;
            let sender = peek_account(view, from)?;
            sender.balance = sender
                .balance
                .checked_sub(value)
                .ok_or(EngineError::Overdraft { account: from.0, what: "native balance" })?;
            let receiver = peek_account(view, to)?;
            receiver.balance = receiver
                .balance
                .checked_add(value)
                .ok_or(EngineError::Amount(crate::types::AmountError::Overflow))?;
        }
        Issue::Issued { issuer, .. } => {
            if from == issuer {
                credit_line(view, to, amount.issue, amount.value)?;
            } else if to == issuer {
                debit_line(view, from, amount.issue, amount.value)?;
            } else {
                let charged = transfer_rate(view, amount.issue).multiply(amount.value)?;
                debit_line(view, from, amount.issue, charged)?;
                credit_line(view, to, amount.issue, amount.value)?;
            }
        }
    }
    trace!(from = %from, to = %to, amount = %amount, "sent");
    Ok(())
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FeeSchedule, LedgerConfig};
    use crate::ledger::{Ledger, Sandbox};

    const GW: AccountId = AccountId(100);
    const ALICE: AccountId = AccountId(1);
    const BOB: AccountId = AccountId(2);

    fn usd() -> Issue {
        Issue::issued("USD", GW).unwrap()
    }

    fn ledger() -> Ledger {
        let mut cfg = LedgerConfig::default();
        cfg.fees = FeeSchedule { base_fee: 10, reserve_base: 200, reserve_increment: 50 };
        let mut l = Ledger::new(cfg.ledger_info(1, 0));
        l.create_account(GW, 1_000).unwrap();
        l.create_account(ALICE, 1_000).unwrap();
        l.create_account(BOB, 1_000).unwrap();
        l.create_trust_line(ALICE, usd(), 500).unwrap();
        l.create_trust_line(BOB, usd(), 0).unwrap();
        l
    }

    #[test]
    fn test_native_funds_subtract_reserve() {
        let l = ledger();
        assert_eq!(account_funds(&l, ALICE, Issue::Native).value, 800);
        assert_eq!(account_funds(&l, AccountId(77), Issue::Native).value, 0);
    }

    #[test]
    fn test_issued_funds() {
        let l = ledger();
        assert_eq!(account_funds(&l, ALICE, usd()).value, 500);
        assert_eq!(account_funds(&l, BOB, usd()).value, 0);
        assert_eq!(account_funds(&l, GW, usd()).value, i64::MAX);
    }

    #[test]
    fn test_send_between_holders_charges_rate() {
        let mut l = ledger();
        l.set_transfer_rate(GW, 1_100_000_000).unwrap();
        let mut sb = Sandbox::new(&l);
        account_send(&mut sb, ALICE, BOB, Amount::new(usd(), 100)).unwrap();
        assert_eq!(account_funds(&sb, ALICE, usd()).value, 390);
        assert_eq!(account_funds(&sb, BOB, usd()).value, 100);
    }

    #[test]
    fn test_send_to_and_from_issuer_has_no_fee() {
        let mut l = ledger();
        l.set_transfer_rate(GW, 1_100_000_000).unwrap();
        let mut sb = Sandbox::new(&l);
        account_send(&mut sb, ALICE, GW, Amount::new(usd(), 100)).unwrap();
        assert_eq!(account_funds(&sb, ALICE, usd()).value, 400);
        account_send(&mut sb, GW, BOB, Amount::new(usd(), 30)).unwrap();
        assert_eq!(account_funds(&sb, BOB, usd()).value, 30);
        assert_eq!(
            effective_rate(&sb, usd(), ALICE, GW),
            Rate::PARITY
        );
        assert_eq!(effective_rate(&sb, usd(), ALICE, BOB), Rate(1_100_000_000));
    }

    #[test]
    fn test_native_send_and_overdraft() {
        let l = ledger();
        let mut sb = Sandbox::new(&l);
        account_send(&mut sb, ALICE, BOB, Amount::native(300)).unwrap();
        assert_eq!(read_account(&sb, BOB).unwrap().balance, 1_300);
        let err = account_send(&mut sb, ALICE, BOB, Amount::native(10_000)).unwrap_err();
        assert!(matches!(err, EngineError::Overdraft { .. }));
    }

    #[test]
    fn test_send_needs_receiver_trust_line() {
        let mut l = ledger();
        l.create_account(AccountId(3), 1_000).unwrap();
        let mut sb = Sandbox::new(&l);
        let err = account_send(&mut sb, ALICE, AccountId(3), Amount::new(usd(), 10)).unwrap_err();
        assert!(matches!(err, EngineError::MissingEntry(_)));
        let err = account_send(&mut sb, GW, AccountId(3), Amount::new(usd(), 10)).unwrap_err();
        assert!(matches!(err, EngineError::MissingEntry(_)));
        let created = sb
            .into_changes()
            .iter()
            .filter(|(_, c)| matches!(c, crate::ledger::Change::Insert(_)))
            .count();
        assert_eq!(created, 0);
    }

    #[test]
    fn test_issued_overdraft() {
        let l = ledger();
        let mut sb = Sandbox::new(&l);
        let err = account_send(&mut sb, BOB, ALICE, Amount::new(usd(), 1)).unwrap_err();
        assert!(matches!(err, EngineError::Overdraft { .. }));
    }
}
