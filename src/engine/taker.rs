//! The crossing side of an offer-create.
//!
//! A [`Taker`] tracks what the submitter still wants to exchange and moves
//! value against one resting offer (direct) or a pair of offers joined
//! through the native asset (bridged).
//!
//! ## Perspective
//!
//! Amounts are seen from the taker: `input` is what the taker pays
//! (the transaction's `taker_gets`), `output` what it receives
//! (`taker_pays`). Qualities are output per input; higher is better.
//!
//! ## Flow limits
//!
//! Each step moves the largest amount that every party can honour:
//!
//! | Limit | Applies to |
//! |-------|------------|
//! | offer remaining amounts | every leg |
//! | owner funds, net of transfer fee | every leg whose owner is not the recipient |
//! | taker remaining output | non-sell takers |
//! | taker remaining input | always |
//! | taker funds, net of transfer fee | always |
//!
//! Capping the output rounds the input up; capping the input rounds the
//! output down. Neither ever favours the taker.

use tracing::trace;

use crate::error::EngineError;
use crate::ledger::{
    account_funds, account_send, effective_rate, offer_delete, peek_offer, ApplyView, ReadView,
};
use crate::orderbook::{BookOffer, CrossingViews};
use crate::types::{mul_div_ceil, AccountId, Amount, Amounts, Fill, Issue, Key, OfferCreate, Quality};

/// Which side of the exchange is the native asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrossType {
    NativeToIssued,
    IssuedToNative,
    IssuedToIssued,
}

impl CrossType {
    pub fn of(input: Issue, output: Issue) -> Self {
        if input.is_native() {
            CrossType::NativeToIssued
        } else if output.is_native() {
            CrossType::IssuedToNative
        } else {
            CrossType::IssuedToIssued
        }
    }
}

/// Result of one crossing step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrossOutcome {
    /// Nothing could move; crossing stops here
    Stalled,
    Direct { offer_spent: bool },
    Bridged { first_spent: bool, second_spent: bool },
}

#[derive(Debug, Clone)]
pub struct Taker {
    account: AccountId,
    cross_type: CrossType,
    original: Amounts,
    remaining: Amounts,

    /// Worst offer quality the taker accepts
    threshold: Quality,

    sell: bool,
    passive: bool,
    fills: Vec<Fill>,
}

impl Taker {
    /// Build the taker for an offer-create submitted by `account`.
    pub fn new(account: AccountId, create: &OfferCreate) -> Result<Self, EngineError> {
        let original = Amounts::new(create.taker_gets, create.taker_pays);
        let threshold = Quality::from_amounts(&original)
            .ok_or(EngineError::Logic("taker input must be positive"))?;
        Ok(Self {
            account,
            cross_type: CrossType::of(original.input.issue, original.output.issue),
            original,
            remaining: original,
            threshold,
            sell: create.is_sell(),
            passive: create.is_passive(),
            fills: Vec::new(),
        })
    }

    pub fn account(&self) -> AccountId {
        self.account
    }

    pub fn cross_type(&self) -> CrossType {
        self.cross_type
    }

    pub fn original(&self) -> &Amounts {
        &self.original
    }

    pub fn remaining(&self) -> &Amounts {
        &self.remaining
    }

    pub fn threshold(&self) -> Quality {
        self.threshold
    }

    pub fn fills(&self) -> &[Fill] {
        &self.fills
    }

    pub fn into_fills(self) -> Vec<Fill> {
        self.fills
    }

    /// Whether an offer at `quality` is worse than the taker accepts.
    ///
    /// Passive takers also refuse offers at exactly their own quality.
    pub fn reject(&self, quality: Quality) -> bool {
        quality < self.threshold || (self.passive && quality == self.threshold)
    }

    /// The request is satisfied: nothing left to pay, or (unless selling)
    /// nothing left to receive.
    pub fn filled(&self) -> bool {
        self.remaining.input.value <= 0 || (!self.sell && self.remaining.output.value <= 0)
    }

    /// Filled, or out of funds to pay with.
    pub fn done<V: ReadView + ?Sized>(&self, view: &V) -> bool {
        self.filled() || account_funds(view, self.account, self.original.input.issue).value <= 0
    }

    /// The unfilled part of the request, at the original rate.
    ///
    /// Selling keeps the remaining input and rounds the matching output up.
    /// Buying keeps the remaining output and rounds the input up, never past
    /// what is left to pay.
    pub fn remaining_offer(&self) -> Amounts {
        let (oi, oo) = (self.original.input.value, self.original.output.value);
        let ri = self.remaining.input.value.max(0);
        let (input, output) = if self.sell {
            (ri, mul_div_ceil(ri, oo, oi))
        } else {
            let ro = self.remaining.output.value.max(0);
            (mul_div_ceil(ro, oi, oo).min(ri), ro)
        };
        Amounts::new(
            Amount::new(self.original.input.issue, input),
            Amount::new(self.original.output.issue, output),
        )
    }

    // ========================================================================
    // Direct crossing
    // ========================================================================

    /// Cross one offer from the direct book.
    pub fn cross(
        &mut self,
        views: &mut CrossingViews<'_>,
        offer: &BookOffer,
    ) -> Result<CrossOutcome, EngineError> {
        let view = &views.primary;
        let owner = offer.offer.owner();

        let mut flow = offer.offer.amounts();
        if let Some(cap) = owner_capacity(view, offer, self.account) {
            flow = flow.limit_output(cap);
        }
        if !self.sell {
            flow = flow.limit_output(self.remaining.output.value);
        }
        flow = flow.limit_input(self.remaining.input.value);
        flow = flow.limit_input(self.input_capacity(view, owner));

        if flow.is_empty() {
            trace!(offer = %offer.key, "direct step stalled");
            return Ok(CrossOutcome::Stalled);
        }

        account_send(&mut views.primary, self.account, owner, flow.input)?;
        account_send(&mut views.primary, owner, self.account, flow.output)?;
        consume_offer(&mut views.primary, &offer.key, &flow)?;
        self.record(offer, &flow);
        self.settle(flow.input, flow.output)?;

        trace!(
            offer = %offer.key,
            paid = %flow.input,
            got = %flow.output,
            "crossed direct"
        );
        Ok(CrossOutcome::Direct {
            offer_spent: is_spent(&views.primary, offer, self.account),
        })
    }

    // ========================================================================
    // Bridged crossing
    // ========================================================================

    /// Cross `first` (input -> native) and `second` (native -> output)
    /// together. Both legs carry exactly the same native amount.
    pub fn cross_bridged(
        &mut self,
        views: &mut CrossingViews<'_>,
        first: &BookOffer,
        second: &BookOffer,
    ) -> Result<CrossOutcome, EngineError> {
        let view = &views.primary;
        let first_owner = first.offer.owner();
        let second_owner = second.offer.owner();

        let mut leg1 = first.offer.amounts();
        let mut leg2 = second.offer.amounts();

        if let Some(cap) = owner_capacity(view, first, second_owner) {
            leg1 = leg1.limit_output(cap);
        }
        if let Some(cap) = owner_capacity(view, second, self.account) {
            leg2 = leg2.limit_output(cap);
        }
        if !self.sell {
            leg2 = leg2.limit_output(self.remaining.output.value);
        }
        leg1 = leg1.limit_input(self.remaining.input.value);
        leg1 = leg1.limit_input(self.input_capacity(view, first_owner));

        // equalize the native leg
        let native = leg1.output.value.min(leg2.input.value);
        leg1 = leg1.limit_output(native);
        leg2 = leg2.limit_input(native);

        if leg1.is_empty() || leg2.is_empty() || leg1.output != leg2.input {
            trace!(first = %first.key, second = %second.key, "bridged step stalled");
            return Ok(CrossOutcome::Stalled);
        }

        account_send(&mut views.primary, self.account, first_owner, leg1.input)?;
        account_send(&mut views.primary, first_owner, second_owner, leg1.output)?;
        account_send(&mut views.primary, second_owner, self.account, leg2.output)?;
        consume_offer(&mut views.primary, &first.key, &leg1)?;
        consume_offer(&mut views.primary, &second.key, &leg2)?;
        self.record(first, &leg1);
        self.record(second, &leg2);
        self.settle(leg1.input, leg2.output)?;

        trace!(
            first = %first.key,
            second = %second.key,
            paid = %leg1.input,
            native = %leg1.output,
            got = %leg2.output,
            "crossed bridged"
        );
        Ok(CrossOutcome::Bridged {
            first_spent: is_spent(&views.primary, first, second_owner),
            second_spent: is_spent(&views.primary, second, self.account),
        })
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    /// Most the taker can deliver to `counterparty` out of its funds.
    fn input_capacity<V: ReadView + ?Sized>(&self, view: &V, counterparty: AccountId) -> i64 {
        let issue = self.original.input.issue;
        let funds = account_funds(view, self.account, issue);
        effective_rate(view, issue, self.account, counterparty).divide(funds.value)
    }

    fn record(&mut self, offer: &BookOffer, flow: &Amounts) {
        self.fills.push(Fill::new(
            offer.offer.owner(),
            offer.offer.sequence,
            flow.input.value,
            flow.output.value,
            offer.quality,
        ));
    }

    fn settle(&mut self, paid: Amount, got: Amount) -> Result<(), EngineError> {
        let input = self.remaining.input.checked_sub(&paid)?;
        let output = self.remaining.output.checked_sub(&got)?;
        self.remaining = Amounts::new(
            Amount::new(input.issue, input.value.max(0)),
            Amount::new(output.issue, output.value.max(0)),
        );
        Ok(())
    }
}

/// Most `offer`'s owner can deliver to `recipient`, or `None` when the owner
/// is the recipient.
fn owner_capacity<V: ReadView + ?Sized>(
    view: &V,
    offer: &BookOffer,
    recipient: AccountId,
) -> Option<i64> {
    let owner = offer.offer.owner();
    if owner == recipient {
        return None;
    }
    let issue = offer.offer.taker_gets().issue;
    let funds = account_funds(view, owner, issue);
    Some(effective_rate(view, issue, owner, recipient).divide(funds.value))
}

/// Consumed completely, or its owner can deliver nothing more.
fn is_spent<V: ReadView + ?Sized>(view: &V, offer: &BookOffer, recipient: AccountId) -> bool {
    !view.exists(&offer.key) || owner_capacity(view, offer, recipient) == Some(0)
}

/// Reduce a resting offer by `flow`, deleting it once dry.
fn consume_offer<V: ApplyView + ?Sized>(
    view: &mut V,
    key: &Key,
    flow: &Amounts,
) -> Result<(), EngineError> {
    let dry = {
        let offer = peek_offer(view, key)?;
        let pays = offer.taker_pays().checked_sub(&flow.input)?;
        let gets = offer.taker_gets().checked_sub(&flow.output)?;
        if pays.value < 0 || gets.value < 0 {
            return Err(EngineError::Logic("offer consumed past its remaining amounts"));
        }
        offer.set_remaining(pays.value, gets.value);
        offer.is_dry()
    };
    if dry {
        offer_delete(view, key)?;
    }
    Ok(())
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FeeSchedule, LedgerConfig};
    use crate::ledger::{offer_place, read_offer, Ledger, Sandbox};
    use crate::orderbook::{OfferStream, StepCounter};
    use crate::types::{Book, Offer, TF_PASSIVE, TF_SELL};

    const GW: AccountId = AccountId(100);
    const ALICE: AccountId = AccountId(1);
    const BOB: AccountId = AccountId(2);
    const CAROL: AccountId = AccountId(3);

    fn usd() -> Issue {
        Issue::issued("USD", GW).unwrap()
    }

    fn eur() -> Issue {
        Issue::issued("EUR", GW).unwrap()
    }

    fn genesis() -> Ledger {
        let mut cfg = LedgerConfig::default();
        cfg.fees = FeeSchedule { base_fee: 10, reserve_base: 1_000, reserve_increment: 100 };
        let mut l = Ledger::new(cfg.ledger_info(1, 0));
        l.create_account(GW, 1_000_000).unwrap();
        for id in [ALICE, BOB, CAROL] {
            l.create_account(id, 1_000_000).unwrap();
            l.create_trust_line(id, usd(), 10_000).unwrap();
            l.create_trust_line(id, eur(), 10_000).unwrap();
        }
        l
    }

    fn place(l: &mut Ledger, owner: AccountId, seq: u32, pays: Amount, gets: Amount) {
        let mut sb = Sandbox::new(&*l);
        offer_place(&mut sb, Offer::new(owner, seq, pays, gets, None, 0)).unwrap();
        let changes = sb.into_changes();
        changes.apply(l).unwrap();
    }

    fn tip(views: &mut CrossingViews<'_>, book: Book) -> BookOffer {
        let mut stream = OfferStream::new(book);
        let mut counter = StepCounter::new(10);
        assert!(stream.step(views, &mut counter).unwrap());
        stream.tip().unwrap().clone()
    }

    #[test]
    fn test_reject_and_passive() {
        let create = OfferCreate::new(Amount::new(usd(), 50), Amount::native(100));
        let taker = Taker::new(BOB, &create).unwrap();
        let at = Quality::from_ratio(50, 100).unwrap();
        assert!(!taker.reject(at));
        assert!(!taker.reject(Quality::from_ratio(60, 100).unwrap()));
        assert!(taker.reject(Quality::from_ratio(40, 100).unwrap()));

        let passive = Taker::new(BOB, &create.clone().with_flags(TF_PASSIVE)).unwrap();
        assert!(passive.reject(at));
        assert_eq!(taker.cross_type(), CrossType::NativeToIssued);
    }

    #[test]
    fn test_remaining_offer_rounds_up() {
        let create = OfferCreate::new(Amount::new(usd(), 80), Amount::native(160));
        let mut taker = Taker::new(BOB, &create).unwrap();
        taker.settle(Amount::native(100), Amount::new(usd(), 50)).unwrap();
        let rest = taker.remaining_offer();
        assert_eq!(rest.input.value, 60);
        assert_eq!(rest.output.value, 30);

        // one unit out would cost ceil(10/3) = 4, but only 3 are left to pay
        let create = OfferCreate::new(Amount::new(usd(), 3), Amount::native(10));
        let mut taker = Taker::new(BOB, &create).unwrap();
        taker.settle(Amount::native(7), Amount::new(usd(), 2)).unwrap();
        assert_eq!(taker.remaining_offer().input.value, 3);

        let sell = OfferCreate::new(Amount::new(usd(), 3), Amount::native(10)).with_flags(TF_SELL);
        let mut taker = Taker::new(BOB, &sell).unwrap();
        taker.settle(Amount::native(5), Amount::new(usd(), 1)).unwrap();
        let rest = taker.remaining_offer();
        assert_eq!(rest.input.value, 5);
        assert_eq!(rest.output.value, 2);
    }

    #[test]
    fn test_direct_cross_consumes_offer() {
        let mut l = genesis();
        // Alice gives 50 USD for 100 drops
        place(&mut l, ALICE, 1, Amount::native(100), Amount::new(usd(), 50));

        let mut views = CrossingViews::new(&l);
        let book = tip(&mut views, Book::new(Issue::Native, usd()));
        let create = OfferCreate::new(Amount::new(usd(), 50), Amount::native(100));
        let mut taker = Taker::new(BOB, &create).unwrap();

        let outcome = taker.cross(&mut views, &book).unwrap();
        assert_eq!(outcome, CrossOutcome::Direct { offer_spent: true });
        assert!(taker.filled());
        assert_eq!(taker.fills().len(), 1);
        assert!(read_offer(&views.primary, &book.key).unwrap().is_none());
        assert_eq!(account_funds(&views.primary, BOB, usd()).value, 10_050);
        assert_eq!(account_funds(&views.primary, ALICE, usd()).value, 9_950);
    }

    #[test]
    fn test_direct_cross_partial_leaves_offer() {
        let mut l = genesis();
        place(&mut l, ALICE, 1, Amount::native(100), Amount::new(usd(), 50));

        let mut views = CrossingViews::new(&l);
        let book = tip(&mut views, Book::new(Issue::Native, usd()));
        let create = OfferCreate::new(Amount::new(usd(), 20), Amount::native(40));
        let mut taker = Taker::new(BOB, &create).unwrap();

        let outcome = taker.cross(&mut views, &book).unwrap();
        assert_eq!(outcome, CrossOutcome::Direct { offer_spent: false });
        let rest = read_offer(&views.primary, &book.key).unwrap().unwrap();
        assert_eq!(rest.taker_pays, 60);
        assert_eq!(rest.taker_gets, 30);
    }

    #[test]
    fn test_owner_funds_limit_direct_flow() {
        let mut l = genesis();
        // Carol offers 500 USD but only holds 10_000 - 9_990 = 10
        place(&mut l, CAROL, 1, Amount::native(1_000), Amount::new(usd(), 500));
        let mut views = CrossingViews::new(&l);
        account_send(&mut views.primary, CAROL, GW, Amount::new(usd(), 9_990)).unwrap();
        let book = tip(&mut views, Book::new(Issue::Native, usd()));

        let create = OfferCreate::new(Amount::new(usd(), 100), Amount::native(200));
        let mut taker = Taker::new(BOB, &create).unwrap();
        let outcome = taker.cross(&mut views, &book).unwrap();
        assert_eq!(outcome, CrossOutcome::Direct { offer_spent: true });
        assert_eq!(taker.remaining().output.value, 90);
        assert_eq!(taker.remaining().input.value, 180);
    }

    #[test]
    fn test_bridged_cross_equalizes_native_leg() {
        let mut l = genesis();
        // leg 1: Alice gives 300 drops for 100 USD
        place(&mut l, ALICE, 1, Amount::new(usd(), 100), Amount::native(300));
        // leg 2: Carol gives 50 EUR for 200 drops
        place(&mut l, CAROL, 1, Amount::native(200), Amount::new(eur(), 50));

        let mut views = CrossingViews::new(&l);
        let first = tip(&mut views, Book::new(usd(), Issue::Native));
        let second = tip(&mut views, Book::new(Issue::Native, eur()));

        let create = OfferCreate::new(Amount::new(eur(), 100), Amount::new(usd(), 1_000));
        let mut taker = Taker::new(BOB, &create).unwrap();
        let outcome = taker.cross_bridged(&mut views, &first, &second).unwrap();

        // only 200 drops can pass through leg 2
        assert_eq!(outcome, CrossOutcome::Bridged { first_spent: false, second_spent: true });
        let fills = taker.fills();
        assert_eq!(fills.len(), 2);
        assert_eq!(fills[0].taker_got, 200);
        assert_eq!(fills[1].taker_paid, 200);
        assert_eq!(fills[1].taker_got, 50);
        // 200 of 300 drops at 100 USD costs ceil(66.6) = 67 USD
        assert_eq!(fills[0].taker_paid, 67);
        assert_eq!(account_funds(&views.primary, BOB, eur()).value, 10_050);
        assert_eq!(account_funds(&views.primary, BOB, usd()).value, 9_933);
    }
}
