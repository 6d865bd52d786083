//! Offer-create: cross the books, then place whatever is left.
//!
//! ## Stages
//!
//! ```text
//! preflight -> cancel prior offer -> checks -> cross -> place remainder -> commit
//! ```
//!
//! Crossing runs in a [`CrossingViews`] pair over the transaction context.
//! On success the primary view is committed; on a claimed failure only the
//! cancel view is, so dead offers found along the way are still removed
//! while every balance change is dropped.
//!
//! ## Path selection
//!
//! Before every step the best direct offer is compared against the best
//! bridged pair (input -> native -> output, issued/issued only, with
//! [`Feature::AutoBridge`]). The bridged pair is used only when its composed
//! quality is strictly better; ties go to the direct book.

use tracing::{debug, trace};

use crate::config::Feature;
use crate::error::{Claimed, EngineError, Malformed, TxError};
use crate::engine::taker::{CrossOutcome, Taker};
use crate::ledger::{
    account_funds, offer_delete, offer_place, read_account, read_trust_line, ChangeSet, ReadView,
    Sandbox,
};
use crate::orderbook::{BookOffer, CrossingViews, OfferStream, StepCounter};
use crate::types::{
    keylet, AccountId, Book, Fill, Issue, Offer, OfferCreate, Quality, Transaction,
    MAX_NATIVE_DROPS, OFFER_CREATE_FLAGS, OFFER_PASSIVE, OFFER_SELL,
};

/// What to keep once crossing is over.
enum Resolution {
    /// Commit the primary view
    Apply(Vec<Fill>),
    /// Commit only dead-offer cleanup, then report the result
    Discard(Result<(), Claimed>),
}

enum Path {
    Direct(BookOffer),
    Bridged(BookOffer, BookOffer),
}

// ============================================================================
// Static checks
// ============================================================================

/// Reject offers whose shape is invalid regardless of ledger state.
pub fn preflight(tx: &Transaction, create: &OfferCreate) -> Result<(), Malformed> {
    if create.flags & !OFFER_CREATE_FLAGS != 0 {
        return Err(Malformed::InvalidFlags);
    }
    if create.is_immediate_or_cancel() && create.is_fill_or_kill() {
        return Err(Malformed::InvalidFlags);
    }
    if create.expiration == Some(0) {
        return Err(Malformed::BadExpiration);
    }
    if let Some(seq) = create.offer_sequence {
        if seq == 0 || seq >= tx.sequence {
            return Err(Malformed::BadSequence);
        }
    }

    let (pays, gets) = (&create.taker_pays, &create.taker_gets);
    if !pays.is_positive() || !gets.is_positive() {
        return Err(Malformed::BadOffer);
    }
    if pays.value > pays.issue.max_value() || gets.value > gets.issue.max_value() {
        return Err(Malformed::BadOffer);
    }
    if pays.issue.is_native() && gets.issue.is_native() {
        return Err(Malformed::BadOffer);
    }
    if pays.issue == gets.issue {
        return Err(Malformed::Redundant);
    }
    for issue in [pays.issue, gets.issue] {
        if let Issue::Issued { currency, issuer } = issue {
            if currency.is_native_code() {
                return Err(Malformed::BadCurrency);
            }
            if issuer.0 == 0 {
                return Err(Malformed::BadIssuer);
            }
        }
    }
    check_fee(tx)
}

/// Fees above the total native supply are nonsense for any transaction.
pub(crate) fn check_fee(tx: &Transaction) -> Result<(), Malformed> {
    if tx.fee > MAX_NATIVE_DROPS as u64 {
        return Err(Malformed::BadFee);
    }
    Ok(())
}

// ============================================================================
// Apply
// ============================================================================

/// Apply an offer-create inside the transaction context `ctx`.
///
/// The fee has already been charged in `ctx`.
///
/// # Returns
///
/// The fills produced by crossing. A [`TxError::Claimed`] result has
/// already committed dead-offer cleanup into `ctx`.
pub fn apply(
    ctx: &mut Sandbox<'_>,
    tx: &Transaction,
    create: &OfferCreate,
) -> Result<Vec<Fill>, TxError> {
    let (resolution, primary, cancel) = {
        let mut views = CrossingViews::new(&*ctx);
        let resolution = resolve(&mut views, tx, create);
        let (primary, cancel) = views.into_changes();
        (resolution?, primary, cancel)
    };

    match resolution {
        Resolution::Apply(fills) => {
            debug!(
                account = %tx.account,
                sequence = tx.sequence,
                fills = fills.len(),
                touched = primary.len(),
                "offer create applied"
            );
            commit(ctx, primary)?;
            Ok(fills)
        }
        Resolution::Discard(result) => {
            debug!(
                account = %tx.account,
                sequence = tx.sequence,
                cleaned = cancel.len(),
                ?result,
                "offer create discarded"
            );
            commit(ctx, cancel)?;
            result.map(|()| Vec::new()).map_err(TxError::Claimed)
        }
    }
}

fn commit(ctx: &mut Sandbox<'_>, changes: ChangeSet) -> Result<(), EngineError> {
    changes.apply(ctx)?;
    Ok(())
}

fn resolve(
    views: &mut CrossingViews<'_>,
    tx: &Transaction,
    create: &OfferCreate,
) -> Result<Resolution, EngineError> {
    let account = tx.account;
    let info = views.primary.info().clone();

    if let Some(seq) = create.offer_sequence {
        let prior = keylet::offer(account, seq);
        if views.primary.exists(&prior) {
            trace!(account = %account, sequence = seq, "cancelling replaced offer");
            offer_delete(&mut views.primary, &prior)?;
        }
    }

    if create.expiration.is_some_and(|e| e <= info.parent_close_time) {
        debug!(account = %account, "offer expired on submission");
        return Ok(Resolution::Apply(Vec::new()));
    }

    if account_funds(&views.primary, account, create.taker_gets.issue).value <= 0 {
        return Ok(Resolution::Discard(Err(Claimed::UnfundedOffer)));
    }
    if let Err(claimed) = check_accept_asset(&views.primary, account, create.taker_pays.issue) {
        return Ok(Resolution::Discard(Err(claimed)));
    }

    let starting_balance = read_account(&views.primary, account)
        .ok_or(EngineError::MissingEntry(keylet::account(account)))?
        .balance;

    let mut taker = Taker::new(account, create)?;
    let mut counter = StepCounter::new(info.max_offers_stepped);
    let bridging = info.rules.enabled(Feature::AutoBridge)
        && !create.taker_pays.issue.is_native()
        && !create.taker_gets.issue.is_native();

    if let Some(violation) = cross(views, &mut taker, &mut counter, bridging)? {
        return Ok(Resolution::Discard(Err(violation)));
    }

    let crossed = !taker.fills().is_empty();
    if taker.filled() {
        return Ok(Resolution::Apply(taker.into_fills()));
    }

    if create.is_fill_or_kill() {
        debug!(account = %account, remaining = ?taker.remaining(), "fill-or-kill not filled");
        let result = if info.rules.enabled(Feature::KilledResult) {
            Err(Claimed::Killed)
        } else {
            Ok(())
        };
        return Ok(Resolution::Discard(result));
    }
    if create.is_immediate_or_cancel() {
        return Ok(Resolution::Apply(taker.into_fills()));
    }

    let remainder = taker.remaining_offer();
    if remainder.is_empty() {
        return Ok(Resolution::Apply(taker.into_fills()));
    }

    let owner_count = read_account(&views.primary, account)
        .ok_or(EngineError::MissingEntry(keylet::account(account)))?
        .owner_count;
    let reserve = info.fees.account_reserve(owner_count + 1);
    if starting_balance < reserve {
        debug!(account = %account, starting_balance, reserve, "reserve too low to place offer");
        return Ok(if crossed {
            Resolution::Apply(taker.into_fills())
        } else {
            Resolution::Discard(Err(Claimed::InsufficientReserveOffer))
        });
    }

    let mut flags = 0;
    if create.is_passive() {
        flags |= OFFER_PASSIVE;
    }
    if create.is_sell() {
        flags |= OFFER_SELL;
    }
    let mut offer = Offer::new(
        account,
        tx.sequence,
        remainder.output,
        remainder.input,
        create.expiration,
        flags,
    );
    // rest at the requested rate, not the rounded remainder's
    let quality = Quality::from_ratio(create.taker_gets.value, create.taker_pays.value)
        .ok_or(EngineError::Logic("offer amounts must be positive"))?;
    offer.quality_bits = quality.to_key_bits();
    let key = offer_place(&mut views.primary, offer)?;
    debug!(
        account = %account,
        offer = %key,
        pays = %remainder.output,
        gets = %remainder.input,
        "offer placed"
    );

    Ok(Resolution::Apply(taker.into_fills()))
}

/// The submitter must be able to hold the issued asset it asks for.
fn check_accept_asset<V: ReadView + ?Sized>(
    view: &V,
    account: AccountId,
    issue: Issue,
) -> Result<(), Claimed> {
    let Issue::Issued { currency, issuer } = issue else {
        return Ok(());
    };
    if read_account(view, issuer).is_none() {
        return Err(Claimed::NoIssuer);
    }
    if account != issuer
        && read_trust_line(view, &keylet::trust_line(account, currency.to_raw(), issuer)).is_none()
    {
        return Err(Claimed::NoLine);
    }
    Ok(())
}

// ============================================================================
// Crossing loop
// ============================================================================

/// Cross until the taker is done, no acceptable offer remains, or a step
/// stalls.
///
/// # Returns
///
/// A policy violation that must abort the transaction, if one was found.
fn cross(
    views: &mut CrossingViews<'_>,
    taker: &mut Taker,
    counter: &mut StepCounter,
    bridging: bool,
) -> Result<Option<Claimed>, EngineError> {
    let input = taker.original().input.issue;
    let output = taker.original().output.issue;

    let mut direct = OfferStream::new(Book::new(input, output));
    direct.step(views, counter)?;

    let mut bridge = if bridging {
        // own offers on a leg are left alone; only the direct book claims them
        let mut first = OfferStream::excluding(Book::new(input, Issue::Native), taker.account());
        let mut second = OfferStream::excluding(Book::new(Issue::Native, output), taker.account());
        first.step(views, counter)?;
        second.step(views, counter)?;
        Some((first, second))
    } else {
        None
    };

    loop {
        if taker.done(&views.primary) {
            break;
        }

        // an offer crossed in part stays the tip with fewer remaining
        direct.refresh(&views.primary)?;
        if let Some((first, second)) = bridge.as_mut() {
            first.refresh(&views.primary)?;
            second.refresh(&views.primary)?;
        }

        let direct_tip = direct.tip().cloned();
        let bridge_tips = bridge
            .as_ref()
            .and_then(|(first, second)| Some((first.tip()?.clone(), second.tip()?.clone())));

        let path = match (direct_tip, bridge_tips) {
            (None, None) => break,
            (Some(offer), None) => Path::Direct(offer),
            (None, Some((first, second))) => Path::Bridged(first, second),
            (Some(offer), Some((first, second))) => {
                if first.quality.compose(&second.quality) > offer.quality {
                    Path::Bridged(first, second)
                } else {
                    Path::Direct(offer)
                }
            }
        };

        match path {
            Path::Direct(offer) => {
                if taker.reject(offer.quality) {
                    break;
                }
                if offer.offer.owner() == taker.account() {
                    debug!(account = %taker.account(), offer = %offer.key, "would cross own offer");
                    return Ok(Some(Claimed::OfferCrossSelf));
                }
                match taker.cross(views, &offer)? {
                    CrossOutcome::Direct { offer_spent: true } => {
                        direct.step(views, counter)?;
                    }
                    CrossOutcome::Direct { offer_spent: false } => {}
                    _ => break,
                }
            }
            Path::Bridged(first, second) => {
                if taker.reject(first.quality.compose(&second.quality)) {
                    break;
                }
                let Some((first_stream, second_stream)) = bridge.as_mut() else {
                    break;
                };
                match taker.cross_bridged(views, &first, &second)? {
                    CrossOutcome::Bridged { first_spent, second_spent } => {
                        if first_spent {
                            first_stream.step(views, counter)?;
                        }
                        if second_spent {
                            second_stream.step(views, counter)?;
                        }
                    }
                    _ => break,
                }
            }
        }
    }

    Ok(None)
}

// ============================================================================
// Unit Tests
// ============================================================================
