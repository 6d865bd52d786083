//! Lazy, best-first offer cursor with dead-offer pruning.
//!
//! ## Views
//!
//! Crossing runs over two sibling sandboxes, [`CrossingViews`]:
//!
//! - **primary**: every balance change, offer consumption and removal
//! - **cancel**: only removals of offers that were already dead before this
//!   transaction started (expired, dry, or unfunded)
//!
//! Dead-offer removals are made in both views, so committing the primary
//! alone carries them too. When the transaction fails, committing the cancel
//! view alone still prunes the dead offers.
//!
//! ## Classification
//!
//! | Offer state | Action |
//! |-------------|--------|
//! | expired / dry | delete in both views, skip |
//! | unfunded in both views | delete in both views, skip |
//! | unfunded only in primary | delete in primary, skip |
//! | owned by the excluded account | leave in place, skip |
//! | otherwise | yield |
//!
//! An offer that is unfunded only in the primary view became unfunded through
//! this transaction's own crossings; it stays alive if the transaction fails.

use tracing::{trace, warn};

use crate::error::EngineError;
use crate::ledger::{account_funds, offer_delete, read_offer, ChangeSet, ReadView, Sandbox};
use crate::orderbook::BookTip;
use crate::types::{AccountId, Book, Key, Offer, Quality};

/// The primary / cancel sandbox pair for one crossing.
pub struct CrossingViews<'a> {
    pub primary: Sandbox<'a>,
    pub cancel: Sandbox<'a>,
}

impl<'a> CrossingViews<'a> {
    pub fn new(base: &'a dyn ReadView) -> Self {
        Self { primary: Sandbox::new(base), cancel: Sandbox::new(base) }
    }

    /// Remove an offer that was dead before this transaction.
    pub fn remove_dead(&mut self, key: &Key) -> Result<(), EngineError> {
        offer_delete(&mut self.cancel, key)?;
        offer_delete(&mut self.primary, key)?;
        Ok(())
    }

    /// Detach both change sets: `(primary, cancel)`.
    pub fn into_changes(self) -> (ChangeSet, ChangeSet) {
        (self.primary.into_changes(), self.cancel.into_changes())
    }
}

/// Caps the number of offers one transaction may examine.
#[derive(Debug, Clone)]
pub struct StepCounter {
    count: u32,
    limit: u32,
}

impl StepCounter {
    pub fn new(limit: u32) -> Self {
        Self { count: 0, limit }
    }

    /// Count one offer. Returns `false` once the limit is reached.
    pub fn step(&mut self) -> bool {
        if self.count >= self.limit {
            return false;
        }
        self.count += 1;
        true
    }

    pub fn count(&self) -> u32 {
        self.count
    }
}

/// A live offer at the top of a book.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookOffer {
    pub key: Key,
    pub offer: Offer,
    /// Quality of the directory the offer rests in
    pub quality: Quality,
}

/// Produces live offers of one book in best-quality, then placement, order.
#[derive(Debug, Clone)]
pub struct OfferStream {
    tip: BookTip,
    current: Option<BookOffer>,

    /// Offers of this account are passed over, never yielded
    excluded: Option<AccountId>,
}

impl OfferStream {
    pub fn new(book: Book) -> Self {
        Self { tip: BookTip::new(book), current: None, excluded: None }
    }

    /// A stream that never yields offers owned by `owner`. They stay on the
    /// book untouched.
    pub fn excluding(book: Book, owner: AccountId) -> Self {
        Self { excluded: Some(owner), ..Self::new(book) }
    }

    pub fn book(&self) -> &Book {
        self.tip.book()
    }

    /// The offer yielded by the last successful [`OfferStream::step`].
    ///
    /// Partial crossings change the offer in the view but not here; call
    /// [`OfferStream::refresh`] before using the tip again.
    pub fn tip(&self) -> Option<&BookOffer> {
        self.current.as_ref()
    }

    /// Re-read the tip's remaining amounts from `view`.
    ///
    /// A tip that no longer exists is left as is; the next step retires it.
    pub fn refresh<V: ReadView + ?Sized>(&mut self, view: &V) -> Result<(), EngineError> {
        if let Some(current) = self.current.as_mut() {
            if let Some(offer) = read_offer(view, &current.key)? {
                current.offer = offer;
            }
        }
        Ok(())
    }

    /// Advance to the next live offer.
    ///
    /// The previous tip is retired first: if it still exists in the primary
    /// view it is deleted there. Call this only once the previous tip has
    /// been consumed or can no longer be crossed.
    ///
    /// # Returns
    ///
    /// `false` when the book is exhausted or the step limit is reached.
    pub fn step(
        &mut self,
        views: &mut CrossingViews<'_>,
        counter: &mut StepCounter,
    ) -> Result<bool, EngineError> {
        let close_time = views.primary.info().parent_close_time;
        loop {
            if let Some(previous) = self.current.take() {
                if views.primary.exists(&previous.key) {
                    offer_delete(&mut views.primary, &previous.key)?;
                }
            }

            if !self.tip.step(&views.primary)? {
                return Ok(false);
            }
            if !counter.step() {
                warn!(book = %self.tip.book(), steps = counter.count(), "offer step limit reached");
                return Ok(false);
            }

            let Some(entry) = self.tip.current().cloned() else {
                return Ok(false);
            };
            let Some(offer) = read_offer(&views.primary, &entry.offer)? else {
                warn!(offer = %entry.offer, directory = %entry.directory, "directory lists a missing offer");
                return Err(EngineError::DanglingLink { directory: entry.directory, item: entry.offer });
            };

            if offer.is_expired(close_time) {
                trace!(offer = %entry.offer, expiration = offer.expiration, "removing expired offer");
                views.remove_dead(&entry.offer)?;
                continue;
            }
            if offer.is_dry() {
                trace!(offer = %entry.offer, "removing dry offer");
                views.remove_dead(&entry.offer)?;
                continue;
            }

            let issue = offer.taker_gets().issue;
            let funds = account_funds(&views.primary, offer.owner(), issue);
            if funds.value <= 0 {
                let original = account_funds(&views.cancel, offer.owner(), issue);
                if original == funds {
                    trace!(offer = %entry.offer, "removing found-unfunded offer");
                    views.remove_dead(&entry.offer)?;
                } else {
                    trace!(offer = %entry.offer, "offer became unfunded");
                    offer_delete(&mut views.primary, &entry.offer)?;
                }
                continue;
            }

            if Some(offer.owner()) == self.excluded {
                trace!(offer = %entry.offer, "passing over own offer");
                self.tip.pass();
                continue;
            }

            self.current = Some(BookOffer { key: entry.offer, offer, quality: entry.quality });
            return Ok(true);
        }
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
