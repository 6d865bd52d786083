//! Position within one order book.
//!
//! A book is the key range `[book_base, book_end]`; each key in it is the
//! root of a quality directory. Because directory keys end with the packed
//! quality, the ordered successor of the current position is always the best
//! remaining quality, and the first entry of that directory is the oldest
//! offer at that quality (time priority).
//!
//! The tip does not remove anything. Callers consume or delete the current
//! offer before stepping again; the tip then re-reads the same directory and
//! finds the next offer, or moves on once the directory is gone. An offer
//! that must stay on the book is [`BookTip::pass`]ed instead, and later
//! steps look past it.

use crate::error::EngineError;
use crate::ledger::{dir_nth, ReadView};
use crate::types::{keylet, Book, Key, Quality};

/// The best offer of a book, as of the last [`BookTip::step`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TipEntry {
    pub directory: Key,
    pub offer: Key,
    pub quality: Quality,
}

#[derive(Debug, Clone)]
pub struct BookTip {
    book: Book,
    end: Key,

    /// Successor searches start strictly after this key
    position: Key,

    current: Option<TipEntry>,

    /// Offers left in place at the front of the current directory
    passed: usize,
}

impl BookTip {
    pub fn new(book: Book) -> Self {
        Self {
            book,
            end: keylet::book_end(&book),
            position: keylet::book_base(&book),
            current: None,
            passed: 0,
        }
    }

    pub fn book(&self) -> &Book {
        &self.book
    }

    pub fn current(&self) -> Option<&TipEntry> {
        self.current.as_ref()
    }

    /// Leave the current offer on the book; the next step looks past it.
    pub fn pass(&mut self) {
        if self.current.is_some() {
            self.passed += 1;
        }
    }

    /// Move to the first offer of the best non-empty quality directory,
    /// not counting passed offers.
    ///
    /// # Returns
    ///
    /// `false` once the book has no more offers.
    pub fn step<V: ReadView + ?Sized>(&mut self, view: &V) -> Result<bool, EngineError> {
        loop {
            let Some(directory) = view.succ(&self.position, Some(&self.end)) else {
                self.current = None;
                return Ok(false);
            };
            let same = self.current.as_ref().is_some_and(|c| c.directory == directory);
            if !same {
                self.passed = 0;
            }
            match dir_nth(view, &directory, self.passed)? {
                Some(offer) => {
                    // the same directory is found again next time
                    self.position = directory.prev();
                    self.current = Some(TipEntry {
                        directory,
                        offer,
                        quality: Quality::from_key_bits(directory.tail_u64()),
                    });
                    return Ok(true);
                }
                None => {
                    self.position = directory;
                    self.current = None;
                    self.passed = 0;
                }
            }
        }
    }
}
