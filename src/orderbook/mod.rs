//! Order-book traversal for the crossing engine.
//!
//! ## Architecture
//!
//! Books are not materialized. An order book is the range of quality
//! directories between `book_base` and `book_end`; traversal walks it with
//! ordered successor queries against the current view.
//!
//! ## Components
//!
//! - [`BookTip`]: position at the best remaining offer of one book
//! - [`OfferStream`]: live-offer cursor that prunes dead offers as it goes
//! - [`CrossingViews`]: the primary / cancel sandbox pair a crossing runs in
//! - [`StepCounter`]: per-transaction cap on offers examined
//!
//! ## Performance
//!
//! | Operation | Complexity |
//! |-----------|------------|
//! | Find best quality | O(log n) |
//! | Next offer at same quality | O(log n) |
//! | Prune dead offer | O(page size) |

mod book;
mod stream;

pub use book::{BookTip, TipEntry};
pub use stream::{BookOffer, CrossingViews, OfferStream, StepCounter};
