//! Ledger state, transactional views and bookkeeping primitives.
//!
//! ## Components
//!
//! - [`Ledger`]: committed state in a slab arena with an ordered key index
//! - [`Sandbox`]: copy-on-write overlay with explicit commit/discard
//! - [`dir_add`] / [`dir_remove`]: paged directories (owner and book)
//! - [`account_funds`] / [`account_send`]: balances and transfers
//! - [`offer_delete`]: remove an offer and all its linkage
//! - [`ledger_data`]: paged read-only enumeration for clients
//!
//! ## Complexity
//!
//! | Operation | Complexity |
//! |-----------|------------|
//! | Read by key | O(log n) |
//! | Successor | O(log n) |
//! | Directory append | O(1) pages touched |
//! | Directory remove with hint | O(page size) |

mod data;
mod directory;
mod funds;
mod ownership;
mod sandbox;
mod state;
mod view;

pub use data::{
    ledger_data, EntryData, LedgerDataItem, LedgerDataPage, LedgerDataRequest,
    BINARY_PAGE_LENGTH, OBJECT_PAGE_LENGTH,
};
pub use directory::{dir_add, dir_entries, dir_first, dir_nth, dir_remove, DIR_NODE_MAX};
pub use funds::{account_funds, account_send, effective_rate, transfer_rate};
pub use ownership::{adjust_owner_count, offer_delete, offer_place};
pub use sandbox::{Change, ChangeSet, Sandbox};
pub use state::Ledger;
pub use view::{
    peek_account, peek_directory, peek_offer, read_account, read_directory, read_offer,
    read_trust_line, ApplyView, LedgerInfo, RawView, ReadView, Rules, ViewError,
};
