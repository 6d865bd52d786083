//! Paged enumeration of a committed ledger, for clients.
//!
//! Only a finalized [`Ledger`] can be queried; transactional views are never
//! exposed. Each page holds at most `limit` entries (capped at 256, or 2048
//! in binary mode). When entries remain, the page carries a `marker`:
//! passing it back resumes with the first entry not yet returned.

use crate::error::EngineError;
use crate::ledger::{Ledger, ReadView};
use crate::types::{Key, LedgerEntry};

/// Page size cap for binary requests.
pub const BINARY_PAGE_LENGTH: usize = 2048;
/// Page size cap for structured requests.
pub const OBJECT_PAGE_LENGTH: usize = 256;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LedgerDataRequest {
    /// Resume point from a previous page
    pub marker: Option<Key>,
    /// Requested page size; capped per mode
    pub limit: Option<usize>,
    /// Return hex-encoded entries instead of structured ones
    pub binary: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryData {
    Object(LedgerEntry),
    /// Hex of the canonical entry encoding
    Binary(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerDataItem {
    pub index: Key,
    pub data: EntryData,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerDataPage {
    pub ledger_seq: u32,
    /// Hex state root of the queried ledger
    pub state_root: String,
    pub state: Vec<LedgerDataItem>,
    pub marker: Option<Key>,
}

/// Return one page of ledger entries in key order.
pub fn ledger_data(ledger: &Ledger, request: &LedgerDataRequest) -> Result<LedgerDataPage, EngineError> {
    let max = if request.binary { BINARY_PAGE_LENGTH } else { OBJECT_PAGE_LENGTH };
    let limit = request.limit.map_or(max, |l| l.min(max));

    let mut state = Vec::with_capacity(limit.min(ledger.len()));
    let mut marker = None;
    for (key, entry) in ledger.iter_from(request.marker) {
        if state.len() == limit {
            marker = Some(key.prev());
            break;
        }
        let data = if request.binary {
            EntryData::Binary(hex::encode(entry.encode()?))
        } else {
            EntryData::Object(entry.clone())
        };
        state.push(LedgerDataItem { index: *key, data });
    }

    Ok(LedgerDataPage {
        ledger_seq: ledger.info().seq,
        state_root: ledger.state_root_hex()?,
        state,
        marker,
    })
}
