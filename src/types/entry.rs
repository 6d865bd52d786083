//! Ledger entry types.
//!
//! ## SSZ Serialization
//!
//! Fixed-layout entries derive `SimpleSerialize` from ssz_rs. Issues are
//! stored as raw `(currency, issuer)` integer pairs and amounts as unsigned
//! smallest-unit counts; typed accessors convert to [`Amount`] and [`Issue`].
//! The canonical encoding of an entry feeds the ledger state root.
//!
//! ## Ownership
//!
//! Offers are owned objects: each is listed in its owner's directory and in
//! one order-book quality directory, and counts toward the owner's reserve.

use ssz_rs::prelude::*;

use crate::error::EngineError;
use crate::types::{keylet, AccountId, Amount, Amounts, Book, Issue, Key, Quality};

fn encoding_error<E: std::fmt::Debug>(e: E) -> EngineError {
    EngineError::Encoding(format!("{:?}", e))
}

// ============================================================================
// AccountRoot
// ============================================================================

/// An account: native balance, owned-object count and next sequence.
#[derive(Debug, Clone, PartialEq, Eq, Default, SimpleSerialize)]
pub struct AccountRoot {
    pub account: u64,

    /// Native balance in drops
    pub balance: u64,

    /// Number of owned objects (offers) counting toward the reserve
    pub owner_count: u32,

    /// Next transaction sequence number expected from this account
    pub sequence: u32,

    /// Transfer fee charged on this account's issued currencies, scaled by
    /// 10^9. `0` means none.
    pub transfer_rate: u32,
}

impl AccountRoot {
    pub fn new(account: AccountId, balance: u64) -> Self {
        Self {
            account: account.0,
            balance,
            owner_count: 0,
            sequence: 1,
            transfer_rate: 0,
        }
    }

    pub fn id(&self) -> AccountId {
        AccountId(self.account)
    }

    pub fn key(&self) -> Key {
        keylet::account(self.id())
    }
}

// ============================================================================
// TrustLine
// ============================================================================

/// Balance of one issued currency held by `holder`.
#[derive(Debug, Clone, PartialEq, Eq, Default, SimpleSerialize)]
pub struct TrustLine {
    pub holder: u64,
    pub currency: u64,
    pub issuer: u64,

    /// Held amount in 10^-8 units; never negative
    pub balance: u64,
}

impl TrustLine {
    pub fn new(holder: AccountId, issue: Issue, balance: u64) -> Self {
        let (currency, issuer) = issue.to_raw();
        Self { holder: holder.0, currency, issuer, balance }
    }

    pub fn issue(&self) -> Issue {
        Issue::from_raw(self.currency, self.issuer)
    }

    pub fn balance(&self) -> Amount {
        Amount::new(self.issue(), self.balance as i64)
    }

    pub fn key(&self) -> Key {
        keylet::trust_line(AccountId(self.holder), self.currency, AccountId(self.issuer))
    }
}

// ============================================================================
// Offer
// ============================================================================

/// Ledger flag: do not consume offers at exactly this offer's quality.
pub const OFFER_PASSIVE: u32 = 0x0001_0000;
/// Ledger flag: the offer was placed as a sell.
pub const OFFER_SELL: u32 = 0x0002_0000;

/// A standing offer resting in an order book.
///
/// `taker_pays` is what the owner wants, `taker_gets` what the owner gives.
///
/// ## SSZ Layout
///
/// 8+4+8+8+8+8+8+8+4+4+8+8+8 = 92 bytes
#[derive(Debug, Clone, PartialEq, Eq, Default, SimpleSerialize)]
pub struct Offer {
    pub account: u64,
    pub sequence: u32,

    pub pays_currency: u64,
    pub pays_issuer: u64,
    /// Remaining amount the owner wants, in smallest units
    pub taker_pays: u64,

    pub gets_currency: u64,
    pub gets_issuer: u64,
    /// Remaining amount the owner gives, in smallest units
    pub taker_gets: u64,

    /// Close time after which the offer is dead; `0` = never
    pub expiration: u32,
    pub flags: u32,

    /// Quality the offer was placed at, packed as directory key bits
    pub quality_bits: u64,

    /// Page of the book directory holding this offer
    pub book_node: u64,

    /// Page of the owner directory holding this offer
    pub owner_node: u64,
}

impl Offer {
    /// Build an unlinked offer. Directory hints are filled in on placement.
    pub fn new(
        owner: AccountId,
        sequence: u32,
        taker_pays: Amount,
        taker_gets: Amount,
        expiration: Option<u32>,
        flags: u32,
    ) -> Self {
        let (pays_currency, pays_issuer) = taker_pays.issue.to_raw();
        let (gets_currency, gets_issuer) = taker_gets.issue.to_raw();
        let quality = Quality::from_ratio(taker_gets.value, taker_pays.value)
            .unwrap_or(Quality::ZERO);
        Self {
            account: owner.0,
            sequence,
            pays_currency,
            pays_issuer,
            taker_pays: taker_pays.value.max(0) as u64,
            gets_currency,
            gets_issuer,
            taker_gets: taker_gets.value.max(0) as u64,
            expiration: expiration.unwrap_or(0),
            flags,
            quality_bits: quality.to_key_bits(),
            book_node: 0,
            owner_node: 0,
        }
    }

    pub fn owner(&self) -> AccountId {
        AccountId(self.account)
    }

    pub fn key(&self) -> Key {
        keylet::offer(self.owner(), self.sequence)
    }

    pub fn taker_pays(&self) -> Amount {
        Amount::new(Issue::from_raw(self.pays_currency, self.pays_issuer), self.taker_pays as i64)
    }

    pub fn taker_gets(&self) -> Amount {
        Amount::new(Issue::from_raw(self.gets_currency, self.gets_issuer), self.taker_gets as i64)
    }

    /// Replace the remaining amounts after a partial fill.
    pub fn set_remaining(&mut self, taker_pays: i64, taker_gets: i64) {
        self.taker_pays = taker_pays.max(0) as u64;
        self.taker_gets = taker_gets.max(0) as u64;
    }

    /// The book this offer rests in: crossers pay `taker_pays` and receive
    /// `taker_gets`.
    pub fn book(&self) -> Book {
        Book::new(self.taker_pays().issue, self.taker_gets().issue)
    }

    /// Remaining amounts from the crossing taker's point of view.
    pub fn amounts(&self) -> Amounts {
        Amounts::new(self.taker_pays(), self.taker_gets())
    }

    pub fn quality(&self) -> Quality {
        Quality::from_key_bits(self.quality_bits)
    }

    pub fn book_directory(&self) -> Key {
        keylet::quality(&self.book(), &self.quality())
    }

    pub fn is_passive(&self) -> bool {
        self.flags & OFFER_PASSIVE != 0
    }

    pub fn is_sell(&self) -> bool {
        self.flags & OFFER_SELL != 0
    }

    /// Nothing left to exchange on at least one side.
    pub fn is_dry(&self) -> bool {
        self.taker_pays == 0 || self.taker_gets == 0
    }

    pub fn is_expired(&self, close_time: u32) -> bool {
        self.expiration != 0 && self.expiration <= close_time
    }
}

// ============================================================================
// DirectoryNode
// ============================================================================

/// One page of a directory: an ordered list of keys.
///
/// Pages form a doubly linked ring through the root (page 0). The root's
/// `prev` is the last page; the last page's `next` is 0.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DirectoryNode {
    pub root: Key,
    pub page: u64,
    pub indexes: Vec<Key>,
    pub next: u64,
    pub prev: u64,

    /// Owning account for owner directories, 0 for book directories
    pub owner: u64,

    /// Packed quality for book directories, 0 for owner directories
    pub exchange_rate: u64,
}

/// Fixed part of a directory page, as encoded.
#[derive(Debug, Clone, PartialEq, Eq, Default, SimpleSerialize)]
struct DirectoryHeader {
    page: u64,
    next: u64,
    prev: u64,
    owner: u64,
    exchange_rate: u64,
    count: u32,
}

impl DirectoryNode {
    pub fn new(root: Key, page: u64) -> Self {
        Self { root, page, ..Default::default() }
    }

    pub fn key(&self) -> Key {
        keylet::dir_page(&self.root, self.page)
    }

    pub fn is_root(&self) -> bool {
        self.page == 0
    }

    fn encode(&self) -> Result<Vec<u8>, EngineError> {
        let header = DirectoryHeader {
            page: self.page,
            next: self.next,
            prev: self.prev,
            owner: self.owner,
            exchange_rate: self.exchange_rate,
            count: self.indexes.len() as u32,
        };
        let mut out = self.root.0.to_vec();
        out.extend(ssz_rs::serialize(&header).map_err(encoding_error)?);
        for k in &self.indexes {
            out.extend_from_slice(&k.0);
        }
        Ok(out)
    }
}

// ============================================================================
// LedgerEntry
// ============================================================================

/// Any object stored in the ledger state map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerEntry {
    Account(AccountRoot),
    TrustLine(TrustLine),
    Offer(Offer),
    Directory(DirectoryNode),
}

impl LedgerEntry {
    pub fn type_name(&self) -> &'static str {
        match self {
            LedgerEntry::Account(_) => "AccountRoot",
            LedgerEntry::TrustLine(_) => "TrustLine",
            LedgerEntry::Offer(_) => "Offer",
            LedgerEntry::Directory(_) => "DirectoryNode",
        }
    }

    fn tag(&self) -> u8 {
        match self {
            LedgerEntry::Account(_) => 1,
            LedgerEntry::TrustLine(_) => 2,
            LedgerEntry::Offer(_) => 3,
            LedgerEntry::Directory(_) => 4,
        }
    }

    /// Canonical bytes: a type tag followed by the entry's encoding.
    pub fn encode(&self) -> Result<Vec<u8>, EngineError> {
        let body = match self {
            LedgerEntry::Account(a) => ssz_rs::serialize(a).map_err(encoding_error)?,
            LedgerEntry::TrustLine(t) => ssz_rs::serialize(t).map_err(encoding_error)?,
            LedgerEntry::Offer(o) => ssz_rs::serialize(o).map_err(encoding_error)?,
            LedgerEntry::Directory(d) => d.encode()?,
        };
        let mut out = Vec::with_capacity(body.len() + 1);
        out.push(self.tag());
        out.extend(body);
        Ok(out)
    }

    pub fn as_account(&self) -> Option<&AccountRoot> {
        match self {
            LedgerEntry::Account(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_account_mut(&mut self) -> Option<&mut AccountRoot> {
        match self {
            LedgerEntry::Account(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_trust_line_mut(&mut self) -> Option<&mut TrustLine> {
        match self {
            LedgerEntry::TrustLine(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_offer(&self) -> Option<&Offer> {
        match self {
            LedgerEntry::Offer(o) => Some(o),
            _ => None,
        }
    }

    pub fn as_offer_mut(&mut self) -> Option<&mut Offer> {
        match self {
            LedgerEntry::Offer(o) => Some(o),
            _ => None,
        }
    }

    pub fn as_directory(&self) -> Option<&DirectoryNode> {
        match self {
            LedgerEntry::Directory(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_directory_mut(&mut self) -> Option<&mut DirectoryNode> {
        match self {
            LedgerEntry::Directory(d) => Some(d),
            _ => None,
        }
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn usd() -> Issue {
        Issue::issued("USD", AccountId(9)).unwrap()
    }

    fn sample_offer() -> Offer {
        Offer::new(
            AccountId(1),
            5,
            Amount::new(usd(), 100),
            Amount::native(50),
            None,
            OFFER_SELL,
        )
    }

    #[test]
    fn test_offer_accessors() {
        let o = sample_offer();
        assert_eq!(o.taker_pays(), Amount::new(usd(), 100));
        assert_eq!(o.taker_gets(), Amount::native(50));
        assert_eq!(o.book(), Book::new(usd(), Issue::Native));
        assert_eq!(o.quality(), Quality::from_ratio(50, 100).unwrap());
        assert!(o.is_sell());
        assert!(!o.is_passive());
        assert!(!o.is_dry());
        assert_eq!(o.key(), keylet::offer(AccountId(1), 5));
    }

    #[test]
    fn test_offer_expiry() {
        let mut o = sample_offer();
        assert!(!o.is_expired(1_000));
        o.expiration = 100;
        assert!(o.is_expired(100));
        assert!(!o.is_expired(99));
    }

    #[test]
    fn test_offer_dry() {
        let mut o = sample_offer();
        o.set_remaining(10, 0);
        assert!(o.is_dry());
    }

    #[test]
    fn test_offer_ssz_roundtrip() {
        let o = sample_offer();
        let bytes = ssz_rs::serialize(&o).expect("Failed to serialize");
        assert_eq!(bytes.len(), 92);
        let back: Offer = ssz_rs::deserialize(&bytes).expect("Failed to deserialize");
        assert_eq!(o, back);
    }

    #[test]
    fn test_entry_encoding_is_tagged_and_deterministic() {
        let a = LedgerEntry::Account(AccountRoot::new(AccountId(1), 10));
        let b1 = a.encode().unwrap();
        let b2 = a.encode().unwrap();
        assert_eq!(b1, b2);
        assert_eq!(b1[0], 1);

        let mut dir = DirectoryNode::new(keylet::owner_dir(AccountId(1)), 0);
        let empty_len = LedgerEntry::Directory(dir.clone()).encode().unwrap().len();
        dir.indexes.push(keylet::offer(AccountId(1), 1));
        let one_len = LedgerEntry::Directory(dir).encode().unwrap().len();
        assert_eq!(one_len, empty_len + 32);
    }

    #[test]
    fn test_trust_line() {
        let t = TrustLine::new(AccountId(2), usd(), 500);
        assert_eq!(t.balance(), Amount::new(usd(), 500));
        assert_eq!(t.key(), keylet::trust_line(AccountId(2), usd().to_raw().0, AccountId(9)));
    }
}
