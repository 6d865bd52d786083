//! Ledger keys ("keylets").
//!
//! Every ledger entry lives under a 32-byte key derived with SHA-256 from a
//! one-byte space tag and the fields that identify it. Keys are compared as
//! big-endian byte strings, which is the order of the ledger's state map.
//!
//! | Space | Entry |
//! |-------|-------|
//! | `a` | account root |
//! | `r` | trust line |
//! | `o` | offer |
//! | `O` | owner directory root |
//! | `B` | order-book quality directory root |
//! | `d` | directory page other than the root |
//!
//! Order-book keys are special: all quality directories of one book share
//! the first 24 bytes and carry [`Quality::to_key_bits`] in the last 8, so a
//! book occupies the contiguous range `[book_base, book_end]`.

use std::fmt;

use sha2::{Digest, Sha256};

use crate::types::{AccountId, Book, Quality};

/// A 256-bit ledger key.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Key(pub [u8; 32]);

impl Key {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// The last 8 bytes, big-endian.
    pub fn tail_u64(&self) -> u64 {
        let mut b = [0u8; 8];
        b.copy_from_slice(&self.0[24..]);
        u64::from_be_bytes(b)
    }

    /// Copy with the last 8 bytes replaced.
    pub fn with_tail(&self, tail: u64) -> Key {
        let mut k = self.0;
        k[24..].copy_from_slice(&tail.to_be_bytes());
        Key(k)
    }

    /// The key immediately before this one, used to restart a successor
    /// search at (and including) `self`.
    pub fn prev(&self) -> Key {
        let mut k = self.0;
        for byte in k.iter_mut().rev() {
            if *byte == 0 {
                *byte = 0xFF;
            } else {
                *byte -= 1;
                break;
            }
        }
        Key(k)
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn from_hex(s: &str) -> Option<Key> {
        let bytes = hex::decode(s).ok()?;
        let arr: [u8; 32] = bytes.try_into().ok()?;
        Some(Key(arr))
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Key({})", &self.to_hex()[..16])
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

fn hash(space: u8, parts: &[&[u8]]) -> Key {
    let mut hasher = Sha256::new();
    hasher.update([space]);
    for part in parts {
        hasher.update(part);
    }
    Key(hasher.finalize().into())
}

// ============================================================================
// Keylets
// ============================================================================

pub mod keylet {
    use super::*;

    pub fn account(id: AccountId) -> Key {
        hash(b'a', &[&id.0.to_be_bytes()])
    }

    pub fn trust_line(holder: AccountId, currency_raw: u64, issuer: AccountId) -> Key {
        hash(
            b'r',
            &[&holder.0.to_be_bytes(), &currency_raw.to_be_bytes(), &issuer.0.to_be_bytes()],
        )
    }

    pub fn offer(owner: AccountId, sequence: u32) -> Key {
        hash(b'o', &[&owner.0.to_be_bytes(), &sequence.to_be_bytes()])
    }

    pub fn owner_dir(owner: AccountId) -> Key {
        hash(b'O', &[&owner.0.to_be_bytes()])
    }

    /// First key of a book's range (best possible quality).
    pub fn book_base(book: &Book) -> Key {
        hash(b'B', &[&book.input.key_bytes(), &book.output.key_bytes()]).with_tail(0)
    }

    /// Last key of a book's range.
    pub fn book_end(book: &Book) -> Key {
        book_base(book).with_tail(u64::MAX)
    }

    /// Root of the directory holding a book's offers at `quality`.
    pub fn quality(book: &Book, quality: &Quality) -> Key {
        book_base(book).with_tail(quality.to_key_bits())
    }

    /// Page `page` of the directory rooted at `root`. Page 0 is the root.
    pub fn dir_page(root: &Key, page: u64) -> Key {
        if page == 0 {
            *root
        } else {
            hash(b'd', &[&root.0, &page.to_be_bytes()])
        }
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
