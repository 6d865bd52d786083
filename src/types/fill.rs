//! Record of one offer consumed during a crossing.
//!
//! ## SSZ Serialization
//!
//! Fills are serialized using SSZ for deterministic encoding, so a
//! transaction's fill list can be hashed and compared across nodes.

use ssz_rs::prelude::*;

use crate::types::{AccountId, Quality};

/// One exchange between the crossing taker and a resting offer.
///
/// ## Terminology
///
/// - **Taker**: the account submitting the crossing transaction
/// - **Offer owner**: the account whose resting offer was consumed
///
/// Amounts are in smallest units of the offer's issues: `taker_paid` in the
/// offer's `taker_pays` issue, `taker_got` in its `taker_gets` issue. For a
/// bridged step, each leg produces its own fill.
#[derive(Debug, Clone, PartialEq, Eq, Default, SimpleSerialize)]
pub struct Fill {
    pub offer_owner: u64,
    pub offer_sequence: u32,

    /// Amount delivered to the offer owner (before transfer fees)
    pub taker_paid: u64,

    /// Amount delivered by the offer owner (before transfer fees)
    pub taker_got: u64,

    /// Quality of the consumed offer's directory
    pub quality_bits: u64,
}

impl Fill {
    pub fn new(
        offer_owner: AccountId,
        offer_sequence: u32,
        taker_paid: i64,
        taker_got: i64,
        quality: Quality,
    ) -> Self {
        Self {
            offer_owner: offer_owner.0,
            offer_sequence,
            taker_paid: taker_paid.max(0) as u64,
            taker_got: taker_got.max(0) as u64,
            quality_bits: quality.to_key_bits(),
        }
    }

    pub fn owner(&self) -> AccountId {
        AccountId(self.offer_owner)
    }

    pub fn quality(&self) -> Quality {
        Quality::from_key_bits(self.quality_bits)
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fill_new() {
        let q = Quality::from_ratio(1, 2).unwrap();
        let fill = Fill::new(AccountId(7), 3, 100, 50, q);
        assert_eq!(fill.owner(), AccountId(7));
        assert_eq!(fill.offer_sequence, 3);
        assert_eq!(fill.taker_paid, 100);
        assert_eq!(fill.taker_got, 50);
        assert_eq!(fill.quality(), q);
    }

    #[test]
    fn test_fill_ssz_roundtrip() {
        let fill = Fill::new(AccountId(1), 2, 3, 4, Quality::from_ratio(4, 3).unwrap());
        let bytes = ssz_rs::serialize(&fill).expect("Failed to serialize");
        // 8 + 4 + 8 + 8 + 8
        assert_eq!(bytes.len(), 36);
        let back: Fill = ssz_rs::deserialize(&bytes).expect("Failed to deserialize");
        assert_eq!(fill, back);
    }
}
