//! Exchange-rate representation used to order offers.
//!
//! ## Representation
//!
//! A [`Quality`] is the ratio `output / input` of an exchange, stored as a
//! 16-digit decimal mantissa and a base-10 exponent:
//!
//! ```text
//! value = mantissa * 10^exponent,   10^15 <= mantissa < 10^16
//! ```
//!
//! Every constructor truncates toward zero, so a quality never overstates the
//! rate it was derived from. Because the form is normalized, equal ratios
//! always produce identical qualities, and the ordering is total.
//!
//! ## Ordering
//!
//! Higher is better: more output per unit of input.
//!
//! ## Directory keys
//!
//! [`Quality::to_key_bits`] packs a quality into 64 bits such that ascending
//! key order is best-quality-first. Order-book directory keys end with these
//! bits, so an ordered successor scan walks a book from its best price.

use std::fmt;

const MIN_MANTISSA: u128 = 1_000_000_000_000_000;
const MAX_MANTISSA: u128 = 10_000_000_000_000_000;

/// Exponent bias for key packing.
const EXPONENT_BIAS: i32 = 128;
const MANTISSA_MASK: u64 = (1 << 56) - 1;

/// Exchange rate `output / input`, truncated to 16 significant digits.
///
/// Field order matters: the derived ordering compares the exponent first,
/// which is correct because the mantissa is normalized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Quality {
    exponent: i32,
    mantissa: u64,
}

/// `floor(num / den)` normalized to 16 digits. Both must be non-zero.
fn normalize(mut num: u128, mut den: u128) -> (u64, i32) {
    let mut exponent = 0i32;
    while num < den * MIN_MANTISSA {
        num *= 10;
        exponent -= 1;
    }
    while num >= den * MAX_MANTISSA {
        den *= 10;
        exponent += 1;
    }
    ((num / den) as u64, exponent)
}

fn pow10(n: u32) -> Option<u128> {
    10u128.checked_pow(n)
}

impl Quality {
    /// Worse than every real quality. Produced only from empty outputs.
    pub const ZERO: Quality = Quality { exponent: i32::MIN, mantissa: 0 };

    /// Quality of exchanging `input` for `output` (raw units).
    ///
    /// Returns `None` when `input` is not positive.
    pub fn from_ratio(output: i64, input: i64) -> Option<Quality> {
        if input <= 0 {
            return None;
        }
        if output <= 0 {
            return Some(Quality::ZERO);
        }
        let (mantissa, exponent) = normalize(output as u128, input as u128);
        Some(Quality { exponent, mantissa })
    }

    /// Quality of an amounts pair.
    pub fn from_amounts(amounts: &crate::types::Amounts) -> Option<Quality> {
        Self::from_ratio(amounts.output.value, amounts.input.value)
    }

    #[inline]
    pub fn mantissa(&self) -> u64 {
        self.mantissa
    }

    #[inline]
    pub fn exponent(&self) -> i32 {
        self.exponent
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        self.mantissa == 0
    }

    /// Quality of two exchanges performed back to back.
    ///
    /// Used to price a bridged path: `leg1` output feeds `leg2` input.
    /// The product is truncated, and `a.compose(b) == b.compose(a)`.
    pub fn compose(&self, other: &Quality) -> Quality {
        if self.is_zero() || other.is_zero() {
            return Quality::ZERO;
        }
        let (mantissa, exponent) = normalize(self.mantissa as u128 * other.mantissa as u128, 1);
        Quality {
            exponent: exponent + self.exponent + other.exponent,
            mantissa,
        }
    }

    /// `1 / self`, truncated. The inverse of `ZERO` is `ZERO`.
    pub fn inverse(&self) -> Quality {
        if self.is_zero() {
            return Quality::ZERO;
        }
        let (mantissa, exponent) = normalize(1, self.mantissa as u128);
        Quality {
            exponent: exponent - self.exponent,
            mantissa,
        }
    }

    /// Output obtained for `input` at this rate. Rounds down.
    ///
    /// Returns `None` if the result does not fit in an `i64`.
    pub fn output_for(&self, input: i64) -> Option<i64> {
        if input <= 0 || self.is_zero() {
            return Some(0);
        }
        let product = input as u128 * self.mantissa as u128;
        let value = if self.exponent >= 0 {
            product.checked_mul(pow10(self.exponent as u32)?)?
        } else {
            match pow10(self.exponent.unsigned_abs()) {
                Some(d) => product / d,
                None => 0,
            }
        };
        i64::try_from(value).ok()
    }

    /// Input required to obtain `output` at this rate. Rounds up.
    ///
    /// Returns `None` if the result does not fit in an `i64`.
    pub fn input_for(&self, output: i64) -> Option<i64> {
        if output <= 0 {
            return Some(0);
        }
        if self.is_zero() {
            return None;
        }
        let value = if self.exponent <= 0 {
            let num = (output as u128).checked_mul(pow10(self.exponent.unsigned_abs())?)?;
            num.div_ceil(self.mantissa as u128)
        } else {
            let den = (self.mantissa as u128).checked_mul(pow10(self.exponent as u32)?)?;
            (output as u128).div_ceil(den)
        };
        i64::try_from(value).ok()
    }

    /// Pack into 64 bits; ascending packed order is best-first.
    pub fn to_key_bits(&self) -> u64 {
        let biased = (self.exponent.saturating_add(EXPONENT_BIAS)).clamp(0, 255) as u64;
        !((biased << 56) | self.mantissa)
    }

    /// Inverse of [`Quality::to_key_bits`].
    pub fn from_key_bits(bits: u64) -> Quality {
        let rate = !bits;
        let mantissa = rate & MANTISSA_MASK;
        if mantissa == 0 {
            return Quality::ZERO;
        }
        Quality {
            exponent: (rate >> 56) as i32 - EXPONENT_BIAS,
            mantissa,
        }
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_zero() {
            return f.write_str("0");
        }
        write!(f, "{}e{}", self.mantissa, self.exponent)
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
