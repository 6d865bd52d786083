//! Fixed-point amounts, issues and transfer rates.
//!
//! ## Overview
//!
//! Every amount is an `i64` count of the smallest unit of its issue:
//!
//! | Issue | Unit | Decimal places |
//! |-------|------|----------------|
//! | Native | drop | 6 |
//! | Issued (currency, issuer) | 10^-8 | 8 |
//!
//! No floating point is used anywhere. Decimal strings are only parsed and
//! formatted at the edges, through `rust_decimal`.
//!
//! ## Rounding
//!
//! Ratios are computed exactly in 128-bit integers. Whenever a counter-amount
//! is derived, the rounding goes in favour of the ledger: what a taker
//! receives is rounded down, what a taker pays is rounded up.
//!
//! ## Examples
//!
//! ```
//! use ledger_crossing::types::{Amount, Issue};
//!
//! let xrp = Amount::from_decimal(Issue::Native, "1.5").unwrap();
//! assert_eq!(xrp.value, 1_500_000);
//! assert_eq!(xrp.to_string(), "1.5 XRP");
//! ```

use std::fmt;

use rust_decimal::prelude::*;
use rust_decimal::Decimal;
use thiserror::Error;

/// Drops per unit of the native asset: 10^6
pub const NATIVE_SCALE: i64 = 1_000_000;

/// Smallest units per unit of an issued asset: 10^8
pub const ISSUED_SCALE: i64 = 100_000_000;

/// Total native supply in drops. No native amount may exceed it.
pub const MAX_NATIVE_DROPS: i64 = 100_000_000_000_000_000;

/// Currency code reserved for the native asset.
pub const NATIVE_CODE: [u8; 3] = *b"XRP";

/// Errors from amount arithmetic and parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AmountError {
    #[error("amount out of representable range")]
    Overflow,
    #[error("amounts of different issues")]
    IssueMismatch,
    #[error("amount would become negative")]
    Negative,
    #[error("invalid decimal amount")]
    Parse,
}

// ============================================================================
// Accounts, currencies, issues
// ============================================================================

/// Account identifier. `0` is never a valid account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct AccountId(pub u64);

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Three-letter currency code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Currency(pub [u8; 3]);

impl Currency {
    /// Parse a three-letter ASCII code.
    pub fn from_code(code: &str) -> Option<Self> {
        let bytes: [u8; 3] = code.as_bytes().try_into().ok()?;
        if bytes.iter().all(|b| b.is_ascii_alphanumeric()) {
            Some(Currency(bytes))
        } else {
            None
        }
    }

    /// Packed big-endian form used in ledger entries. Never zero.
    pub fn to_raw(self) -> u64 {
        u64::from_be_bytes([0, 0, 0, 0, 0, self.0[0], self.0[1], self.0[2]])
    }

    /// Inverse of [`Currency::to_raw`]. Zero means "no currency".
    pub fn from_raw(raw: u64) -> Option<Self> {
        if raw == 0 {
            return None;
        }
        let b = raw.to_be_bytes();
        Some(Currency([b[5], b[6], b[7]]))
    }

    pub fn is_native_code(self) -> bool {
        self.0 == NATIVE_CODE
    }

    pub fn as_str(&self) -> &str {
        std::str::from_utf8(&self.0).unwrap_or("???")
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The asset an amount is denominated in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Issue {
    /// The ledger's native settlement asset
    #[default]
    Native,
    /// An IOU of `currency` owed by `issuer`
    Issued { currency: Currency, issuer: AccountId },
}

impl Issue {
    pub fn issued(code: &str, issuer: AccountId) -> Option<Self> {
        Some(Issue::Issued { currency: Currency::from_code(code)?, issuer })
    }

    #[inline]
    pub fn is_native(&self) -> bool {
        matches!(self, Issue::Native)
    }

    pub fn issuer(&self) -> Option<AccountId> {
        match self {
            Issue::Native => None,
            Issue::Issued { issuer, .. } => Some(*issuer),
        }
    }

    /// Raw `(currency, issuer)` pair stored in ledger entries; `(0, 0)` is native.
    pub fn to_raw(&self) -> (u64, u64) {
        match self {
            Issue::Native => (0, 0),
            Issue::Issued { currency, issuer } => (currency.to_raw(), issuer.0),
        }
    }

    pub fn from_raw(currency: u64, issuer: u64) -> Self {
        match Currency::from_raw(currency) {
            None => Issue::Native,
            Some(currency) => Issue::Issued { currency, issuer: AccountId(issuer) },
        }
    }

    /// Bytes fed into key hashing.
    pub fn key_bytes(&self) -> [u8; 16] {
        let (c, i) = self.to_raw();
        let mut out = [0u8; 16];
        out[..8].copy_from_slice(&c.to_be_bytes());
        out[8..].copy_from_slice(&i.to_be_bytes());
        out
    }

    /// Decimal places of the smallest unit.
    pub fn decimal_places(&self) -> u32 {
        match self {
            Issue::Native => 6,
            Issue::Issued { .. } => 8,
        }
    }

    /// Largest representable magnitude.
    pub fn max_value(&self) -> i64 {
        match self {
            Issue::Native => MAX_NATIVE_DROPS,
            Issue::Issued { .. } => i64::MAX,
        }
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Issue::Native => f.write_str("XRP"),
            Issue::Issued { currency, issuer } => write!(f, "{}/{}", currency, issuer),
        }
    }
}

/// An order book: offers that take `input` and give `output`, from the
/// point of view of whoever crosses them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Book {
    pub input: Issue,
    pub output: Issue,
}

impl Book {
    pub fn new(input: Issue, output: Issue) -> Self {
        Self { input, output }
    }

    /// The book on the other side of the market.
    pub fn reversed(&self) -> Self {
        Self { input: self.output, output: self.input }
    }
}

impl fmt::Display for Book {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.input, self.output)
    }
}

// ============================================================================
// Amount
// ============================================================================

/// A signed quantity of one issue, in smallest units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Amount {
    pub issue: Issue,
    pub value: i64,
}

impl Amount {
    pub fn new(issue: Issue, value: i64) -> Self {
        Self { issue, value }
    }

    pub fn zero(issue: Issue) -> Self {
        Self { issue, value: 0 }
    }

    pub fn native(drops: i64) -> Self {
        Self { issue: Issue::Native, value: drops }
    }

    /// Parse a decimal string such as `"12.5"` into smallest units.
    ///
    /// Digits beyond the issue's precision are rounded, as the decimal
    /// conversion helpers always have.
    pub fn from_decimal(issue: Issue, s: &str) -> Result<Self, AmountError> {
        let d = Decimal::from_str(s).map_err(|_| AmountError::Parse)?;
        let scale = Decimal::from(10i64.pow(issue.decimal_places()));
        let scaled = d.checked_mul(scale).ok_or(AmountError::Overflow)?;
        let value = scaled.round_dp(0).to_i64().ok_or(AmountError::Overflow)?;
        if value.abs() > issue.max_value() {
            return Err(AmountError::Overflow);
        }
        Ok(Self { issue, value })
    }

    pub fn to_decimal(&self) -> Decimal {
        Decimal::new(self.value, self.issue.decimal_places())
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        self.value == 0
    }

    #[inline]
    pub fn is_positive(&self) -> bool {
        self.value > 0
    }

    fn check(issue: Issue, value: Option<i64>) -> Result<Self, AmountError> {
        match value {
            Some(v) if v.abs() <= issue.max_value() => Ok(Self { issue, value: v }),
            _ => Err(AmountError::Overflow),
        }
    }

    pub fn checked_add(&self, other: &Amount) -> Result<Amount, AmountError> {
        if self.issue != other.issue {
            return Err(AmountError::IssueMismatch);
        }
        Self::check(self.issue, self.value.checked_add(other.value))
    }

    pub fn checked_sub(&self, other: &Amount) -> Result<Amount, AmountError> {
        if self.issue != other.issue {
            return Err(AmountError::IssueMismatch);
        }
        Self::check(self.issue, self.value.checked_sub(other.value))
    }

    /// Same issue, smaller value.
    pub fn min(self, other: Amount) -> Amount {
        if other.value < self.value {
            Amount { issue: self.issue, value: other.value }
        } else {
            self
        }
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let code = match self.issue {
            Issue::Native => "XRP".to_string(),
            Issue::Issued { currency, .. } => currency.to_string(),
        };
        write!(f, "{} {}", self.to_decimal().normalize(), code)
    }
}

// ============================================================================
// Exact ratio helpers
// ============================================================================

/// `floor(a * b / c)` without intermediate overflow. `c` must be non-zero.
pub(crate) fn mul_div_floor(a: i64, b: i64, c: i64) -> i64 {
    let r = (a.max(0) as u128) * (b.max(0) as u128) / (c.max(1) as u128);
    r.min(i64::MAX as u128) as i64
}

/// `ceil(a * b / c)` without intermediate overflow. `c` must be non-zero.
pub(crate) fn mul_div_ceil(a: i64, b: i64, c: i64) -> i64 {
    let num = (a.max(0) as u128) * (b.max(0) as u128);
    let den = c.max(1) as u128;
    let r = num.div_ceil(den);
    r.min(i64::MAX as u128) as i64
}

// ============================================================================
// Amounts pair
// ============================================================================

/// What one side of an exchange pays (`input`) and receives (`output`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Amounts {
    pub input: Amount,
    pub output: Amount,
}

impl Amounts {
    pub fn new(input: Amount, output: Amount) -> Self {
        Self { input, output }
    }

    /// Either side is exhausted.
    pub fn is_empty(&self) -> bool {
        self.input.value <= 0 || self.output.value <= 0
    }

    /// Cap the output at `max_out`, paying proportionally less.
    ///
    /// The input is rounded up: the payer never gets a discount.
    pub fn limit_output(&self, max_out: i64) -> Amounts {
        if max_out >= self.output.value {
            return *self;
        }
        let max_out = max_out.max(0);
        Amounts {
            input: Amount::new(
                self.input.issue,
                mul_div_ceil(max_out, self.input.value, self.output.value),
            ),
            output: Amount::new(self.output.issue, max_out),
        }
    }

    /// Cap the input at `max_in`, receiving proportionally less.
    ///
    /// The output is rounded down: the receiver never gets extra.
    pub fn limit_input(&self, max_in: i64) -> Amounts {
        if max_in >= self.input.value {
            return *self;
        }
        let max_in = max_in.max(0);
        Amounts {
            input: Amount::new(self.input.issue, max_in),
            output: Amount::new(
                self.output.issue,
                mul_div_floor(max_in, self.output.value, self.input.value),
            ),
        }
    }
}

// ============================================================================
// Transfer rates
// ============================================================================

/// Issuer transfer fee, as a multiplier scaled by 10^9.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Rate(pub u32);

impl Rate {
    /// No fee.
    pub const PARITY: Rate = Rate(1_000_000_000);

    /// Ledger entries store `0` for "no rate set".
    pub fn from_raw(raw: u32) -> Self {
        if raw == 0 {
            Rate::PARITY
        } else {
            Rate(raw)
        }
    }

    #[inline]
    pub fn is_parity(&self) -> bool {
        self.0 == Self::PARITY.0
    }

    /// What a payer is charged to deliver `value`. Rounds up.
    pub fn multiply(&self, value: i64) -> Result<i64, AmountError> {
        let r = mul_div_ceil(value, self.0 as i64, Self::PARITY.0 as i64);
        if r == i64::MAX {
            return Err(AmountError::Overflow);
        }
        Ok(r)
    }

    /// What can be delivered out of `value` held. Rounds down.
    pub fn divide(&self, value: i64) -> i64 {
        mul_div_floor(value, Self::PARITY.0 as i64, self.0 as i64)
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
