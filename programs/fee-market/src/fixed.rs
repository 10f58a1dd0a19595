use anchor_lang::prelude::*;
use core::fmt;
use core::str::FromStr;
use primitive_types::U256;

use crate::error::FeeMarketError;

// ============================================================================
// Dec - 18-Decimal Fixed Point
// ============================================================================
//
// Raw u128 scaled by 10^18 (1.0 = 1_000_000_000_000_000_000).
// Every multiplication and division truncates toward zero, computed through
// a 256-bit intermediate so `a * b / c` cannot overflow before truncation.
// All nodes must agree on this rule bit for bit.

/// Number of fractional digits carried by [`Dec`]
pub const DEC_PRECISION: usize = 18;

/// Raw value of 1.0
pub const DEC_SCALE: u128 = 1_000_000_000_000_000_000;

/// Unsigned fixed-point decimal with 18 fractional digits
#[derive(
    AnchorSerialize, AnchorDeserialize, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
pub struct Dec(u128);

impl Dec {
    pub const ZERO: Dec = Dec(0);
    pub const ONE: Dec = Dec(DEC_SCALE);
    /// Smallest representable step (10^-18)
    pub const ULP: Dec = Dec(1);
    pub const MAX: Dec = Dec(u128::MAX);

    #[inline]
    pub const fn from_raw(raw: u128) -> Self {
        Dec(raw)
    }

    #[inline]
    pub const fn raw(self) -> u128 {
        self.0
    }

    /// Whole number. Never overflows: u64::MAX * 10^18 < u128::MAX.
    #[inline]
    pub const fn from_int(value: u64) -> Self {
        Dec(value as u128 * DEC_SCALE)
    }

    /// Compile-time ratio for parameter tables. Truncates.
    /// Panics on a zero denominator, so only use it in constants.
    pub const fn ratio(numerator: u64, denominator: u64) -> Self {
        Dec((numerator as u128 * DEC_SCALE) / denominator as u128)
    }

    /// Runtime ratio of two integers, `None` on zero denominator or overflow.
    pub fn checked_from_ratio(numerator: u128, denominator: u128) -> Option<Self> {
        mul_div(numerator, DEC_SCALE, denominator).map(Dec)
    }

    #[inline]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub fn checked_add(self, rhs: Dec) -> Option<Dec> {
        self.0.checked_add(rhs.0).map(Dec)
    }

    #[inline]
    pub fn saturating_add(self, rhs: Dec) -> Dec {
        Dec(self.0.saturating_add(rhs.0))
    }

    #[inline]
    pub fn checked_sub(self, rhs: Dec) -> Option<Dec> {
        self.0.checked_sub(rhs.0).map(Dec)
    }

    #[inline]
    pub fn saturating_sub(self, rhs: Dec) -> Dec {
        Dec(self.0.saturating_sub(rhs.0))
    }

    /// `self * rhs`, truncated
    #[inline]
    pub fn checked_mul(self, rhs: Dec) -> Option<Dec> {
        mul_div(self.0, rhs.0, DEC_SCALE).map(Dec)
    }

    #[inline]
    pub fn saturating_mul(self, rhs: Dec) -> Dec {
        self.checked_mul(rhs).unwrap_or(Dec::MAX)
    }

    /// `self / rhs`, truncated. `None` when `rhs` is zero.
    #[inline]
    pub fn checked_div(self, rhs: Dec) -> Option<Dec> {
        mul_div(self.0, DEC_SCALE, rhs.0).map(Dec)
    }

    /// `self * rhs` for an integer multiplier (exact, no truncation)
    #[inline]
    pub fn checked_mul_int(self, rhs: u64) -> Option<Dec> {
        self.0.checked_mul(rhs as u128).map(Dec)
    }

    /// Integer part, fraction dropped
    #[inline]
    pub const fn trunc_int(self) -> u128 {
        self.0 / DEC_SCALE
    }

    /// Clamp into `[lo, hi]`. Caller guarantees `lo <= hi` (Params validation).
    #[inline]
    pub fn clamp_to(self, lo: Dec, hi: Dec) -> Dec {
        self.max(lo).min(hi)
    }
}

/// `floor(a * b / denominator)` through a 256-bit intermediate.
/// `None` on zero denominator or when the quotient exceeds u128.
pub fn mul_div(a: u128, b: u128, denominator: u128) -> Option<u128> {
    if denominator == 0 {
        return None;
    }
    let quotient = U256::from(a) * U256::from(b) / U256::from(denominator);
    if quotient > U256::from(u128::MAX) {
        return None;
    }
    Some(quotient.as_u128())
}

impl fmt::Display for Dec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{:0width$}",
            self.0 / DEC_SCALE,
            self.0 % DEC_SCALE,
            width = DEC_PRECISION
        )
    }
}

impl fmt::Debug for Dec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Dec({})", self)
    }
}

impl FromStr for Dec {
    type Err = FeeMarketError;

    /// Parses `"12"`, `"0.025"` or `".5"`. At most 18 fractional digits,
    /// no sign, no exponent.
    fn from_str(s: &str) -> core::result::Result<Self, Self::Err> {
        let (int_part, frac_part) = match s.split_once('.') {
            Some((int_part, frac_part)) => {
                if frac_part.is_empty() {
                    return Err(FeeMarketError::InvalidDecimal);
                }
                (int_part, frac_part)
            }
            None => (s, ""),
        };

        if int_part.is_empty() && frac_part.is_empty() {
            return Err(FeeMarketError::InvalidDecimal);
        }
        if frac_part.len() > DEC_PRECISION {
            return Err(FeeMarketError::InvalidDecimal);
        }
        let all_digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
        if !all_digits(int_part) || !all_digits(frac_part) {
            return Err(FeeMarketError::InvalidDecimal);
        }

        let int_value: u128 = if int_part.is_empty() {
            0
        } else {
            int_part.parse().map_err(|_| FeeMarketError::InvalidDecimal)?
        };
        let frac_value: u128 = if frac_part.is_empty() {
            0
        } else {
            let digits: u128 = frac_part.parse().map_err(|_| FeeMarketError::InvalidDecimal)?;
            digits * 10u128.pow((DEC_PRECISION - frac_part.len()) as u32)
        };

        int_value
            .checked_mul(DEC_SCALE)
            .and_then(|scaled| scaled.checked_add(frac_value))
            .map(Dec)
            .ok_or(FeeMarketError::InvalidDecimal)
    }
}
