use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Fixed-point monetary value with 4 decimal places, stored as a scaled
/// integer. Balances never touch floating point.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub struct Amount(i64);

impl Amount {
    const SCALE: i64 = 10_000;
    const FRACTION_DIGITS: usize = 4;

    pub const ZERO: Amount = Amount(0);

    pub fn from_scaled(value: i64) -> Self {
        Amount(value)
    }

    /// Whole currency units, e.g. `Amount::from_units(1500)` is `1500.0000`.
    pub fn from_units(value: i64) -> Self {
        Amount(value * Self::SCALE)
    }

    pub fn is_negative(&self) -> bool {
        self.0 < 0
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.abs();
        let whole = abs / Self::SCALE;
        let frac = abs % Self::SCALE;
        write!(f, "{sign}{whole}.{frac:04}")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseAmountError {
    #[error("invalid amount {0:?}")]
    Invalid(String),

    #[error("amount {0:?} has more than 4 decimal places")]
    TooPrecise(String),
}

impl FromStr for Amount {
    type Err = ParseAmountError;

    /// Parses decimal notation such as `"1500.00"`, `"0.0001"` or `"-50.25"`,
    /// with at most 4 fractional digits.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let (negative, digits) = match trimmed.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, trimmed),
        };

        let (whole, frac) = match digits.split_once('.') {
            Some((whole, frac)) => (whole, frac),
            None => (digits, ""),
        };

        if whole.is_empty() && frac.is_empty() {
            return Err(ParseAmountError::Invalid(s.to_string()));
        }
        if frac.len() > Self::FRACTION_DIGITS {
            return Err(ParseAmountError::TooPrecise(s.to_string()));
        }

        let parse_digits = |part: &str| -> Result<i64, ParseAmountError> {
            if part.is_empty() {
                return Ok(0);
            }
            if !part.bytes().all(|b| b.is_ascii_digit()) {
                return Err(ParseAmountError::Invalid(s.to_string()));
            }
            part.parse()
                .map_err(|_| ParseAmountError::Invalid(s.to_string()))
        };

        let frac_scale = 10i64.pow((Self::FRACTION_DIGITS - frac.len()) as u32);
        let whole = parse_digits(whole)?;
        let frac = parse_digits(frac)?;

        // The whole part can sit near i64::MAX even when the digits are
        // well-formed; an overflow is a bad value, not a panic.
        let scaled = whole
            .checked_mul(Self::SCALE)
            .and_then(|scaled| scaled.checked_add(frac * frac_scale))
            .ok_or_else(|| ParseAmountError::Invalid(s.to_string()))?;
        Ok(Amount(if negative { -scaled } else { scaled }))
    }
}

impl std::ops::Add for Amount {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Amount(self.0 + rhs.0)
    }
}

impl std::ops::Sub for Amount {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Amount(self.0 - rhs.0)
    }
}

impl std::ops::AddAssign for Amount {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl std::ops::SubAssign for Amount {
    fn sub_assign(&mut self, rhs: Self) {
        self.0 -= rhs.0;
    }
}
