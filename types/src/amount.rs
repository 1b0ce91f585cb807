//! Fixed-point token amounts.
//!
//! The casino ledger denominates balances in minor units at 8 decimal places
//! (1 whole token = 10^8 minor units). All arithmetic happens on `u64` minor
//! units; decimal text exists only at the edges (user input, transfer URLs).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Number of fractional decimal digits carried by an [`Amount`].
pub const DECIMALS: u32 = 8;

/// Minor units per whole token.
pub const UNIT: u64 = 100_000_000;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseAmountError {
    #[error("empty amount")]
    Empty,
    #[error("invalid character {0:?} in amount")]
    InvalidCharacter(char),
    #[error("amount overflows 64-bit minor units")]
    Overflow,
}

/// A token amount in minor units (8-decimal fixed point).
///
/// Always non-negative by construction. The authoritative value lives on the
/// remote ledger; local copies are caches.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Amount(u64);

impl Amount {
    pub const ZERO: Amount = Amount(0);

    pub const fn from_minor_units(units: u64) -> Self {
        Amount(units)
    }

    pub const fn minor_units(&self) -> u64 {
        self.0
    }

    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(&self, other: Amount) -> Option<Amount> {
        self.0.checked_add(other.0).map(Amount)
    }

    pub fn checked_sub(&self, other: Amount) -> Option<Amount> {
        self.0.checked_sub(other.0).map(Amount)
    }

    /// Parse a decimal amount string into minor units.
    ///
    /// Fractional digits beyond the 8th are truncated, never rounded.
    /// Negative amounts are coerced to [`Amount::ZERO`]; only malformed text
    /// (empty, stray characters, a bare `.`) and overflow are errors.
    pub fn parse(input: &str) -> Result<Amount, ParseAmountError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(ParseAmountError::Empty);
        }

        let (negative, rest) = match input.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, input),
        };
        let (whole, frac) = match rest.split_once('.') {
            Some((whole, frac)) => (whole, frac),
            None => (rest, ""),
        };
        if whole.is_empty() && frac.is_empty() {
            return Err(ParseAmountError::Empty);
        }
        if let Some(c) = whole.chars().find(|c| !c.is_ascii_digit()) {
            return Err(ParseAmountError::InvalidCharacter(c));
        }
        if let Some(c) = frac.chars().find(|c| !c.is_ascii_digit()) {
            return Err(ParseAmountError::InvalidCharacter(c));
        }

        // Validate before coercing so "-x1" is still rejected.
        if negative {
            return Ok(Amount::ZERO);
        }

        let whole: u64 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| ParseAmountError::Overflow)?
        };

        // Truncate (never round) anything beyond the supported precision.
        let frac = &frac[..frac.len().min(DECIMALS as usize)];
        let mut frac_units: u64 = 0;
        for c in frac.chars() {
            frac_units = frac_units * 10 + (c as u64 - '0' as u64);
        }
        frac_units *= 10u64.pow(DECIMALS - frac.len() as u32);

        whole
            .checked_mul(UNIT)
            .and_then(|units| units.checked_add(frac_units))
            .map(Amount)
            .ok_or(ParseAmountError::Overflow)
    }
}

impl fmt::Display for Amount {
    /// Full-precision decimal text with trailing fractional zeros trimmed.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.0 / UNIT;
        let frac = self.0 % UNIT;
        if frac == 0 {
            return write!(f, "{whole}");
        }
        let frac = format!("{frac:08}");
        write!(f, "{whole}.{}", frac.trim_end_matches('0'))
    }
}

impl FromStr for Amount {
    type Err = ParseAmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Amount::parse(s)
    }
}

impl From<u64> for Amount {
    fn from(units: u64) -> Self {
        Amount(units)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, Rng as _, SeedableRng as _};

    #[test]
    fn parse_whole_and_fractional_amounts() {
        assert_eq!(Amount::parse("0").unwrap(), Amount::ZERO);
        assert_eq!(Amount::parse("1").unwrap(), Amount(UNIT));
        assert_eq!(Amount::parse("1.5").unwrap(), Amount(150_000_000));
        assert_eq!(Amount::parse("1.23456789").unwrap(), Amount(123_456_789));
        assert_eq!(Amount::parse(".5").unwrap(), Amount(50_000_000));
        assert_eq!(Amount::parse("7.").unwrap(), Amount(7 * UNIT));
        assert_eq!(Amount::parse("  2.25 ").unwrap(), Amount(225_000_000));
    }

    #[test]
    fn parse_truncates_beyond_eight_digits() {
        // Truncation, not rounding: the 9th digit is dropped even when >= 5.
        assert_eq!(Amount::parse("1.234567899").unwrap(), Amount(123_456_789));
        assert_eq!(Amount::parse("0.000000009").unwrap(), Amount::ZERO);
        assert_eq!(
            Amount::parse("0.99999999999").unwrap(),
            Amount(99_999_999)
        );
    }

    #[test]
    fn parse_coerces_negative_to_zero() {
        assert_eq!(Amount::parse("-1").unwrap(), Amount::ZERO);
        assert_eq!(Amount::parse("-0.00000001").unwrap(), Amount::ZERO);
        // Malformed negatives are still malformed.
        assert_eq!(
            Amount::parse("-x1"),
            Err(ParseAmountError::InvalidCharacter('x'))
        );
    }

    #[test]
    fn parse_rejects_malformed_input() {
        assert_eq!(Amount::parse(""), Err(ParseAmountError::Empty));
        assert_eq!(Amount::parse("."), Err(ParseAmountError::Empty));
        assert_eq!(Amount::parse("-"), Err(ParseAmountError::Empty));
        assert_eq!(
            Amount::parse("1.2.3"),
            Err(ParseAmountError::InvalidCharacter('.'))
        );
        assert_eq!(
            Amount::parse("12a"),
            Err(ParseAmountError::InvalidCharacter('a'))
        );
        assert_eq!(
            Amount::parse("1,5"),
            Err(ParseAmountError::InvalidCharacter(','))
        );
    }

    #[test]
    fn parse_rejects_overflow() {
        assert_eq!(
            Amount::parse("999999999999999999999"),
            Err(ParseAmountError::Overflow)
        );
        // u64::MAX minor units is 184467440737.09551615; one whole more overflows.
        assert_eq!(
            Amount::parse("184467440738"),
            Err(ParseAmountError::Overflow)
        );
        assert_eq!(
            Amount::parse("184467440737.09551615").unwrap(),
            Amount(u64::MAX)
        );
    }

    #[test]
    fn display_trims_trailing_zeros() {
        assert_eq!(Amount::ZERO.to_string(), "0");
        assert_eq!(Amount(UNIT).to_string(), "1");
        assert_eq!(Amount(150_000_000).to_string(), "1.5");
        assert_eq!(Amount(123_456_789).to_string(), "1.23456789");
        assert_eq!(Amount(223_456_789).to_string(), "2.23456789");
        assert_eq!(Amount(1).to_string(), "0.00000001");
    }

    #[test]
    fn display_parse_roundtrip_preserves_value() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..1_000 {
            let amount = Amount(rng.gen());
            let reparsed = Amount::parse(&amount.to_string()).unwrap();
            assert_eq!(reparsed, amount);
        }
    }

    #[test]
    fn checked_arithmetic() {
        let a = Amount(UNIT);
        let b = Amount(50_000_000);
        assert_eq!(a.checked_add(b), Some(Amount(150_000_000)));
        assert_eq!(a.checked_sub(b), Some(Amount(50_000_000)));
        assert_eq!(b.checked_sub(a), None);
        assert_eq!(Amount(u64::MAX).checked_add(Amount(1)), None);
    }

    #[test]
    fn serde_is_transparent_minor_units() {
        let amount = Amount(123_456_789);
        let json = serde_json::to_string(&amount).unwrap();
        assert_eq!(json, "123456789");
        let decoded: Amount = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, amount);
    }
}
