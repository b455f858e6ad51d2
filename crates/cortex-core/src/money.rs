//! Exact monetary amounts.
//!
//! Amounts are persisted as decimal text (`"1250.00"`) and held in memory as
//! a signed count of minor units (cents). Parsing, summing, and formatting
//! never pass through `f64`, so aggregates such as net profit are exact.
//!
//! Parsed amounts are bounded by [`Money::MAX`] so that summing any number
//! of records up to [`MAX_EXACT_TERMS`] stays inside `i64`. Arithmetic
//! beyond that saturates instead of panicking or wrapping.

use anyhow::{bail, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Neg, Sub};
use std::str::FromStr;

/// A monetary amount with two fractional digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Money(i64);

/// How many [`Money::MAX`]-sized amounts can be added without saturating.
pub const MAX_EXACT_TERMS: i64 = i64::MAX / Money::MAX.0;

impl Money {
    pub const ZERO: Money = Money(0);

    /// Largest magnitude `parse` accepts: ten trillion, in cents.
    pub const MAX: Money = Money(1_000_000_000_000_000);

    pub fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    pub fn cents(self) -> i64 {
        self.0
    }

    pub fn is_negative(self) -> bool {
        self.0 < 0
    }

    /// Parse a decimal string such as `"1250"`, `"1,250.5"`, or `"-12.30"`.
    ///
    /// Thousands separators are accepted; more than two fractional digits
    /// are rejected rather than rounded.
    pub fn parse(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            bail!("invalid amount: empty string");
        }

        let (negative, digits) = match trimmed.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
        };
        let digits: String = digits.chars().filter(|c| *c != ',').collect();

        let (whole, frac) = match digits.split_once('.') {
            Some((w, f)) => (w, f),
            None => (digits.as_str(), ""),
        };

        if whole.is_empty() && frac.is_empty() {
            bail!("invalid amount: {}", s);
        }
        if !whole.chars().all(|c| c.is_ascii_digit()) || !frac.chars().all(|c| c.is_ascii_digit())
        {
            bail!("invalid amount: {}", s);
        }
        if frac.len() > 2 {
            bail!("invalid amount: {} has more than two decimal places", s);
        }

        let whole_units: i64 = if whole.is_empty() {
            0
        } else {
            whole
                .parse()
                .map_err(|_| anyhow::anyhow!("invalid amount: {}", s))?
        };
        let frac_units: i64 = match frac.len() {
            0 => 0,
            1 => frac.parse::<i64>()? * 10,
            _ => frac.parse::<i64>()?,
        };

        let cents = whole_units
            .checked_mul(100)
            .and_then(|c| c.checked_add(frac_units))
            .filter(|c| *c <= Money::MAX.0)
            .ok_or_else(|| anyhow::anyhow!("invalid amount: {} is out of range", s))?;

        Ok(Money(if negative { -cents } else { cents }))
    }

    /// Plain decimal form used for storage, e.g. `"-1250.50"`.
    pub fn to_decimal_string(self) -> String {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        format!("{}{}.{:02}", sign, abs / 100, abs % 100)
    }

    /// Human-readable currency form, e.g. `"$1,250.50"` or `"-$40.00"`.
    pub fn display(self) -> String {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        format!("{}${}.{:02}", sign, group_thousands(abs / 100), abs % 100)
    }
}

fn group_thousands(n: u64) -> String {
    let raw = n.to_string();
    let mut out = String::with_capacity(raw.len() + raw.len() / 3);
    for (i, ch) in raw.chars().enumerate() {
        if i > 0 && (raw.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display())
    }
}

impl FromStr for Money {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        Money::parse(s)
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Money {
        Money(self.0.saturating_add(rhs.0))
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Money) {
        *self = *self + rhs;
    }
}

impl Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Money) -> Money {
        Money(self.0.saturating_sub(rhs.0))
    }
}

impl Neg for Money {
    type Output = Money;

    fn neg(self) -> Money {
        Money(self.0.saturating_neg())
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, Add::add)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Money {
        iter.copied().sum()
    }
}

// Serialized as a decimal string so JSON consumers never see a float.
impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_decimal_string())
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Money::parse(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_whole_and_fractional() {
        assert_eq!(Money::parse("1250").unwrap().cents(), 125_000);
        assert_eq!(Money::parse("1250.5").unwrap().cents(), 125_050);
        assert_eq!(Money::parse("1,250.05").unwrap().cents(), 125_005);
        assert_eq!(Money::parse(".75").unwrap().cents(), 75);
        assert_eq!(Money::parse("-12.30").unwrap().cents(), -1_230);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(Money::parse("").is_err());
        assert!(Money::parse("abc").is_err());
        assert!(Money::parse("1.234").is_err());
        assert!(Money::parse("12.3.4").is_err());
        assert!(Money::parse("-").is_err());
    }

    #[test]
    fn test_display_groups_thousands() {
        assert_eq!(Money::from_cents(125_000).display(), "$1,250.00");
        assert_eq!(Money::from_cents(123_456_789).display(), "$1,234,567.89");
        assert_eq!(Money::from_cents(-4_000).display(), "-$40.00");
        assert_eq!(Money::from_cents(5).display(), "$0.05");
    }

    #[test]
    fn test_sum_is_exact() {
        // 0.1 + 0.2 is the classic float trap.
        let total: Money = ["0.10", "0.20"]
            .iter()
            .map(|s| Money::parse(s).unwrap())
            .sum();
        assert_eq!(total.to_decimal_string(), "0.30");
    }

    #[test]
    fn test_parse_rejects_amounts_above_max() {
        assert_eq!(Money::parse("10000000000000.00").unwrap(), Money::MAX);
        assert_eq!(Money::parse("-10000000000000").unwrap(), -Money::MAX);
        let err = Money::parse("90000000000000000.00").unwrap_err();
        assert!(err.to_string().contains("out of range"));
        assert!(Money::parse("10000000000000.01").is_err());
        assert!(serde_json::from_str::<Money>("\"90000000000000000.00\"").is_err());
    }

    #[test]
    fn test_largest_amounts_sum_exactly() {
        let total: Money = std::iter::repeat(Money::MAX)
            .take(MAX_EXACT_TERMS as usize)
            .sum();
        assert_eq!(total.cents(), Money::MAX.cents() * MAX_EXACT_TERMS);
        assert_eq!((total - total).cents(), 0);
    }

    #[test]
    fn test_arithmetic_saturates_instead_of_panicking() {
        let huge = Money::from_cents(i64::MAX - 1);
        let total: Money = [huge, huge].iter().sum();
        assert_eq!(total.cents(), i64::MAX);
        assert_eq!((Money::from_cents(i64::MIN) - huge).cents(), i64::MIN);
        assert_eq!((-Money::from_cents(i64::MIN)).cents(), i64::MAX);
    }

    #[test]
    fn test_serde_uses_decimal_strings() {
        let m = Money::parse("99.9").unwrap();
        let json = serde_json::to_string(&m).unwrap();
        assert_eq!(json, "\"99.90\"");
        let back: Money = serde_json::from_str(&json).unwrap();
        assert_eq!(back, m);
    }
}
