use std::{
    fmt,
    ops::{Add, Neg, Sub},
    str::FromStr,
};

use serde::{Deserialize, Deserializer, Serialize, Serializer, de};

use crate::{EngineError, ResultEngine};

/// Largest number of cents that survives a round trip through a major-unit
/// `f64` (`cents / 100`, then back through [`Money::from_major`]).
const MAX_CENTS: i64 = 999_999_999_999_999;

/// Rounds a monetary value to the nearest hundredth.
///
/// Halves round toward positive infinity (`2.345 -> 2.35`, `-2.345 -> -2.34`),
/// so repeated deposits and withdrawals never accumulate floating-point drift.
/// The operation is idempotent: `sanitize(sanitize(v)) == sanitize(v)`.
#[must_use]
pub fn sanitize(value: f64) -> f64 {
    (value * 100.0 + 0.5).floor() / 100.0
}

/// Signed money amount represented as **integer cents**.
///
/// Every amount stored on a goal or a transaction is a `Money`, so the only
/// place where floating point is involved is the conversion from caller
/// input ([`Money::from_major`]).
///
/// On the wire and on disk the amount is a plain JSON number in major units
/// (`150.5`), re-sanitized when decoded.
///
/// # Examples
///
/// ```rust
/// use engine::Money;
///
/// let amount = Money::from_major(12.345).unwrap();
/// assert_eq!(amount.cents(), 1235);
/// assert_eq!(amount.to_string(), "12.35");
/// assert_eq!("10,5".parse::<Money>().unwrap().cents(), 1050);
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);
    /// Largest amount accepted anywhere in the engine.
    pub const MAX: Money = Money(MAX_CENTS);

    /// Creates a new amount from integer cents.
    #[must_use]
    pub const fn new(cents: i64) -> Self {
        Self(cents)
    }

    /// Sanitizes a value expressed in major units (`12.5` = twelve and a
    /// half) into cents.
    ///
    /// Negative values are accepted; NaN, infinities and values too large to
    /// be represented exactly are rejected.
    pub fn from_major(value: f64) -> ResultEngine<Self> {
        if !value.is_finite() {
            return Err(EngineError::InvalidAmount(format!(
                "{value} is not a finite amount"
            )));
        }
        let cents = (value * 100.0 + 0.5).floor();
        if cents.abs() > MAX_CENTS as f64 {
            return Err(EngineError::InvalidAmount("amount too large".to_string()));
        }
        Ok(Self(cents as i64))
    }

    /// Returns the raw value in cents.
    #[must_use]
    pub const fn cents(self) -> i64 {
        self.0
    }

    /// Returns the amount in major units.
    #[must_use]
    pub fn to_major(self) -> f64 {
        self.0 as f64 / 100.0
    }

    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    #[must_use]
    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }

    #[must_use]
    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }

    /// Checked addition. Returns `None` when the result leaves
    /// `[-MAX, MAX]`, the range [`Money::from_major`] reads back.
    #[must_use]
    pub fn checked_add(self, rhs: Money) -> Option<Money> {
        self.0
            .checked_add(rhs.0)
            .filter(|v| v.abs() <= MAX_CENTS)
            .map(Money)
    }

    /// Checked subtraction, bounded like [`Money::checked_add`].
    #[must_use]
    pub fn checked_sub(self, rhs: Money) -> Option<Money> {
        self.0
            .checked_sub(rhs.0)
            .filter(|v| v.abs() <= MAX_CENTS)
            .map(Money)
    }

    /// Share of `target` reached by `self`, as a percentage clamped to
    /// `[0, 100]`.
    ///
    /// A zero target counts as reached as soon as the amount is positive.
    #[must_use]
    pub fn percent_of(self, target: Money) -> f64 {
        if target.0 <= 0 {
            return if self.0 > 0 { 100.0 } else { 0.0 };
        }
        (self.0 as f64 * 100.0 / target.0 as f64).clamp(0.0, 100.0)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let units = abs / 100;
        let cents = abs % 100;
        write!(f, "{sign}{units}.{cents:02}")
    }
}

impl From<i64> for Money {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl From<Money> for i64 {
    fn from(value: Money) -> Self {
        value.0
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Self::Output {
        Money(self.0 + rhs.0)
    }
}

impl Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Money) -> Self::Output {
        Money(self.0 - rhs.0)
    }
}

impl Neg for Money {
    type Output = Money;

    fn neg(self) -> Self::Output {
        Money(-self.0)
    }
}

impl FromStr for Money {
    type Err = EngineError;

    /// Parses a decimal string into cents.
    ///
    /// Accepts `.` or `,` as decimal separator and an optional leading `+`/`-`.
    /// At most 2 fractional digits are allowed.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let empty = || EngineError::InvalidAmount("empty amount".to_string());
        let invalid = || EngineError::InvalidAmount(format!("invalid amount: {s}"));
        let overflow = || EngineError::InvalidAmount("amount too large".to_string());

        let trimmed = s.trim();
        let (negative, rest) = if let Some(stripped) = trimmed.strip_prefix('-') {
            (true, stripped)
        } else if let Some(stripped) = trimmed.strip_prefix('+') {
            (false, stripped)
        } else {
            (false, trimmed)
        };

        let rest = rest.trim().replace(',', ".");
        if rest.is_empty() {
            return Err(empty());
        }

        let (units_str, cents_str) = match rest.split_once('.') {
            Some((units, cents)) => (units, Some(cents)),
            None => (rest.as_str(), None),
        };

        if units_str.is_empty() || !units_str.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }
        let units: i64 = units_str.parse().map_err(|_| overflow())?;

        let cents: i64 = match cents_str {
            None | Some("") => 0,
            Some(frac) if !frac.chars().all(|c| c.is_ascii_digit()) => return Err(invalid()),
            Some(frac) if frac.len() == 1 => frac.parse::<i64>().map_err(|_| invalid())? * 10,
            Some(frac) if frac.len() == 2 => frac.parse::<i64>().map_err(|_| invalid())?,
            Some(_) => {
                return Err(EngineError::InvalidAmount("too many decimals".to_string()));
            }
        };

        let total = units
            .checked_mul(100)
            .and_then(|v| v.checked_add(cents))
            .filter(|v| *v <= MAX_CENTS)
            .ok_or_else(overflow)?;

        Ok(Money(if negative { -total } else { total }))
    }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.to_major())
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = f64::deserialize(deserializer)?;
        Money::from_major(value).map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_rounds_to_hundredths() {
        assert_eq!(sanitize(1.234), 1.23);
        assert_eq!(sanitize(1.235), 1.24);
        assert_eq!(sanitize(-2.345), -2.34);
        assert_eq!(sanitize(0.1 + 0.2), 0.3);
    }

    #[test]
    fn sanitize_is_idempotent() {
        for value in [0.0, 0.1 + 0.2, 19.999, -7.125, 1234.5678, 1e9 + 0.015] {
            let once = sanitize(value);
            assert_eq!(sanitize(once), once, "value {value}");
        }
    }

    #[test]
    fn from_major_matches_sanitize() {
        for value in [0.0, 0.1 + 0.2, 19.999, -7.125, 150.0, 1234.5678] {
            let money = Money::from_major(value).unwrap();
            assert_eq!(money.to_major(), sanitize(value));
            assert_eq!(Money::from_major(money.to_major()).unwrap(), money);
        }
    }

    #[test]
    fn from_major_rejects_non_finite() {
        assert!(Money::from_major(f64::NAN).is_err());
        assert!(Money::from_major(f64::INFINITY).is_err());
        assert!(Money::from_major(1e300).is_err());
    }

    #[test]
    fn checked_ops_stay_within_readable_range() {
        assert_eq!(Money::MAX.checked_add(Money::ZERO), Some(Money::MAX));
        assert_eq!(Money::MAX.checked_add(Money::new(1)), None);
        assert_eq!((-Money::MAX).checked_sub(Money::new(1)), None);
        assert_eq!(
            Money::MAX.checked_sub(Money::new(1)),
            Some(Money::new(MAX_CENTS - 1))
        );
        assert_eq!(Money::from_major(Money::MAX.to_major()).unwrap(), Money::MAX);
        assert!(Money::from_major(10_000_000_000_000.0).is_err());
    }

    #[test]
    fn display_formats_two_decimals() {
        assert_eq!(Money::new(0).to_string(), "0.00");
        assert_eq!(Money::new(1).to_string(), "0.01");
        assert_eq!(Money::new(1050).to_string(), "10.50");
        assert_eq!(Money::new(-1050).to_string(), "-10.50");
    }

    #[test]
    fn parse_accepts_dot_or_comma() {
        assert_eq!("10".parse::<Money>().unwrap().cents(), 1000);
        assert_eq!("10.5".parse::<Money>().unwrap().cents(), 1050);
        assert_eq!("10,50".parse::<Money>().unwrap().cents(), 1050);
        assert_eq!("-0.01".parse::<Money>().unwrap().cents(), -1);
        assert_eq!("  2.30 ".parse::<Money>().unwrap().cents(), 230);
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!("12.345".parse::<Money>().is_err());
        assert!("".parse::<Money>().is_err());
        assert!("1.2.3".parse::<Money>().is_err());
        assert!("abc".parse::<Money>().is_err());
    }

    #[test]
    fn percent_is_clamped() {
        let target = Money::new(50_000);
        assert_eq!(Money::new(15_000).percent_of(target), 30.0);
        assert_eq!(Money::new(80_000).percent_of(target), 100.0);
        assert_eq!(Money::new(-1_000).percent_of(target), 0.0);
        assert_eq!(Money::new(10).percent_of(Money::ZERO), 100.0);
        assert_eq!(Money::ZERO.percent_of(Money::ZERO), 0.0);
    }

    #[test]
    fn serde_uses_major_units() {
        let json = serde_json::to_string(&Money::new(15_050)).unwrap();
        assert_eq!(json, "150.5");
        let back: Money = serde_json::from_str("150.499").unwrap();
        assert_eq!(back, Money::new(15_050));
    }
}
