use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Most decimal places a `Numeric` keeps.
const MAX_SCALE: u32 = 18;

/// Most significant digits accepted when parsing.
const MAX_DIGITS: usize = 20;

/// An exact decimal number, as typed by the respondent.
///
/// Stored as an integer number of units at a decimal scale, so `"1.23"` is
/// `123 × 10⁻²`. Addition keeps the larger scale of its operands and never
/// rounds: `1.23 + 2.35 + 3.45 + 4.56` is exactly `11.59`.
///
/// Equality and ordering compare values, not representations:
/// `"10"` equals `"10.00"`.
#[derive(Debug, Clone, Copy)]
pub struct Numeric {
    units: i128,
    scale: u32,
}

/// Error returned when a string is not a plain decimal number.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseNumericError {
    #[error("empty number")]
    Empty,

    #[error("invalid character '{0}' in number")]
    InvalidCharacter(char),

    #[error("more than 18 decimal places")]
    TooPrecise,

    #[error("more than 20 significant digits")]
    TooLarge,
}

impl Numeric {
    pub const ZERO: Self = Self { units: 0, scale: 0 };

    /// Create a number from raw units and a decimal scale (`units × 10^-scale`).
    pub fn new(units: i128, scale: u32) -> Self {
        Self { units, scale }
    }

    /// Number of decimal places this value was written with.
    pub fn scale(&self) -> u32 {
        self.scale
    }

    pub fn is_negative(&self) -> bool {
        self.units < 0
    }

    pub fn is_zero(&self) -> bool {
        self.units == 0
    }

    /// Add two numbers exactly. Returns `None` on overflow.
    pub fn checked_add(self, other: Self) -> Option<Self> {
        let scale = self.scale.max(other.scale);
        let units = self.rescaled(scale)?.checked_add(other.rescaled(scale)?)?;
        Some(Self { units, scale })
    }

    /// Widen to the given number of decimal places (for display).
    ///
    /// Returns `None` if that would drop digits or overflow.
    pub fn with_scale(self, scale: u32) -> Option<Self> {
        Some(Self {
            units: self.rescaled(scale)?,
            scale,
        })
    }

    /// Lossy conversion, for ordering values that cannot be rescaled exactly.
    pub fn to_f64(self) -> f64 {
        self.units as f64 / 10f64.powi(self.scale as i32)
    }

    fn rescaled(&self, scale: u32) -> Option<i128> {
        let factor = 10i128.checked_pow(scale.checked_sub(self.scale)?)?;
        self.units.checked_mul(factor)
    }
}

impl Default for Numeric {
    fn default() -> Self {
        Self::ZERO
    }
}

impl PartialEq for Numeric {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Numeric {}

impl PartialOrd for Numeric {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Numeric {
    fn cmp(&self, other: &Self) -> Ordering {
        let scale = self.scale.max(other.scale);
        match (self.rescaled(scale), other.rescaled(scale)) {
            (Some(a), Some(b)) => a.cmp(&b),
            _ => self.to_f64().total_cmp(&other.to_f64()),
        }
    }
}

impl FromStr for Numeric {
    type Err = ParseNumericError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (negative, body) = match s.as_bytes().first() {
            Some(b'-') => (true, &s[1..]),
            Some(b'+') => (false, &s[1..]),
            Some(_) => (false, s),
            None => return Err(ParseNumericError::Empty),
        };

        let (whole, fraction) = body.split_once('.').unwrap_or((body, ""));
        if whole.is_empty() && fraction.is_empty() {
            return Err(ParseNumericError::Empty);
        }
        if let Some(c) = whole
            .chars()
            .chain(fraction.chars())
            .find(|c| !c.is_ascii_digit())
        {
            return Err(ParseNumericError::InvalidCharacter(c));
        }

        let scale = u32::try_from(fraction.len()).map_err(|_| ParseNumericError::TooPrecise)?;
        if scale > MAX_SCALE {
            return Err(ParseNumericError::TooPrecise);
        }

        let digits = format!("{whole}{fraction}");
        let significant = digits.trim_start_matches('0');
        if significant.len() > MAX_DIGITS {
            return Err(ParseNumericError::TooLarge);
        }
        let magnitude = if significant.is_empty() {
            0
        } else {
            significant
                .parse::<i128>()
                .map_err(|_| ParseNumericError::TooLarge)?
        };

        Ok(Self {
            units: if negative { -magnitude } else { magnitude },
            scale,
        })
    }
}

impl fmt::Display for Numeric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.scale == 0 {
            return write!(f, "{}", self.units);
        }
        let divisor = 10u128.pow(self.scale);
        let magnitude = self.units.unsigned_abs();
        let sign = if self.units < 0 { "-" } else { "" };
        write!(
            f,
            "{sign}{}.{:0width$}",
            magnitude / divisor,
            magnitude % divisor,
            width = self.scale as usize
        )
    }
}

impl From<i64> for Numeric {
    fn from(i: i64) -> Self {
        Self::new(i128::from(i), 0)
    }
}

impl From<i32> for Numeric {
    fn from(i: i32) -> Self {
        Self::new(i128::from(i), 0)
    }
}

impl From<u32> for Numeric {
    fn from(i: u32) -> Self {
        Self::new(i128::from(i), 0)
    }
}

impl Serialize for Numeric {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Numeric {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(NumericVisitor)
    }
}

struct NumericVisitor;

impl Visitor<'_> for NumericVisitor {
    type Value = Numeric;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a decimal number or a string holding one")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Numeric, E> {
        v.parse().map_err(E::custom)
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Numeric, E> {
        Ok(Numeric::from(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Numeric, E> {
        Ok(Numeric::new(i128::from(v), 0))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Numeric, E> {
        if !v.is_finite() {
            return Err(E::custom("number must be finite"));
        }
        // Shortest round-trip form, so 1.23 stays 1.23.
        format!("{v}").parse().map_err(E::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn n(s: &str) -> Numeric {
        s.parse().unwrap()
    }

    #[test]
    fn parse_integer() {
        assert_eq!(n("40"), Numeric::from(40));
        assert_eq!(n(" 40 ").to_string(), "40");
    }

    #[test]
    fn parse_decimal_keeps_scale() {
        let value = n("4.50");
        assert_eq!(value.scale(), 2);
        assert_eq!(value.to_string(), "4.50");
    }

    #[test]
    fn parse_negative() {
        assert!(n("-10").is_negative());
        assert_eq!(n("-0.5").to_string(), "-0.5");
    }

    #[test]
    fn rejects_words() {
        assert_eq!(
            "ten".parse::<Numeric>(),
            Err(ParseNumericError::InvalidCharacter('t'))
        );
        assert_eq!("".parse::<Numeric>(), Err(ParseNumericError::Empty));
        assert_eq!("-".parse::<Numeric>(), Err(ParseNumericError::Empty));
        assert!("1.2.3".parse::<Numeric>().is_err());
        assert!("1e5".parse::<Numeric>().is_err());
    }

    #[test]
    fn sum_is_exact() {
        let total = ["1.23", "2.35", "3.45", "4.56"]
            .into_iter()
            .map(n)
            .try_fold(Numeric::ZERO, Numeric::checked_add)
            .unwrap();
        assert_eq!(total.to_string(), "11.59");
        assert_eq!(total, n("11.59"));
    }

    #[test]
    fn equality_ignores_trailing_zeros() {
        assert_eq!(n("100"), n("100.00"));
        assert!(n("99.99") < n("100"));
    }

    #[test]
    fn widen_for_display() {
        assert_eq!(n("12").with_scale(2).unwrap().to_string(), "12.00");
        assert!(n("1.234").with_scale(2).is_none());
    }

    #[test]
    fn deserialize_from_json_number_or_string() {
        let a: Numeric = serde_json::from_str("1.23").unwrap();
        let b: Numeric = serde_json::from_str("\"1.23\"").unwrap();
        let c: Numeric = serde_json::from_str("100").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "1.23");
        assert_eq!(c, Numeric::from(100));
    }
}
