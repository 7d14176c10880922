//! Similarity thresholds as exact rationals.
//!
//! Tanimoto values are ratios of small integers, so comparing them against a
//! threshold in floating point can misjudge matches that sit exactly on the
//! boundary (`0.7` is not representable as `f64`; `7/10` is). A [`Threshold`]
//! stores `numerator / denominator` and every decision derived from it
//! (size bounds, pass/fail) is made by integer cross-multiplication.

use crate::error::{Result, SearchError};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Fractional digits kept exactly when parsing (10^18 fits in a `u64`).
pub const MAX_FRACTION_DIGITS: usize = 18;

/// A similarity threshold `t ∈ (0, 1]`, held as a reduced fraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Threshold {
    num: u64,
    den: u64,
}

impl Threshold {
    /// Exact `numerator / denominator`.
    pub fn from_ratio(numerator: u64, denominator: u64) -> Result<Self> {
        let shown = format!("{numerator}/{denominator}");
        if denominator == 0 {
            return Err(SearchError::invalid_threshold(shown, "zero denominator"));
        }
        if numerator == 0 || numerator > denominator {
            return Err(SearchError::invalid_threshold(shown, "must lie in (0, 1]"));
        }
        let g = gcd(numerator, denominator);
        Ok(Self {
            num: numerator / g,
            den: denominator / g,
        })
    }

    /// Convert a float through its shortest round-trip decimal form, so
    /// `0.7_f64` becomes exactly `7/10`.
    pub fn from_f64(value: f64) -> Result<Self> {
        if !value.is_finite() || value <= 0.0 || value > 1.0 {
            return Err(SearchError::invalid_threshold(value, "must lie in (0, 1]"));
        }
        format!("{value}").parse()
    }

    pub fn numerator(&self) -> u64 {
        self.num
    }

    pub fn denominator(&self) -> u64 {
        self.den
    }

    pub fn as_f64(&self) -> f64 {
        self.num as f64 / self.den as f64
    }

    pub fn is_one(&self) -> bool {
        self.num == self.den
    }

    /// `ceil(t * n)`.
    pub fn ceil_mul(&self, n: usize) -> usize {
        let product = self.num as u128 * n as u128;
        saturate(product.div_ceil(self.den as u128))
    }

    /// `floor(n / t)`.
    pub fn floor_div(&self, n: usize) -> usize {
        saturate(n as u128 * self.den as u128 / self.num as u128)
    }

    /// `overlap / union >= t`, decided without division.
    ///
    /// A zero union (two empty sets) never meets a threshold.
    pub fn is_met_by(&self, overlap: usize, union: usize) -> bool {
        if union == 0 {
            return false;
        }
        overlap as u128 * self.den as u128 >= self.num as u128 * union as u128
    }
}

fn saturate(v: u128) -> usize {
    usize::try_from(v).unwrap_or(usize::MAX)
}

fn gcd(mut a: u64, mut b: u64) -> u64 {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}

impl FromStr for Threshold {
    type Err = SearchError;

    /// Parse plain decimal text (`"1"`, `"0.05"`, `".5"`).
    ///
    /// Digits past the 18th fractional place round to the nearest multiple
    /// of `10^-18`; a nonzero value never rounds down to zero.
    fn from_str(s: &str) -> Result<Self> {
        let text = s.trim();
        let bad = |reason: &str| SearchError::invalid_threshold(text, reason);

        let (int_part, frac_part) = text.split_once('.').unwrap_or((text, ""));
        if int_part.is_empty() && frac_part.is_empty() {
            return Err(bad("not a decimal number"));
        }
        if !int_part.bytes().chain(frac_part.bytes()).all(|b| b.is_ascii_digit()) {
            return Err(bad("not a decimal number"));
        }
        let int_part = int_part.trim_start_matches('0');
        let frac_part = frac_part.trim_end_matches('0');
        match int_part {
            "" => {}
            "1" if frac_part.is_empty() => return Self::from_ratio(1, 1),
            _ => return Err(bad("must lie in (0, 1]")),
        }
        if frac_part.is_empty() {
            return Err(bad("must lie in (0, 1]"));
        }

        let (kept, rest) = frac_part.split_at(frac_part.len().min(MAX_FRACTION_DIGITS));
        let den = 10u64.pow(kept.len() as u32);
        let mut num: u64 = kept.parse().map_err(|_| bad("not a decimal number"))?;
        if rest.as_bytes().first().is_some_and(|&d| d >= b'5') {
            num += 1;
        }
        // The input was nonzero (its last fractional digit is nonzero).
        Self::from_ratio(num.clamp(1, den), den)
    }
}

impl TryFrom<f64> for Threshold {
    type Error = SearchError;

    fn try_from(value: f64) -> Result<Self> {
        Self::from_f64(value)
    }
}

impl fmt::Display for Threshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_f64())
    }
}

impl Serialize for Threshold {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.as_f64())
    }
}

impl<'de> Deserialize<'de> for Threshold {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = f64::deserialize(deserializer)?;
        Self::from_f64(value).map_err(serde::de::Error::custom)
    }
}
