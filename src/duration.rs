//! # Durations
//!
//! A duration is a reduced positive fraction of a whole measure: `1/4` is a quarter
//! note, `3/8` a dotted quarter, `1/12` an eighth-note triplet member.
//!
//! ## Conversions
//! - **Ticks**: `numerator * 4 * resolution / denominator`, where the resolution is
//!   the number of ticks in a quarter note (960 for every arrangement built with
//!   the defaults).
//! - **Milliseconds**: `60_000 * 4 * numerator / (bpm * denominator)`, the
//!   duration's quarter-note count at the given tempo.
//!
//! Both conversions truncate toward zero.
//!
//! ## Example
//! ```rust
//! use partitura::Duration;
//!
//! let dotted_quarter = Duration::QUARTER.add(&Duration::EIGHTH)?;
//! assert_eq!(dotted_quarter.to_string(), "3/8");
//! assert_eq!(dotted_quarter.to_ticks(960), 1440);
//! assert_eq!(Duration::QUARTER.to_millis(120)?, 500);
//! # Ok::<(), partitura::PartituraError>(())
//! ```

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{PartituraError, Result};

/// A positive fraction of a whole measure, always stored in lowest terms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Duration {
    numerator: u32,
    denominator: u32,
}

impl Duration {
    pub const WHOLE: Duration = Duration { numerator: 1, denominator: 1 };
    pub const HALF: Duration = Duration { numerator: 1, denominator: 2 };
    pub const QUARTER: Duration = Duration { numerator: 1, denominator: 4 };
    pub const EIGHTH: Duration = Duration { numerator: 1, denominator: 8 };
    pub const SIXTEENTH: Duration = Duration { numerator: 1, denominator: 16 };
    pub const THIRTY_SECOND: Duration = Duration { numerator: 1, denominator: 32 };
    pub const SIXTY_FOURTH: Duration = Duration { numerator: 1, denominator: 64 };

    /// Create a duration from a numerator and a denominator, reducing the fraction.
    ///
    /// # Errors
    /// `InvalidDuration` if either term is zero or negative.
    pub fn new(numerator: i64, denominator: i64) -> Result<Self> {
        if numerator <= 0 || denominator <= 0 {
            return Err(PartituraError::InvalidDuration(format!(
                "{}/{} is not positive",
                numerator, denominator
            )));
        }
        Self::reduced(numerator as u128, denominator as u128)
    }

    /// A fraction `1/denominator` of the measure.
    pub fn fraction(denominator: i64) -> Result<Self> {
        Self::new(1, denominator)
    }

    fn reduced(numerator: u128, denominator: u128) -> Result<Self> {
        let divisor = gcd(numerator, denominator);
        let numerator = numerator / divisor;
        let denominator = denominator / divisor;
        match (u32::try_from(numerator), u32::try_from(denominator)) {
            (Ok(numerator), Ok(denominator)) => Ok(Self { numerator, denominator }),
            _ => Err(PartituraError::InvalidArgument(format!(
                "{}/{} does not fit a 32-bit fraction",
                numerator, denominator
            ))),
        }
    }

    pub fn numerator(&self) -> u32 {
        self.numerator
    }

    pub fn denominator(&self) -> u32 {
        self.denominator
    }

    /// Sum of this duration and `other`.
    pub fn add(&self, other: &Duration) -> Result<Duration> {
        let numerator = self.numerator as u128 * other.denominator as u128
            + other.numerator as u128 * self.denominator as u128;
        let denominator = self.denominator as u128 * other.denominator as u128;
        Self::reduced(numerator, denominator)
    }

    /// Difference between this duration and `other`.
    ///
    /// # Errors
    /// `InvalidDuration` if `other` is as long as or longer than `self`.
    pub fn subtract(&self, other: &Duration) -> Result<Duration> {
        let left = self.numerator as u128 * other.denominator as u128;
        let right = other.numerator as u128 * self.denominator as u128;
        if left <= right {
            return Err(PartituraError::InvalidDuration(format!(
                "{} - {} is not positive",
                self, other
            )));
        }
        Self::reduced(left - right, self.denominator as u128 * other.denominator as u128)
    }

    /// This duration multiplied by `factor`.
    pub fn scale(&self, factor: i64) -> Result<Duration> {
        if factor <= 0 {
            return Err(PartituraError::InvalidArgument(format!(
                "cannot scale a duration by {}",
                factor
            )));
        }
        Self::reduced(self.numerator as u128 * factor as u128, self.denominator as u128)
    }

    /// This duration divided by `divisor`.
    pub fn divide(&self, divisor: i64) -> Result<Duration> {
        if divisor <= 0 {
            return Err(PartituraError::InvalidArgument(format!(
                "cannot divide a duration by {}",
                divisor
            )));
        }
        Self::reduced(self.numerator as u128, self.denominator as u128 * divisor as u128)
    }

    /// Length in milliseconds at `bpm` quarter notes per minute.
    pub fn to_millis(&self, bpm: u32) -> Result<u64> {
        if bpm == 0 {
            return Err(PartituraError::InvalidArgument(
                "tempo must be at least 1 bpm".to_string(),
            ));
        }
        let millis = 240_000u128 * self.numerator as u128
            / (bpm as u128 * self.denominator as u128);
        Ok(saturate(millis))
    }

    /// Length in ticks for a timeline with `resolution` ticks per quarter note.
    pub fn to_ticks(&self, resolution: u32) -> u64 {
        saturate(self.numerator as u128 * 4 * resolution as u128 / self.denominator as u128)
    }
}

fn saturate(value: u128) -> u64 {
    u64::try_from(value).unwrap_or(u64::MAX)
}

fn gcd(mut a: u128, mut b: u128) -> u128 {
    while b != 0 {
        let r = a % b;
        a = b;
        b = r;
    }
    a
}

impl Default for Duration {
    fn default() -> Self {
        Duration::QUARTER
    }
}

impl Ord for Duration {
    fn cmp(&self, other: &Self) -> Ordering {
        let left = self.numerator as u64 * other.denominator as u64;
        let right = other.numerator as u64 * self.denominator as u64;
        left.cmp(&right)
    }
}

impl PartialOrd for Duration {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.numerator, self.denominator)
    }
}

impl FromStr for Duration {
    type Err = PartituraError;

    /// Parse the `N/D` form, e.g. `1/8` or `3/16`.
    fn from_str(s: &str) -> Result<Self> {
        let (numerator, denominator) = s
            .split_once('/')
            .ok_or_else(|| PartituraError::parse(s, "a duration must have the form N/D"))?;
        let numerator = parse_term(s, numerator)?;
        let denominator = parse_term(s, denominator)?;
        Duration::new(numerator, denominator)
    }
}

fn parse_term(input: &str, term: &str) -> Result<i64> {
    // Reject "+1" and " 1": only plain (optionally negative) digits are a term
    let digits = term.strip_prefix('-').unwrap_or(term);
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(PartituraError::parse(
            input,
            format!("'{}' is not an integer", term),
        ));
    }
    term.parse()
        .map_err(|_| PartituraError::parse(input, format!("'{}' is too large", term)))
}

impl TryFrom<String> for Duration {
    type Error = PartituraError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Duration> for String {
    fn from(duration: Duration) -> Self {
        duration.to_string()
    }
}
