//! Clock frequencies with unit parsing, display and period conversion.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::duration::FS_PER_S;

/// A frequency value stored in Hertz.
///
/// Parses strings like `"1MHz"`, `"100KHz"`, `"48000Hz"`, and bare numeric
/// values (interpreted as Hz).
#[derive(Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Frequency(f64);

impl Frequency {
    /// Creates a new frequency from a value in Hertz.
    pub fn new(hz: f64) -> Self {
        Self(hz)
    }

    /// Returns the frequency in Hertz.
    pub fn hz(&self) -> f64 {
        self.0
    }

    /// Returns the frequency in megahertz.
    pub fn mhz(&self) -> f64 {
        self.0 / 1_000_000.0
    }

    /// Returns the full period in femtoseconds, rounded to the nearest fs.
    pub fn period_fs(&self) -> u64 {
        (FS_PER_S as f64 / self.0).round() as u64
    }

    /// Returns the time between two clock edges, in femtoseconds.
    pub fn half_period_fs(&self) -> u64 {
        (FS_PER_S as f64 / (2.0 * self.0)).round() as u64
    }
}

impl fmt::Debug for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Frequency({self})")
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hz = self.0;
        if hz >= 1_000_000_000.0 {
            write!(f, "{}GHz", hz / 1_000_000_000.0)
        } else if hz >= 1_000_000.0 {
            write!(f, "{}MHz", hz / 1_000_000.0)
        } else if hz >= 1_000.0 {
            write!(f, "{}KHz", hz / 1_000.0)
        } else {
            write!(f, "{hz}Hz")
        }
    }
}

/// Error returned when a frequency string is malformed or not positive.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid frequency: '{input}'")]
pub struct ParseFrequencyError {
    /// The input string that failed to parse.
    pub input: String,
}

impl FromStr for Frequency {
    type Err = ParseFrequencyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let err = || ParseFrequencyError {
            input: s.to_string(),
        };

        let lower = s.to_ascii_lowercase();
        let (num, scale) = if let Some(num) = lower.strip_suffix("ghz") {
            (num, 1_000_000_000.0)
        } else if let Some(num) = lower.strip_suffix("mhz") {
            (num, 1_000_000.0)
        } else if let Some(num) = lower.strip_suffix("khz") {
            (num, 1_000.0)
        } else if let Some(num) = lower.strip_suffix("hz") {
            (num, 1.0)
        } else {
            (lower.as_str(), 1.0)
        };

        let val: f64 = num.trim().parse().map_err(|_| err())?;
        let hz = val * scale;
        if !hz.is_finite() || hz <= 0.0 {
            return Err(err());
        }
        Ok(Frequency(hz))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_units() {
        assert_eq!("1GHz".parse::<Frequency>().unwrap().hz(), 1_000_000_000.0);
        assert_eq!("2MHz".parse::<Frequency>().unwrap().hz(), 2_000_000.0);
        assert_eq!("100khz".parse::<Frequency>().unwrap().hz(), 100_000.0);
        assert_eq!("60Hz".parse::<Frequency>().unwrap().hz(), 60.0);
        assert_eq!("25000".parse::<Frequency>().unwrap().hz(), 25_000.0);
    }

    #[test]
    fn parse_rejects_garbage_and_zero() {
        assert!("fast".parse::<Frequency>().is_err());
        assert!("0MHz".parse::<Frequency>().is_err());
        assert!("-5Hz".parse::<Frequency>().is_err());
    }

    #[test]
    fn periods_in_femtoseconds() {
        let f: Frequency = "1MHz".parse().unwrap();
        assert_eq!(f.period_fs(), 1_000_000_000);
        assert_eq!(f.half_period_fs(), 500_000_000);
    }

    #[test]
    fn display_selects_best_unit() {
        assert_eq!(Frequency::new(50_000_000.0).to_string(), "50MHz");
        assert_eq!(Frequency::new(44_100.0).to_string(), "44.1KHz");
        assert_eq!(Frequency::new(500.0).to_string(), "500Hz");
    }

    #[test]
    fn error_display() {
        let err = "bogus".parse::<Frequency>().unwrap_err();
        assert_eq!(err.to_string(), "invalid frequency: 'bogus'");
    }
}
