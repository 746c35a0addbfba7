//! Polling frequency specification.
//!
//! A frequency is written as `<count><unit>` (`"45m"`, `"2h"`) or as a range
//! sharing one unit (`"1h..2h"`). Units are `m`, `h`, `d` and `w`.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use regex::Regex;

use crate::error::{AppError, Result};

const FIXED_PATTERN: &str = r"^(\d+)([mhdw])$";
const RANGE_PATTERN: &str = r"^(\d+)([mhdw])\.\.(\d+)([mhdw])$";

/// Unit of a polling interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeUnit {
    Minute,
    Hour,
    Day,
    Week,
}

impl TimeUnit {
    fn from_suffix(s: &str) -> Option<Self> {
        match s {
            "m" => Some(TimeUnit::Minute),
            "h" => Some(TimeUnit::Hour),
            "d" => Some(TimeUnit::Day),
            "w" => Some(TimeUnit::Week),
            _ => None,
        }
    }

    fn suffix(&self) -> &'static str {
        match self {
            TimeUnit::Minute => "m",
            TimeUnit::Hour => "h",
            TimeUnit::Day => "d",
            TimeUnit::Week => "w",
        }
    }

    /// Length of one unit in seconds.
    pub fn seconds(&self) -> u64 {
        match self {
            TimeUnit::Minute => 60,
            TimeUnit::Hour => 60 * 60,
            TimeUnit::Day => 24 * 60 * 60,
            TimeUnit::Week => 7 * 24 * 60 * 60,
        }
    }

    /// Duration of `count` units.
    pub fn as_duration(&self, count: u32) -> Duration {
        Duration::from_secs(self.seconds() * u64::from(count))
    }
}

/// Normalized polling interval or interval range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrequencySpec {
    /// Every `count` units
    Fixed(u32, TimeUnit),
    /// A uniformly drawn count in `lo..=hi` units, redrawn every cycle
    Range(u32, u32, TimeUnit),
}

impl FrequencySpec {
    /// Parse a human frequency string.
    ///
    /// Every malformed input fails with [`AppError::InvalidFrequency`]; callers
    /// tell the cases apart by message only.
    pub fn parse(text: &str) -> Result<Self> {
        let invalid = |reason: &str| {
            AppError::InvalidFrequency(format!(
                "The provided monitor frequency '{text}' is invalid: {reason}"
            ))
        };

        let count = |s: &str| {
            s.parse::<u32>()
                .ok()
                .filter(|c| *c > 0)
                .ok_or_else(|| invalid("count must be a positive integer"))
        };
        let unit = |s: &str| TimeUnit::from_suffix(s).ok_or_else(|| invalid("unknown unit"));

        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(invalid("empty"));
        }

        let fixed = Regex::new(FIXED_PATTERN).map_err(|e| AppError::config(e.to_string()))?;
        if let Some(caps) = fixed.captures(trimmed) {
            return Ok(FrequencySpec::Fixed(count(&caps[1])?, unit(&caps[2])?));
        }

        let range = Regex::new(RANGE_PATTERN).map_err(|e| AppError::config(e.to_string()))?;
        if let Some(caps) = range.captures(trimmed) {
            let (lo, lo_unit) = (count(&caps[1])?, unit(&caps[2])?);
            let (hi, hi_unit) = (count(&caps[3])?, unit(&caps[4])?);
            if lo_unit != hi_unit {
                return Err(invalid("range bounds must share a unit"));
            }
            if lo >= hi {
                return Err(invalid("range lower bound must be below the upper bound"));
            }
            return Ok(FrequencySpec::Range(lo, hi, lo_unit));
        }

        Err(invalid("expected <count><m|h|d|w> or <count><unit>..<count><unit>"))
    }

    pub fn unit(&self) -> TimeUnit {
        match self {
            FrequencySpec::Fixed(_, unit) | FrequencySpec::Range(_, _, unit) => *unit,
        }
    }

    /// Shortest interval this frequency can produce.
    pub fn min_interval(&self) -> Duration {
        match self {
            FrequencySpec::Fixed(count, unit) | FrequencySpec::Range(count, _, unit) => {
                unit.as_duration(*count)
            }
        }
    }

    /// Longest interval this frequency can produce.
    pub fn max_interval(&self) -> Duration {
        match self {
            FrequencySpec::Fixed(count, unit) | FrequencySpec::Range(_, count, unit) => {
                unit.as_duration(*count)
            }
        }
    }
}

impl FromStr for FrequencySpec {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for FrequencySpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrequencySpec::Fixed(count, unit) => write!(f, "{}{}", count, unit.suffix()),
            FrequencySpec::Range(lo, hi, unit) => {
                write!(f, "{lo}{u}..{hi}{u}", u = unit.suffix())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_invalid(text: &str) {
        match FrequencySpec::parse(text) {
            Err(AppError::InvalidFrequency(msg)) => assert!(msg.contains(text.trim())),
            other => panic!("expected InvalidFrequency for {text:?}, got {other:?}"),
        }
    }

    #[test]
    fn parses_fixed() {
        assert_eq!(
            FrequencySpec::parse("45m").unwrap(),
            FrequencySpec::Fixed(45, TimeUnit::Minute)
        );
        assert_eq!(
            FrequencySpec::parse("2h").unwrap(),
            FrequencySpec::Fixed(2, TimeUnit::Hour)
        );
        assert_eq!(
            FrequencySpec::parse("3d").unwrap(),
            FrequencySpec::Fixed(3, TimeUnit::Day)
        );
        assert_eq!(
            "1w".parse::<FrequencySpec>().unwrap(),
            FrequencySpec::Fixed(1, TimeUnit::Week)
        );
    }

    #[test]
    fn parses_range() {
        assert_eq!(
            FrequencySpec::parse("1h..2h").unwrap(),
            FrequencySpec::Range(1, 2, TimeUnit::Hour)
        );
        assert_eq!(
            FrequencySpec::parse("30m..90m").unwrap(),
            FrequencySpec::Range(30, 90, TimeUnit::Minute)
        );
    }

    #[test]
    fn rejects_malformed_input() {
        assert_invalid("");
        assert_invalid("   ");
        assert_invalid("abc");
        assert_invalid("45");
        assert_invalid("45s");
        assert_invalid("0m");
        assert_invalid("1h2m");
        assert_invalid("x45m");
        assert_invalid("-5m");
    }

    #[test]
    fn rejects_bad_ranges() {
        assert_invalid("1h..2d");
        assert_invalid("2h..1h");
        assert_invalid("1h..1h");
        assert_invalid("0h..2h");
        assert_invalid("1h..");
    }

    #[test]
    fn rejects_overflowing_count() {
        assert_invalid("99999999999m");
    }

    #[test]
    fn display_round_trips() {
        for text in ["45m", "2h", "1h..2h", "1d..3d"] {
            assert_eq!(FrequencySpec::parse(text).unwrap().to_string(), text);
        }
    }

    #[test]
    fn interval_bounds() {
        let spec = FrequencySpec::parse("1h..2h").unwrap();
        assert_eq!(spec.min_interval(), Duration::from_secs(3600));
        assert_eq!(spec.max_interval(), Duration::from_secs(7200));
        assert_eq!(
            FrequencySpec::parse("1w").unwrap().min_interval(),
            Duration::from_secs(604_800)
        );
    }
}
