//! Elapsed times as `sacct` prints them.
//!
//! Accepted notations:
//! - `D-HH:MM:SS` (days are unbounded, hours must be below 24)
//! - `HH:MM:SS`   (hours are unbounded)
//! - `MM:SS`
use std::{fmt, str::FromStr};

use derive_more::derive::{Deref, From, Into};
use itertools::Itertools as _;
use thiserror::Error;

pub const SECONDS_PER_MINUTE: u64 = 60;
pub const SECONDS_PER_HOUR: u64 = 60 * SECONDS_PER_MINUTE;
pub const SECONDS_PER_DAY: u64 = 24 * SECONDS_PER_HOUR;

/// Whole seconds a job ran for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Deref, From, Into)]
pub struct Elapsed(pub u64);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DurationError {
    #[error("trying to parse an empty elapsed time")]
    Empty,
    #[error("`{0}` is not in D-HH:MM:SS, HH:MM:SS or MM:SS notation")]
    Notation(String),
    #[error("{unit} in `{input}` is not a number (`{value}`)")]
    NotANumber {
        input: String,
        unit: &'static str,
        value: String,
    },
    #[error("{unit} in `{input}` out of range ({value}, must be below {limit})")]
    OutOfRange {
        input: String,
        unit: &'static str,
        value: u64,
        limit: u64,
    },
    #[error("`{0}` does not fit into 64 bit seconds")]
    TooLarge(String),
}

impl Elapsed {
    pub fn seconds(self) -> u64 {
        self.0
    }

    pub fn parse(input: &str) -> Result<Self, DurationError> {
        use DurationError::*;
        let input = input.trim();
        if input.is_empty() {
            return Err(Empty);
        }

        let component = |value: &str, unit: &'static str, limit: Option<u64>| -> Result<u64, DurationError> {
            // `u64::from_str` would accept a leading `+`
            if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
                return Err(NotANumber {
                    input: input.to_owned(),
                    unit,
                    value: value.to_owned(),
                });
            }
            let value = value.parse::<u64>().map_err(|_| TooLarge(input.to_owned()))?;
            match limit {
                Some(limit) if value >= limit => Err(OutOfRange {
                    input: input.to_owned(),
                    unit,
                    value,
                    limit,
                }),
                _ => Ok(value),
            }
        };

        let (days, clock) = match input.split_once('-') {
            Some((days, clock)) => (Some(component(days, "days", None)?), clock),
            None => (None, input),
        };
        let clock = clock.split(':').collect_vec();

        let (days, hours, minutes, seconds) = match (days, clock.as_slice()) {
            (Some(days), &[hours, minutes, seconds]) => (days, component(hours, "hours", Some(24))?, minutes, seconds),
            (None, &[hours, minutes, seconds]) => (0, component(hours, "hours", None)?, minutes, seconds),
            (None, &[minutes, seconds]) => (0, 0, minutes, seconds),
            _ => return Err(Notation(input.to_owned())),
        };
        let minutes = component(minutes, "minutes", Some(60))?;
        let seconds = component(seconds, "seconds", Some(60))?;

        days.checked_mul(SECONDS_PER_DAY)
            .and_then(|total| total.checked_add(hours.checked_mul(SECONDS_PER_HOUR)?))
            .and_then(|total| total.checked_add(minutes * SECONDS_PER_MINUTE + seconds))
            .map(Elapsed)
            .ok_or_else(|| TooLarge(input.to_owned()))
    }
}

impl FromStr for Elapsed {
    type Err = DurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Prints the normalized sacct notation, `D-HH:MM:SS` with the day part only when non-zero.
impl fmt::Display for Elapsed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let days = self.0 / SECONDS_PER_DAY;
        let hours = self.0 % SECONDS_PER_DAY / SECONDS_PER_HOUR;
        let minutes = self.0 % SECONDS_PER_HOUR / SECONDS_PER_MINUTE;
        let seconds = self.0 % SECONDS_PER_MINUTE;
        if days > 0 {
            write!(f, "{days}-")?;
        }
        write!(f, "{hours:02}:{minutes:02}:{seconds:02}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(input: &str) -> u64 {
        Elapsed::parse(input).unwrap().seconds()
    }

    #[test]
    fn test_parse_with_days() {
        assert_eq!(secs("1-02:03:04"), 93784);
        assert_eq!(secs("1-00:00:01"), 86401);
        assert_eq!(secs("12-23:59:59"), 12 * SECONDS_PER_DAY + 86399);
    }

    #[test]
    fn test_parse_hours_minutes_seconds() {
        assert_eq!(secs("02:03:04"), 7384);
        assert_eq!(secs("00:00:01"), 1);
        assert_eq!(secs("00:01:01"), 61);
        assert_eq!(secs("11:11:11"), 40271);
        // no day part, so hours may exceed a day
        assert_eq!(secs("36:00:00"), 36 * SECONDS_PER_HOUR);
    }

    #[test]
    fn test_parse_minutes_seconds() {
        assert_eq!(secs("03:04"), 184);
        assert_eq!(secs("00:00"), 0);
    }

    #[test]
    fn test_parse_trims_whitespace() {
        assert_eq!(secs("  00:07:23 "), 443);
    }

    #[test]
    fn test_parse_empty() {
        assert_eq!(Elapsed::parse(""), Err(DurationError::Empty));
        assert_eq!(Elapsed::parse("   "), Err(DurationError::Empty));
    }

    #[test]
    fn test_parse_out_of_range() {
        assert!(matches!(
            Elapsed::parse("00:60:00"),
            Err(DurationError::OutOfRange { unit: "minutes", value: 60, .. })
        ));
        assert!(matches!(
            Elapsed::parse("00:00:75"),
            Err(DurationError::OutOfRange { unit: "seconds", .. })
        ));
        assert!(matches!(
            Elapsed::parse("1-24:00:00"),
            Err(DurationError::OutOfRange { unit: "hours", .. })
        ));
    }

    #[test]
    fn test_parse_wrong_notation() {
        assert!(matches!(Elapsed::parse("1-03:04"), Err(DurationError::Notation(_))));
        assert!(matches!(Elapsed::parse("42"), Err(DurationError::Notation(_))));
        assert!(matches!(Elapsed::parse("1:2:3:4"), Err(DurationError::Notation(_))));
        assert!(matches!(Elapsed::parse("35s"), Err(DurationError::Notation(_))));
    }

    #[test]
    fn test_parse_not_a_number() {
        assert!(matches!(Elapsed::parse("aa:00:00"), Err(DurationError::NotANumber { .. })));
        assert!(matches!(Elapsed::parse("+1:00:00"), Err(DurationError::NotANumber { .. })));
        assert!(matches!(Elapsed::parse("-01:00:00"), Err(DurationError::NotANumber { unit: "days", .. })));
        assert!(matches!(Elapsed::parse("01::00"), Err(DurationError::NotANumber { .. })));
    }

    #[test]
    fn test_parse_too_large() {
        assert!(matches!(
            Elapsed::parse("99999999999999999-00:00:00"),
            Err(DurationError::TooLarge(_))
        ));
    }

    #[test]
    fn test_display_normalizes() {
        assert_eq!(Elapsed(93784).to_string(), "1-02:03:04");
        assert_eq!(Elapsed(184).to_string(), "00:03:04");
        assert_eq!(Elapsed(0).to_string(), "00:00:00");
    }
}
