use std::{fmt, str::FromStr};

use chrono::{NaiveDate, NaiveDateTime};
use thiserror::Error;

/// sacct prints `Submit`/`Start`/`End` like this, in the _local_ time of the cluster and without
/// any offset.
pub const SLURM_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// What sacct writes for a point in time the job hasn't reached (yet).
pub const UNSET_SENTINELS: [&str; 4] = ["", "unknown", "none", "n/a"];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("`{input}` is neither a timestamp ({fmt}) nor one of {sentinels:?}", fmt = SLURM_FORMAT, sentinels = UNSET_SENTINELS)]
pub struct TimestampError {
    pub input: String,
    #[source]
    pub cause: chrono::ParseError,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Timestamp {
    At(NaiveDateTime),
    #[default]
    Unset,
}

impl Timestamp {
    pub fn parse(input: &str) -> Result<Self, TimestampError> {
        let input = input.trim();
        if UNSET_SENTINELS.iter().any(|sentinel| input.eq_ignore_ascii_case(sentinel)) {
            return Ok(Timestamp::Unset);
        }

        NaiveDateTime::parse_from_str(input, SLURM_FORMAT)
            .or_else(|_| NaiveDateTime::parse_from_str(input, "%Y-%m-%d %H:%M:%S"))
            .map(Timestamp::At)
            .map_err(|cause| TimestampError {
                input: input.to_owned(),
                cause,
            })
    }

    pub fn get(self) -> Option<NaiveDateTime> {
        match self {
            Timestamp::At(at) => Some(at),
            Timestamp::Unset => None,
        }
    }

    pub fn is_set(self) -> bool {
        matches!(self, Timestamp::At(_))
    }

    pub fn date(self) -> Option<NaiveDate> {
        self.get().map(|at| at.date())
    }
}

impl From<NaiveDateTime> for Timestamp {
    fn from(value: NaiveDateTime) -> Self {
        Timestamp::At(value)
    }
}

impl FromStr for Timestamp {
    type Err = TimestampError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Unset prints as an empty string.
impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Timestamp::At(at) => write!(f, "{}", at.format(SLURM_FORMAT)),
            Timestamp::Unset => Ok(()),
        }
    }
}
