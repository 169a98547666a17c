//! Trackable resources (`AllocTRES`), e.g. `billing=8,cpu=8,mem=64G,node=1,gres/gpu=4`.
use std::{collections::BTreeMap, fmt, num::ParseIntError, str::FromStr};

use itertools::Itertools as _;
use thiserror::Error;

pub const GPU: &str = "gres/gpu";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AllocationError {
    #[error("`{token}` in `{input}` is not a key=value pair")]
    MissingSeparator { input: String, token: String },
    #[error("`{token}` in `{input}` has an empty key")]
    EmptyKey { input: String, token: String },
    #[error("value `{value}` of `{key}` is not a count")]
    MalformedValue {
        key: String,
        value: String,
        #[source]
        cause: ResourceValueError,
    },
}

/// empty means empty after trimming
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResourceValueError {
    #[error("trying to parse an empty string")]
    Empty,
    #[error("scalar part `{0}` contains non-digits")]
    NotDigits(String),
    #[error("scalar part is not an unsigned integer")]
    InvalidInt(#[from] ParseIntError),
    #[error("count overflows with unit suffix")]
    Overflow,
}

/// Decoded allocation. Keys keep their spelling, values stay raw text so unknown resources
/// survive untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Allocation {
    raw: String,
    resources: BTreeMap<String, String>,
}

impl Allocation {
    /// An empty (or whitespace) string is an empty allocation; pending jobs have no TRES yet.
    /// Duplicate keys: last one wins.
    pub fn parse(input: &str) -> Result<Self, AllocationError> {
        let raw = input.trim();
        if raw.is_empty() {
            return Ok(Self::default());
        }

        let resources = raw
            .split(',')
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .map(|token| match token.split_once('=') {
                Some((key, _)) if key.trim().is_empty() => Err(AllocationError::EmptyKey {
                    input: raw.to_owned(),
                    token: token.to_owned(),
                }),
                Some((key, value)) => Ok((key.trim().to_owned(), value.trim().to_owned())),
                None => Err(AllocationError::MissingSeparator {
                    input: raw.to_owned(),
                    token: token.to_owned(),
                }),
            })
            .process_results(|iter| iter.collect())?;

        Ok(Self {
            raw: raw.to_owned(),
            resources,
        })
    }

    /// The string as it was read (trimmed).
    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.resources.get(key).map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.resources.contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.resources.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Numeric value of `key`, `None` if the key is absent.
    ///
    /// A single binary unit suffix (`K`, `M`, `G`, `T`, `P`) is stripped and applied, so `mem=16G`
    /// yields bytes.
    pub fn count(&self, key: &str) -> Result<Option<u64>, AllocationError> {
        self.decode(key, parse_count)
    }

    /// Numeric value of `key` without unit suffixes, `None` if the key is absent. Only these
    /// values count things that make sense multiplied with a duration.
    pub fn plain_count(&self, key: &str) -> Result<Option<u64>, AllocationError> {
        self.decode(key, parse_plain_count)
    }

    /// Resources whose value is a plain integer (no unit).
    pub fn countable(&self) -> impl Iterator<Item = (&str, u64)> {
        self.iter()
            .filter_map(|(key, value)| parse_plain_count(value).ok().map(|count| (key, count)))
    }

    fn decode(
        &self,
        key: &str,
        parse: impl FnOnce(&str) -> Result<u64, ResourceValueError>,
    ) -> Result<Option<u64>, AllocationError> {
        self.get(key)
            .map(|value| {
                parse(value).map_err(|cause| AllocationError::MalformedValue {
                    key: key.to_owned(),
                    value: value.to_owned(),
                    cause,
                })
            })
            .transpose()
    }
}

impl FromStr for Allocation {
    type Err = AllocationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Canonical form: `key=value` pairs sorted by key, duplicates collapsed. See [`Allocation::raw`]
/// for the text as read.
impl fmt::Display for Allocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.iter().map(|(key, value)| format!("{key}={value}")).join(","))
    }
}

fn scaled(s: &str, power: u32) -> Result<u64, ResourceValueError> {
    // `u64::from_str` would accept a leading `+`
    if !s.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ResourceValueError::NotDigits(s.to_owned()));
    }
    s.parse::<u64>()?
        .checked_mul(1024u64.pow(power))
        .ok_or(ResourceValueError::Overflow)
}

/// empty means empty after trimming
pub fn parse_count(input: &str) -> Result<u64, ResourceValueError> {
    use ResourceValueError::*;
    let input = input.trim();

    fn strip_suffix(s: &str) -> String {
        s.chars().dropping_back(1).collect()
    }

    match input.chars().last() {
        Some('K') => scaled(&strip_suffix(input), 1),
        Some('M') => scaled(&strip_suffix(input), 2),
        Some('G') => scaled(&strip_suffix(input), 3),
        Some('T') => scaled(&strip_suffix(input), 4),
        Some('P') => scaled(&strip_suffix(input), 5),
        None => Err(Empty),
        _ => scaled(input, 0),
    }
}

/// Digits only, no unit suffix.
pub fn parse_plain_count(input: &str) -> Result<u64, ResourceValueError> {
    match input.trim() {
        "" => Err(ResourceValueError::Empty),
        input => scaled(input, 0),
    }
}
