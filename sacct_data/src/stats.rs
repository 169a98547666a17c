//! Per-job statistics. Everything in here is a pure function of a [`JobRecord`]: no I/O, nothing
//! can fail. Values that can't be computed are [`Computed::NotComputable`], never zero or negative.
use std::{collections::BTreeMap, fmt};

use chrono::NaiveDate;
use serde::Serialize;

use crate::{
    config::{Category, CategoryRules},
    duration::SECONDS_PER_HOUR,
    record::JobRecord,
    timestamp::Timestamp,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Computed<T> {
    Value(T),
    NotComputable,
}

impl<T> Computed<T> {
    pub fn value(self) -> Option<T> {
        match self {
            Computed::Value(value) => Some(value),
            Computed::NotComputable => None,
        }
    }

    pub fn is_computable(&self) -> bool {
        matches!(self, Computed::Value(_))
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Computed<U> {
        match self {
            Computed::Value(value) => Computed::Value(f(value)),
            Computed::NotComputable => Computed::NotComputable,
        }
    }

    /// `marker` for [`Computed::NotComputable`], the value's `Display` otherwise.
    pub fn display<'a>(&'a self, marker: &'a str) -> impl fmt::Display + 'a
    where
        T: fmt::Display,
    {
        struct Cell<'a, T>(&'a Computed<T>, &'a str);
        impl<T: fmt::Display> fmt::Display for Cell<'_, T> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                match self.0 {
                    Computed::Value(value) => fmt::Display::fmt(value, f),
                    Computed::NotComputable => f.write_str(self.1),
                }
            }
        }
        Cell(self, marker)
    }
}

impl<T> From<Option<T>> for Computed<T> {
    fn from(value: Option<T>) -> Self {
        value.map_or(Computed::NotComputable, Computed::Value)
    }
}

/// A job plus what we derive from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputRow {
    pub job: JobRecord,
    /// CPUs × elapsed seconds
    pub cpu_seconds: Computed<u64>,
    /// nodes × elapsed seconds
    pub node_seconds: Computed<u64>,
    /// count × elapsed seconds for every countable resource in the allocation. Resources that
    /// weren't allocated have no entry (as opposed to a zero one).
    pub resource_seconds: BTreeMap<String, Computed<u64>>,
    /// start − submit, only when both are set and start isn't before submit
    pub queue_wait: Computed<u64>,
    pub category: Category,
    pub end_date: Computed<NaiveDate>,
}

impl OutputRow {
    pub fn cpu_hours(&self) -> Computed<f64> {
        hours(self.cpu_seconds)
    }

    pub fn node_hours(&self) -> Computed<f64> {
        hours(self.node_seconds)
    }

    pub fn queue_wait_hours(&self) -> Computed<f64> {
        hours(self.queue_wait)
    }

    /// Not computable when the resource wasn't allocated at all.
    pub fn resource_seconds(&self, key: &str) -> Computed<u64> {
        self.resource_seconds.get(key).copied().unwrap_or(Computed::NotComputable)
    }

    pub fn resource_hours(&self, key: &str) -> Computed<f64> {
        hours(self.resource_seconds(key))
    }
}

pub fn hours(seconds: Computed<u64>) -> Computed<f64> {
    seconds.map(|seconds| seconds as f64 / SECONDS_PER_HOUR as f64)
}

fn time_product(count: u64, seconds: u64) -> Computed<u64> {
    count.checked_mul(seconds).into()
}

/// Seconds from submit to start. Start before submit (clock skew, bogus data) is not computable.
pub fn queue_wait(submit: Timestamp, start: Timestamp) -> Computed<u64> {
    match (submit, start) {
        (Timestamp::At(submit), Timestamp::At(start)) if start >= submit => {
            u64::try_from((start - submit).num_seconds()).ok().into()
        }
        _ => Computed::NotComputable,
    }
}

/// Derives the statistics of one job. Consumes the record; it ends up unchanged in the row.
pub fn derive_stats(job: JobRecord, categories: &CategoryRules) -> OutputRow {
    let elapsed = job.elapsed.seconds();

    OutputRow {
        cpu_seconds: time_product(job.cpus.into(), elapsed),
        node_seconds: time_product(job.nodes.into(), elapsed),
        resource_seconds: job
            .tres
            .countable()
            .map(|(key, count)| (key.to_owned(), time_product(count, elapsed)))
            .collect(),
        queue_wait: queue_wait(job.submit, job.start),
        category: categories.categorize(&job.partition),
        end_date: job.end.date().into(),
        job,
    }
}
