//! Lines in, rows out.
//!
//! [`Pipeline`] wraps any iterator of lines and yields one [`OutputRow`] per line that parses. A
//! bad line never stops the run: it is logged, recorded in the [`Report`] and skipped. Errors of
//! the line source itself (an unreadable file, say) are passed through untouched.
//!
//! Lines are bytes: one that isn't UTF-8 is a malformed line like any other.
use std::{
    convert::Infallible,
    fmt,
    iter::{Enumerate, Map},
    str,
};

use itertools::Itertools as _;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::{
    config::PipelineConfig,
    record::{split_fields, ErrorKind, JobRecord, RecordError, RecordParseError},
    stats::{derive_stats, OutputRow},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display, Serialize)]
pub enum SkipReason {
    #[display("blank line")]
    Blank,
    #[display("header line")]
    Header,
    #[display("zero elapsed time")]
    ZeroElapsed,
}

/// What happened to the lines seen so far. `total == rows + skipped + failures`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Report {
    pub total: usize,
    pub rows: usize,
    pub skipped: Vec<(usize, SkipReason)>,
    pub failures: Vec<RecordParseError>,
}

impl Report {
    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn failures_by_kind(&self) -> Vec<(ErrorKind, usize)> {
        self.failures
            .iter()
            .map(RecordParseError::kind)
            .counts()
            .into_iter()
            .sorted_by_key(|(kind, _)| kind.to_string())
            .collect()
    }

    pub fn log_summary(&self) {
        info!(
            total = self.total,
            rows = self.rows,
            skipped = self.skipped.len(),
            failed = self.failed(),
            "done"
        );
        for (kind, count) in self.failures_by_kind() {
            info!(%kind, count, "skipped malformed lines");
        }
    }
}

/// Operator summary: one line of totals, then one line per failed line.
impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} lines read, {} rows written, {} skipped, {} malformed",
            self.total,
            self.rows,
            self.skipped.len(),
            self.failed()
        )?;
        for failure in &self.failures {
            writeln!(f, "  [{}] {failure}", failure.kind())?;
        }
        Ok(())
    }
}

enum Outcome {
    Row(Box<OutputRow>),
    Skipped(SkipReason),
    Failed(RecordParseError),
}

/// Single pass, forward only. Consuming it again needs a fresh line source.
#[derive(Debug)]
pub struct Pipeline<I> {
    lines: Enumerate<I>,
    config: PipelineConfig,
    report: Report,
}

impl<I: Iterator> Pipeline<I> {
    pub fn new(lines: impl IntoIterator<IntoIter = I>, config: PipelineConfig) -> Self {
        Self {
            lines: lines.into_iter().enumerate(),
            config,
            report: Report::default(),
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Report of the lines consumed so far.
    pub fn report(&self) -> &Report {
        &self.report
    }

    pub fn into_report(self) -> Report {
        self.report
    }

    fn process(&self, index: usize, line: &[u8]) -> Outcome {
        let line = line.strip_suffix(b"\r").unwrap_or(line);
        let line = match str::from_utf8(line) {
            Ok(line) => line,
            Err(cause) => {
                return Outcome::Failed(RecordParseError {
                    line: index,
                    cause: RecordError::Encoding(cause),
                })
            }
        };

        if self.config.skip_blank && line.trim().is_empty() {
            return Outcome::Skipped(SkipReason::Blank);
        }
        if self.config.skip_header && self.config.schema.is_header(split_fields(line, &self.config).into_iter()) {
            return Outcome::Skipped(SkipReason::Header);
        }

        let job = match JobRecord::parse(line, index, &self.config) {
            Ok(job) => job,
            Err(e) => return Outcome::Failed(e),
        };
        if self.config.skip_zero_elapsed && job.elapsed.seconds() == 0 {
            return Outcome::Skipped(SkipReason::ZeroElapsed);
        }
        Outcome::Row(Box::new(derive_stats(job, &self.config.categories)))
    }
}

/// Lines from a source that can't fail, e.g. lines already in memory.
pub type InfallibleLines<J> = Map<J, fn(<J as Iterator>::Item) -> Result<<J as Iterator>::Item, Infallible>>;

impl<J: Iterator> Pipeline<InfallibleLines<J>> {
    pub fn from_lines(lines: impl IntoIterator<IntoIter = J>, config: PipelineConfig) -> Self {
        let ok: fn(J::Item) -> Result<J::Item, Infallible> = Ok;
        Pipeline::new(lines.into_iter().map(ok), config)
    }
}

impl<I, S, E> Pipeline<I>
where
    I: Iterator<Item = Result<S, E>>,
    S: AsRef<[u8]>,
{
    /// Drains the pipeline. Stops at the first error of the line source.
    pub fn run(mut self) -> Result<(Vec<OutputRow>, Report), E> {
        let rows = self.by_ref().collect::<Result<Vec<_>, E>>()?;
        Ok((rows, self.report))
    }
}

impl<I, S, E> Iterator for Pipeline<I>
where
    I: Iterator<Item = Result<S, E>>,
    S: AsRef<[u8]>,
{
    type Item = Result<OutputRow, E>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let (index, line) = self.lines.next()?;
            let line = match line {
                Ok(line) => line,
                Err(e) => return Some(Err(e)),
            };
            self.report.total += 1;

            match self.process(index, line.as_ref()) {
                Outcome::Row(row) => {
                    debug!(line = index, job_id = %row.job.job_id, "row");
                    self.report.rows += 1;
                    return Some(Ok(*row));
                }
                Outcome::Skipped(reason) => {
                    debug!(line = index, %reason, "skipping line");
                    self.report.skipped.push((index, reason));
                }
                Outcome::Failed(e) => {
                    warn!(line = index, kind = %e.kind(), "skipping malformed line: {e}");
                    self.report.failures.push(e);
                }
            }
        }
    }
}
