use std::{num::ParseIntError, str::Utf8Error};

use chrono::NaiveDateTime;
use derive_more::derive::{Deref, Display, Into};
use itertools::Itertools as _;
use serde::Serialize;
use thiserror::Error;
use tracing::trace;

use crate::{
    config::PipelineConfig,
    duration::{DurationError, Elapsed},
    schema::{Column, Schema},
    timestamp::{Timestamp, TimestampError},
    tres::{Allocation, AllocationError},
};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Deref, Into, Display, Serialize)]
pub struct SlurmUser(pub String);

/// One accounting line, decoded.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct JobRecord {
    pub job_id: String,
    pub job_name: String,
    pub user: SlurmUser,
    pub account: String,
    pub partition: String,
    pub elapsed: Elapsed,
    pub nodes: u32,
    pub cpus: u32,
    pub tres: Allocation,
    pub submit: Timestamp,
    pub start: Timestamp,
    /// [`Timestamp::Unset`] when the input layout has no `End` column.
    pub end: Timestamp,
    pub node_list: String,
}

/// Flat classification of everything that can go wrong with a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize)]
pub enum ErrorKind {
    FieldCountMismatch,
    MalformedDuration,
    MalformedAllocation,
    MalformedResourceValue,
    MalformedTimestamp,
    MalformedCount,
    StartAfterEnd,
    MalformedEncoding,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldError {
    #[error(transparent)]
    Duration(#[from] DurationError),
    #[error(transparent)]
    Allocation(#[from] AllocationError),
    #[error(transparent)]
    Timestamp(#[from] TimestampError),
    #[error("`{input}` is not a count ({cause})")]
    Count {
        input: String,
        #[source]
        cause: ParseIntError,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordError {
    #[error("expected {expected} fields, found {found}")]
    FieldCountMismatch { expected: usize, found: usize },
    #[error("{column}: {cause}")]
    Field {
        column: Column,
        #[source]
        cause: FieldError,
    },
    #[error("start {start} is after end {end}")]
    StartAfterEnd { start: NaiveDateTime, end: NaiveDateTime },
    #[error("not valid UTF-8 ({0})")]
    Encoding(#[source] Utf8Error),
}

/// A line that didn't make it into the output, with the (0-based) index of the line.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("line {line}: {cause}")]
pub struct RecordParseError {
    pub line: usize,
    #[source]
    pub cause: RecordError,
}

impl RecordParseError {
    pub fn kind(&self) -> ErrorKind {
        match &self.cause {
            RecordError::FieldCountMismatch { .. } => ErrorKind::FieldCountMismatch,
            RecordError::StartAfterEnd { .. } => ErrorKind::StartAfterEnd,
            RecordError::Encoding(_) => ErrorKind::MalformedEncoding,
            RecordError::Field { cause, .. } => match cause {
                FieldError::Duration(_) => ErrorKind::MalformedDuration,
                FieldError::Allocation(AllocationError::MalformedValue { .. }) => ErrorKind::MalformedResourceValue,
                FieldError::Allocation(_) => ErrorKind::MalformedAllocation,
                FieldError::Timestamp(_) => ErrorKind::MalformedTimestamp,
                FieldError::Count { .. } => ErrorKind::MalformedCount,
            },
        }
    }

    /// Column the failure happened in, if it is local to one field.
    pub fn column(&self) -> Option<Column> {
        match &self.cause {
            RecordError::Field { column, .. } => Some(*column),
            _ => None,
        }
    }
}

/// Splits `line` on the configured delimiter. A trailing delimiter (sacct `--parsable`) is dropped
/// when allowed and the field count says so.
pub fn split_fields<'l>(line: &'l str, config: &PipelineConfig) -> Vec<&'l str> {
    let mut fields = line.split(config.delimiter).collect_vec();
    if config.allow_trailing_delimiter
        && fields.len() == config.schema.len() + 1
        && fields.last().is_some_and(|last| last.trim().is_empty())
    {
        fields.pop();
    }
    fields
}

impl JobRecord {
    /// Decodes one raw line. `line_index` only ends up in the error.
    pub fn parse(line: &str, line_index: usize, config: &PipelineConfig) -> Result<Self, RecordParseError> {
        let fields = split_fields(line, config);
        Self::from_fields(&fields, &config.schema, &config.tracked_resources).map_err(|cause| RecordParseError {
            line: line_index,
            cause,
        })
    }

    /// Maps positional fields onto a record. Tracked resources, when present, have to hold a plain
    /// integer count.
    pub fn from_fields(fields: &[&str], schema: &Schema, tracked_resources: &[String]) -> Result<Self, RecordError> {
        if fields.len() != schema.len() {
            return Err(RecordError::FieldCountMismatch {
                expected: schema.len(),
                found: fields.len(),
            });
        }

        let mut record = JobRecord::default();
        for (&column, raw) in schema.iter().zip(fields) {
            record
                .set(column, raw.trim(), tracked_resources)
                .map_err(|cause| RecordError::Field { column, cause })?;
        }

        if let (Timestamp::At(start), Timestamp::At(end)) = (record.start, record.end) {
            if start > end {
                return Err(RecordError::StartAfterEnd { start, end });
            }
        }

        trace!(job_id = %record.job_id, "parsed record");
        Ok(record)
    }

    fn set(&mut self, column: Column, value: &str, tracked_resources: &[String]) -> Result<(), FieldError> {
        fn count(input: &str) -> Result<u32, FieldError> {
            input.parse().map_err(|cause| FieldError::Count {
                input: input.to_owned(),
                cause,
            })
        }

        match column {
            Column::JobId => self.job_id = value.to_owned(),
            Column::JobName => self.job_name = value.to_owned(),
            Column::User => self.user = SlurmUser(value.to_owned()),
            Column::Account => self.account = value.to_owned(),
            Column::Partition => self.partition = value.to_owned(),
            Column::Elapsed => self.elapsed = Elapsed::parse(value)?,
            Column::NNodes => self.nodes = count(value)?,
            Column::NCpus => self.cpus = count(value)?,
            Column::AllocTres => {
                let tres = Allocation::parse(value)?;
                for key in tracked_resources {
                    tres.plain_count(key)?;
                }
                self.tres = tres;
            }
            Column::Submit => self.submit = Timestamp::parse(value)?,
            Column::Start => self.start = Timestamp::parse(value)?,
            Column::End => self.end = Timestamp::parse(value)?,
            Column::NodeList => self.node_list = value.to_owned(),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Layout;

    const LINE: &str = "29148459_925|ld_stats_array|akapoor|kernlab|kern|00:07:23|1|8|billing=8,cpu=8,mem=64G,node=1|2025-02-03T23:38:14|2025-02-03T23:53:21|n0335";
    const LINE_WITH_END: &str = "29148459_925|ld_stats_array|akapoor|kernlab|kern|00:07:23|1|8|billing=8,cpu=8,mem=64G,node=1,gres/gpu=4|2025-02-03T23:38:14|2025-02-03T23:53:21|2025-02-04T00:00:44|n0335";

    fn config(layout: Layout) -> PipelineConfig {
        PipelineConfig::from(layout.schema())
    }

    #[test]
    fn test_parse_line() {
        let job = JobRecord::parse(LINE, 0, &config(Layout::WithoutEnd)).unwrap();
        assert_eq!(job.job_id, "29148459_925");
        assert_eq!(job.job_name, "ld_stats_array");
        assert_eq!(*job.user, "akapoor");
        assert_eq!(job.account, "kernlab");
        assert_eq!(job.partition, "kern");
        assert_eq!(job.elapsed, Elapsed(443));
        assert_eq!(job.nodes, 1);
        assert_eq!(job.cpus, 8);
        assert_eq!(job.tres.raw(), "billing=8,cpu=8,mem=64G,node=1");
        assert_eq!(job.submit.to_string(), "2025-02-03T23:38:14");
        assert_eq!(job.start.to_string(), "2025-02-03T23:53:21");
        assert_eq!(job.end, Timestamp::Unset);
        assert_eq!(job.node_list, "n0335");
    }

    #[test]
    fn test_parse_line_with_end() {
        let job = JobRecord::parse(LINE_WITH_END, 0, &config(Layout::WithEnd)).unwrap();
        assert_eq!(job.end.to_string(), "2025-02-04T00:00:44");
        assert_eq!(job.tres.count("gres/gpu").unwrap(), Some(4));
        assert_eq!(job.node_list, "n0335");
    }

    #[test]
    fn test_layout_mismatch_is_not_guessed() {
        let err = JobRecord::parse(LINE_WITH_END, 3, &config(Layout::WithoutEnd)).unwrap_err();
        assert_eq!(err.line, 3);
        assert_eq!(err.kind(), ErrorKind::FieldCountMismatch);
        assert_eq!(
            err.cause,
            RecordError::FieldCountMismatch {
                expected: 12,
                found: 13
            }
        );

        let err = JobRecord::parse(LINE, 0, &config(Layout::WithEnd)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::FieldCountMismatch);
    }

    #[test]
    fn test_trailing_delimiter() {
        let line = format!("{LINE}|");
        assert!(JobRecord::parse(&line, 0, &config(Layout::WithoutEnd)).is_ok());

        let mut strict = config(Layout::WithoutEnd);
        strict.allow_trailing_delimiter = false;
        assert_eq!(
            JobRecord::parse(&line, 0, &strict).unwrap_err().kind(),
            ErrorKind::FieldCountMismatch
        );
    }

    #[test]
    fn test_fields_are_trimmed() {
        let line = LINE.replace('|', " | ");
        let job = JobRecord::parse(&line, 0, &config(Layout::WithoutEnd)).unwrap();
        assert_eq!(job.job_id, "29148459_925");
        assert_eq!(job.cpus, 8);
    }

    #[test]
    fn test_error_kinds() {
        let cfg = config(Layout::WithoutEnd);
        let cases = [
            (LINE.replace("00:07:23", "7 minutes"), ErrorKind::MalformedDuration, Some(Column::Elapsed)),
            (LINE.replace("|1|8|", "|one|8|"), ErrorKind::MalformedCount, Some(Column::NNodes)),
            (LINE.replace("|1|8|", "|1|-8|"), ErrorKind::MalformedCount, Some(Column::NCpus)),
            (LINE.replace("node=1", "node"), ErrorKind::MalformedAllocation, Some(Column::AllocTres)),
            (LINE.replace("node=1", "node=1,gres/gpu=two"), ErrorKind::MalformedResourceValue, Some(Column::AllocTres)),
            (LINE.replace("node=1", "node=1,gres/gpu=2K"), ErrorKind::MalformedResourceValue, Some(Column::AllocTres)),
            (LINE.replace("2025-02-03T23:38:14", "03.02.2025"), ErrorKind::MalformedTimestamp, Some(Column::Submit)),
            (LINE.replace("|n0335", ""), ErrorKind::FieldCountMismatch, None),
        ];
        for (line, kind, column) in cases {
            let err = JobRecord::parse(&line, 7, &cfg).unwrap_err();
            assert_eq!(err.kind(), kind, "{line}");
            assert_eq!(err.column(), column, "{line}");
            assert!(err.to_string().starts_with("line 7: "), "{err}");
        }
    }

    #[test]
    fn test_unset_timestamps_are_fine() {
        let line = LINE
            .replace("2025-02-03T23:53:21", "Unknown")
            .replace("billing=8,cpu=8,mem=64G,node=1", "");
        let job = JobRecord::parse(&line, 0, &config(Layout::WithoutEnd)).unwrap();
        assert_eq!(job.start, Timestamp::Unset);
        assert!(job.tres.is_empty());
    }

    #[test]
    fn test_start_after_end() {
        let line = LINE_WITH_END.replace("2025-02-04T00:00:44", "2025-02-03T23:00:00");
        let err = JobRecord::parse(&line, 0, &config(Layout::WithEnd)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StartAfterEnd);
    }
}
