//! Turns `sacct --parsable2` accounting lines into per-job statistics.
//!
//! Decoders for the individual field formats live in [`duration`], [`tres`] and [`timestamp`].
//! [`record`] maps a line onto a [`JobRecord`] according to a [`Schema`], [`stats`] derives the
//! numbers and [`pipeline`] ties it together over a stream of lines.
pub mod config;
pub mod duration;
pub mod pipeline;
pub mod record;
pub mod schema;
pub mod stats;
pub mod table;
pub mod timestamp;
pub mod tres;

pub use config::{Category, CategoryRules, PipelineConfig};
pub use duration::Elapsed;
pub use pipeline::{Pipeline, Report, SkipReason};
pub use record::{ErrorKind, JobRecord, RecordParseError};
pub use schema::{Column, Layout, Schema};
pub use stats::{derive_stats, Computed, OutputRow};
pub use table::TableLayout;
pub use timestamp::Timestamp;
pub use tres::Allocation;
