//! Which sacct columns a line holds, and in which order.
//!
//! sacct itself decides nothing here: the caller asked for `--format=...` and has to tell us what
//! it asked for. There is deliberately no default layout.
use std::{fmt, str::FromStr};

use derive_more::derive::Deref;
use itertools::Itertools as _;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Column {
    #[serde(rename = "JobID", alias = "job_id")]
    JobId,
    #[serde(rename = "JobName", alias = "job_name")]
    JobName,
    #[serde(rename = "User", alias = "username")]
    User,
    #[serde(rename = "Account", alias = "account")]
    Account,
    #[serde(rename = "Partition", alias = "partition")]
    Partition,
    #[serde(rename = "Elapsed", alias = "elapsed")]
    Elapsed,
    #[serde(rename = "NNodes", alias = "nodes")]
    NNodes,
    #[serde(rename = "NCPUS", alias = "cpus")]
    NCpus,
    #[serde(rename = "AllocTRES", alias = "tres")]
    AllocTres,
    #[serde(rename = "Submit", alias = "submit_time")]
    Submit,
    #[serde(rename = "Start", alias = "start_time")]
    Start,
    #[serde(rename = "End", alias = "end_time")]
    End,
    #[serde(rename = "NodeList", alias = "nodelist")]
    NodeList,
}

impl Column {
    pub const ALL: [Column; 13] = [
        Column::JobId,
        Column::JobName,
        Column::User,
        Column::Account,
        Column::Partition,
        Column::Elapsed,
        Column::NNodes,
        Column::NCpus,
        Column::AllocTres,
        Column::Submit,
        Column::Start,
        Column::End,
        Column::NodeList,
    ];

    /// Columns a record can't be built without. `End` is the only optional one.
    pub fn is_required(self) -> bool {
        self != Column::End
    }

    /// Name as used in `sacct --format` and in sacct's own header line.
    pub fn sacct_name(self) -> &'static str {
        match self {
            Column::JobId => "JobID",
            Column::JobName => "JobName",
            Column::User => "User",
            Column::Account => "Account",
            Column::Partition => "Partition",
            Column::Elapsed => "Elapsed",
            Column::NNodes => "NNodes",
            Column::NCpus => "NCPUS",
            Column::AllocTres => "AllocTRES",
            Column::Submit => "Submit",
            Column::Start => "Start",
            Column::End => "End",
            Column::NodeList => "NodeList",
        }
    }

    /// Name of the column in the output table.
    pub fn output_name(self) -> &'static str {
        match self {
            Column::JobId => "job_id",
            Column::JobName => "job_name",
            Column::User => "username",
            Column::Account => "account",
            Column::Partition => "partition",
            Column::Elapsed => "elapsed",
            Column::NNodes => "nodes",
            Column::NCpus => "cpus",
            Column::AllocTres => "tres",
            Column::Submit => "submit_time",
            Column::Start => "start_time",
            Column::End => "end_time",
            Column::NodeList => "nodelist",
        }
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.sacct_name())
    }
}

impl FromStr for Column {
    type Err = SchemaError;

    /// Accepts sacct names (case-insensitive, like sacct does) and output names.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Column::ALL
            .into_iter()
            .find(|column| column.sacct_name().eq_ignore_ascii_case(s) || column.output_name() == s)
            .ok_or_else(|| SchemaError::UnknownColumn(s.to_owned()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("unknown column `{0}`")]
    UnknownColumn(String),
    #[error("column {0} listed more than once")]
    Duplicate(Column),
    #[error("required column(s) missing: {}", .0.iter().join(", "))]
    Missing(Vec<Column>),
    #[error("unknown layout `{0}` (expected `without-end` or `with-end`)")]
    UnknownLayout(String),
}

/// The two layouts the accounting scripts have been run with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Layout {
    /// `JobID|JobName|User|Account|Partition|Elapsed|NNodes|NCPUS|AllocTRES|Submit|Start|NodeList`
    WithoutEnd,
    /// Same, with `End` between `Start` and `NodeList`
    WithEnd,
}

impl Layout {
    pub fn schema(self) -> Schema {
        let columns = Column::ALL.into_iter();
        Schema(match self {
            Layout::WithoutEnd => columns.filter(|c| *c != Column::End).collect(),
            Layout::WithEnd => columns.collect(),
        })
    }
}

impl FromStr for Layout {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "without-end" => Ok(Layout::WithoutEnd),
            "with-end" => Ok(Layout::WithEnd),
            other => Err(SchemaError::UnknownLayout(other.to_owned())),
        }
    }
}

/// Ordered list of input columns. Every required column appears exactly once.
#[derive(Debug, Clone, PartialEq, Eq, Deref, Serialize, Deserialize)]
#[serde(try_from = "Vec<Column>", into = "Vec<Column>")]
pub struct Schema(Vec<Column>);

impl Schema {
    pub fn new(columns: Vec<Column>) -> Result<Self, SchemaError> {
        if let Some(duplicate) = columns.iter().duplicates().next() {
            return Err(SchemaError::Duplicate(*duplicate));
        }
        let missing = Column::ALL
            .into_iter()
            .filter(|column| column.is_required() && !columns.contains(column))
            .collect_vec();
        if !missing.is_empty() {
            return Err(SchemaError::Missing(missing));
        }
        Ok(Schema(columns))
    }

    pub fn position(&self, column: Column) -> Option<usize> {
        self.0.iter().position(|c| *c == column)
    }

    pub fn contains(&self, column: Column) -> bool {
        self.0.contains(&column)
    }

    /// True for sacct's own header line, e.g. `JobID|JobName|...`.
    pub fn is_header<'a>(&self, mut fields: impl Iterator<Item = &'a str>) -> bool {
        self.0
            .first()
            .zip(fields.next())
            .is_some_and(|(column, field)| field.trim().eq_ignore_ascii_case(column.sacct_name()))
    }
}

impl TryFrom<Vec<Column>> for Schema {
    type Error = SchemaError;

    fn try_from(value: Vec<Column>) -> Result<Self, Self::Error> {
        Schema::new(value)
    }
}

impl From<Schema> for Vec<Column> {
    fn from(value: Schema) -> Self {
        value.0
    }
}

impl From<Layout> for Schema {
    fn from(value: Layout) -> Self {
        value.schema()
    }
}

/// Comma (or `|`) separated column names, the way they'd be passed to `sacct --format`.
impl FromStr for Schema {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.split([',', '|'])
            .filter(|name| !name.trim().is_empty())
            .map(Column::from_str)
            .process_results(|columns| columns.collect_vec())
            .and_then(Schema::new)
    }
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.iter().join("|"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layouts() {
        assert_eq!(Layout::WithoutEnd.schema().len(), 12);
        assert_eq!(Layout::WithEnd.schema().len(), 13);
        assert_eq!(
            Layout::WithoutEnd.schema().to_string(),
            "JobID|JobName|User|Account|Partition|Elapsed|NNodes|NCPUS|AllocTRES|Submit|Start|NodeList"
        );
        assert_eq!(Layout::WithEnd.schema().position(Column::End), Some(11));
        assert_eq!(Layout::WithEnd.schema().position(Column::NodeList), Some(12));
    }

    #[test]
    fn test_parse_column_list() {
        let schema: Schema = "jobid,JobName,User,Account,Partition,Elapsed,NNodes,NCPUS,AllocTRES,Submit,Start,End,NodeList"
            .parse()
            .unwrap();
        assert_eq!(schema, Layout::WithEnd.schema());

        // reordering is fine
        let schema: Schema = "NodeList|JobID|JobName|User|Account|Partition|Elapsed|NNodes|NCPUS|AllocTRES|Submit|Start"
            .parse()
            .unwrap();
        assert_eq!(schema.position(Column::NodeList), Some(0));
    }

    #[test]
    fn test_parse_rejects_bad_lists() {
        assert!(matches!("JobID,Bogus".parse::<Schema>(), Err(SchemaError::UnknownColumn(c)) if c == "Bogus"));
        assert!(matches!(
            "JobID,JobID".parse::<Schema>(),
            Err(SchemaError::Duplicate(Column::JobId))
        ));
        assert!(matches!(
            "JobID,JobName,User,Account,Partition,Elapsed,NNodes,NCPUS,Submit,Start,NodeList".parse::<Schema>(),
            Err(SchemaError::Missing(missing)) if missing == vec![Column::AllocTres]
        ));
    }

    #[test]
    fn test_layout_from_str() {
        assert_eq!("with-end".parse::<Layout>().unwrap(), Layout::WithEnd);
        assert!("both".parse::<Layout>().is_err());
    }

    #[test]
    fn test_deserialize_validates() {
        let schema: Schema = serde_json::from_str(
            r#"["JobID","JobName","User","Account","Partition","Elapsed","NNodes","NCPUS","AllocTRES","Submit","Start","NodeList"]"#,
        )
        .unwrap();
        assert_eq!(schema, Layout::WithoutEnd.schema());
        assert!(serde_json::from_str::<Schema>(r#"["JobID"]"#).is_err());
    }

    #[test]
    fn test_is_header() {
        let schema = Layout::WithoutEnd.schema();
        assert!(schema.is_header("JobID|JobName".split('|')));
        assert!(!schema.is_header("29148459_925|ld_stats_array".split('|')));
    }
}
