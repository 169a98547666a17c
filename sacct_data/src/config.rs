use derive_builder::Builder;
use serde::{Deserialize, Serialize};

use crate::{schema::Schema, tres::GPU};

pub const DEFAULT_DELIMITER: char = '|';
pub const DEFAULT_NOT_COMPUTABLE: &str = "NA";

/// Everything the pipeline needs to know about its input and output. Passed in explicitly, never
/// read from the environment by the library.
#[derive(Debug, Clone, PartialEq, Eq, Builder, Serialize, Deserialize)]
#[builder(setter(into))]
pub struct PipelineConfig {
    /// Input columns in order. No default: the caller has to say which layout it asked sacct for.
    pub schema: Schema,
    #[builder(default = "DEFAULT_DELIMITER")]
    #[serde(default = "default_delimiter")]
    pub delimiter: char,
    /// `sacct --parsable` (as opposed to `--parsable2`) ends every line with the delimiter.
    #[builder(default = "true")]
    #[serde(default = "default_true")]
    pub allow_trailing_delimiter: bool,
    /// Skip empty (or whitespace) lines instead of reporting them as malformed.
    #[builder(default = "true")]
    #[serde(default = "default_true")]
    pub skip_blank: bool,
    /// Skip sacct's own header line instead of reporting it as malformed.
    #[builder(default = "true")]
    #[serde(default = "default_true")]
    pub skip_header: bool,
    #[builder(default)]
    #[serde(default)]
    pub skip_zero_elapsed: bool,
    /// Allocation keys that get their own `<key>_seconds`/`<key>_hours` columns.
    #[builder(default = "vec![GPU.to_owned()]")]
    #[serde(default = "default_tracked_resources")]
    pub tracked_resources: Vec<String>,
    #[builder(default)]
    #[serde(default)]
    pub categories: CategoryRules,
    /// Cell text for values that can't be computed, e.g. a queue wait without start time.
    #[builder(default = "DEFAULT_NOT_COMPUTABLE.to_owned()")]
    #[serde(default = "default_not_computable")]
    pub not_computable: String,
}

impl PipelineConfig {
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder::default()
    }
}

impl From<Schema> for PipelineConfig {
    fn from(schema: Schema) -> Self {
        PipelineConfig {
            schema,
            delimiter: DEFAULT_DELIMITER,
            allow_trailing_delimiter: true,
            skip_blank: true,
            skip_header: true,
            skip_zero_elapsed: false,
            tracked_resources: default_tracked_resources(),
            categories: CategoryRules::default(),
            not_computable: default_not_computable(),
        }
    }
}

/// How partitions map to a [`Category`]. Anything not listed is [`Category::Condo`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CategoryRules {
    pub open_use: Vec<String>,
    pub donated: Vec<String>,
}

impl Default for CategoryRules {
    fn default() -> Self {
        Self {
            open_use: Vec::new(),
            donated: vec!["preempt".to_owned()],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, derive_more::Display, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    #[display("open_use")]
    OpenUse,
    #[display("donated")]
    Donated,
    #[display("condo")]
    Condo,
}

impl CategoryRules {
    pub fn categorize(&self, partition: &str) -> Category {
        if self.open_use.iter().any(|p| p == partition) {
            Category::OpenUse
        } else if self.donated.iter().any(|p| p == partition) {
            Category::Donated
        } else {
            Category::Condo
        }
    }
}

fn default_delimiter() -> char {
    DEFAULT_DELIMITER
}

fn default_true() -> bool {
    true
}

fn default_tracked_resources() -> Vec<String> {
    vec![GPU.to_owned()]
}

fn default_not_computable() -> String {
    DEFAULT_NOT_COMPUTABLE.to_owned()
}
