use std::{env, path::Path};

use color_eyre::{
    eyre::{bail, eyre, WrapErr as _},
    Result,
};
use config::{Config, ConfigError, Environment, File};
use sacct_data::{
    config::{DEFAULT_DELIMITER, DEFAULT_NOT_COMPUTABLE},
    tres::GPU,
    CategoryRules, Layout, PipelineConfig, Schema,
};
use serde::Deserialize;
use tracing::{debug, info};

use crate::cli::Args;

const ENV_PREFIX: &str = "SACCT_STATS";

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Settings {
    pub layout: Option<Layout>,
    pub columns: Option<Schema>,
    pub delimiter: String,
    pub allow_trailing_delimiter: bool,
    pub skip_blank: bool,
    pub skip_header: bool,
    pub skip_zero_elapsed: bool,
    pub tracked_resources: Vec<String>,
    pub categories: CategoryRules,
    pub not_computable: String,
}

impl Settings {
    /// defaults < config file < `SACCT_STATS_*` environment
    ///
    /// Without an explicit `config_file`, `config/default` and `config/$RUN_MODE` are read if they
    /// exist.
    pub fn new(config_file: Option<&Path>) -> Result<Self, ConfigError> {
        let defaults = CategoryRules::default();
        let mut builder = Config::builder()
            .set_default("delimiter", DEFAULT_DELIMITER.to_string())?
            .set_default("allow_trailing_delimiter", true)?
            .set_default("skip_blank", true)?
            .set_default("skip_header", true)?
            .set_default("skip_zero_elapsed", false)?
            .set_default("tracked_resources", vec![GPU.to_owned()])?
            .set_default("categories.open_use", defaults.open_use)?
            .set_default("categories.donated", defaults.donated)?
            .set_default("not_computable", DEFAULT_NOT_COMPUTABLE.to_owned())?;

        builder = match config_file {
            Some(path) => builder.add_source(File::from(path)),
            None => {
                let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "default".into());
                builder
                    .add_source(File::with_name("config/default").required(false))
                    .add_source(File::with_name(&format!("config/{run_mode}")).required(false))
            }
        };

        builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("columns")
                    .with_list_parse_key("tracked_resources"),
            )
            .build()?
            .try_deserialize()
    }

    /// Command line beats everything else. A layout given on the command line replaces a column
    /// list from the config and vice versa.
    pub fn apply_args(&mut self, args: &Args) {
        if let Some(layout) = args.layout {
            self.layout = Some(layout);
            self.columns = None;
        }
        if let Some(columns) = &args.columns {
            self.columns = Some(columns.clone());
            self.layout = None;
        }
        if let Some(delimiter) = args.delimiter {
            self.delimiter = delimiter.to_string();
        }
        if let Some(not_computable) = &args.not_computable {
            self.not_computable = not_computable.clone();
        }
        if args.skip_zero_elapsed {
            self.skip_zero_elapsed = true;
        }
    }

    pub fn into_pipeline_config(self) -> Result<PipelineConfig> {
        let schema = match (self.columns, self.layout) {
            (Some(_), Some(_)) => bail!("both `columns` and `layout` are configured, pick one"),
            (Some(columns), None) => columns,
            (None, Some(layout)) => layout.schema(),
            (None, None) => bail!(
                "no input layout configured: pass --layout (without-end|with-end) or --columns, \
                 or set `layout`/`columns` in the config file"
            ),
        };

        let mut delimiter = self.delimiter.chars();
        let delimiter = match (delimiter.next(), delimiter.next()) {
            (Some(c), None) => c,
            _ => return Err(eyre!("delimiter must be a single character, got {:?}", self.delimiter)),
        };

        Ok(PipelineConfig {
            schema,
            delimiter,
            allow_trailing_delimiter: self.allow_trailing_delimiter,
            skip_blank: self.skip_blank,
            skip_header: self.skip_header,
            skip_zero_elapsed: self.skip_zero_elapsed,
            tracked_resources: self.tracked_resources,
            categories: self.categories,
            not_computable: self.not_computable,
        })
    }
}

pub fn read_config(args: &Args) -> Result<PipelineConfig> {
    info!("Loading config");
    let mut settings = Settings::new(args.config.as_deref()).wrap_err("parsing config file")?;
    settings.apply_args(args);
    debug!(?settings, "effective settings");
    let config = settings.into_pipeline_config()?;
    info!(schema = %config.schema, "input layout");
    Ok(config)
}
