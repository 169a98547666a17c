mod cli;
mod output;
mod settings;

use std::{
    fs::File,
    io::{self, BufRead, BufReader, BufWriter, Write},
    path::Path,
};

use clap::Parser as _;
use cli::Args;
use color_eyre::{
    eyre::{eyre, WrapErr as _},
    Result,
};
use output::CsvSink;
use sacct_data::{Pipeline, PipelineConfig, Report, TableLayout};
use tracing::{info, instrument, Level};

fn main() -> Result<()> {
    color_eyre::install()?;
    let args = Args::parse();
    register_logging(args.log_level)?;

    let config = settings::read_config(&args)?;
    let report = run(&args, config)?;

    report.log_summary();
    if !report.is_clean() || !report.skipped.is_empty() {
        eprint!("{report}");
    }
    Ok(())
}

fn register_logging(level: Option<Level>) -> Result<()> {
    // stdout may well be the CSV, so everything goes to stderr
    let subscriber = tracing_subscriber::FmtSubscriber::builder()
        .with_max_level(level.unwrap_or(Level::INFO))
        .with_writer(io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber).wrap_err("setting default subscriber failed")
}

fn is_std_stream(path: Option<&Path>) -> bool {
    path.map_or(true, |path| path.as_os_str() == "-")
}

#[instrument(skip_all)]
fn run(args: &Args, config: PipelineConfig) -> Result<Report> {
    let input: Box<dyn BufRead> = if is_std_stream(args.input.as_deref()) {
        info!("reading from stdin");
        Box::new(io::stdin().lock())
    } else {
        let path = args.input.as_deref().ok_or_else(|| eyre!("no input path"))?;
        info!(path = %path.display(), "reading");
        Box::new(BufReader::new(
            File::open(path).wrap_err_with(|| format!("opening {}", path.display()))?,
        ))
    };

    let output: Box<dyn Write> = if is_std_stream(args.output.as_deref()) {
        Box::new(io::stdout().lock())
    } else {
        let path = args.output.as_deref().ok_or_else(|| eyre!("no output path"))?;
        info!(path = %path.display(), "writing");
        Box::new(BufWriter::new(
            File::create(path).wrap_err_with(|| format!("creating {}", path.display()))?,
        ))
    };

    convert(input, output, config, !args.no_header)
}

/// Streams `input` through the pipeline into a CSV table on `output`. Only I/O errors are fatal, a
/// line that isn't UTF-8 is just malformed.
fn convert(input: impl BufRead, output: impl Write, config: PipelineConfig, header: bool) -> Result<Report> {
    let mut sink = CsvSink::new(output, TableLayout::new(&config), header)?;
    let mut pipeline = Pipeline::new(input.split(b'\n'), config);

    for row in pipeline.by_ref() {
        sink.write(&row.wrap_err("reading input")?)?;
    }
    let rows = sink.rows();
    sink.finish()?.flush().wrap_err("flushing output")?;

    let report = pipeline.into_report();
    debug_assert_eq!(rows, report.rows);
    Ok(report)
}
