use std::io::Write;

use color_eyre::{eyre::WrapErr as _, Result};
use csv::{Terminator, WriterBuilder};
use sacct_data::{OutputRow, TableLayout};

/// Comma separated, RFC 4180 quoting, one record per `\n` terminated line.
pub struct CsvSink<W: Write> {
    writer: csv::Writer<W>,
    layout: TableLayout,
    rows: usize,
}

impl<W: Write> CsvSink<W> {
    pub fn new(out: W, layout: TableLayout, header: bool) -> Result<Self> {
        let mut writer = WriterBuilder::new().terminator(Terminator::Any(b'\n')).from_writer(out);
        if header {
            writer.write_record(layout.header()).wrap_err("writing header row")?;
        }
        Ok(Self { writer, layout, rows: 0 })
    }

    pub fn write(&mut self, row: &OutputRow) -> Result<()> {
        self.writer
            .write_record(self.layout.row(row))
            .wrap_err_with(|| format!("writing row for job {}", row.job.job_id))?;
        self.rows += 1;
        Ok(())
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn finish(self) -> Result<W> {
        self.writer.into_inner().map_err(|e| e.into_error()).wrap_err("flushing output")
    }
}
