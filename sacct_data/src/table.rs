//! Column layout of the output table. Produces plain strings; writing them is up to the caller.
use itertools::Itertools as _;

use crate::{
    config::PipelineConfig,
    schema::Column,
    stats::{Computed, OutputRow},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputColumn {
    Input(Column),
    ElapsedSeconds,
    CpuSeconds,
    NodeSeconds,
    ResourceSeconds(String),
    QueueWaitSeconds,
    CpuHours,
    NodeHours,
    ResourceHours(String),
    QueueWaitHours,
    Category,
    EndDate,
}

/// `gres/gpu` -> `gres_gpu`
fn sanitize(resource: &str) -> String {
    resource
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .collect()
}

impl OutputColumn {
    pub fn name(&self) -> String {
        match self {
            OutputColumn::Input(column) => column.output_name().to_owned(),
            OutputColumn::ElapsedSeconds => "elapsed_seconds".to_owned(),
            OutputColumn::CpuSeconds => "cpu_seconds".to_owned(),
            OutputColumn::NodeSeconds => "node_seconds".to_owned(),
            OutputColumn::ResourceSeconds(resource) => format!("{}_seconds", sanitize(resource)),
            OutputColumn::QueueWaitSeconds => "queue_wait_seconds".to_owned(),
            OutputColumn::CpuHours => "cpu_hours".to_owned(),
            OutputColumn::NodeHours => "node_hours".to_owned(),
            OutputColumn::ResourceHours(resource) => format!("{}_hours", sanitize(resource)),
            OutputColumn::QueueWaitHours => "queue_wait_hours".to_owned(),
            OutputColumn::Category => "category".to_owned(),
            OutputColumn::EndDate => "end_date".to_owned(),
        }
    }
}

/// Fixed for a whole run, so every row has the same cells as the header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableLayout {
    columns: Vec<OutputColumn>,
    not_computable: String,
}

impl TableLayout {
    pub fn new(config: &PipelineConfig) -> Self {
        let tracked = &config.tracked_resources;
        let columns = config
            .schema
            .iter()
            .copied()
            .map(OutputColumn::Input)
            .chain([OutputColumn::ElapsedSeconds, OutputColumn::CpuSeconds, OutputColumn::NodeSeconds])
            .chain(tracked.iter().cloned().map(OutputColumn::ResourceSeconds))
            .chain([OutputColumn::QueueWaitSeconds, OutputColumn::CpuHours, OutputColumn::NodeHours])
            .chain(tracked.iter().cloned().map(OutputColumn::ResourceHours))
            .chain([OutputColumn::QueueWaitHours, OutputColumn::Category])
            .chain(config.schema.contains(Column::End).then_some(OutputColumn::EndDate))
            .collect_vec();

        Self {
            columns,
            not_computable: config.not_computable.clone(),
        }
    }

    pub fn columns(&self) -> &[OutputColumn] {
        &self.columns
    }

    pub fn header(&self) -> Vec<String> {
        self.columns.iter().map(OutputColumn::name).collect()
    }

    pub fn row(&self, row: &OutputRow) -> Vec<String> {
        self.columns.iter().map(|column| self.cell(column, row)).collect()
    }

    fn cell(&self, column: &OutputColumn, row: &OutputRow) -> String {
        fn show<T: std::fmt::Display>(value: Computed<T>, marker: &str) -> String {
            value.display(marker).to_string()
        }
        let marker = self.not_computable.as_str();
        let job = &row.job;

        match column {
            // input columns are written back from their decoded values, not echoed
            OutputColumn::Input(input) => match input {
                Column::JobId => job.job_id.clone(),
                Column::JobName => job.job_name.clone(),
                Column::User => job.user.to_string(),
                Column::Account => job.account.clone(),
                Column::Partition => job.partition.clone(),
                Column::Elapsed => job.elapsed.to_string(),
                Column::NNodes => job.nodes.to_string(),
                Column::NCpus => job.cpus.to_string(),
                Column::AllocTres => job.tres.to_string(),
                Column::Submit => job.submit.to_string(),
                Column::Start => job.start.to_string(),
                Column::End => job.end.to_string(),
                Column::NodeList => job.node_list.clone(),
            },
            OutputColumn::ElapsedSeconds => job.elapsed.seconds().to_string(),
            OutputColumn::CpuSeconds => show(row.cpu_seconds, marker),
            OutputColumn::NodeSeconds => show(row.node_seconds, marker),
            OutputColumn::ResourceSeconds(resource) => show(row.resource_seconds(resource), marker),
            OutputColumn::QueueWaitSeconds => show(row.queue_wait, marker),
            OutputColumn::CpuHours => show(row.cpu_hours(), marker),
            OutputColumn::NodeHours => show(row.node_hours(), marker),
            OutputColumn::ResourceHours(resource) => show(row.resource_hours(resource), marker),
            OutputColumn::QueueWaitHours => show(row.queue_wait_hours(), marker),
            OutputColumn::Category => row.category.to_string(),
            OutputColumn::EndDate => show(row.end_date, marker),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::CategoryRules, record::JobRecord, schema::Layout, stats::derive_stats};

    const LINE_WITH_END: &str = "29148459_925|ld_stats_array|akapoor|kernlab|kern|00:07:23|1|8|billing=8,cpu=8,mem=64G,node=1,gres/gpu=4|2025-02-03T23:38:14|2025-02-03T23:53:21|2025-02-04T00:00:44|n0335";

    #[test]
    fn test_header_without_end() {
        let layout = TableLayout::new(&PipelineConfig::from(Layout::WithoutEnd.schema()));
        assert_eq!(
            layout.header().join(","),
            "job_id,job_name,username,account,partition,elapsed,nodes,cpus,tres,submit_time,start_time,nodelist,\
             elapsed_seconds,cpu_seconds,node_seconds,gres_gpu_seconds,queue_wait_seconds,\
             cpu_hours,node_hours,gres_gpu_hours,queue_wait_hours,category"
        );
    }

    #[test]
    fn test_row_matches_header() {
        let config = PipelineConfig::from(Layout::WithEnd.schema());
        let layout = TableLayout::new(&config);
        let job = JobRecord::parse(LINE_WITH_END, 0, &config).unwrap();
        let cells = layout.row(&derive_stats(job, &CategoryRules::default()));
        let header = layout.header();
        assert_eq!(cells.len(), header.len());

        let cell = |name: &str| cells[header.iter().position(|h| h == name).unwrap()].as_str();
        assert_eq!(cell("job_id"), "29148459_925");
        assert_eq!(cell("tres"), "billing=8,cpu=8,gres/gpu=4,mem=64G,node=1");
        assert_eq!(cell("end_time"), "2025-02-04T00:00:44");
        assert_eq!(cell("elapsed_seconds"), "443");
        assert_eq!(cell("cpu_seconds"), "3544");
        assert_eq!(cell("gres_gpu_seconds"), "1772");
        assert_eq!(cell("queue_wait_seconds"), "907");
        assert_eq!(cell("category"), "condo");
        assert_eq!(cell("end_date"), "2025-02-04");
    }

    #[test]
    fn test_not_computable_marker() {
        let mut config = PipelineConfig::from(Layout::WithEnd.schema());
        config.not_computable = "n/c".to_owned();
        let layout = TableLayout::new(&config);
        let line = LINE_WITH_END
            .replace(",gres/gpu=4", "")
            .replace("2025-02-03T23:53:21", "Unknown")
            .replace("2025-02-04T00:00:44", "Unknown");
        let job = JobRecord::parse(&line, 0, &config).unwrap();
        let cells = layout.row(&derive_stats(job, &CategoryRules::default()));
        let header = layout.header();
        let cell = |name: &str| cells[header.iter().position(|h| h == name).unwrap()].as_str();

        assert_eq!(cell("gres_gpu_seconds"), "n/c");
        assert_eq!(cell("gres_gpu_hours"), "n/c");
        assert_eq!(cell("queue_wait_seconds"), "n/c");
        assert_eq!(cell("end_date"), "n/c");
        assert_eq!(cell("start_time"), "");
    }

    #[test]
    fn test_input_columns_are_normalized() {
        let config = PipelineConfig::from(Layout::WithEnd.schema());
        let layout = TableLayout::new(&config);
        let line = LINE_WITH_END
            .replace("00:07:23", "07:23")
            .replace("billing=8,cpu=8,mem=64G,node=1,gres/gpu=4", "node=1, cpu=8,cpu=8")
            .replace("2025-02-03T23:38:14", "2025-02-03 23:38:14");
        let job = JobRecord::parse(&line, 0, &config).unwrap();
        let cells = layout.row(&derive_stats(job, &CategoryRules::default()));
        let header = layout.header();
        let cell = |name: &str| cells[header.iter().position(|h| h == name).unwrap()].as_str();

        assert_eq!(cell("elapsed"), "00:07:23");
        assert_eq!(cell("tres"), "cpu=8,node=1");
        assert_eq!(cell("submit_time"), "2025-02-03T23:38:14");
    }
}
