//! `switchstat check`: parse both streams and count records per switch.
//!
//! Any line that does not parse fails the command with a non-zero exit.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Serialize;
use tabled::Tabled;

use switchstat_core::{DatapathId, RecordStream, read_flow_records, read_port_records};

use crate::cli::{GlobalOpts, StreamArgs};
use crate::config::{self, Config};
use crate::error::CliError;
use crate::output;

#[derive(Debug, Serialize)]
struct StreamSummary {
    stream: &'static str,
    path: PathBuf,
    records: usize,
    /// Records per datapath id, keyed by the hex id.
    switches: BTreeMap<String, usize>,
}

impl StreamSummary {
    fn new(stream: RecordStream, path: PathBuf, datapaths: impl Iterator<Item = DatapathId>) -> Self {
        let mut switches = BTreeMap::new();
        let mut records = 0;
        for datapath in datapaths {
            *switches.entry(datapath.to_string()).or_insert(0) += 1;
            records += 1;
        }
        Self {
            stream: stream.into(),
            path,
            records,
            switches,
        }
    }
}

#[derive(Tabled)]
struct CheckRow {
    #[tabled(rename = "Stream")]
    stream: String,
    #[tabled(rename = "Datapath")]
    datapath: String,
    #[tabled(rename = "Records")]
    records: usize,
}

fn rows(summaries: &[StreamSummary]) -> Vec<CheckRow> {
    let mut rows = Vec::new();
    for summary in summaries {
        for (datapath, &records) in &summary.switches {
            rows.push(CheckRow {
                stream: summary.stream.into(),
                datapath: datapath.clone(),
                records,
            });
        }
        rows.push(CheckRow {
            stream: summary.stream.into(),
            datapath: "(total)".into(),
            records: summary.records,
        });
    }
    rows
}

fn plain_line(summary: &StreamSummary) -> String {
    format!(
        "{} {} records from {} switches in {}",
        summary.stream,
        summary.records,
        summary.switches.len(),
        summary.path.display()
    )
}

pub fn handle(args: &StreamArgs, cfg: &Config, global: &GlobalOpts) -> Result<(), CliError> {
    let collector = config::collector_config(cfg, args, None)?;

    let flows = read_flow_records(&collector.flow_stats_path)?;
    let ports = read_port_records(&collector.port_stats_path)?;
    tracing::debug!(flows = flows.len(), ports = ports.len(), "streams parsed");

    let summaries = [
        StreamSummary::new(
            RecordStream::Flow,
            collector.flow_stats_path.clone(),
            flows.iter().map(|r| r.datapath),
        ),
        StreamSummary::new(
            RecordStream::Port,
            collector.port_stats_path.clone(),
            ports.iter().map(|r| r.datapath),
        ),
    ];

    let text = output::render_list(global.output, &summaries, rows, plain_line)?;
    output::print_output(&text, global.quiet);
    Ok(())
}
