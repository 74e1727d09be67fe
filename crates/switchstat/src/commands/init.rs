//! `switchstat init`: reset both record streams to just their headers.

use switchstat_core::{RecordStream, RecordWriter};

use crate::cli::{GlobalOpts, StreamArgs};
use crate::config::{self, Config};
use crate::error::CliError;
use crate::output;

pub fn handle(args: &StreamArgs, cfg: &Config, global: &GlobalOpts) -> Result<(), CliError> {
    let collector = config::collector_config(cfg, args, None)?;
    let writer = RecordWriter::create(&collector.flow_stats_path, &collector.port_stats_path)?;

    let text = [RecordStream::Flow, RecordStream::Port]
        .iter()
        .map(|&stream| format!("{stream}: {}", writer.path(stream).display()))
        .collect::<Vec<_>>()
        .join("\n");
    output::print_output(&text, global.quiet);
    Ok(())
}
