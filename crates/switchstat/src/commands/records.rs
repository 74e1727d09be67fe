//! `switchstat records <flow|port>`: print one stream's records.

use chrono::{DateTime, SecondsFormat, Utc};
use tabled::Tabled;

use switchstat_core::{
    DatapathId, FlowStatRecord, PortNo, PortStatRecord, read_flow_records, read_port_records,
};

use crate::cli::{GlobalOpts, RecordsArgs, StreamKind};
use crate::config::{self, Config};
use crate::error::CliError;
use crate::output;

// ── Row types ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct FlowRow {
    #[tabled(rename = "Time")]
    time: String,
    #[tabled(rename = "Datapath")]
    datapath: String,
    #[tabled(rename = "In")]
    in_port: String,
    #[tabled(rename = "Eth Dst")]
    eth_dst: String,
    #[tabled(rename = "Out")]
    out_port: String,
    #[tabled(rename = "Packets")]
    packets: u64,
    #[tabled(rename = "Bytes")]
    bytes: u64,
}

impl From<&FlowStatRecord> for FlowRow {
    fn from(r: &FlowStatRecord) -> Self {
        Self {
            time: time_cell(r.timestamp),
            datapath: r.datapath.to_string(),
            in_port: port_cell(r.in_port),
            eth_dst: r.eth_dst.to_string(),
            out_port: port_cell(r.out_port),
            packets: r.packets,
            bytes: r.bytes,
        }
    }
}

#[derive(Tabled)]
struct PortRow {
    #[tabled(rename = "Time")]
    time: String,
    #[tabled(rename = "Datapath")]
    datapath: String,
    #[tabled(rename = "Port")]
    port_no: String,
    #[tabled(rename = "Rx Pkts")]
    rx_packets: u64,
    #[tabled(rename = "Rx Bytes")]
    rx_bytes: u64,
    #[tabled(rename = "Rx Err")]
    rx_errors: u64,
    #[tabled(rename = "Tx Pkts")]
    tx_packets: u64,
    #[tabled(rename = "Tx Bytes")]
    tx_bytes: u64,
    #[tabled(rename = "Tx Err")]
    tx_errors: u64,
}

impl From<&PortStatRecord> for PortRow {
    fn from(r: &PortStatRecord) -> Self {
        Self {
            time: time_cell(r.timestamp),
            datapath: r.datapath.to_string(),
            port_no: port_cell(r.port_no),
            rx_packets: r.rx_packets,
            rx_bytes: r.rx_bytes,
            rx_errors: r.rx_errors,
            tx_packets: r.tx_packets,
            tx_bytes: r.tx_bytes,
            tx_errors: r.tx_errors,
        }
    }
}

fn time_cell(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn port_cell(port: PortNo) -> String {
    match port {
        PortNo::LOCAL => "LOCAL".into(),
        PortNo::CONTROLLER => "CONTROLLER".into(),
        PortNo::FLOOD => "FLOOD".into(),
        other => other.to_string(),
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(args: &RecordsArgs, cfg: &Config, global: &GlobalOpts) -> Result<(), CliError> {
    let collector = config::collector_config(cfg, &args.streams, None)?;
    let wanted = args.datapath.map(DatapathId);
    let keep = |datapath: DatapathId| wanted.is_none_or(|w| w == datapath);

    let text = match args.stream {
        StreamKind::Flow => {
            let mut records = read_flow_records(&collector.flow_stats_path)?;
            records.retain(|r| keep(r.datapath));
            output::render_list(
                global.output,
                &records,
                |rs| rs.iter().map(FlowRow::from).collect::<Vec<_>>(),
                ToString::to_string,
            )?
        }
        StreamKind::Port => {
            let mut records = read_port_records(&collector.port_stats_path)?;
            records.retain(|r| keep(r.datapath));
            output::render_list(
                global.output,
                &records,
                |rs| rs.iter().map(PortRow::from).collect::<Vec<_>>(),
                ToString::to_string,
            )?
        }
    };
    output::print_output(&text, global.quiet);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserved_ports_get_names() {
        assert_eq!(port_cell(PortNo::LOCAL), "LOCAL");
        assert_eq!(port_cell(PortNo(3)), "3");
    }
}
