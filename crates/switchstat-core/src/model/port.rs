use serde::{Deserialize, Serialize};

use super::ids::{DatapathId, PortNo};

/// Per-port counters from a port-stats reply body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortStatsEntry {
    pub port_no: PortNo,
    pub rx_packets: u64,
    pub rx_bytes: u64,
    pub rx_errors: u64,
    pub tx_packets: u64,
    pub tx_bytes: u64,
    pub tx_errors: u64,
}

impl PortStatsEntry {
    pub fn new(port_no: impl Into<PortNo>) -> Self {
        Self {
            port_no: port_no.into(),
            ..Self::default()
        }
    }
}

/// Port-stats reply as delivered by the event bus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortStatsReply {
    pub datapath: DatapathId,
    pub body: Vec<PortStatsEntry>,
}
