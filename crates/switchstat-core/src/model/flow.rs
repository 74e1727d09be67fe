use serde::{Deserialize, Serialize};

use super::ids::{DatapathId, MacAddress, PortNo};

/// Priority carried by learned forwarding rules. Table-miss and other
/// default rules use different priorities and are not recorded.
pub const LEARNED_FLOW_PRIORITY: u16 = 1;

/// Match fields the collector reads from a flow entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowMatch {
    pub in_port: Option<PortNo>,
    pub eth_dst: Option<MacAddress>,
}

impl FlowMatch {
    pub fn new(in_port: impl Into<PortNo>, eth_dst: impl Into<MacAddress>) -> Self {
        Self {
            in_port: Some(in_port.into()),
            eth_dst: Some(eth_dst.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    Output { port: PortNo, max_len: u16 },
    SetQueue { queue_id: u32 },
    Group { group_id: u32 },
    Other { kind: String },
}

impl Action {
    pub fn output(port: impl Into<PortNo>) -> Self {
        Self::Output {
            port: port.into(),
            max_len: 0xffe5,
        }
    }

    pub fn kind(&self) -> &str {
        match self {
            Self::Output { .. } => "output",
            Self::SetQueue { .. } => "set_queue",
            Self::Group { .. } => "group",
            Self::Other { kind } => kind,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Instruction {
    ApplyActions { actions: Vec<Action> },
    WriteActions { actions: Vec<Action> },
    ClearActions,
    GotoTable { table_id: u8 },
}

impl Instruction {
    /// Action list, or `None` for instructions that carry none.
    pub fn actions(&self) -> Option<&[Action]> {
        match self {
            Self::ApplyActions { actions } | Self::WriteActions { actions } => Some(actions),
            Self::ClearActions | Self::GotoTable { .. } => None,
        }
    }
}

/// One entry of a flow-stats reply body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowStatsEntry {
    pub table_id: u8,
    pub priority: u16,
    #[serde(rename = "match")]
    pub flow_match: FlowMatch,
    pub instructions: Vec<Instruction>,
    pub packet_count: u64,
    pub byte_count: u64,
}

impl FlowStatsEntry {
    /// A learned forwarding rule that outputs to `out_port`.
    pub fn learned(
        in_port: impl Into<PortNo>,
        eth_dst: impl Into<MacAddress>,
        out_port: impl Into<PortNo>,
    ) -> Self {
        Self {
            table_id: 0,
            priority: LEARNED_FLOW_PRIORITY,
            flow_match: FlowMatch::new(in_port, eth_dst),
            instructions: vec![Instruction::ApplyActions {
                actions: vec![Action::output(out_port)],
            }],
            packet_count: 0,
            byte_count: 0,
        }
    }

    /// The table-miss rule that punts unmatched packets to the controller.
    pub fn table_miss() -> Self {
        Self {
            table_id: 0,
            priority: 0,
            flow_match: FlowMatch::default(),
            instructions: vec![Instruction::ApplyActions {
                actions: vec![Action::output(PortNo::CONTROLLER)],
            }],
            packet_count: 0,
            byte_count: 0,
        }
    }

    pub fn with_priority(mut self, priority: u16) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_counters(mut self, packets: u64, bytes: u64) -> Self {
        self.packet_count = packets;
        self.byte_count = bytes;
        self
    }

    pub fn is_learned(&self) -> bool {
        self.priority == LEARNED_FLOW_PRIORITY
    }
}

/// Flow-stats reply as delivered by the event bus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowStatsReply {
    pub datapath: DatapathId,
    pub body: Vec<FlowStatsEntry>,
}
