// ── Domain model ──
//
// Switch identities, stats reply payloads, bus events and the records
// written to the time-series streams.

pub mod flow;
pub mod ids;
pub mod port;
pub mod record;
pub mod switch;

pub use flow::{Action, FlowMatch, FlowStatsEntry, FlowStatsReply, Instruction, LEARNED_FLOW_PRIORITY};
pub use ids::{DatapathId, MacAddress, PortNo};
pub use port::{PortStatsEntry, PortStatsReply};
pub use record::{FLOW_HEADER, FlowStatRecord, PORT_HEADER, PortStatRecord, RecordStream};
pub use switch::{
    ConnectionEvent, FlowStatsRequest, PortStatsRequest, ReplyEvent, StatsRequest,
    SwitchConnection, SwitchHandle,
};
