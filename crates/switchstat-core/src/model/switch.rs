// ── Switch sessions and bus events ──
//
// The controller's connection layer owns the wire protocol. The core
// only sees a handle that can send a stats request, plus the typed
// events the bus delivers.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use strum::{Display, IntoStaticStr};

use super::flow::FlowStatsReply;
use super::ids::{DatapathId, PortNo};
use super::port::PortStatsReply;
use crate::error::SendError;

// ── Requests ────────────────────────────────────────────────────────

/// Table id meaning "all tables".
pub const ALL_TABLES: u8 = 0xff;

/// Flow-stats request. The defaults ask for every flow in every table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowStatsRequest {
    pub table_id: u8,
    pub out_port: PortNo,
}

impl FlowStatsRequest {
    pub const fn all() -> Self {
        Self {
            table_id: ALL_TABLES,
            out_port: PortNo::ANY,
        }
    }
}

/// Port-stats request for a single port or, with [`PortNo::ANY`], all ports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortStatsRequest {
    pub port_no: PortNo,
}

impl PortStatsRequest {
    pub const fn all_ports() -> Self {
        Self {
            port_no: PortNo::ANY,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum StatsRequest {
    #[strum(serialize = "flow_stats")]
    Flow(FlowStatsRequest),
    #[strum(serialize = "port_stats")]
    Port(PortStatsRequest),
}

// ── Connection capability ───────────────────────────────────────────

/// Send capability for one connected switch.
///
/// Implementations must not block: the request is queued for the
/// connection layer and the reply, if any, arrives later as a
/// [`ReplyEvent`].
pub trait SwitchConnection: Send + Sync {
    fn send(&self, request: StatsRequest) -> Result<(), SendError>;
}

/// A live session with one switch.
///
/// Cheap to clone. Two handles are the same session only if they share
/// the same underlying connection.
#[derive(Clone)]
pub struct SwitchHandle {
    datapath: DatapathId,
    connection: Arc<dyn SwitchConnection>,
}

impl SwitchHandle {
    pub fn new(datapath: DatapathId, connection: Arc<dyn SwitchConnection>) -> Self {
        Self {
            datapath,
            connection,
        }
    }

    pub fn datapath(&self) -> DatapathId {
        self.datapath
    }

    pub fn send(&self, request: StatsRequest) -> Result<(), SendError> {
        self.connection.send(request)
    }

    pub fn same_session(&self, other: &Self) -> bool {
        self.datapath == other.datapath && Arc::ptr_eq(&self.connection, &other.connection)
    }
}

impl fmt::Debug for SwitchHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SwitchHandle")
            .field("datapath", &self.datapath)
            .finish_non_exhaustive()
    }
}

// ── Bus events ──────────────────────────────────────────────────────

/// Connection lifecycle, as reported by the controller.
#[derive(Debug, Clone)]
pub enum ConnectionEvent {
    Established(SwitchHandle),
    Lost(SwitchHandle),
}

impl ConnectionEvent {
    pub fn datapath(&self) -> DatapathId {
        match self {
            Self::Established(h) | Self::Lost(h) => h.datapath(),
        }
    }
}

/// Stats replies, as delivered by the event bus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReplyEvent {
    Flow(FlowStatsReply),
    Port(PortStatsReply),
}

impl ReplyEvent {
    pub fn datapath(&self) -> DatapathId {
        match self {
            Self::Flow(r) => r.datapath,
            Self::Port(r) => r.datapath,
        }
    }
}

impl From<FlowStatsReply> for ReplyEvent {
    fn from(reply: FlowStatsReply) -> Self {
        Self::Flow(reply)
    }
}

impl From<PortStatsReply> for ReplyEvent {
    fn from(reply: PortStatsReply) -> Self {
        Self::Port(reply)
    }
}
