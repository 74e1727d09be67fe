//! Traffic statistics collection for an OpenFlow controller.
//!
//! This crate sits between the controller's connection layer and the two
//! time-series files it produces:
//!
//! - **[`Collector`]**: Facade owning the whole pipeline.
//!   [`new()`](Collector::new) truncates both record streams and writes
//!   their headers; [`start()`](Collector::start) attaches to the event bus
//!   and spawns the poll scheduler, lifecycle listener and reply dispatcher;
//!   [`shutdown()`](Collector::shutdown) cancels and joins them.
//!
//! - **[`SwitchRegistry`]**: Concurrent map (`DashMap`) of live switch
//!   sessions, driven by [`ConnectionEvent`]s, with a `watch` channel for
//!   the live switch count.
//!
//! - **[`scheduler`]**: Periodic flow-stats and port-stats requests to
//!   every registered switch.
//!
//! - **[`ReplyHandlers`]**: Turn [`FlowStatsReply`] and [`PortStatsReply`]
//!   payloads into [`FlowStatRecord`]s and [`PortStatRecord`]s and append
//!   them through the [`RecordWriter`].
//!
//! - **[`store`]**: Append-only stream files plus a reader that parses
//!   them back.

pub mod collector;
pub mod config;
pub mod error;
pub mod format;
pub mod handlers;
pub mod model;
pub mod registry;
pub mod scheduler;
pub mod store;

// ── Primary re-exports ──────────────────────────────────────────────
pub use collector::{Collector, CollectorState, CollectorTotals};
pub use config::CollectorConfig;
pub use error::{CoreError, MalformedReplyError, RecordParseError, SendError};
pub use handlers::{HandleOutcome, ReplyHandlers};
pub use registry::SwitchRegistry;
pub use scheduler::{PollSummary, poll_once};
pub use store::{RecordWriter, read_flow_records, read_port_records};

pub use model::{
    Action, ConnectionEvent, DatapathId, FLOW_HEADER, FlowMatch, FlowStatRecord, FlowStatsEntry,
    FlowStatsReply, FlowStatsRequest, Instruction, MacAddress, PORT_HEADER, PortNo,
    PortStatRecord, PortStatsEntry, PortStatsReply, PortStatsRequest, RecordStream, ReplyEvent,
    StatsRequest, SwitchConnection, SwitchHandle,
};
