// ── Reply handlers ──
//
// Turn one stats reply into records and hand them to the writer. The
// handlers hold no per-reply state; every record is stamped with the
// wall clock at the moment it is emitted.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, error};

use crate::error::CoreError;
use crate::format;
use crate::model::{DatapathId, FlowStatsReply, PortStatsReply, RecordStream, ReplyEvent};
use crate::store::RecordWriter;

/// Result of handling one reply.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HandleOutcome {
    /// Records appended to the stream.
    pub written: usize,
    /// Records dropped because the stream could not be written.
    pub dropped: usize,
}

/// Flow-reply and port-reply handlers sharing one [`RecordWriter`].
#[derive(Clone)]
pub struct ReplyHandlers {
    writer: Arc<RecordWriter>,
}

impl ReplyHandlers {
    pub fn new(writer: Arc<RecordWriter>) -> Self {
        Self { writer }
    }

    pub fn writer(&self) -> &Arc<RecordWriter> {
        &self.writer
    }

    /// Route a bus event to the matching handler.
    pub fn handle(&self, event: &ReplyEvent) -> Result<HandleOutcome, CoreError> {
        match event {
            ReplyEvent::Flow(reply) => self.handle_flow_reply(reply),
            ReplyEvent::Port(reply) => Ok(self.handle_port_reply(reply)),
        }
    }

    /// Record every learned flow in `reply`, ordered by `(in_port, eth_dst)`.
    ///
    /// A malformed learned entry rejects the reply before anything is
    /// written. A storage failure drops only the record being written.
    pub fn handle_flow_reply(&self, reply: &FlowStatsReply) -> Result<HandleOutcome, CoreError> {
        let datapath = reply.datapath;
        let flows = format::learned_flows(datapath, &reply.body)?;

        let mut outcome = HandleOutcome::default();
        for flow in &flows {
            let record = format::flow_record(datapath, flow, Utc::now());
            tally(datapath, RecordStream::Flow, &mut outcome, || {
                self.writer.append_flow(&record)
            });
        }
        debug!(datapath = %datapath, written = outcome.written, dropped = outcome.dropped, "flow stats written");
        Ok(outcome)
    }

    /// Record every port in `reply`, ordered by port number.
    pub fn handle_port_reply(&self, reply: &PortStatsReply) -> HandleOutcome {
        let datapath = reply.datapath;

        let mut outcome = HandleOutcome::default();
        for entry in format::sorted_ports(&reply.body) {
            let record = format::port_record(datapath, entry, Utc::now());
            tally(datapath, RecordStream::Port, &mut outcome, || {
                self.writer.append_port(&record)
            });
        }
        debug!(datapath = %datapath, written = outcome.written, dropped = outcome.dropped, "port stats written");
        outcome
    }
}

/// Run one append, logging and counting a failure instead of returning it.
fn tally(
    datapath: DatapathId,
    stream: RecordStream,
    outcome: &mut HandleOutcome,
    append: impl FnOnce() -> Result<(), CoreError>,
) {
    match append() {
        Ok(()) => outcome.written += 1,
        Err(e) => {
            error!(datapath = %datapath, stream = %stream, error = %e, "dropping record");
            outcome.dropped += 1;
        }
    }
}
