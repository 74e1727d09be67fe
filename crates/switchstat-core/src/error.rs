// ── Core error types ──
//
// Errors surfaced by the collector core. Send failures stay local to
// one switch, storage failures stay local to one record, and malformed
// replies reject the whole reply they came in.

use std::path::PathBuf;

use thiserror::Error;

use crate::model::{DatapathId, PortNo};

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Reply errors ─────────────────────────────────────────────────
    #[error(transparent)]
    MalformedReply(#[from] MalformedReplyError),

    // ── Request errors ───────────────────────────────────────────────
    #[error(transparent)]
    Send(#[from] SendError),

    // ── Storage errors ───────────────────────────────────────────────
    #[error("Cannot write {stream} stream at {}: {source}", .path.display())]
    Storage {
        stream: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{}:{line}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        line: usize,
        #[source]
        source: RecordParseError,
    },

    // ── Lifecycle errors ─────────────────────────────────────────────
    #[error("Collector is already running")]
    AlreadyRunning,

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A flow-stats reply whose shape cannot produce a valid record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MalformedReplyError {
    #[error("flow entry on {datapath} has no `{field}` match field")]
    MissingMatchField {
        datapath: DatapathId,
        field: &'static str,
    },

    #[error("flow entry on {datapath} (in_port {in_port}) has invalid eth_dst `{value}`")]
    InvalidEthDst {
        datapath: DatapathId,
        in_port: PortNo,
        value: String,
    },

    #[error("flow entry on {datapath} (in_port {in_port}) has no instructions")]
    NoInstructions { datapath: DatapathId, in_port: PortNo },

    #[error("flow entry on {datapath} (in_port {in_port}): first instruction has no actions")]
    NoActions { datapath: DatapathId, in_port: PortNo },

    #[error(
        "flow entry on {datapath} (in_port {in_port}): first action is `{kind}`, expected output"
    )]
    NotOutput {
        datapath: DatapathId,
        in_port: PortNo,
        kind: String,
    },
}

/// Failure to hand a stats request to a switch's connection.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SendError {
    #[error("switch {datapath} is disconnected")]
    Disconnected { datapath: DatapathId },

    #[error("send queue for switch {datapath} is full")]
    QueueFull { datapath: DatapathId },

    #[error("send to switch {datapath} failed: {reason}")]
    Io { datapath: DatapathId, reason: String },
}

/// A stream line that does not match the record layout.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordParseError {
    #[error("expected {expected} fields, found {found}")]
    FieldCount { expected: usize, found: usize },

    #[error("invalid {field}: {value:?}")]
    InvalidField { field: &'static str, value: String },

    #[error("expected header {expected:?}, found {found:?}")]
    Header { expected: &'static str, found: String },
}
