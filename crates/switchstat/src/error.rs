//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text.

use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

use switchstat_config::ConfigError;
use switchstat_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const CONFIG: i32 = 3;
    pub const STORAGE: i32 = 4;
    pub const DATA: i32 = 5;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Storage ──────────────────────────────────────────────────────

    #[error("Cannot write {stream} stream at {}", .path.display())]
    #[diagnostic(
        code(switchstat::storage),
        help("Check that the directory exists and is writable, or pick another path with --{stream}-out.")
    )]
    Storage {
        stream: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot read {}", .path.display())]
    #[diagnostic(
        code(switchstat::read),
        help("Run `switchstat init` or `switchstat demo` to create the record streams.")
    )]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Data ─────────────────────────────────────────────────────────

    #[error("{}:{line}: {reason}", .path.display())]
    #[diagnostic(
        code(switchstat::parse),
        help("The stream is not in the expected record layout.")
    )]
    Parse {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    #[error("Rejected stats reply: {reason}")]
    #[diagnostic(code(switchstat::malformed_reply))]
    MalformedReply { reason: String },

    #[error("Stats request failed: {reason}")]
    #[diagnostic(code(switchstat::send))]
    Send { reason: String },

    // ── Validation ───────────────────────────────────────────────────

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(switchstat::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────

    #[error("Configuration file already exists at {}", .path.display())]
    #[diagnostic(
        code(switchstat::config_exists),
        help("Use `switchstat config init --force` to overwrite it.")
    )]
    ConfigExists { path: PathBuf },

    #[error("Could not load configuration")]
    #[diagnostic(
        code(switchstat::config),
        help("Check the config file (`switchstat config path`) and SWITCHSTAT_* variables.")
    )]
    Config(#[source] Box<ConfigError>),

    // ── Lifecycle ────────────────────────────────────────────────────

    #[error("Collector is already running")]
    #[diagnostic(code(switchstat::already_running))]
    AlreadyRunning,

    #[error("Internal error: {0}")]
    #[diagnostic(code(switchstat::internal))]
    Internal(String),

    // ── IO / Serialization ────────────────────────────────────────────

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Could not serialize output: {0}")]
    #[diagnostic(code(switchstat::json))]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Storage { .. } | Self::Read { .. } | Self::Io(_) => exit_code::STORAGE,
            Self::Parse { .. } | Self::MalformedReply { .. } => exit_code::DATA,
            Self::Validation { .. } => exit_code::USAGE,
            Self::Config(_) | Self::ConfigExists { .. } => exit_code::CONFIG,
            _ => exit_code::GENERAL,
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => Self::Validation { field, reason },
            other => Self::Config(Box::new(other)),
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Storage {
                stream,
                path,
                source,
            } => Self::Storage {
                stream,
                path,
                source,
            },

            CoreError::Read { path, source } => Self::Read { path, source },

            CoreError::Parse { path, line, source } => Self::Parse {
                path,
                line,
                reason: source.to_string(),
            },

            CoreError::MalformedReply(e) => Self::MalformedReply {
                reason: e.to_string(),
            },

            CoreError::Send(e) => Self::Send {
                reason: e.to_string(),
            },

            CoreError::Config { message } => Self::Validation {
                field: "collector".into(),
                reason: message,
            },

            CoreError::AlreadyRunning => Self::AlreadyRunning,

            CoreError::Internal(message) => Self::Internal(message),
        }
    }
}
