//! Configuration for the switchstat collector.
//!
//! A TOML file at the platform config path, merged under environment
//! overrides, translated into `switchstat_core::CollectorConfig`. The CLI
//! layers its own flag overrides on top.

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use switchstat_core::CollectorConfig;
use switchstat_core::config::{
    DEFAULT_FLOW_STATS_PATH, DEFAULT_POLL_INTERVAL, DEFAULT_PORT_STATS_PATH, DEFAULT_REPLY_QUEUE,
};

/// Prefix for environment overrides, e.g.
/// `SWITCHSTAT_COLLECTOR__POLL_INTERVAL_SECS=5`.
pub const ENV_PREFIX: &str = "SWITCHSTAT_";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

fn invalid(field: &str, reason: &str) -> ConfigError {
    ConfigError::Validation {
        field: field.into(),
        reason: reason.into(),
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub collector: CollectorSection,

    #[serde(default)]
    pub log: LogSection,
}

/// `[collector]` table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct CollectorSection {
    /// Seconds between poll ticks.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Flow stream output file.
    #[serde(default = "default_flow_stats_path")]
    pub flow_stats_path: PathBuf,

    /// Port stream output file.
    #[serde(default = "default_port_stats_path")]
    pub port_stats_path: PathBuf,

    /// Reply bus capacity.
    #[serde(default = "default_reply_queue")]
    pub reply_queue: usize,
}

impl Default for CollectorSection {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval_secs(),
            flow_stats_path: default_flow_stats_path(),
            port_stats_path: default_port_stats_path(),
            reply_queue: default_reply_queue(),
        }
    }
}

fn default_poll_interval_secs() -> u64 {
    DEFAULT_POLL_INTERVAL.as_secs()
}
fn default_flow_stats_path() -> PathBuf {
    DEFAULT_FLOW_STATS_PATH.into()
}
fn default_port_stats_path() -> PathBuf {
    DEFAULT_PORT_STATS_PATH.into()
}
fn default_reply_queue() -> usize {
    DEFAULT_REPLY_QUEUE
}

/// `[log]` table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct LogSection {
    /// Default filter when neither `-v` nor `RUST_LOG` is given.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Also write logs to this file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
}

impl Default for LogSection {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

fn default_log_level() -> String {
    "warn".into()
}

impl Config {
    /// Reject values the collector cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let c = &self.collector;
        if c.poll_interval_secs == 0 {
            return Err(invalid("collector.poll_interval_secs", "must be greater than zero"));
        }
        if c.flow_stats_path.as_os_str().is_empty() {
            return Err(invalid("collector.flow_stats_path", "must not be empty"));
        }
        if c.port_stats_path.as_os_str().is_empty() {
            return Err(invalid("collector.port_stats_path", "must not be empty"));
        }
        if c.flow_stats_path == c.port_stats_path {
            return Err(invalid(
                "collector.port_stats_path",
                "must differ from collector.flow_stats_path",
            ));
        }
        if c.reply_queue == 0 {
            return Err(invalid("collector.reply_queue", "must be greater than zero"));
        }
        if self.log.level.trim().is_empty() {
            return Err(invalid("log.level", "must not be empty"));
        }
        Ok(())
    }

    /// Validate, then build the runtime collector configuration.
    pub fn to_collector_config(&self) -> Result<CollectorConfig, ConfigError> {
        self.validate()?;
        Ok(CollectorConfig {
            poll_interval: Duration::from_secs(self.collector.poll_interval_secs),
            flow_stats_path: self.collector.flow_stats_path.clone(),
            port_stats_path: self.collector.port_stats_path.clone(),
            reply_queue: self.collector.reply_queue,
        })
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("org", "switchstat", "switchstat").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("switchstat");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Defaults, then the TOML file at `path`, then environment overrides.
/// A missing file contributes nothing.
pub fn figment(path: &Path) -> Figment {
    Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"))
}

/// Load the full Config from `path` (or the platform path) plus
/// environment. The result is not validated.
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = path.map_or_else(config_path, Path::to_path_buf);
    let config: Config = figment(&path).extract()?;
    Ok(config)
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize `cfg` as TOML to `path`, creating parent directories.
pub fn save_config(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, to_toml(cfg)?)?;
    Ok(())
}

pub fn to_toml(cfg: &Config) -> Result<String, ConfigError> {
    Ok(toml::to_string_pretty(cfg)?)
}
