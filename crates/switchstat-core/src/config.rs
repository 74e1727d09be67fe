// ── Runtime collector configuration ──
//
// These types describe *where* records go and *how often* switches are
// polled. They never touch disk themselves: the config crate or the CLI
// builds a `CollectorConfig` and hands it in.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::CoreError;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);
pub const DEFAULT_FLOW_STATS_PATH: &str = "net_stats_flow.csv";
pub const DEFAULT_PORT_STATS_PATH: &str = "net_stats_port.csv";
pub const DEFAULT_REPLY_QUEUE: usize = 1024;

/// Configuration for one collector instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectorConfig {
    /// Time between poll ticks.
    pub poll_interval: Duration,
    /// Flow stream output file (truncated on start).
    pub flow_stats_path: PathBuf,
    /// Port stream output file (truncated on start).
    pub port_stats_path: PathBuf,
    /// Capacity of the reply bus channel the host should create.
    pub reply_queue: usize,
}

impl CollectorConfig {
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.poll_interval.is_zero() {
            return Err(CoreError::Config {
                message: "poll interval must be greater than zero".into(),
            });
        }
        if self.flow_stats_path.as_os_str().is_empty() || self.port_stats_path.as_os_str().is_empty()
        {
            return Err(CoreError::Config {
                message: "record stream paths must not be empty".into(),
            });
        }
        if self.flow_stats_path == self.port_stats_path {
            return Err(CoreError::Config {
                message: "flow and port streams must use different files".into(),
            });
        }
        if self.reply_queue == 0 {
            return Err(CoreError::Config {
                message: "reply queue capacity must be greater than zero".into(),
            });
        }
        Ok(())
    }
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            flow_stats_path: PathBuf::from(DEFAULT_FLOW_STATS_PATH),
            port_stats_path: PathBuf::from(DEFAULT_PORT_STATS_PATH),
            reply_queue: DEFAULT_REPLY_QUEUE,
        }
    }
}
