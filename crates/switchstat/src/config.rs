//! CLI configuration: thin wrapper around `switchstat_config`.
//!
//! Adds resolution that respects `GlobalOpts` and per-command flag
//! overrides (`--config`, `--flow-out`, `--port-out`, `--interval`).

use std::path::PathBuf;
use std::time::Duration;

use switchstat_core::CollectorConfig;

use crate::cli::{GlobalOpts, StreamArgs};
use crate::error::CliError;

// ── Re-exports from shared crate ────────────────────────────────────

pub use switchstat_config::{Config, save_config, to_toml};

// ── CLI-specific helpers ────────────────────────────────────────────

/// The config file in effect: `--config` / `SWITCHSTAT_CONFIG`, else the
/// platform path.
pub fn active_path(global: &GlobalOpts) -> PathBuf {
    global
        .config
        .clone()
        .unwrap_or_else(switchstat_config::config_path)
}

/// Load the config file in effect, merged with environment overrides.
pub fn load(global: &GlobalOpts) -> Result<Config, CliError> {
    Ok(switchstat_config::load_config(Some(&active_path(global)))?)
}

/// Apply command-line overrides on top of the file and build the runtime
/// collector configuration.
///
/// Flags take priority over the file and environment.
pub fn collector_config(
    cfg: &Config,
    streams: &StreamArgs,
    interval: Option<Duration>,
) -> Result<CollectorConfig, CliError> {
    let mut cfg = cfg.clone();
    if let Some(ref path) = streams.flow_out {
        cfg.collector.flow_stats_path.clone_from(path);
    }
    if let Some(ref path) = streams.port_out {
        cfg.collector.port_stats_path.clone_from(path);
    }

    if interval.is_some() {
        // Replaced below, so a zero in the file must not fail validation.
        cfg.collector.poll_interval_secs = cfg.collector.poll_interval_secs.max(1);
    }
    let mut collector = cfg.to_collector_config()?;
    if let Some(interval) = interval {
        collector.poll_interval = interval;
        collector.validate()?;
    }
    Ok(collector)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_file_values() {
        let streams = StreamArgs {
            flow_out: Some("/data/f.csv".into()),
            port_out: None,
        };
        let collector =
            collector_config(&Config::default(), &streams, Some(Duration::from_millis(500)))
                .unwrap();
        assert_eq!(collector.flow_stats_path, PathBuf::from("/data/f.csv"));
        assert_eq!(collector.port_stats_path, PathBuf::from("net_stats_port.csv"));
        assert_eq!(collector.poll_interval, Duration::from_millis(500));
    }

    #[test]
    fn zero_interval_flag_is_rejected() {
        let err = collector_config(&Config::default(), &StreamArgs::default(), Some(Duration::ZERO))
            .unwrap_err();
        assert!(matches!(err, CliError::Validation { .. }));
    }

    #[test]
    fn same_path_for_both_streams_is_rejected() {
        let streams = StreamArgs {
            flow_out: Some("x.csv".into()),
            port_out: Some("x.csv".into()),
        };
        assert!(collector_config(&Config::default(), &streams, None).is_err());
    }
}
