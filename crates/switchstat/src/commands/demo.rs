//! `switchstat demo`: run the full collector against a simulated fabric.
//!
//! Switches connect at start and disconnect at the end. With `--flap`,
//! one switch drops and reconnects midway through the run.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::sync::mpsc;
use tracing::info;

use switchstat_core::{Collector, CollectorTotals, ConnectionEvent};

use crate::cli::{DemoArgs, GlobalOpts};
use crate::config::{self, Config};
use crate::error::CliError;
use crate::output;
use crate::sim::{FabricShape, SimFabric};

/// Flap after this many poll intervals when the run is unbounded.
const UNBOUNDED_FLAP_TICKS: u32 = 3;

#[derive(Debug, Serialize)]
struct DemoSummary {
    stopped: &'static str,
    elapsed: String,
    switches: u64,
    replies_handled: u64,
    replies_rejected: u64,
    records_written: u64,
    records_dropped: u64,
    requests_refused: u64,
    flow_stats_path: PathBuf,
    port_stats_path: PathBuf,
}

impl DemoSummary {
    fn detail(&self) -> String {
        [
            format!("Stopped:          {}", self.stopped),
            format!("Elapsed:          {}", self.elapsed),
            format!("Switches:         {}", self.switches),
            format!(
                "Replies:          {} handled, {} rejected",
                self.replies_handled, self.replies_rejected
            ),
            format!(
                "Records:          {} written, {} dropped",
                self.records_written, self.records_dropped
            ),
            format!("Requests refused: {}", self.requests_refused),
            format!("Flow stream:      {}", self.flow_stats_path.display()),
            format!("Port stream:      {}", self.port_stats_path.display()),
        ]
        .join("\n")
    }
}

async fn announce(
    lifecycle: &mpsc::Sender<ConnectionEvent>,
    event: ConnectionEvent,
) -> Result<(), CliError> {
    lifecycle
        .send(event)
        .await
        .map_err(|_| CliError::Internal("collector lifecycle bus closed".into()))
}

/// Resolve on Ctrl-C, or SIGTERM on unix.
async fn shutdown_signal() -> std::io::Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut sigterm = signal(SignalKind::terminate())?;
        tokio::select! {
            r = tokio::signal::ctrl_c() => r,
            _ = sigterm.recv() => Ok(()),
        }
    }
    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await
    }
}

async fn wait_for_stop(duration: Option<Duration>) -> Result<&'static str, CliError> {
    let deadline = async {
        match duration {
            Some(d) => tokio::time::sleep(d).await,
            None => std::future::pending().await,
        }
    };
    tokio::select! {
        () = deadline => Ok("duration elapsed"),
        signal = shutdown_signal() => {
            signal?;
            Ok("interrupted")
        }
    }
}

pub async fn handle(args: &DemoArgs, cfg: &Config, global: &GlobalOpts) -> Result<(), CliError> {
    let collector_config = config::collector_config(cfg, &args.streams, args.interval)?;
    let interval = collector_config.poll_interval;
    let collector = Collector::new(collector_config)?;

    let (lifecycle_tx, lifecycle_rx) = Collector::lifecycle_channel();
    let (reply_tx, reply_rx) = collector.reply_channel();
    collector.start(lifecycle_rx, reply_rx).await?;

    let shape = FabricShape {
        switches: args.switches,
        flows: args.flows,
        ports: args.ports,
    };
    let mut fabric = SimFabric::new(shape, reply_tx);
    for handle in fabric.handles() {
        announce(&lifecycle_tx, ConnectionEvent::Established(handle)).await?;
    }
    info!(
        switches = shape.switches,
        flows = shape.flows,
        ports = shape.ports,
        "simulated fabric connected"
    );
    if !global.quiet {
        match args.duration {
            Some(d) => eprintln!("demo: running for {}", humantime::format_duration(d)),
            None => eprintln!("demo: running (ctrl-c to stop)"),
        }
    }

    let started = Instant::now();
    let flap_after = args
        .duration
        .map_or(interval * UNBOUNDED_FLAP_TICKS, |d| d / 2);

    let stop = wait_for_stop(args.duration);
    tokio::pin!(stop);
    let flap = tokio::time::sleep(flap_after);
    tokio::pin!(flap);
    let mut flap_pending = args.flap;

    let stopped = loop {
        tokio::select! {
            reason = &mut stop => break reason?,
            () = &mut flap, if flap_pending => {
                flap_pending = false;
                if let Some((lost, fresh)) = fabric.reconnect(0) {
                    info!(datapath = %lost.datapath(), "flapping switch");
                    announce(&lifecycle_tx, ConnectionEvent::Lost(lost)).await?;
                    announce(&lifecycle_tx, ConnectionEvent::Established(fresh)).await?;
                }
            }
        }
    };

    for handle in fabric.disconnect_all() {
        announce(&lifecycle_tx, ConnectionEvent::Lost(handle)).await?;
    }
    collector.shutdown().await;

    let CollectorTotals {
        replies_handled,
        replies_rejected,
        records_written,
        records_dropped,
    } = collector.totals();
    let elapsed = Duration::from_millis(
        u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
    );
    let summary = DemoSummary {
        stopped,
        elapsed: humantime::format_duration(elapsed).to_string(),
        switches: shape.switches,
        replies_handled,
        replies_rejected,
        records_written,
        records_dropped,
        requests_refused: fabric.refused(),
        flow_stats_path: collector.config().flow_stats_path.clone(),
        port_stats_path: collector.config().port_stats_path.clone(),
    };

    let text = output::render_single(global.output, &summary, DemoSummary::detail)?;
    output::print_output(&text, global.quiet);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_detail_layout() {
        let summary = DemoSummary {
            stopped: "duration elapsed",
            elapsed: "1s 3ms".into(),
            switches: 2,
            replies_handled: 20,
            replies_rejected: 0,
            records_written: 110,
            records_dropped: 0,
            requests_refused: 1,
            flow_stats_path: "flow.csv".into(),
            port_stats_path: "port.csv".into(),
        };
        insta::assert_snapshot!(summary.detail(), @r"
        Stopped:          duration elapsed
        Elapsed:          1s 3ms
        Switches:         2
        Replies:          20 handled, 0 rejected
        Records:          110 written, 0 dropped
        Requests refused: 1
        Flow stream:      flow.csv
        Port stream:      port.csv
        ");
    }
}
