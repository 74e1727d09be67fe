// ── Poll scheduler ──
//
// Every tick, snapshot the registry and ask each live switch for its
// flow and port statistics. Sends are fire-and-forget; replies come back
// later through the reply bus.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::model::{FlowStatsRequest, PortStatsRequest, StatsRequest, SwitchHandle};
use crate::registry::SwitchRegistry;

/// What one poll tick did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollSummary {
    pub switches: usize,
    pub requests_sent: usize,
    pub requests_failed: usize,
}

/// The requests issued to every switch on every tick.
pub const TICK_REQUESTS: [StatsRequest; 2] = [
    StatsRequest::Flow(FlowStatsRequest::all()),
    StatsRequest::Port(PortStatsRequest::all_ports()),
];

fn request_stats(handle: &SwitchHandle, summary: &mut PollSummary) {
    debug!(datapath = %handle.datapath(), "send stats request");
    for request in TICK_REQUESTS {
        match handle.send(request) {
            Ok(()) => summary.requests_sent += 1,
            Err(e) => {
                warn!(datapath = %handle.datapath(), request = %request, error = %e, "stats request failed");
                summary.requests_failed += 1;
            }
        }
    }
}

/// Run a single poll tick against the current registry contents.
///
/// A failed send is logged and counted; it never stops the other
/// requests for that switch or the requests for other switches.
pub fn poll_once(registry: &SwitchRegistry) -> PollSummary {
    let switches = registry.snapshot();
    let mut summary = PollSummary {
        switches: switches.len(),
        ..PollSummary::default()
    };
    for handle in &switches {
        request_stats(handle, &mut summary);
    }
    summary
}

/// Poll every `period` until `cancel` fires.
///
/// The first tick fires immediately. A tick that runs late pushes the
/// following ticks back rather than bursting to catch up.
pub async fn poll_task(registry: Arc<SwitchRegistry>, period: Duration, cancel: CancellationToken) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = interval.tick() => {
                let summary = poll_once(&registry);
                debug!(
                    switches = summary.switches,
                    sent = summary.requests_sent,
                    failed = summary.requests_failed,
                    "poll tick"
                );
            }
        }
    }
    debug!("poll task stopped");
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::error::SendError;
    use crate::model::{DatapathId, PortNo, SwitchConnection};

    #[derive(Default)]
    struct Recorder {
        sent: Mutex<Vec<StatsRequest>>,
    }

    impl SwitchConnection for Recorder {
        fn send(&self, request: StatsRequest) -> Result<(), SendError> {
            self.sent.lock().unwrap().push(request);
            Ok(())
        }
    }

    struct Broken {
        datapath: DatapathId,
        attempts: AtomicUsize,
    }

    impl SwitchConnection for Broken {
        fn send(&self, _request: StatsRequest) -> Result<(), SendError> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            Err(SendError::Disconnected {
                datapath: self.datapath,
            })
        }
    }

    #[test]
    fn each_switch_gets_flow_and_port_request() {
        let registry = SwitchRegistry::new();
        let a = Arc::new(Recorder::default());
        let b = Arc::new(Recorder::default());
        registry.register(SwitchHandle::new(DatapathId(1), a.clone()));
        registry.register(SwitchHandle::new(DatapathId(2), b.clone()));

        let summary = poll_once(&registry);
        assert_eq!(summary, PollSummary { switches: 2, requests_sent: 4, requests_failed: 0 });

        let sent = a.sent.lock().unwrap().clone();
        assert_eq!(sent, TICK_REQUESTS.to_vec());
        assert!(matches!(sent[1], StatsRequest::Port(r) if r.port_no == PortNo::ANY));
        assert_eq!(b.sent.lock().unwrap().len(), 2);
    }

    #[test]
    fn failing_switch_does_not_affect_others() {
        let registry = SwitchRegistry::new();
        let broken = Arc::new(Broken {
            datapath: DatapathId(1),
            attempts: AtomicUsize::new(0),
        });
        let healthy = Arc::new(Recorder::default());
        registry.register(SwitchHandle::new(DatapathId(1), broken.clone()));
        registry.register(SwitchHandle::new(DatapathId(2), healthy.clone()));

        let summary = poll_once(&registry);
        assert_eq!(summary.requests_failed, 2);
        assert_eq!(summary.requests_sent, 2);
        // The port request is still attempted after the flow request fails.
        assert_eq!(broken.attempts.load(Ordering::SeqCst), 2);
        assert_eq!(healthy.sent.lock().unwrap().len(), 2);
    }

    #[test]
    fn empty_registry_is_a_quiet_tick() {
        assert_eq!(poll_once(&SwitchRegistry::new()), PollSummary::default());
    }

    #[tokio::test(start_paused = true)]
    async fn task_polls_every_period_until_cancelled() {
        let registry = Arc::new(SwitchRegistry::new());
        let rec = Arc::new(Recorder::default());
        registry.register(SwitchHandle::new(DatapathId(1), rec.clone()));

        let cancel = CancellationToken::new();
        let task = tokio::spawn(poll_task(
            Arc::clone(&registry),
            Duration::from_secs(2),
            cancel.clone(),
        ));

        // Ticks at t=0, 2, 4.
        tokio::time::sleep(Duration::from_millis(4_500)).await;
        cancel.cancel();
        task.await.unwrap();

        assert_eq!(rec.sent.lock().unwrap().len(), 6);
    }

    #[tokio::test(start_paused = true)]
    async fn switches_registered_later_are_picked_up() {
        let registry = Arc::new(SwitchRegistry::new());
        let cancel = CancellationToken::new();
        let task = tokio::spawn(poll_task(
            Arc::clone(&registry),
            Duration::from_secs(2),
            cancel.clone(),
        ));

        tokio::time::sleep(Duration::from_millis(500)).await;
        let rec = Arc::new(Recorder::default());
        registry.register(SwitchHandle::new(DatapathId(3), rec.clone()));
        tokio::time::sleep(Duration::from_secs(2)).await;

        cancel.cancel();
        task.await.unwrap();
        assert_eq!(rec.sent.lock().unwrap().len(), 2);
    }
}
