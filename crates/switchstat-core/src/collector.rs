// ── Collector facade ──
//
// Owns the registry, the record writer and the reply handlers, and runs
// the three background tasks: the poll scheduler, the connection
// lifecycle listener and the reply dispatcher.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::{Mutex, mpsc, watch};
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::CollectorConfig;
use crate::error::CoreError;
use crate::handlers::{HandleOutcome, ReplyHandlers};
use crate::model::{ConnectionEvent, ReplyEvent};
use crate::registry::SwitchRegistry;
use crate::scheduler;
use crate::store::RecordWriter;

const LIFECYCLE_CHANNEL_SIZE: usize = 64;

// ── CollectorState ───────────────────────────────────────────────

/// Lifecycle state observable by consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum CollectorState {
    Idle,
    Running,
    Stopped,
}

// ── Totals ───────────────────────────────────────────────────────

/// Running totals across every reply the dispatcher has handled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CollectorTotals {
    pub replies_handled: u64,
    pub replies_rejected: u64,
    pub records_written: u64,
    pub records_dropped: u64,
}

fn widen(n: usize) -> u64 {
    u64::try_from(n).unwrap_or(u64::MAX)
}

#[derive(Default)]
struct Counters {
    replies_handled: AtomicU64,
    replies_rejected: AtomicU64,
    records_written: AtomicU64,
    records_dropped: AtomicU64,
}

impl Counters {
    fn record(&self, outcome: HandleOutcome) {
        self.replies_handled.fetch_add(1, Ordering::Relaxed);
        self.records_written
            .fetch_add(widen(outcome.written), Ordering::Relaxed);
        self.records_dropped
            .fetch_add(widen(outcome.dropped), Ordering::Relaxed);
    }

    fn reject(&self) {
        self.replies_rejected.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> CollectorTotals {
        CollectorTotals {
            replies_handled: self.replies_handled.load(Ordering::Relaxed),
            replies_rejected: self.replies_rejected.load(Ordering::Relaxed),
            records_written: self.records_written.load(Ordering::Relaxed),
            records_dropped: self.records_dropped.load(Ordering::Relaxed),
        }
    }
}

// ── Collector ────────────────────────────────────────────────────

/// The traffic statistics collector.
///
/// Cheaply cloneable via `Arc<CollectorInner>`. Construction truncates
/// both record streams; [`start()`](Self::start) attaches the collector
/// to the controller's event bus and begins polling.
#[derive(Clone)]
pub struct Collector {
    inner: Arc<CollectorInner>,
}

struct CollectorInner {
    config: CollectorConfig,
    registry: Arc<SwitchRegistry>,
    handlers: ReplyHandlers,
    state: watch::Sender<CollectorState>,
    counters: Arc<Counters>,
    cancel: CancellationToken,
    /// Child token for the current run, replaced on every start.
    cancel_child: Mutex<CancellationToken>,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
}

impl Collector {
    /// Validate `config`, then create (or truncate) both record streams
    /// and write their headers. Does not start polling.
    pub fn new(config: CollectorConfig) -> Result<Self, CoreError> {
        config.validate()?;
        let writer = RecordWriter::create(&config.flow_stats_path, &config.port_stats_path)?;
        let (state, _) = watch::channel(CollectorState::Idle);
        let cancel = CancellationToken::new();
        let cancel_child = cancel.child_token();

        Ok(Self {
            inner: Arc::new(CollectorInner {
                config,
                registry: Arc::new(SwitchRegistry::new()),
                handlers: ReplyHandlers::new(Arc::new(writer)),
                state,
                counters: Arc::new(Counters::default()),
                cancel,
                cancel_child: Mutex::new(cancel_child),
                task_handles: Mutex::new(Vec::new()),
            }),
        })
    }

    pub fn config(&self) -> &CollectorConfig {
        &self.inner.config
    }

    pub fn registry(&self) -> &Arc<SwitchRegistry> {
        &self.inner.registry
    }

    pub fn handlers(&self) -> &ReplyHandlers {
        &self.inner.handlers
    }

    pub fn writer(&self) -> &Arc<RecordWriter> {
        self.inner.handlers.writer()
    }

    /// Subscribe to lifecycle state changes.
    pub fn state(&self) -> watch::Receiver<CollectorState> {
        self.inner.state.subscribe()
    }

    pub fn totals(&self) -> CollectorTotals {
        self.inner.counters.snapshot()
    }

    /// A reply bus channel sized from the configured queue capacity.
    pub fn reply_channel(&self) -> (mpsc::Sender<ReplyEvent>, mpsc::Receiver<ReplyEvent>) {
        mpsc::channel(self.inner.config.reply_queue)
    }

    /// A connection lifecycle channel.
    pub fn lifecycle_channel() -> (mpsc::Sender<ConnectionEvent>, mpsc::Receiver<ConnectionEvent>) {
        mpsc::channel(LIFECYCLE_CHANNEL_SIZE)
    }

    // ── Lifecycle ────────────────────────────────────────────────

    /// Attach to the event bus and spawn the background tasks.
    ///
    /// Connection events arrive on `lifecycle_rx`, stats replies on
    /// `reply_rx`. Fails with [`CoreError::AlreadyRunning`] if the
    /// collector is running.
    pub async fn start(
        &self,
        lifecycle_rx: mpsc::Receiver<ConnectionEvent>,
        reply_rx: mpsc::Receiver<ReplyEvent>,
    ) -> Result<(), CoreError> {
        // Held until every task is spawned, so a concurrent shutdown
        // either runs first or sees all of them.
        let mut handles = self.inner.task_handles.lock().await;

        let claimed = self.inner.state.send_if_modified(|state| {
            if *state == CollectorState::Running {
                false
            } else {
                *state = CollectorState::Running;
                true
            }
        });
        if !claimed {
            return Err(CoreError::AlreadyRunning);
        }

        let child = self.inner.cancel.child_token();
        *self.inner.cancel_child.lock().await = child.clone();

        {
            let registry = Arc::clone(&self.inner.registry);
            let cancel = child.clone();
            handles.push(tokio::spawn(lifecycle_task(registry, lifecycle_rx, cancel)));
        }

        {
            let handlers = self.inner.handlers.clone();
            let counters = Arc::clone(&self.inner.counters);
            let cancel = child.clone();
            handles.push(tokio::spawn(reply_dispatch_task(
                handlers, counters, reply_rx, cancel,
            )));
        }

        {
            let registry = Arc::clone(&self.inner.registry);
            let period = self.inner.config.poll_interval;
            handles.push(tokio::spawn(scheduler::poll_task(registry, period, child)));
        }

        info!(
            interval = ?self.inner.config.poll_interval,
            flow = %self.inner.config.flow_stats_path.display(),
            port = %self.inner.config.port_stats_path.display(),
            "collector started"
        );
        Ok(())
    }

    /// Stop polling and wait for every background task to finish.
    ///
    /// Replies already handed to a blocking handler are written before
    /// this returns. Calling it on a collector that is not running does
    /// nothing.
    pub async fn shutdown(&self) {
        let mut handles = self.inner.task_handles.lock().await;
        self.inner.cancel_child.lock().await.cancel();

        for handle in handles.drain(..) {
            if let Err(e) = handle.await {
                warn!(error = %e, "collector task ended abnormally");
            }
        }

        let stopped = self.inner.state.send_if_modified(|state| {
            if *state == CollectorState::Running {
                *state = CollectorState::Stopped;
                true
            } else {
                false
            }
        });
        drop(handles);
        if stopped {
            info!(switches = self.inner.registry.len(), "collector stopped");
        }
    }
}

// ── Background tasks ─────────────────────────────────────────────

/// Apply connection events to the registry until cancelled or the bus
/// closes.
async fn lifecycle_task(
    registry: Arc<SwitchRegistry>,
    mut rx: mpsc::Receiver<ConnectionEvent>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            event = rx.recv() => {
                let Some(event) = event else {
                    debug!("lifecycle bus closed");
                    break;
                };
                registry.apply(event);
            }
        }
    }
    debug!("lifecycle task stopped");
}

/// Handle each stats reply on the blocking pool.
///
/// Replies are independent, so every one gets its own blocking task and
/// flow and port writes overlap. In-flight replies are drained before
/// the task returns.
async fn reply_dispatch_task(
    handlers: ReplyHandlers,
    counters: Arc<Counters>,
    mut rx: mpsc::Receiver<ReplyEvent>,
    cancel: CancellationToken,
) {
    let mut inflight = JoinSet::new();

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            Some(joined) = inflight.join_next(), if !inflight.is_empty() => {
                log_join(joined);
            }
            event = rx.recv() => {
                let Some(event) = event else {
                    debug!("reply bus closed");
                    break;
                };
                let handlers = handlers.clone();
                let counters = Arc::clone(&counters);
                inflight.spawn_blocking(move || dispatch(&handlers, &counters, &event));
            }
        }
    }

    while let Some(joined) = inflight.join_next().await {
        log_join(joined);
    }
    debug!("reply dispatch task stopped");
}

fn dispatch(handlers: &ReplyHandlers, counters: &Counters, event: &ReplyEvent) {
    match handlers.handle(event) {
        Ok(outcome) => counters.record(outcome),
        Err(e) => {
            error!(datapath = %event.datapath(), error = %e, "rejected stats reply");
            counters.reject();
        }
    }
}

fn log_join(joined: Result<(), tokio::task::JoinError>) {
    if let Err(e) = joined {
        error!(error = %e, "reply handler panicked");
    }
}
