#![allow(clippy::unwrap_used)]
// End-to-end tests: registry, scheduler, handlers and writer driven
// through the public `Collector` API with in-process switches.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::mpsc;

use switchstat_core::{
    Collector, CollectorConfig, CollectorState, ConnectionEvent, DatapathId, FlowStatsEntry,
    FlowStatsReply, PortNo, PortStatsEntry, PortStatsReply, ReplyEvent, SendError, StatsRequest,
    SwitchConnection, SwitchHandle, read_flow_records, read_port_records,
};

// ── Helpers ─────────────────────────────────────────────────────────

/// A switch with two learned flows and three ports whose counters grow on
/// every request.
struct FakeSwitch {
    datapath: DatapathId,
    replies: mpsc::Sender<ReplyEvent>,
    ticks: AtomicU64,
}

impl FakeSwitch {
    fn handle(datapath: u64, replies: &mpsc::Sender<ReplyEvent>) -> SwitchHandle {
        let datapath = DatapathId(datapath);
        SwitchHandle::new(
            datapath,
            Arc::new(Self {
                datapath,
                replies: replies.clone(),
                ticks: AtomicU64::new(0),
            }),
        )
    }
}

impl SwitchConnection for FakeSwitch {
    fn send(&self, request: StatsRequest) -> Result<(), SendError> {
        let n = self.ticks.fetch_add(1, Ordering::SeqCst) + 1;
        let event = match request {
            StatsRequest::Flow(_) => ReplyEvent::Flow(FlowStatsReply {
                datapath: self.datapath,
                body: vec![
                    FlowStatsEntry::learned(2u32, "00:00:00:00:00:01", 1u32).with_counters(n, n * 98),
                    FlowStatsEntry::table_miss(),
                    FlowStatsEntry::learned(1u32, "00:00:00:00:00:02", 2u32).with_counters(n, n * 98),
                ],
            }),
            StatsRequest::Port(_) => ReplyEvent::Port(PortStatsReply {
                datapath: self.datapath,
                body: vec![
                    PortStatsEntry::new(PortNo::LOCAL),
                    PortStatsEntry::new(2u32),
                    PortStatsEntry::new(1u32),
                ],
            }),
        };
        self.replies.try_send(event).map_err(|_| SendError::QueueFull {
            datapath: self.datapath,
        })
    }
}

fn config(dir: &tempfile::TempDir) -> CollectorConfig {
    CollectorConfig {
        poll_interval: Duration::from_millis(25),
        flow_stats_path: dir.path().join("net_stats_flow.csv"),
        port_stats_path: dir.path().join("net_stats_port.csv"),
        ..CollectorConfig::default()
    }
}

// ── Pipeline tests ──────────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_two_switches_produce_learned_records() {
    let dir = tempfile::tempdir().unwrap();
    let collector = Collector::new(config(&dir)).unwrap();
    let (ltx, lrx) = Collector::lifecycle_channel();
    let (rtx, rrx) = collector.reply_channel();
    collector.start(lrx, rrx).await.unwrap();

    let mut count = collector.registry().subscribe_count();
    ltx.send(ConnectionEvent::Established(FakeSwitch::handle(1, &rtx)))
        .await
        .unwrap();
    ltx.send(ConnectionEvent::Established(FakeSwitch::handle(2, &rtx)))
        .await
        .unwrap();
    count.wait_for(|n| *n == 2).await.unwrap();

    tokio::time::sleep(Duration::from_millis(150)).await;
    collector.shutdown().await;
    assert_eq!(*collector.state().borrow(), CollectorState::Stopped);

    let flows = read_flow_records(&collector.config().flow_stats_path).unwrap();
    let ports = read_port_records(&collector.config().port_stats_path).unwrap();
    assert!(!flows.is_empty());
    assert!(!ports.is_empty());

    // The table-miss entry never reaches the stream.
    assert_eq!(flows.len() % 2, 0);
    // LOCAL is reported like any other port.
    assert!(ports.iter().any(|r| r.port_no == PortNo::LOCAL));

    // Each learned flow keeps its own match and output port.
    for record in &flows {
        let expected = if record.in_port == PortNo(1) {
            ("00:00:00:00:00:02", PortNo(2))
        } else {
            ("00:00:00:00:00:01", PortNo(1))
        };
        assert_eq!((record.eth_dst.as_str(), record.out_port), expected);
    }
    assert_eq!(ports.len() % 3, 0);

    let totals = collector.totals();
    assert_eq!(
        totals.records_written,
        u64::try_from(flows.len() + ports.len()).unwrap()
    );
    assert_eq!(totals.records_dropped, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_lost_switch_is_no_longer_polled() {
    let dir = tempfile::tempdir().unwrap();
    let collector = Collector::new(config(&dir)).unwrap();
    let (ltx, lrx) = Collector::lifecycle_channel();
    let (rtx, rrx) = collector.reply_channel();
    collector.start(lrx, rrx).await.unwrap();

    let mut count = collector.registry().subscribe_count();
    let switch = FakeSwitch::handle(7, &rtx);
    ltx.send(ConnectionEvent::Established(switch.clone()))
        .await
        .unwrap();
    count.wait_for(|n| *n == 1).await.unwrap();
    tokio::time::sleep(Duration::from_millis(60)).await;

    ltx.send(ConnectionEvent::Lost(switch)).await.unwrap();
    count.wait_for(|n| *n == 0).await.unwrap();

    // Let queued replies drain, then take a reading.
    tokio::time::sleep(Duration::from_millis(60)).await;
    let before = read_port_records(&collector.config().port_stats_path)
        .unwrap()
        .len();
    tokio::time::sleep(Duration::from_millis(100)).await;
    let after = read_port_records(&collector.config().port_stats_path)
        .unwrap()
        .len();
    collector.shutdown().await;

    assert!(before > 0);
    assert_eq!(before, after);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_stale_lost_event_keeps_reconnected_session() {
    let dir = tempfile::tempdir().unwrap();
    let collector = Collector::new(config(&dir)).unwrap();
    let (ltx, lrx) = Collector::lifecycle_channel();
    let (rtx, rrx) = collector.reply_channel();
    collector.start(lrx, rrx).await.unwrap();

    let old = FakeSwitch::handle(3, &rtx);
    let new = FakeSwitch::handle(3, &rtx);
    ltx.send(ConnectionEvent::Established(old.clone()))
        .await
        .unwrap();
    ltx.send(ConnectionEvent::Established(new.clone()))
        .await
        .unwrap();
    ltx.send(ConnectionEvent::Lost(old)).await.unwrap();
    drop(ltx);

    tokio::time::sleep(Duration::from_millis(50)).await;
    let current = collector.registry().get(DatapathId(3)).unwrap();
    assert!(current.same_session(&new));
    collector.shutdown().await;
}

#[tokio::test]
async fn test_restart_truncates_previous_run() {
    let dir = tempfile::tempdir().unwrap();
    {
        let collector = Collector::new(config(&dir)).unwrap();
        let (_ltx, lrx) = Collector::lifecycle_channel();
        let (rtx, rrx) = collector.reply_channel();
        collector.start(lrx, rrx).await.unwrap();
        rtx.send(ReplyEvent::Port(PortStatsReply {
            datapath: DatapathId(1),
            body: vec![PortStatsEntry::new(1u32)],
        }))
        .await
        .unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        collector.shutdown().await;
        assert_eq!(
            read_port_records(&collector.config().port_stats_path)
                .unwrap()
                .len(),
            1
        );
    }

    let collector = Collector::new(config(&dir)).unwrap();
    assert!(
        read_port_records(&collector.config().port_stats_path)
            .unwrap()
            .is_empty()
    );
    assert!(
        read_flow_records(&collector.config().flow_stats_path)
            .unwrap()
            .is_empty()
    );
}
