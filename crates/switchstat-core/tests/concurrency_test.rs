#![allow(clippy::unwrap_used)]
// Concurrent appends must never interleave inside a line.

use std::sync::Arc;
use std::thread;

use chrono::{DateTime, Utc};

use switchstat_core::{
    DatapathId, FlowStatsEntry, FlowStatsReply, PortStatsEntry, PortStatsReply, RecordWriter,
    ReplyHandlers, read_flow_records, read_port_records,
};

const THREADS: u64 = 8;
const PER_THREAD: u64 = 250;

fn ts() -> DateTime<Utc> {
    DateTime::from_timestamp(1_700_000_000, 500_000_000).unwrap()
}

#[test]
fn test_concurrent_appends_keep_lines_whole() {
    let dir = tempfile::tempdir().unwrap();
    let flow = dir.path().join("flow.csv");
    let port = dir.path().join("port.csv");
    let writer = Arc::new(RecordWriter::create(&flow, &port).unwrap());

    let workers: Vec<_> = (0..THREADS)
        .map(|t| {
            let writer = Arc::clone(&writer);
            thread::spawn(move || {
                for i in 0..PER_THREAD {
                    let record = switchstat_core::FlowStatRecord {
                        timestamp: ts(),
                        datapath: DatapathId(t),
                        in_port: switchstat_core::PortNo(1),
                        eth_dst: "00:00:00:00:00:01".into(),
                        out_port: switchstat_core::PortNo(2),
                        packets: i,
                        bytes: i * 64,
                    };
                    writer.append_flow(&record).unwrap();
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }

    let records = read_flow_records(&flow).unwrap();
    assert_eq!(records.len(), usize::try_from(THREADS * PER_THREAD).unwrap());
    for t in 0..THREADS {
        let mine: Vec<u64> = records
            .iter()
            .filter(|r| r.datapath == DatapathId(t))
            .map(|r| r.packets)
            .collect();
        // One writer per datapath, so its own records stay in order.
        assert_eq!(mine, (0..PER_THREAD).collect::<Vec<_>>());
    }
}

#[test]
fn test_flow_and_port_handlers_run_in_parallel() {
    let dir = tempfile::tempdir().unwrap();
    let flow = dir.path().join("flow.csv");
    let port = dir.path().join("port.csv");
    let handlers = ReplyHandlers::new(Arc::new(RecordWriter::create(&flow, &port).unwrap()));

    let workers: Vec<_> = (0..THREADS)
        .map(|t| {
            let handlers = handlers.clone();
            thread::spawn(move || {
                let datapath = DatapathId(t);
                for _ in 0..20 {
                    if t % 2 == 0 {
                        handlers
                            .handle_flow_reply(&FlowStatsReply {
                                datapath,
                                body: vec![
                                    FlowStatsEntry::learned(1u32, "00:00:00:00:00:02", 2u32),
                                    FlowStatsEntry::learned(2u32, "00:00:00:00:00:01", 1u32),
                                ],
                            })
                            .unwrap();
                    } else {
                        handlers.handle_port_reply(&PortStatsReply {
                            datapath,
                            body: (1..=4u32).map(PortStatsEntry::new).collect(),
                        });
                    }
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }

    assert_eq!(read_flow_records(&flow).unwrap().len(), 4 * 20 * 2);
    assert_eq!(read_port_records(&port).unwrap().len(), 4 * 20 * 4);
}
