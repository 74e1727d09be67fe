//! In-process simulated switch fabric for `switchstat demo`.
//!
//! Each simulated switch answers a stats request by pushing a reply onto
//! the reply bus, the same way a controller's connection layer would.
//! Counters grow with every request, entries arrive unsorted, and every
//! flow table carries a priority-0 table-miss entry.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use tokio::sync::mpsc::{self, error::TrySendError};

use switchstat_core::{
    DatapathId, FlowStatsEntry, FlowStatsReply, MacAddress, PortNo, PortStatsEntry,
    PortStatsReply, ReplyEvent, SendError, StatsRequest, SwitchConnection, SwitchHandle,
};

/// Average frame size used to derive byte counters from packet counters.
const FRAME_BYTES: u64 = 98;

/// Shape of every simulated switch.
#[derive(Debug, Clone, Copy)]
pub struct FabricShape {
    pub switches: u64,
    pub flows: u32,
    pub ports: u32,
}

// ── SimSwitch ────────────────────────────────────────────────────────

struct SimSwitch {
    datapath: DatapathId,
    shape: FabricShape,
    replies: mpsc::Sender<ReplyEvent>,
    requests: AtomicU64,
    connected: AtomicBool,
    refused: Arc<AtomicU64>,
}

impl SimSwitch {
    fn mac(&self, flow: u32) -> MacAddress {
        let [.., d1, d0] = self.datapath.get().to_be_bytes();
        let [.., f1, f0] = flow.to_be_bytes();
        MacAddress::new(format!("02:{d1:02x}:{d0:02x}:00:{f1:02x}:{f0:02x}"))
    }

    fn port_for(&self, index: u32) -> PortNo {
        PortNo(index % self.shape.ports + 1)
    }

    /// Learned flows in reverse creation order, with the table-miss
    /// entry in the middle.
    fn flow_body(&self, tick: u64) -> Vec<FlowStatsEntry> {
        let mut body: Vec<FlowStatsEntry> = (0..self.shape.flows)
            .rev()
            .map(|i| {
                let packets = tick * (u64::from(i) + 1);
                FlowStatsEntry::learned(self.port_for(i), self.mac(i), self.port_for(i + 1))
                    .with_counters(packets, packets * FRAME_BYTES)
            })
            .collect();
        body.insert(body.len() / 2, FlowStatsEntry::table_miss().with_counters(tick, tick * 60));
        body
    }

    /// Physical ports in descending order, then the LOCAL port.
    fn port_body(&self, tick: u64) -> Vec<PortStatsEntry> {
        (1..=self.shape.ports)
            .rev()
            .map(PortNo)
            .chain(std::iter::once(PortNo::LOCAL))
            .map(|port_no| {
                let weight = u64::from(port_no.get() % 16) + 1;
                PortStatsEntry {
                    port_no,
                    rx_packets: tick * weight,
                    rx_bytes: tick * weight * FRAME_BYTES,
                    rx_errors: 0,
                    tx_packets: tick * weight * 2,
                    tx_bytes: tick * weight * 2 * FRAME_BYTES,
                    tx_errors: u64::from(tick % 50 == 0),
                }
            })
            .collect()
    }
}

impl SwitchConnection for SimSwitch {
    fn send(&self, request: StatsRequest) -> Result<(), SendError> {
        if !self.connected.load(Ordering::Acquire) {
            return Err(SendError::Disconnected {
                datapath: self.datapath,
            });
        }
        let tick = self.requests.fetch_add(1, Ordering::Relaxed) / 2 + 1;
        let event = match request {
            StatsRequest::Flow(_) => ReplyEvent::Flow(FlowStatsReply {
                datapath: self.datapath,
                body: self.flow_body(tick),
            }),
            StatsRequest::Port(_) => ReplyEvent::Port(PortStatsReply {
                datapath: self.datapath,
                body: self.port_body(tick),
            }),
        };

        self.replies.try_send(event).map_err(|e| {
            self.refused.fetch_add(1, Ordering::Relaxed);
            match e {
                TrySendError::Full(_) => SendError::QueueFull {
                    datapath: self.datapath,
                },
                TrySendError::Closed(_) => SendError::Disconnected {
                    datapath: self.datapath,
                },
            }
        })
    }
}

// ── SimFabric ────────────────────────────────────────────────────────

/// A set of simulated switches sharing one reply bus.
pub struct SimFabric {
    shape: FabricShape,
    replies: mpsc::Sender<ReplyEvent>,
    sessions: Vec<(SwitchHandle, Arc<SimSwitch>)>,
    refused: Arc<AtomicU64>,
}

impl SimFabric {
    /// Datapath ids run from 1 to `shape.switches`.
    pub fn new(shape: FabricShape, replies: mpsc::Sender<ReplyEvent>) -> Self {
        let mut fabric = Self {
            shape,
            replies,
            sessions: Vec::new(),
            refused: Arc::new(AtomicU64::new(0)),
        };
        fabric.sessions = (1..=shape.switches)
            .map(|id| fabric.new_session(DatapathId(id)))
            .collect();
        fabric
    }

    fn new_session(&self, datapath: DatapathId) -> (SwitchHandle, Arc<SimSwitch>) {
        let switch = Arc::new(SimSwitch {
            datapath,
            shape: self.shape,
            replies: self.replies.clone(),
            requests: AtomicU64::new(0),
            connected: AtomicBool::new(true),
            refused: Arc::clone(&self.refused),
        });
        let connection: Arc<dyn SwitchConnection> = switch.clone();
        (SwitchHandle::new(datapath, connection), switch)
    }

    /// Handles for every current session.
    pub fn handles(&self) -> Vec<SwitchHandle> {
        self.sessions.iter().map(|(h, _)| h.clone()).collect()
    }

    /// Drop the session at `index` and open a fresh one for the same
    /// datapath. Returns `(lost, established)`.
    pub fn reconnect(&mut self, index: usize) -> Option<(SwitchHandle, SwitchHandle)> {
        let datapath = self.sessions.get(index)?.0.datapath();
        let fresh = self.new_session(datapath);
        let (old_handle, old_switch) = std::mem::replace(&mut self.sessions[index], fresh);
        old_switch.connected.store(false, Ordering::Release);
        Some((old_handle, self.sessions[index].0.clone()))
    }

    /// Mark every session disconnected. Returns their handles.
    pub fn disconnect_all(&self) -> Vec<SwitchHandle> {
        self.sessions
            .iter()
            .map(|(handle, switch)| {
                switch.connected.store(false, Ordering::Release);
                handle.clone()
            })
            .collect()
    }

    /// Requests refused because the bus was full or closed.
    pub fn refused(&self) -> u64 {
        self.refused.load(Ordering::Relaxed)
    }
}
