// ── Switch registry ──
//
// Concurrent map of live switches. Mutated by connection lifecycle
// events, read by the poll scheduler through owned snapshots.

use dashmap::DashMap;
use tokio::sync::watch;
use tracing::debug;

use crate::model::{ConnectionEvent, DatapathId, SwitchHandle};

/// Live switches, keyed by datapath id.
///
/// Uses `DashMap` so lifecycle callbacks and the scheduler never contend
/// on a single lock. Every mutation republishes the switch count on a
/// `watch` channel.
pub struct SwitchRegistry {
    switches: DashMap<DatapathId, SwitchHandle>,
    count: watch::Sender<usize>,
}

impl SwitchRegistry {
    pub fn new() -> Self {
        let (count, _) = watch::channel(0);
        Self {
            switches: DashMap::new(),
            count,
        }
    }

    /// Insert or replace the handle for `handle.datapath()`.
    /// Returns `true` if the id was not registered before.
    pub fn register(&self, handle: SwitchHandle) -> bool {
        let datapath = handle.datapath();
        let replaced = self.switches.insert(datapath, handle).is_some();
        if replaced {
            debug!(datapath = %datapath, "replaced switch session");
        } else {
            debug!(datapath = %datapath, "register datapath");
        }
        self.publish_count();
        !replaced
    }

    /// Remove `datapath` if present. Returns the removed handle.
    pub fn unregister(&self, datapath: DatapathId) -> Option<SwitchHandle> {
        let removed = self.switches.remove(&datapath).map(|(_, h)| h);
        if removed.is_some() {
            debug!(datapath = %datapath, "unregister datapath");
            self.publish_count();
        } else {
            debug!(datapath = %datapath, "unregister of unknown datapath ignored");
        }
        removed
    }

    /// Remove `handle`'s switch only if `handle` is still the registered
    /// session. A lost event for a session that has already been replaced
    /// by a reconnect leaves the new session in place.
    pub fn unregister_session(&self, handle: &SwitchHandle) -> bool {
        let datapath = handle.datapath();
        let removed = self
            .switches
            .remove_if(&datapath, |_, current| current.same_session(handle))
            .is_some();
        if removed {
            debug!(datapath = %datapath, "unregister datapath");
            self.publish_count();
        } else {
            debug!(datapath = %datapath, "stale or unknown session lost, ignored");
        }
        removed
    }

    /// Apply one lifecycle event from the controller.
    pub fn apply(&self, event: ConnectionEvent) {
        match event {
            ConnectionEvent::Established(handle) => {
                self.register(handle);
            }
            ConnectionEvent::Lost(handle) => {
                self.unregister_session(&handle);
            }
        }
    }

    /// Owned copy of the live switches. No shard lock is held once this
    /// returns, so callers may send requests while lifecycle events land.
    pub fn snapshot(&self) -> Vec<SwitchHandle> {
        self.switches.iter().map(|r| r.value().clone()).collect()
    }

    pub fn get(&self, datapath: DatapathId) -> Option<SwitchHandle> {
        self.switches.get(&datapath).map(|r| r.value().clone())
    }

    pub fn contains(&self, datapath: DatapathId) -> bool {
        self.switches.contains_key(&datapath)
    }

    /// Registered ids in ascending order.
    pub fn ids(&self) -> Vec<DatapathId> {
        let mut ids: Vec<DatapathId> = self.switches.iter().map(|r| *r.key()).collect();
        ids.sort_unstable();
        ids
    }

    pub fn len(&self) -> usize {
        self.switches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.switches.is_empty()
    }

    /// Subscribe to the live switch count.
    pub fn subscribe_count(&self) -> watch::Receiver<usize> {
        self.count.subscribe()
    }

    fn publish_count(&self) {
        // Read the length under the channel lock so the last writer wins.
        self.count.send_modify(|count| *count = self.switches.len());
    }
}

impl Default for SwitchRegistry {
    fn default() -> Self {
        Self::new()
    }
}
