//! Snapshots: the immutable per-round view handed to consumers

pub mod aggregator;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::watch;

pub use aggregator::{RoundTimeouts, SnapshotAggregator};

/// Liveness verdict for one host in one round
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LivenessStatus {
    Online,
    Offline,
}

impl std::fmt::Display for LivenessStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LivenessStatus::Online => write!(f, "online"),
            LivenessStatus::Offline => write!(f, "offline"),
        }
    }
}

/// Result row for one registry entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostRecord {
    pub address: String,
    pub name: String,
    pub status: LivenessStatus,
    /// Responsive ports, in configured port order
    pub responsive_ports: Vec<u16>,
    /// Why the entry could never be probed (bad or unresolvable address)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl HostRecord {
    pub fn is_online(&self) -> bool {
        self.status == LivenessStatus::Online
    }
}

/// Complete results of one round, one record per registry entry in order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// When aggregation finished
    pub taken_at: DateTime<Utc>,
    /// Port set the round was scanned against
    pub ports: Vec<u16>,
    pub records: Vec<HostRecord>,
}

impl Snapshot {
    pub fn get(&self, address: &str) -> Option<&HostRecord> {
        self.records.iter().find(|r| r.address == address)
    }

    pub fn online_count(&self) -> usize {
        self.records.iter().filter(|r| r.is_online()).count()
    }

    /// Equal results regardless of when they were taken
    pub fn same_results(&self, other: &Snapshot) -> bool {
        self.ports == other.ports && self.records == other.records
    }
}

/// Holder of the current snapshot.
///
/// Publishing swaps a single `Arc`, so readers see either the previous
/// snapshot or the new one, never a mix.
#[derive(Debug, Clone)]
pub struct SnapshotPublisher {
    sender: Arc<watch::Sender<Option<Arc<Snapshot>>>>,
}

impl Default for SnapshotPublisher {
    fn default() -> Self {
        Self::new()
    }
}

impl SnapshotPublisher {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(None);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Replace the current snapshot
    pub fn publish(&self, snapshot: Snapshot) -> Arc<Snapshot> {
        let snapshot = Arc::new(snapshot);
        self.sender.send_replace(Some(Arc::clone(&snapshot)));
        snapshot
    }

    /// Latest published snapshot, if any round has completed
    pub fn latest(&self) -> Option<Arc<Snapshot>> {
        self.sender.borrow().clone()
    }

    /// Receiver notified on every publish
    pub fn subscribe(&self) -> watch::Receiver<Option<Arc<Snapshot>>> {
        self.sender.subscribe()
    }
}
