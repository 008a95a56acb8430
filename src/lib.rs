//! Hostwatch - liveness and port reachability for a fixed set of hosts
//!
//! Every refresh round pings each configured host and tries a TCP connect
//! on each configured port, all concurrently and under one deadline, then
//! publishes the results as a single immutable snapshot.

pub mod config;
pub mod engine;
pub mod error;
pub mod network;
pub mod output;
pub mod scanner;
pub mod scheduler;
pub mod snapshot;
pub mod targets;

// Re-export commonly used types
pub use config::WatchConfig;
pub use engine::HostWatch;
pub use error::{ScanError, ScanResult};
pub use network::{LivenessMethod, LivenessProbe, PortProbe};
pub use scheduler::{RefreshScheduler, SchedulerState};
pub use snapshot::{HostRecord, LivenessStatus, RoundTimeouts, Snapshot, SnapshotAggregator, SnapshotPublisher};
pub use targets::{HostEntry, HostRegistry};

pub type Result<T> = std::result::Result<T, ScanError>;
