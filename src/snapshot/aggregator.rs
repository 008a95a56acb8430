//! Snapshot aggregator: runs both probes and joins them onto the registry

use crate::scanner::{LivenessProber, LivenessResult, PortScanResult, PortScanner};
use crate::snapshot::{HostRecord, LivenessStatus, Snapshot};
use crate::targets::{HostRegistry, RegisteredHost, Target};
use crate::ScanResult;
use chrono::Utc;
use std::time::Duration;
use tokio::time::Instant;

/// Per-round timeouts, both measured from round start
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoundTimeouts {
    pub probe: Duration,
    pub scan: Duration,
}

impl RoundTimeouts {
    pub fn new(probe: Duration, scan: Duration) -> Self {
        Self { probe, scan }
    }

    /// Same timeout for liveness and port scanning
    pub fn uniform(timeout: Duration) -> Self {
        Self::new(timeout, timeout)
    }
}

pub struct SnapshotAggregator {
    prober: LivenessProber,
    scanner: PortScanner,
}

impl SnapshotAggregator {
    pub fn new(prober: LivenessProber, scanner: PortScanner) -> Self {
        Self { prober, scanner }
    }

    pub fn liveness_method(&self) -> &str {
        self.prober.method_name()
    }

    /// Run one round and build its snapshot.
    ///
    /// Liveness and port scanning run concurrently. Records come out in
    /// registry order, one per entry, stamped when aggregation completes.
    pub async fn build_snapshot(
        &self,
        registry: &HostRegistry,
        ports: &[u16],
        timeouts: RoundTimeouts,
    ) -> ScanResult<Snapshot> {
        let addresses = registry.probe_addresses();
        let round_start = Instant::now();

        let (liveness, open_ports) = futures::future::try_join(
            self.prober.probe_until(&addresses, round_start + timeouts.probe),
            self.scanner.scan_until(&addresses, ports, round_start + timeouts.scan),
        )
        .await?;

        let records: Vec<HostRecord> = registry
            .iter()
            .map(|host| host_record(host, &liveness, &open_ports))
            .collect();

        log::debug!(
            "Round finished in {:?}: {}/{} online, {} open ports",
            round_start.elapsed(),
            liveness.len(),
            addresses.len(),
            open_ports.open_count()
        );

        Ok(Snapshot {
            taken_at: Utc::now(),
            ports: ports.to_vec(),
            records,
        })
    }
}

fn host_record(host: &RegisteredHost, liveness: &LivenessResult, open_ports: &PortScanResult) -> HostRecord {
    let (status, responsive_ports, error) = match &host.target {
        Target::Resolved(ip) => {
            let status = if liveness.is_alive(ip) {
                LivenessStatus::Online
            } else {
                LivenessStatus::Offline
            };
            let ports = open_ports.ports_for(ip).map(<[u16]>::to_vec).unwrap_or_default();
            (status, ports, None)
        }
        Target::Invalid(reason) => (LivenessStatus::Offline, Vec::new(), Some(reason.clone())),
    };

    HostRecord {
        address: host.entry.address.clone(),
        name: host.entry.name.clone(),
        status,
        responsive_ports,
        error,
    }
}
