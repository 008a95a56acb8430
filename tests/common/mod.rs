//! Fully simulated network shared by the integration tests

#![allow(dead_code)]

use hostwatch::{LivenessProbe, PortProbe, ScanResult};
use std::collections::HashSet;
use std::net::IpAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Hosts that are up answer every echo; open pairs accept every connect.
/// Everything else stays silent forever, like a filtered network.
#[derive(Default)]
pub struct SimulatedNetwork {
    alive: HashSet<IpAddr>,
    open: HashSet<(IpAddr, u16)>,
    latency: Duration,
    echoes: AtomicUsize,
    connects: AtomicUsize,
    echoes_in_flight: AtomicUsize,
    peak_echoes_in_flight: AtomicUsize,
}

/// Counts one echo as in flight until dropped, even when cancelled
struct InFlight<'a>(&'a AtomicUsize);

impl<'a> InFlight<'a> {
    fn enter(counter: &'a AtomicUsize, peak: &AtomicUsize) -> Self {
        let now = counter.fetch_add(1, Ordering::SeqCst) + 1;
        peak.fetch_max(now, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl SimulatedNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_host_up(mut self, address: &str) -> Self {
        self.alive.insert(ip(address));
        self
    }

    pub fn with_open_ports(mut self, address: &str, ports: &[u16]) -> Self {
        for &port in ports {
            self.open.insert((ip(address), port));
        }
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn echoes(&self) -> usize {
        self.echoes.load(Ordering::SeqCst)
    }

    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    /// Most echoes that were ever outstanding at the same time
    pub fn peak_echoes_in_flight(&self) -> usize {
        self.peak_echoes_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl LivenessProbe for SimulatedNetwork {
    async fn echo(&self, target: IpAddr, _timeout: Duration) -> ScanResult<bool> {
        self.echoes.fetch_add(1, Ordering::SeqCst);
        let _in_flight = InFlight::enter(&self.echoes_in_flight, &self.peak_echoes_in_flight);
        if self.alive.contains(&target) {
            tokio::time::sleep(self.latency).await;
            Ok(true)
        } else {
            std::future::pending().await
        }
    }

    fn method_name(&self) -> &str {
        "simulated"
    }
}

#[async_trait::async_trait]
impl PortProbe for SimulatedNetwork {
    async fn connect(&self, target: IpAddr, port: u16) -> ScanResult<bool> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        if self.open.contains(&(target, port)) {
            tokio::time::sleep(self.latency).await;
            Ok(true)
        } else {
            std::future::pending().await
        }
    }
}

pub fn ip(address: &str) -> IpAddr {
    address.parse().expect("fixture addresses are IP literals")
}
