//! Port scanner: one connect per (address, port) pair

use crate::network::PortProbe;
use crate::scanner::{unique_addresses, PortScanResult};
use crate::{ScanError, ScanResult};
use std::collections::HashSet;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::{timeout_at, Instant};

/// Concurrent TCP port scanner
#[derive(Clone)]
pub struct PortScanner {
    probe: Arc<dyn PortProbe>,
    limiter: Arc<Semaphore>,
}

impl PortScanner {
    pub fn new(probe: Arc<dyn PortProbe>, max_concurrency: usize) -> Self {
        Self {
            probe,
            limiter: Arc::new(Semaphore::new(max_concurrency.max(1))),
        }
    }

    /// Attempt every (address, port) pair once within `timeout`
    pub async fn scan(&self, addresses: &[IpAddr], ports: &[u16], timeout: Duration) -> ScanResult<PortScanResult> {
        self.scan_until(addresses, ports, Instant::now() + timeout).await
    }

    /// Attempt every (address, port) pair once against an absolute deadline.
    ///
    /// Wall-clock time is bounded by the deadline, not by the number of
    /// pairs. A pair that is refused, reset or still pending at the deadline
    /// is simply absent from the result.
    pub async fn scan_until(
        &self,
        addresses: &[IpAddr],
        ports: &[u16],
        deadline: Instant,
    ) -> ScanResult<PortScanResult> {
        let addresses = unique_addresses(addresses);
        let mut tasks = JoinSet::new();

        for &address in &addresses {
            for &port in ports {
                let probe = Arc::clone(&self.probe);
                let limiter = Arc::clone(&self.limiter);

                tasks.spawn(async move {
                    let attempt = async {
                        let _permit = limiter
                            .acquire()
                            .await
                            .map_err(|e| ScanError::TaskFailed(e.to_string()))?;
                        probe.connect(address, port).await
                    };

                    let verdict = match timeout_at(deadline, attempt).await {
                        Ok(result) => result,
                        Err(_) => Ok(false),
                    };
                    (address, port, verdict)
                });
            }
        }

        let mut successes = HashSet::new();

        while let Some(joined) = tasks.join_next().await {
            let (address, port, verdict) = joined?;
            match verdict {
                Ok(true) => {
                    successes.insert((address, port));
                }
                Ok(false) => {}
                Err(e) if e.is_round_fatal() => return Err(e),
                Err(e) => log::debug!("connect to {}:{} failed: {}", address, port, e),
            }
        }

        log::debug!(
            "Port scan settled: {} of {} pairs responsive",
            successes.len(),
            addresses.len() * ports.len()
        );

        Ok(PortScanResult::from_successes(&addresses, ports, &successes))
    }
}
