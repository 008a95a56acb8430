//! Liveness prober: one echo per address, all bounded by one deadline

use crate::network::LivenessProbe;
use crate::scanner::{unique_addresses, LivenessResult};
use crate::{ScanError, ScanResult};
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::{timeout_at, Instant};

/// Concurrent liveness prober
#[derive(Clone)]
pub struct LivenessProber {
    probe: Arc<dyn LivenessProbe>,
    limiter: Arc<Semaphore>,
}

impl LivenessProber {
    pub fn new(probe: Arc<dyn LivenessProbe>, max_concurrency: usize) -> Self {
        Self {
            probe,
            limiter: Arc::new(Semaphore::new(max_concurrency.max(1))),
        }
    }

    pub fn method_name(&self) -> &str {
        self.probe.method_name()
    }

    /// Probe every address once and return the responsive subset
    pub async fn probe(&self, addresses: &[IpAddr], timeout: Duration) -> ScanResult<LivenessResult> {
        self.probe_until(addresses, Instant::now() + timeout).await
    }

    /// Probe every address once against an absolute deadline.
    ///
    /// Silence and ordinary probe errors count as offline. Only resource
    /// exhaustion or a failed task aborts the call.
    pub async fn probe_until(&self, addresses: &[IpAddr], deadline: Instant) -> ScanResult<LivenessResult> {
        let mut tasks = JoinSet::new();

        for address in unique_addresses(addresses) {
            let probe = Arc::clone(&self.probe);
            let limiter = Arc::clone(&self.limiter);

            tasks.spawn(async move {
                let attempt = async {
                    let _permit = limiter
                        .acquire()
                        .await
                        .map_err(|e| ScanError::TaskFailed(e.to_string()))?;
                    let budget = deadline.saturating_duration_since(Instant::now());
                    probe.echo(address, budget).await
                };

                let verdict = match timeout_at(deadline, attempt).await {
                    Ok(result) => result,
                    Err(_) => Ok(false),
                };
                (address, verdict)
            });
        }

        let mut result = LivenessResult::new();

        while let Some(joined) = tasks.join_next().await {
            let (address, verdict) = joined?;
            match verdict {
                Ok(true) => result.insert(address),
                Ok(false) => log::trace!("{} did not answer", address),
                Err(e) if e.is_round_fatal() => return Err(e),
                Err(e @ ScanError::ConfigError(_)) | Err(e @ ScanError::PermissionError(_)) => {
                    log::warn!("{} probe for {} failed: {}", self.method_name(), address, e)
                }
                Err(e) => log::debug!("{} probe for {} failed: {}", self.method_name(), address, e),
            }
        }

        Ok(result)
    }
}
