//! Hostwatch engine: wires configuration, probes, aggregator and scheduler

use crate::config::WatchConfig;
use crate::network::icmp::IcmpPinger;
use crate::network::ping::SystemPinger;
use crate::network::socket::TcpConnectScanner;
use crate::network::{LivenessMethod, LivenessProbe, PortProbe};
use crate::scanner::{LivenessProber, PortScanner};
use crate::scheduler::{RefreshScheduler, SchedulerState};
use crate::snapshot::{RoundTimeouts, Snapshot, SnapshotAggregator, SnapshotPublisher};
use crate::targets::HostRegistry;
use crate::ScanError;
use std::sync::Arc;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// Main engine
pub struct HostWatch {
    config: Arc<WatchConfig>,
    registry: Arc<HostRegistry>,
    scheduler: RefreshScheduler,
}

impl HostWatch {
    /// Create an engine using real network probes
    pub async fn new(config: WatchConfig) -> crate::Result<Self> {
        config.validate()?;

        let liveness = liveness_backend(config.liveness_method)?;
        Self::with_probes(config, liveness, Arc::new(TcpConnectScanner::new())).await
    }

    /// Create an engine with caller-supplied probes
    pub async fn with_probes(
        config: WatchConfig,
        liveness: Arc<dyn LivenessProbe>,
        ports: Arc<dyn PortProbe>,
    ) -> crate::Result<Self> {
        config.validate()?;

        let registry = Arc::new(HostRegistry::resolve(config.hosts.clone(), config.probe_timeout()).await?);

        let aggregator = SnapshotAggregator::new(
            LivenessProber::new(liveness, config.max_concurrency),
            PortScanner::new(ports, config.max_concurrency),
        );

        let scheduler = RefreshScheduler::new(
            Arc::new(aggregator),
            Arc::clone(&registry),
            Arc::from(config.ports.clone()),
            RoundTimeouts::new(config.probe_timeout(), config.scan_timeout()),
            SnapshotPublisher::new(),
        );

        Ok(Self {
            config: Arc::new(config),
            registry,
            scheduler,
        })
    }

    pub fn config(&self) -> &WatchConfig {
        &self.config
    }

    pub fn registry(&self) -> &HostRegistry {
        &self.registry
    }

    /// Latest published snapshot
    pub fn latest(&self) -> Option<Arc<Snapshot>> {
        self.scheduler.publisher().latest()
    }

    /// Receiver notified whenever a new snapshot is published
    pub fn subscribe(&self) -> watch::Receiver<Option<Arc<Snapshot>>> {
        self.scheduler.publisher().subscribe()
    }

    pub fn state(&self) -> SchedulerState {
        self.scheduler.state()
    }

    pub fn shutdown_token(&self) -> CancellationToken {
        self.scheduler.shutdown_token()
    }

    /// Run one round now and publish it
    pub async fn refresh_once(&self) -> crate::Result<Arc<Snapshot>> {
        self.scheduler.refresh_once().await
    }

    /// Refresh on the configured interval until shut down
    pub async fn run<F>(&self, on_snapshot: F)
    where
        F: FnMut(Arc<Snapshot>) + Send,
    {
        self.scheduler.run(self.config.refresh_interval(), on_snapshot).await
    }
}

/// Pick the liveness probe for `method`.
///
/// `Auto` prefers raw ICMP and falls back to the system ping when the
/// process lacks raw-socket privileges.
pub fn liveness_backend(method: LivenessMethod) -> crate::Result<Arc<dyn LivenessProbe>> {
    match method {
        LivenessMethod::Icmp => Ok(Arc::new(IcmpPinger::new()?)),
        LivenessMethod::System => Ok(Arc::new(SystemPinger::new())),
        LivenessMethod::Auto => match IcmpPinger::new() {
            Ok(pinger) => {
                log::info!("Raw ICMP socket available, using native echo");
                Ok(Arc::new(pinger))
            }
            Err(ScanError::PermissionError(e)) => {
                log::warn!("Raw ICMP unavailable ({}). Falling back to system ping.", e);
                Ok(Arc::new(SystemPinger::new()))
            }
            Err(e) => Err(e),
        },
    }
}
