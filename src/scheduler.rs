//! Refresh scheduler: runs one aggregation round per tick
//!
//! Idle -> Probing -> Publishing -> Idle. Rounds are strictly sequential;
//! a round that overruns the interval delays the next tick instead of
//! overlapping with it.

use crate::snapshot::{RoundTimeouts, Snapshot, SnapshotAggregator, SnapshotPublisher};
use crate::targets::HostRegistry;
use crate::ScanResult;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// Shortest interval `run` will tick at
pub const MIN_INTERVAL: Duration = Duration::from_millis(100);

/// Where the scheduler is in its cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Probing,
    Publishing,
}

impl std::fmt::Display for SchedulerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SchedulerState::Idle => write!(f, "idle"),
            SchedulerState::Probing => write!(f, "probing"),
            SchedulerState::Publishing => write!(f, "publishing"),
        }
    }
}

pub struct RefreshScheduler {
    aggregator: Arc<SnapshotAggregator>,
    registry: Arc<HostRegistry>,
    ports: Arc<[u16]>,
    timeouts: RoundTimeouts,
    publisher: SnapshotPublisher,
    state: watch::Sender<SchedulerState>,
    shutdown: CancellationToken,
}

impl RefreshScheduler {
    pub fn new(
        aggregator: Arc<SnapshotAggregator>,
        registry: Arc<HostRegistry>,
        ports: Arc<[u16]>,
        timeouts: RoundTimeouts,
        publisher: SnapshotPublisher,
    ) -> Self {
        let (state, _) = watch::channel(SchedulerState::Idle);
        Self {
            aggregator,
            registry,
            ports,
            timeouts,
            publisher,
            state,
            shutdown: CancellationToken::new(),
        }
    }

    pub fn state(&self) -> SchedulerState {
        *self.state.borrow()
    }

    /// Receiver notified on every state transition
    pub fn watch_state(&self) -> watch::Receiver<SchedulerState> {
        self.state.subscribe()
    }

    /// Token that stops `run` when cancelled
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    pub fn publisher(&self) -> &SnapshotPublisher {
        &self.publisher
    }

    /// Run a single round and publish its snapshot
    pub async fn refresh_once(&self) -> ScanResult<Arc<Snapshot>> {
        self.round(&mut |_: Arc<Snapshot>| {}).await
    }

    /// Refresh every `interval` until the shutdown token is cancelled.
    ///
    /// The first round starts immediately. A failed round is logged and the
    /// previously published snapshot stays in place. Intervals shorter than
    /// `MIN_INTERVAL` are raised to it.
    pub async fn run<F>(&self, interval: Duration, mut on_snapshot: F)
    where
        F: FnMut(Arc<Snapshot>) + Send,
    {
        let interval = if interval < MIN_INTERVAL {
            log::warn!("Refresh interval {:?} too short, using {:?}", interval, MIN_INTERVAL);
            MIN_INTERVAL
        } else {
            interval
        };

        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut completed: u64 = 0;
        let mut failed: u64 = 0;

        log::info!(
            "Refreshing {} hosts every {:?} ({} liveness)",
            self.registry.len(),
            interval,
            self.aggregator.liveness_method()
        );

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => break,
                _ = ticker.tick() => {}
            }

            tokio::select! {
                _ = self.shutdown.cancelled() => break,
                result = self.round(&mut on_snapshot) => match result {
                    Ok(snapshot) => {
                        completed += 1;
                        log::info!(
                            "Round {} published: {}/{} hosts online",
                            completed + failed,
                            snapshot.online_count(),
                            snapshot.records.len()
                        );
                    }
                    Err(e) => {
                        failed += 1;
                        log::error!("Round {} failed, keeping previous snapshot: {}", completed + failed, e);
                    }
                },
            }
        }

        self.state.send_replace(SchedulerState::Idle);
        log::info!("Refresh scheduler stopped ({} rounds published, {} failed)", completed, failed);
    }

    async fn round<F>(&self, on_snapshot: &mut F) -> ScanResult<Arc<Snapshot>>
    where
        F: FnMut(Arc<Snapshot>) + Send,
    {
        self.state.send_replace(SchedulerState::Probing);

        let snapshot = match self
            .aggregator
            .build_snapshot(&self.registry, &self.ports, self.timeouts)
            .await
        {
            Ok(snapshot) => snapshot,
            Err(e) => {
                self.state.send_replace(SchedulerState::Idle);
                return Err(e);
            }
        };

        self.state.send_replace(SchedulerState::Publishing);
        let published = self.publisher.publish(snapshot);
        on_snapshot(Arc::clone(&published));
        self.state.send_replace(SchedulerState::Idle);

        Ok(published)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::{LivenessProbe, PortProbe};
    use crate::scanner::{LivenessProber, PortScanner};
    use crate::targets::HostEntry;
    use crate::ScanError;
    use std::net::IpAddr;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Every probe answers; the `fail_on`-th liveness round runs out of sockets
    struct FlakyNetwork {
        echoes: AtomicUsize,
        fail_on: usize,
    }

    #[async_trait::async_trait]
    impl LivenessProbe for FlakyNetwork {
        async fn echo(&self, _target: IpAddr, _timeout: Duration) -> ScanResult<bool> {
            let n = self.echoes.fetch_add(1, Ordering::SeqCst) + 1;
            if n == self.fail_on {
                Err(ScanError::ResourceExhausted("EMFILE".to_string()))
            } else {
                Ok(true)
            }
        }

        fn method_name(&self) -> &str {
            "flaky"
        }
    }

    #[async_trait::async_trait]
    impl PortProbe for FlakyNetwork {
        async fn connect(&self, _target: IpAddr, _port: u16) -> ScanResult<bool> {
            Ok(true)
        }
    }

    async fn scheduler(fail_on: usize) -> RefreshScheduler {
        let network = Arc::new(FlakyNetwork {
            echoes: AtomicUsize::new(0),
            fail_on,
        });
        let aggregator = SnapshotAggregator::new(
            LivenessProber::new(network.clone(), 8),
            PortScanner::new(network, 8),
        );
        let registry = HostRegistry::resolve(vec![HostEntry::new("10.1.1.1", "one")], Duration::from_millis(100))
            .await
            .unwrap();

        RefreshScheduler::new(
            Arc::new(aggregator),
            Arc::new(registry),
            Arc::from(vec![22u16]),
            RoundTimeouts::uniform(Duration::from_millis(100)),
            SnapshotPublisher::new(),
        )
    }

    #[tokio::test]
    async fn test_refresh_once_publishes() {
        let scheduler = scheduler(usize::MAX).await;
        let snapshot = scheduler.refresh_once().await.unwrap();

        assert_eq!(snapshot.records.len(), 1);
        assert_eq!(scheduler.state(), SchedulerState::Idle);
        assert!(scheduler.publisher().latest().is_some());
    }

    #[tokio::test]
    async fn test_failed_round_keeps_previous_snapshot() {
        let scheduler = scheduler(2).await;

        let first = scheduler.refresh_once().await.unwrap();
        assert!(scheduler.refresh_once().await.is_err());
        assert_eq!(scheduler.state(), SchedulerState::Idle);

        let current = scheduler.publisher().latest().unwrap();
        assert!(Arc::ptr_eq(&first, &current));
    }

    #[tokio::test]
    async fn test_run_survives_failure_and_stops_on_shutdown() {
        let scheduler = Arc::new(scheduler(2).await);
        let token = scheduler.shutdown_token();
        let published = Arc::new(AtomicUsize::new(0));

        let runner = {
            let scheduler = Arc::clone(&scheduler);
            let published = Arc::clone(&published);
            tokio::spawn(async move {
                scheduler
                    .run(Duration::from_millis(20), move |_| {
                        published.fetch_add(1, Ordering::SeqCst);
                    })
                    .await;
            })
        };

        tokio::time::sleep(Duration::from_millis(200)).await;
        token.cancel();
        tokio::time::timeout(Duration::from_secs(2), runner).await.unwrap().unwrap();

        // Round 2 failed, the loop kept going afterwards
        assert!(published.load(Ordering::SeqCst) >= 2);
        assert_eq!(scheduler.state(), SchedulerState::Idle);
    }

    #[tokio::test]
    async fn test_zero_interval_is_clamped() {
        let scheduler = Arc::new(scheduler(usize::MAX).await);
        let token = scheduler.shutdown_token();
        let published = Arc::new(AtomicUsize::new(0));

        let runner = {
            let scheduler = Arc::clone(&scheduler);
            let published = Arc::clone(&published);
            tokio::spawn(async move {
                scheduler
                    .run(Duration::ZERO, move |_| {
                        published.fetch_add(1, Ordering::SeqCst);
                    })
                    .await;
            })
        };

        tokio::time::sleep(Duration::from_millis(250)).await;
        token.cancel();
        tokio::time::timeout(Duration::from_secs(2), runner).await.unwrap().unwrap();

        // Ticks at 0, 100 and 200ms at most
        let rounds = published.load(Ordering::SeqCst);
        assert!((1..=3).contains(&rounds), "{} rounds", rounds);
    }
}
