//! Periodic refresh loop.
//!
//! # Responsibilities
//! - Run one pass per interval until shutdown
//! - Log and swallow pass errors
//! - Abandon an in-flight pass when shutdown arrives
//!
//! # Design Decisions
//! - The first tick fires one full interval after start; the initial pass runs before the loop
//! - Missed ticks are dropped, not queued (`MissedTickBehavior::Skip`)

use std::sync::Arc;
use std::time::Duration;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::config::normalize::DEFAULT_REFRESH;
use crate::lifecycle::ShutdownSignal;
use crate::refresh::{PassOutcome, RefreshPass};

pub struct RefreshScheduler {
    pass: Arc<RefreshPass>,
    interval: Duration,
}

impl RefreshScheduler {
    /// A zero `interval` falls back to the default refresh period.
    pub fn new(pass: Arc<RefreshPass>, interval: Duration) -> Self {
        let interval = if interval.is_zero() {
            DEFAULT_REFRESH
        } else {
            interval
        };
        Self { pass, interval }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub async fn run(self, mut shutdown: ShutdownSignal) {
        if shutdown.is_triggered() {
            return;
        }

        tracing::info!(interval = ?self.interval, "Refresh scheduler starting");

        let mut ticker = time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;
                _ = shutdown.recv() => break,
                scheduled = ticker.tick() => {
                    let lag = Instant::now().saturating_duration_since(scheduled);
                    if lag >= self.interval {
                        tracing::warn!(lag = ?lag, "Refresh tick overran its interval; missed ticks skipped");
                    }

                    tokio::select! {
                        biased;
                        _ = shutdown.recv() => {
                            tracing::info!("Abandoning in-flight refresh pass");
                            break;
                        }
                        result = self.pass.run() => match result {
                            Ok(PassOutcome::Installed(outcome)) => {
                                tracing::debug!(outcome = outcome.label(), "Periodic refresh complete");
                            }
                            Ok(PassOutcome::Skipped) => {
                                tracing::info!("Refresh tick skipped, previous pass still running");
                            }
                            Err(e) => {
                                tracing::error!(error = %e, "Periodic refresh failed; keeping previous prefixes");
                            }
                        },
                    }
                }
            }
        }

        tracing::info!("Refresh scheduler stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::normalize::DEFAULT_LIST_NAME_V4;
    use crate::config::{PrefixSpec, RefreshConfig};
    use crate::lifecycle::Shutdown;
    use crate::provider::memory::{StaticCredentials, StaticProvider};
    use crate::provider::ProviderError;
    use crate::snapshot::SnapshotStore;
    use ipnetwork::IpNetwork;

    fn pass_with(provider: Arc<StaticProvider>, interval: Duration) -> Arc<RefreshPass> {
        let config = RefreshConfig {
            region: "us-east-1".into(),
            primary: PrefixSpec::Name(DEFAULT_LIST_NAME_V4.into()),
            ipv6: None,
            refresh: interval,
            require_nonempty: false,
            profile: None,
            role_arn: None,
            pass_timeout: None,
        };
        let credentials = Arc::new(StaticCredentials::new(provider));
        Arc::new(RefreshPass::new(
            config,
            credentials,
            Arc::new(SnapshotStore::new(false)),
        ))
    }

    #[test]
    fn test_zero_interval_uses_default() {
        let pass = pass_with(Arc::new(StaticProvider::new()), Duration::ZERO);
        assert_eq!(RefreshScheduler::new(pass, Duration::ZERO).interval(), DEFAULT_REFRESH);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticks_run_passes() {
        let provider = Arc::new(
            StaticProvider::new().with_list("pl-1", DEFAULT_LIST_NAME_V4, vec![vec!["10.0.0.0/8"]]),
        );
        let interval = Duration::from_secs(60);
        let pass = pass_with(provider.clone(), interval);
        let shutdown = Shutdown::new();
        let task = tokio::spawn(RefreshScheduler::new(pass.clone(), interval).run(shutdown.subscribe()));

        time::sleep(Duration::from_secs(30)).await;
        assert_eq!(provider.describe_calls(), 0);

        time::sleep(Duration::from_secs(60)).await;
        assert_eq!(pass.store().snapshot().generation(), 1);

        time::sleep(Duration::from_secs(60)).await;
        assert_eq!(pass.store().snapshot().generation(), 2);

        shutdown.trigger();
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_errors_do_not_stop_the_loop() {
        let provider = Arc::new(
            StaticProvider::new().with_list("pl-1", DEFAULT_LIST_NAME_V4, vec![vec!["10.0.0.0/8"]]),
        );
        provider.fail_entries(Some(ProviderError::Throttled("slow down".into())));
        let interval = Duration::from_secs(10);
        let pass = pass_with(provider.clone(), interval);
        let shutdown = Shutdown::new();
        let task = tokio::spawn(RefreshScheduler::new(pass.clone(), interval).run(shutdown.subscribe()));

        time::sleep(Duration::from_secs(25)).await;
        assert_eq!(provider.entry_calls(), 2);
        assert_eq!(pass.store().snapshot().generation(), 0);

        provider.fail_entries(None);
        time::sleep(Duration::from_secs(10)).await;
        assert_eq!(pass.store().read(), vec!["10.0.0.0/8".parse::<IpNetwork>().unwrap()]);

        shutdown.trigger();
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_abandons_in_flight_pass() {
        let provider = Arc::new(
            StaticProvider::new().with_list("pl-1", DEFAULT_LIST_NAME_V4, vec![vec!["10.0.0.0/8"]]),
        );
        provider.set_entries_delay(Some(Duration::from_secs(30)));
        let interval = Duration::from_secs(10);
        let pass = pass_with(provider.clone(), interval);
        let shutdown = Shutdown::new();
        let task = tokio::spawn(RefreshScheduler::new(pass.clone(), interval).run(shutdown.subscribe()));

        time::sleep(Duration::from_secs(15)).await;
        assert_eq!(provider.entry_calls(), 1);

        shutdown.trigger();
        task.await.unwrap();

        time::sleep(Duration::from_secs(120)).await;
        assert_eq!(pass.store().snapshot().generation(), 0);
        assert_eq!(provider.entry_calls(), 1);
    }

    #[tokio::test]
    async fn test_already_triggered_returns_immediately() {
        let pass = pass_with(Arc::new(StaticProvider::new()), Duration::from_secs(1));
        let shutdown = Shutdown::new();
        shutdown.trigger();
        time::timeout(
            Duration::from_secs(1),
            RefreshScheduler::new(pass, Duration::from_secs(1)).run(shutdown.subscribe()),
        )
        .await
        .unwrap();
    }
}
