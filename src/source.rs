//! Host-facing prefix source.
//!
//! # Data Flow
//! ```text
//! PrefixSource::start
//!     → initial RefreshPass::run (errors returned to the caller)
//!     → spawn RefreshScheduler::run(shutdown signal)
//!
//! current_prefixes / snapshot → SnapshotStore (lock-free reads)
//! refresh_now                 → RefreshPass::run (single-flight)
//! stop / shutdown             → close store → trigger signal → join task
//! ```

use ipnetwork::IpNetwork;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::task::JoinHandle;

use crate::config::RefreshConfig;
use crate::lifecycle::Shutdown;
use crate::provider::CredentialResolver;
use crate::refresh::{PassOutcome, RefreshError, RefreshPass, RefreshScheduler};
use crate::snapshot::{Snapshot, SnapshotStore};

/// Anything that can hand out the current list of trusted address ranges.
pub trait IpRangeSource: Send + Sync {
    fn current_prefixes(&self) -> Vec<IpNetwork>;
}

/// A periodically refreshed set of prefixes from managed prefix lists.
pub struct PrefixSource {
    pass: Arc<RefreshPass>,
    store: Arc<SnapshotStore>,
    shutdown: Shutdown,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl PrefixSource {
    /// Run the initial pass and start periodic refresh.
    ///
    /// Must be called from within a Tokio runtime. Any error from the initial pass
    /// is returned and nothing is spawned.
    pub async fn start(
        config: RefreshConfig,
        credentials: Arc<dyn CredentialResolver>,
    ) -> Result<Self, RefreshError> {
        let store = Arc::new(SnapshotStore::new(config.require_nonempty));
        let interval = config.refresh;
        let region = config.region.clone();
        let pass = Arc::new(RefreshPass::new(config, credentials, store.clone()));

        match pass.run().await? {
            PassOutcome::Installed(outcome) => {
                tracing::info!(
                    region = %region,
                    count = store.snapshot().len(),
                    outcome = outcome.label(),
                    "Initial prefix load complete"
                );
            }
            PassOutcome::Skipped => {}
        }

        let shutdown = Shutdown::new();
        let scheduler = RefreshScheduler::new(pass.clone(), interval);
        let task = tokio::spawn(scheduler.run(shutdown.subscribe()));

        Ok(Self {
            pass,
            store,
            shutdown,
            task: Mutex::new(Some(task)),
        })
    }

    /// Copy of the currently published prefixes.
    pub fn current_prefixes(&self) -> Vec<IpNetwork> {
        self.store.read()
    }

    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.store.snapshot()
    }

    pub fn config(&self) -> &RefreshConfig {
        self.pass.config()
    }

    /// Run a pass now instead of waiting for the next tick.
    ///
    /// Returns [`PassOutcome::Skipped`] if a pass is already running and
    /// [`RefreshError::Stopped`] once the source is stopped.
    pub async fn refresh_now(&self) -> Result<PassOutcome, RefreshError> {
        if self.stopped() {
            return Err(RefreshError::Stopped);
        }

        let mut signal = self.shutdown.subscribe();
        tokio::select! {
            biased;
            _ = signal.recv() => Err(RefreshError::Stopped),
            result = self.pass.run() => result,
        }
    }

    /// Stop periodic refresh. Safe to call any number of times.
    ///
    /// Once this returns no further install happens, even from a pass already running.
    pub fn stop(&self) {
        self.store.close();
        if self.shutdown.trigger() {
            tracing::info!("Prefix source stopping");
        }
    }

    pub fn stopped(&self) -> bool {
        self.shutdown.is_triggered()
    }

    /// Stop and wait for the background task to exit.
    pub async fn shutdown(&self) {
        self.stop();
        let task = self.task.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                tracing::error!(error = %e, "Refresh task ended abnormally");
            }
        }
    }
}

impl IpRangeSource for PrefixSource {
    fn current_prefixes(&self) -> Vec<IpNetwork> {
        self.store.read()
    }
}

impl Drop for PrefixSource {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for PrefixSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrefixSource")
            .field("region", &self.pass.config().region)
            .field("generation", &self.store.snapshot().generation())
            .field("stopped", &self.stopped())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::normalize::DEFAULT_LIST_NAME_V4;
    use crate::config::PrefixSpec;
    use crate::provider::memory::{StaticCredentials, StaticProvider};
    use std::time::Duration;

    fn config(require_nonempty: bool) -> RefreshConfig {
        RefreshConfig {
            region: "us-east-1".into(),
            primary: PrefixSpec::Name(DEFAULT_LIST_NAME_V4.into()),
            ipv6: None,
            refresh: Duration::from_secs(3600),
            require_nonempty,
            profile: None,
            role_arn: None,
            pass_timeout: None,
        }
    }

    fn credentials(provider: StaticProvider) -> (Arc<StaticProvider>, Arc<StaticCredentials>) {
        let provider = Arc::new(provider);
        (provider.clone(), Arc::new(StaticCredentials::new(provider)))
    }

    #[tokio::test]
    async fn test_start_loads_initial_set() {
        let (_, creds) = credentials(
            StaticProvider::new().with_list("pl-1", DEFAULT_LIST_NAME_V4, vec![vec!["10.0.0.0/8"]]),
        );
        let source = PrefixSource::start(config(true), creds).await.unwrap();

        assert_eq!(source.current_prefixes(), vec!["10.0.0.0/8".parse::<IpNetwork>().unwrap()]);
        assert_eq!(source.snapshot().generation(), 1);
        source.shutdown().await;
    }

    #[tokio::test]
    async fn test_start_fails_on_empty_when_required() {
        let (_, creds) = credentials(StaticProvider::new());
        let err = PrefixSource::start(config(true), creds).await.unwrap_err();
        assert!(matches!(err, RefreshError::FatalEmpty));
    }

    #[tokio::test]
    async fn test_start_allows_empty_when_not_required() {
        let (_, creds) = credentials(StaticProvider::new());
        let source = PrefixSource::start(config(false), creds).await.unwrap();
        assert!(source.current_prefixes().is_empty());
        source.shutdown().await;
    }

    #[tokio::test]
    async fn test_refresh_now_picks_up_changes() {
        let (provider, creds) = credentials(
            StaticProvider::new().with_list("pl-1", DEFAULT_LIST_NAME_V4, vec![vec!["10.0.0.0/8"]]),
        );
        let source = PrefixSource::start(config(false), creds).await.unwrap();

        provider.set_pages("pl-1", vec![vec!["192.168.0.0/16"]]);
        let outcome = source.refresh_now().await.unwrap();
        assert_eq!(outcome.label(), "replaced");
        assert_eq!(source.current_prefixes(), vec!["192.168.0.0/16".parse::<IpNetwork>().unwrap()]);
        source.shutdown().await;
    }

    #[tokio::test]
    async fn test_stop_is_idempotent_and_blocks_refresh() {
        let (_, creds) = credentials(
            StaticProvider::new().with_list("pl-1", DEFAULT_LIST_NAME_V4, vec![vec!["10.0.0.0/8"]]),
        );
        let source = PrefixSource::start(config(false), creds).await.unwrap();

        source.stop();
        source.stop();
        assert!(source.stopped());
        assert!(matches!(source.refresh_now().await, Err(RefreshError::Stopped)));

        source.shutdown().await;
        source.shutdown().await;
        source.stop();
        assert_eq!(source.current_prefixes(), vec!["10.0.0.0/8".parse::<IpNetwork>().unwrap()]);
    }

    #[tokio::test]
    async fn test_shutdown_after_poisoned_task_lock() {
        let (_, creds) = credentials(
            StaticProvider::new().with_list("pl-1", DEFAULT_LIST_NAME_V4, vec![vec!["10.0.0.0/8"]]),
        );
        let source = Arc::new(PrefixSource::start(config(false), creds).await.unwrap());
        let poisoner = source.clone();
        let _ = std::thread::spawn(move || {
            let _task = poisoner.task.lock().unwrap();
            panic!("panicked while holding the task handle");
        })
        .join();
        assert!(source.task.is_poisoned());

        tokio::time::timeout(Duration::from_secs(5), source.shutdown())
            .await
            .unwrap();
        assert!(source.stopped());
        assert!(source.task.lock().unwrap_or_else(PoisonError::into_inner).is_none());
    }

    #[tokio::test]
    async fn test_usable_as_trait_object() {
        let (_, creds) = credentials(
            StaticProvider::new().with_list("pl-1", DEFAULT_LIST_NAME_V4, vec![vec!["10.0.0.0/8"]]),
        );
        let source = Arc::new(PrefixSource::start(config(false), creds).await.unwrap());
        let ranges: Arc<dyn IpRangeSource> = source.clone();
        assert_eq!(ranges.current_prefixes().len(), 1);
        source.shutdown().await;
    }
}
