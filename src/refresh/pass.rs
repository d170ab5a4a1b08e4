//! One refresh pass: credentials → identifiers → entries → install.

use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;

use crate::config::RefreshConfig;
use crate::observability::metrics;
use crate::provider::{CredentialResolver, PrefixListProvider};
use crate::refresh::fetcher::fetch_all;
use crate::refresh::resolver::resolve_list_id;
use crate::refresh::{PassOutcome, RefreshError};
use crate::snapshot::{InstallOutcome, SnapshotStore};

/// Runs refresh passes against one store, never more than one at a time.
pub struct RefreshPass {
    config: RefreshConfig,
    credentials: Arc<dyn CredentialResolver>,
    store: Arc<SnapshotStore>,
    in_flight: Mutex<()>,
}

impl RefreshPass {
    pub fn new(
        config: RefreshConfig,
        credentials: Arc<dyn CredentialResolver>,
        store: Arc<SnapshotStore>,
    ) -> Self {
        Self {
            config,
            credentials,
            store,
            in_flight: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &RefreshConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<SnapshotStore> {
        &self.store
    }

    /// Run one pass, or return [`PassOutcome::Skipped`] if one is already running.
    ///
    /// On error nothing is installed and the previous snapshot stays published.
    pub async fn run(&self) -> Result<PassOutcome, RefreshError> {
        let Ok(_guard) = self.in_flight.try_lock() else {
            tracing::debug!("Refresh pass already in flight, skipping");
            metrics::record_refresh("skipped");
            return Ok(PassOutcome::Skipped);
        };

        let start = Instant::now();
        let result = match self.config.pass_timeout {
            Some(limit) => tokio::time::timeout(limit, self.execute())
                .await
                .unwrap_or(Err(RefreshError::Timeout(limit))),
            None => self.execute().await,
        };
        metrics::record_refresh_duration(start);

        match result {
            Ok(outcome) => {
                metrics::record_refresh(outcome.label());
                Ok(PassOutcome::Installed(outcome))
            }
            Err(err) => {
                metrics::record_refresh("failed");
                Err(err)
            }
        }
    }

    async fn execute(&self) -> Result<InstallOutcome, RefreshError> {
        let provider = self
            .credentials
            .resolve(&self.config.credential_request())
            .await?;

        let list_ids = self.resolve_ids(provider.as_ref()).await?;
        let prefixes = fetch_all(provider.as_ref(), &list_ids).await?;

        tracing::debug!(
            lists = list_ids.len(),
            count = prefixes.len(),
            "Fetched prefixes"
        );
        self.store.install(prefixes)
    }

    async fn resolve_ids(
        &self,
        provider: &dyn PrefixListProvider,
    ) -> Result<Vec<String>, RefreshError> {
        let region = &self.config.region;
        let mut ids = Vec::with_capacity(2);

        match resolve_list_id(provider, &self.config.primary, region).await {
            Ok(id) => ids.push(id),
            Err(err) => {
                tracing::warn!(region = %region, error = %err, "Could not resolve primary prefix list, continuing");
            }
        }

        if let Some(spec) = &self.config.ipv6 {
            match resolve_list_id(provider, spec, region).await {
                Ok(id) if ids.contains(&id) => {}
                Ok(id) => ids.push(id),
                Err(err) => {
                    tracing::warn!(region = %region, error = %err, "Skipping IPv6 prefix list");
                }
            }
        }

        Ok(ids)
    }
}
