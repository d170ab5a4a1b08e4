//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use prefix_list_source::config::{RefreshConfig, SourceConfig};
use prefix_list_source::provider::memory::{StaticCredentials, StaticProvider};
use prefix_list_source::{IpNetwork, PrefixSource};

pub const V4_NAME: &str = "com.amazonaws.global.cloudfront.origin-facing";
pub const V6_NAME: &str = "com.amazonaws.global.cloudfront.origin-facing-ipv6";

/// Normalize `source` with an empty environment.
pub fn refresh_config(source: SourceConfig) -> RefreshConfig {
    RefreshConfig::normalize(&source, |_| None)
}

/// Share `provider` and wrap it in a credential resolver.
pub fn fixture(provider: StaticProvider) -> (Arc<StaticProvider>, Arc<StaticCredentials>) {
    let provider = Arc::new(provider);
    let credentials = Arc::new(StaticCredentials::new(provider.clone()));
    (provider, credentials)
}

pub fn nets(items: &[&str]) -> Vec<IpNetwork> {
    items.iter().map(|s| s.parse().unwrap()).collect()
}

/// Poll until the published generation reaches `generation`.
pub async fn wait_for_generation(source: &PrefixSource, generation: u64, timeout: Duration) {
    tokio::time::timeout(timeout, async {
        while source.snapshot().generation() < generation {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap_or_else(|_| panic!("generation {generation} not reached within {timeout:?}"));
}
