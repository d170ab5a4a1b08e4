//! Configuration schema definitions.
//!
//! This module defines the raw configuration structure as written in the
//! config file. All types derive Serde traits for deserialization; defaults
//! that depend on the environment are applied later by `normalize.rs`.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::duration;

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    /// Managed prefix list source settings.
    pub source: SourceConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Settings for the managed prefix list source.
///
/// Every field is optional; an empty string is treated the same as an
/// absent value.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct SourceConfig {
    /// Provider region (falls back to `AWS_REGION`, then `AWS_DEFAULT_REGION`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,

    /// Explicit prefix list identifier (e.g. `pl-3b927c52`); skips name lookup.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prefix_list_id: Option<String>,

    /// Prefix list name to look up when no identifier is given.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prefix_list_name: Option<String>,

    /// Name of the IPv6 variant list, used only with `include_ipv6`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prefix_list_name_ipv6: Option<String>,

    /// Also load the IPv6 variant list.
    pub include_ipv6: bool,

    /// Interval between background refreshes (e.g. `"12h"`).
    #[serde(with = "duration::option", skip_serializing_if = "Option::is_none")]
    pub refresh: Option<Duration>,

    /// Shared credentials profile to use instead of the default chain.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aws_profile: Option<String>,

    /// Role to assume on top of the base credentials.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role_arn: Option<String>,

    /// Fail startup when the first load yields no prefixes.
    pub require_nonempty: bool,

    /// Deadline for a single refresh pass. Unset means no deadline.
    #[serde(with = "duration::option", skip_serializing_if = "Option::is_none")]
    pub pass_timeout: Option<Duration>,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable the Prometheus metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
