//! Defaulting and fallback ordering for source settings.
//!
//! Turns a raw [`SourceConfig`] into a [`RefreshConfig`] whose fields are all
//! concrete. Pure apart from the injected environment lookup.

use std::time::Duration;

use crate::config::schema::SourceConfig;
use crate::provider::CredentialRequest;

/// Region used when neither the config nor the environment names one.
pub const DEFAULT_REGION: &str = "us-east-1";

/// Refresh interval used when none (or zero) is configured.
pub const DEFAULT_REFRESH: Duration = Duration::from_secs(12 * 60 * 60);

/// Well-known name of the CloudFront origin-facing IPv4 prefix list.
pub const DEFAULT_LIST_NAME_V4: &str = "com.amazonaws.global.cloudfront.origin-facing";

/// Well-known name of the CloudFront origin-facing IPv6 prefix list.
pub const DEFAULT_LIST_NAME_V6: &str = "com.amazonaws.global.cloudfront.origin-facing-ipv6";

/// Environment variables consulted for the region, in order.
pub const REGION_ENV_VARS: [&str; 2] = ["AWS_REGION", "AWS_DEFAULT_REGION"];

/// How a prefix list is located.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrefixSpec {
    /// Use this identifier verbatim.
    Id(String),
    /// Look up the list whose name matches exactly.
    Name(String),
}

/// Fully resolved settings for the refresh engine.
#[derive(Debug, Clone, PartialEq)]
pub struct RefreshConfig {
    pub region: String,
    pub primary: PrefixSpec,
    /// `Some` only when the IPv6 list was requested.
    pub ipv6: Option<PrefixSpec>,
    pub refresh: Duration,
    pub require_nonempty: bool,
    pub profile: Option<String>,
    pub role_arn: Option<String>,
    pub pass_timeout: Option<Duration>,
}

impl RefreshConfig {
    /// Normalize against the process environment.
    pub fn from_source(source: &SourceConfig) -> Self {
        Self::normalize(source, |key| std::env::var(key).ok())
    }

    /// Normalize with an explicit environment lookup.
    pub fn normalize<F>(source: &SourceConfig, env: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let region = present(&source.region)
            .map(str::to_owned)
            .or_else(|| {
                REGION_ENV_VARS
                    .iter()
                    .filter_map(|key| env(key))
                    .find(|value| !value.is_empty())
            })
            .unwrap_or_else(|| DEFAULT_REGION.to_string());

        let refresh = match source.refresh {
            Some(interval) if !interval.is_zero() => interval,
            _ => DEFAULT_REFRESH,
        };

        let primary = match (present(&source.prefix_list_id), present(&source.prefix_list_name)) {
            (Some(id), _) => PrefixSpec::Id(id.to_string()),
            (None, Some(name)) => PrefixSpec::Name(name.to_string()),
            (None, None) => PrefixSpec::Name(DEFAULT_LIST_NAME_V4.to_string()),
        };

        let ipv6 = source.include_ipv6.then(|| {
            PrefixSpec::Name(
                present(&source.prefix_list_name_ipv6)
                    .unwrap_or(DEFAULT_LIST_NAME_V6)
                    .to_string(),
            )
        });

        Self {
            region,
            primary,
            ipv6,
            refresh,
            require_nonempty: source.require_nonempty,
            profile: present(&source.aws_profile).map(str::to_owned),
            role_arn: present(&source.role_arn).map(str::to_owned),
            pass_timeout: source.pass_timeout.filter(|timeout| !timeout.is_zero()),
        }
    }

    /// Whether the IPv6 variant list takes part in each pass.
    pub fn include_ipv6(&self) -> bool {
        self.ipv6.is_some()
    }

    /// Arguments for the credential resolver.
    pub fn credential_request(&self) -> CredentialRequest {
        CredentialRequest {
            region: self.region.clone(),
            profile: self.profile.clone(),
            role_arn: self.role_arn.clone(),
        }
    }
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}
