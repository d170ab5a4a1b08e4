//! Refresh engine.
//!
//! # Data Flow
//! ```text
//! RefreshPass::run (startup, ticker, refresh_now)
//!     → CredentialResolver::resolve           (fresh client each pass)
//!     → resolver.rs: PrefixSpec → list id      (exact name match, id bypass)
//!     → fetcher.rs: pages → parsed, deduplicated prefixes
//!     → SnapshotStore::install                (replace / keep / empty / fatal)
//! ```
//!
//! # Design Decisions
//! - A pass either installs one complete result or nothing at all
//! - Passes never overlap; a trigger that finds one in flight is skipped
//! - The scheduler only logs errors; the first pass at startup is the only fatal one

use std::time::Duration;
use thiserror::Error;

use crate::provider::{AuthError, ProviderError};
use crate::snapshot::InstallOutcome;

pub mod fetcher;
pub mod pass;
pub mod resolver;
pub mod scheduler;

pub use pass::RefreshPass;
pub use scheduler::RefreshScheduler;

/// Errors that abort a refresh pass.
#[derive(Debug, Error)]
pub enum RefreshError {
    #[error("failed to resolve credentials: {0}")]
    Auth(#[from] AuthError),

    #[error("managed prefix list {name:?} not found in region {region}")]
    NotFound { name: String, region: String },

    #[error("failed to look up prefix list {name:?}: {source}")]
    Lookup {
        name: String,
        #[source]
        source: ProviderError,
    },

    #[error("failed to fetch entries of prefix list {list_id}: {source}")]
    Fetch {
        list_id: String,
        #[source]
        source: ProviderError,
    },

    #[error("no prefixes resolved and a non-empty set is required")]
    FatalEmpty,

    #[error("refresh pass exceeded {0:?}")]
    Timeout(Duration),

    #[error("prefix source is stopped")]
    Stopped,
}

impl RefreshError {
    /// Short label used for the `outcome` metric and log fields.
    pub fn label(&self) -> &'static str {
        match self {
            RefreshError::Auth(_) => "auth",
            RefreshError::NotFound { .. } => "not_found",
            RefreshError::Lookup { .. } => "lookup",
            RefreshError::Fetch { .. } => "fetch",
            RefreshError::FatalEmpty => "fatal_empty",
            RefreshError::Timeout(_) => "timeout",
            RefreshError::Stopped => "stopped",
        }
    }
}

/// Result of a refresh pass that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassOutcome {
    /// The pass ran to completion and the store applied its install policy.
    Installed(InstallOutcome),
    /// Another pass was already running; nothing was done.
    Skipped,
}

impl PassOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            PassOutcome::Installed(outcome) => outcome.label(),
            PassOutcome::Skipped => "skipped",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_names_list_and_region() {
        let err = RefreshError::NotFound {
            name: "com.amazonaws.global.cloudfront.origin-facing".into(),
            region: "eu-west-1".into(),
        };
        let message = err.to_string();
        assert!(message.contains("com.amazonaws.global.cloudfront.origin-facing"));
        assert!(message.contains("eu-west-1"));
    }

    #[test]
    fn test_auth_error_converts() {
        let err: RefreshError = AuthError::Rejected("expired".into()).into();
        assert_eq!(err.label(), "auth");
        assert!(err.to_string().contains("expired"));
    }
}
