//! Provider capability seam.
//!
//! # Data Flow
//! ```text
//! CredentialRequest (region, profile?, role?)
//!     → CredentialResolver::resolve (once per refresh pass)
//!     → Arc<dyn PrefixListProvider>
//!         → describe_lists(name filter)      (name → identifier lookup)
//!         → get_list_entries(id, page token)  (paged entry listing)
//! ```
//!
//! # Design Decisions
//! - The refresh engine only sees these two traits; SDK types never leak past `aws.rs`
//! - `memory.rs` provides an in-process implementation for tests and local runs
//! - Errors are classified coarsely; the engine treats every kind the same way

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

#[cfg(feature = "aws")]
pub mod aws;
pub mod memory;

/// A managed prefix list as returned by a name lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListSummary {
    pub id: String,
    pub name: String,
}

/// One entry of a managed prefix list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrefixEntry {
    /// Address range text, e.g. `"130.176.0.0/18"`. May be absent in provider responses.
    pub cidr: Option<String>,
}

/// One page of entries plus the token for the next page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryPage {
    pub entries: Vec<PrefixEntry>,
    /// `None` or an empty string means there are no further pages.
    pub next_token: Option<String>,
}

/// Errors returned by a provider call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    #[error("not authorized: {0}")]
    Unauthorized(String),

    #[error("request throttled: {0}")]
    Throttled(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("service error: {0}")]
    Service(String),
}

/// Errors produced while building an authenticated provider client.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("no credentials available for region {region}")]
    NoCredentials { region: String },

    #[error("credentials rejected: {0}")]
    Rejected(String),
}

/// What the credential resolver needs to build a client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialRequest {
    pub region: String,
    pub profile: Option<String>,
    pub role_arn: Option<String>,
}

/// Read access to a provider's managed prefix lists.
#[async_trait]
pub trait PrefixListProvider: Send + Sync {
    /// Lists whose name matches `name_filter`. Providers may match loosely
    /// (prefix or substring), so callers must check names themselves.
    async fn describe_lists(&self, name_filter: &str) -> Result<Vec<ListSummary>, ProviderError>;

    /// One page of entries for `list_id`, starting at `page_token` (`None` for the first page).
    async fn get_list_entries(
        &self,
        list_id: &str,
        page_token: Option<&str>,
        max_results: u32,
    ) -> Result<EntryPage, ProviderError>;
}

/// Produces an authenticated provider client.
#[async_trait]
pub trait CredentialResolver: Send + Sync {
    async fn resolve(
        &self,
        request: &CredentialRequest,
    ) -> Result<Arc<dyn PrefixListProvider>, AuthError>;
}
