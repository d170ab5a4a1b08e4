//! Managed prefix list source.
//!
//! Keeps an in-memory copy of the address ranges published in a cloud
//! provider's managed prefix list (by default the CloudFront origin-facing
//! list) and refreshes it periodically, so a host can decide which peers are
//! trusted proxies.

pub mod config;
pub mod lifecycle;
pub mod observability;
pub mod provider;
pub mod refresh;
pub mod snapshot;
pub mod source;

pub use config::{AppConfig, RefreshConfig};
pub use ipnetwork::IpNetwork;
pub use provider::{CredentialResolver, PrefixListProvider};
pub use refresh::{PassOutcome, RefreshError};
pub use snapshot::Snapshot;
pub use source::{IpRangeSource, PrefixSource};
