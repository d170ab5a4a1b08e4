//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize, unknown keys rejected)
//!     → validation.rs (semantic checks)
//!     → AppConfig (raw, validated)
//!     → normalize.rs (region/env fallback, default names, default interval)
//!     → RefreshConfig (concrete, immutable) handed to the refresh engine
//! ```
//!
//! # Design Decisions
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - Normalization is infallible; everything that can fail happens at load time

pub mod duration;
pub mod loader;
pub mod normalize;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use normalize::{PrefixSpec, RefreshConfig};
pub use schema::{AppConfig, ObservabilityConfig, SourceConfig};
pub use validation::ValidationError;
