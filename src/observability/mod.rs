//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Refresh engine produces:
//!     → logging.rs (structured tracing events: installs, skips, failures)
//!     → metrics.rs (refresh outcomes, pass duration, published prefix count)
//!
//! Consumers:
//!     → Log output (stderr via tracing-subscriber fmt layer)
//!     → Metrics endpoint (Prometheus scrape, optional)
//! ```
//!
//! # Design Decisions
//! - The library only emits; subscribers and recorders are installed by the binary
//! - Metric calls are no-ops until a recorder is installed

pub mod logging;
pub mod metrics;
