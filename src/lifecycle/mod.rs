//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Shutdown (shutdown.rs):
//!     stop() → trigger → scheduler loop exits → in-flight pass abandoned
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → LifecycleEvent::Shutdown
//!     SIGHUP → LifecycleEvent::Refresh
//! ```
//!
//! # Design Decisions
//! - Shutdown is a sticky flag; triggering it twice is harmless
//! - Signal handling lives in the binary; the library only consumes `ShutdownSignal`

pub mod shutdown;
pub mod signals;

pub use shutdown::{Shutdown, ShutdownSignal};
pub use signals::{LifecycleEvent, SignalListener};
