//! OS signal handling.
//!
//! # Responsibilities
//! - Register signal handlers (SIGTERM, SIGINT, SIGHUP)
//! - Translate signals to lifecycle events
//!
//! # Design Decisions
//! - Uses Tokio's signal handling (async-safe)
//! - SIGHUP requests an immediate refresh, not shutdown
//! - Non-unix platforms only get Ctrl-C

/// What the process should do in response to a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    Shutdown,
    Refresh,
}

#[cfg(unix)]
pub struct SignalListener {
    terminate: tokio::signal::unix::Signal,
    interrupt: tokio::signal::unix::Signal,
    hangup: tokio::signal::unix::Signal,
}

#[cfg(unix)]
impl SignalListener {
    pub fn new() -> std::io::Result<Self> {
        use tokio::signal::unix::{signal, SignalKind};

        Ok(Self {
            terminate: signal(SignalKind::terminate())?,
            interrupt: signal(SignalKind::interrupt())?,
            hangup: signal(SignalKind::hangup())?,
        })
    }

    /// Wait for the next signal of interest.
    pub async fn next(&mut self) -> LifecycleEvent {
        tokio::select! {
            _ = self.terminate.recv() => {
                tracing::info!("Received SIGTERM");
                LifecycleEvent::Shutdown
            }
            _ = self.interrupt.recv() => {
                tracing::info!("Received SIGINT");
                LifecycleEvent::Shutdown
            }
            _ = self.hangup.recv() => {
                tracing::info!("Received SIGHUP");
                LifecycleEvent::Refresh
            }
        }
    }
}

#[cfg(not(unix))]
pub struct SignalListener;

#[cfg(not(unix))]
impl SignalListener {
    pub fn new() -> std::io::Result<Self> {
        Ok(Self)
    }

    pub async fn next(&mut self) -> LifecycleEvent {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
        } else {
            tracing::info!("Received Ctrl-C");
        }
        LifecycleEvent::Shutdown
    }
}
