//! OS shutdown signals.

use tracing::info;

/// Installed shutdown signal listeners.
///
/// Installing happens up front so a failure is reported at startup rather
/// than when the first signal arrives.
#[cfg(unix)]
pub struct ShutdownSignals {
    sigint: tokio::signal::unix::Signal,
    sigterm: tokio::signal::unix::Signal,
}

#[cfg(unix)]
impl ShutdownSignals {
    pub fn install() -> std::io::Result<Self> {
        use tokio::signal::unix::{SignalKind, signal};

        Ok(Self {
            sigint: signal(SignalKind::interrupt())?,
            sigterm: signal(SignalKind::terminate())?,
        })
    }

    /// Wait for SIGINT or SIGTERM.
    pub async fn recv(mut self) {
        tokio::select! {
            _ = self.sigint.recv() => info!(signal = "SIGINT", "received shutdown signal"),
            _ = self.sigterm.recv() => info!(signal = "SIGTERM", "received shutdown signal"),
        }
    }
}

#[cfg(not(unix))]
pub struct ShutdownSignals;

#[cfg(not(unix))]
impl ShutdownSignals {
    pub fn install() -> std::io::Result<Self> {
        Ok(Self)
    }

    pub async fn recv(self) {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!(signal = "ctrl-c", "received shutdown signal"),
            Err(e) => {
                tracing::warn!(error = %e, "ctrl-c handler failed, running until killed");
                std::future::pending::<()>().await
            }
        }
    }
}
