//! Process shutdown signals

#[cfg(unix)]
use tokio::signal::unix::{signal, Signal, SignalKind};
use tracing::error;

use crate::errors::StationError;

/// Interrupt and terminate listeners, registered when built so a signal
/// arriving before the first poll is not lost
pub struct Shutdown {
    #[cfg(unix)]
    terminate: Signal,
}

impl Shutdown {
    pub fn install() -> Result<Self, StationError> {
        Ok(Self {
            #[cfg(unix)]
            terminate: signal(SignalKind::terminate())?,
        })
    }

    /// Wait for the first shutdown signal and return its name
    #[cfg(unix)]
    pub async fn recv(mut self) -> &'static str {
        tokio::select! {
            _ = ctrl_c() => "SIGINT",
            _ = self.terminate.recv() => "SIGTERM",
        }
    }

    #[cfg(not(unix))]
    pub async fn recv(self) -> &'static str {
        ctrl_c().await;
        "ctrl-c"
    }
}

async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for interrupt signal: {}", e);
        std::future::pending::<()>().await;
    }
}
