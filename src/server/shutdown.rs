// Signal handling for graceful server shutdown

use crate::error::{EvalError, Result};
use tokio::signal::unix::{signal, Signal as TokioSignal, SignalKind};

/// Waits for SIGTERM or SIGINT
pub struct ShutdownSignal {
    sigterm: TokioSignal,
    sigint: TokioSignal,
}

impl ShutdownSignal {
    pub fn new() -> Result<Self> {
        let sigterm = signal(SignalKind::terminate()).map_err(|e| EvalError::Io {
            source: e,
            context: "Failed to setup SIGTERM handler".to_string(),
        })?;
        let sigint = signal(SignalKind::interrupt()).map_err(|e| EvalError::Io {
            source: e,
            context: "Failed to setup SIGINT handler".to_string(),
        })?;

        Ok(Self { sigterm, sigint })
    }

    /// Resolves once either signal arrives
    pub async fn wait(mut self) {
        tokio::select! {
            _ = self.sigterm.recv() => {
                tracing::info!("Received SIGTERM, shutting down");
            }
            _ = self.sigint.recv() => {
                tracing::info!("Received SIGINT, shutting down");
            }
        }
    }
}
