//! Runtime - graceful shutdown and signal handling for the serve path

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;

/// Shutdown signal broadcaster
#[derive(Clone)]
pub struct Shutdown {
    sender: broadcast::Sender<()>,
    triggered: Arc<AtomicBool>,
}

impl Default for Shutdown {
    fn default() -> Self { Self::new() }
}

impl Shutdown {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(1);
        Self { sender, triggered: Arc::new(AtomicBool::new(false)) }
    }

    /// Subscribe to the shutdown signal
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.sender.subscribe()
    }

    /// Trigger shutdown; later calls are no-ops
    pub fn trigger(&self) {
        if !self.triggered.swap(true, Ordering::SeqCst) {
            let _ = self.sender.send(());
        }
    }

    pub fn is_triggered(&self) -> bool {
        self.triggered.load(Ordering::SeqCst)
    }
}

/// Install signal handlers and return shutdown handle
pub fn install_signal_handlers() -> Shutdown {
    let shutdown = Shutdown::new();
    let handle = shutdown.clone();

    tokio::spawn(async move {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};
            let mut sigterm = signal(SignalKind::terminate()).expect("SIGTERM handler");
            let mut sigint = signal(SignalKind::interrupt()).expect("SIGINT handler");

            tokio::select! {
                _ = sigterm.recv() => tracing::info!("Received SIGTERM"),
                _ = sigint.recv() => tracing::info!("Received SIGINT"),
            }
        }

        #[cfg(not(unix))]
        {
            tokio::signal::ctrl_c().await.expect("Ctrl+C handler");
            tracing::info!("Received Ctrl+C");
        }

        handle.trigger();
    });

    shutdown
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn trigger_notifies_subscribers() {
        let shutdown = Shutdown::new();
        assert!(!shutdown.is_triggered());

        let mut rx = shutdown.subscribe();
        shutdown.trigger();
        shutdown.trigger();

        assert!(shutdown.is_triggered());
        let result = tokio::time::timeout(std::time::Duration::from_millis(100), rx.recv()).await;
        assert!(result.is_ok());
    }
}
