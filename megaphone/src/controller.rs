use std::sync::Arc;

use megaphone_common::{Signal, internal, logging, tracing};
use megaphone_delivery::{AdminCache, BackgroundReconciler, BroadcastOrchestrator, Collaborators};
use tokio::{sync::broadcast, task::JoinHandle};

use crate::config::MegaphoneConfig;

/// Owns the broadcast engine and its long-lived tasks
pub struct Megaphone {
    orchestrator: Arc<BroadcastOrchestrator>,
    reconciler: Arc<BackgroundReconciler>,
    admins: AdminCache,
    shutdown: broadcast::Sender<Signal>,
}

impl Megaphone {
    #[must_use]
    pub fn new(config: MegaphoneConfig, collaborators: Collaborators) -> Self {
        let admins = AdminCache::new();
        let reconciler = BackgroundReconciler::new(
            &config.reconciler,
            Arc::clone(&collaborators.directory),
            Arc::clone(&collaborators.transport),
            admins.clone(),
        );
        let (shutdown, _receiver) = broadcast::channel(64);

        Self {
            orchestrator: Arc::new(BroadcastOrchestrator::new(config.broadcast, collaborators)),
            reconciler: Arc::new(reconciler),
            admins,
            shutdown,
        }
    }

    /// The orchestrator the command layer submits broadcasts to
    #[must_use]
    pub fn orchestrator(&self) -> Arc<BroadcastOrchestrator> {
        Arc::clone(&self.orchestrator)
    }

    /// The operator cache kept fresh by the reconciler
    #[must_use]
    pub fn admins(&self) -> AdminCache {
        self.admins.clone()
    }

    /// Sending [`Signal::Shutdown`] here stops [`Megaphone::run`]
    #[must_use]
    pub fn shutdown_handle(&self) -> broadcast::Sender<Signal> {
        self.shutdown.clone()
    }

    /// Spawn the reconciler, stopped by the next shutdown signal.
    pub fn start_reconciler(&self) -> JoinHandle<()> {
        let reconciler = Arc::clone(&self.reconciler);
        let shutdown = self.shutdown.subscribe();

        tokio::spawn(async move { reconciler.serve(shutdown).await })
    }

    /// Run until SIGINT, SIGTERM or a shutdown signal, then stop every task.
    ///
    /// # Errors
    ///
    /// This function will return an error if the signal handlers cannot be
    /// installed or the reconciler task panicked.
    pub async fn run(self) -> anyhow::Result<()> {
        logging::init();
        internal!(level = INFO, "Megaphone running");

        let reconciler = self.start_reconciler();
        let mut stop = self.shutdown.subscribe();

        tokio::select! {
            r = os_signal() => r?,
            sig = stop.recv() => {
                tracing::debug!("Stop requested: {sig:?}");
            }
        }

        internal!(level = INFO, "Shutting down...");

        if self.shutdown.send(Signal::Shutdown).is_err() {
            tracing::debug!("No tasks left to notify of shutdown");
        }

        reconciler.await?;

        internal!("Megaphone stopped");
        Ok(())
    }
}

async fn os_signal() -> anyhow::Result<()> {
    let mut terminate = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;

    tokio::select! {
        r = tokio::signal::ctrl_c() => {
            r?;
            internal!(level = INFO, "CTRL+C entered, shutting down");
        }
        _ = terminate.recv() => {
            internal!(level = INFO, "Terminate signal received, shutting down");
        }
    }

    Ok(())
}
