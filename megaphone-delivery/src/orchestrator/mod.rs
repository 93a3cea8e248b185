//! Broadcast run orchestration
//!
//! A run moves through a fixed sequence of passes:
//!
//! ```text
//! Idle ──try_acquire──> Running
//!   primary chats      (unless excluded)     snapshot, batched, optional pin
//!   secondary users    (if requested)        snapshot, batched, never pinned
//!   secondary identities (if requested)      live dialogs, per-identity pacing
//! Running ──guard dropped──> Idle
//! ```
//!
//! The guard is dropped on every exit path, so the orchestrator cannot be
//! left stuck in the running state.

mod guard;
mod identity;
mod notice;

use std::sync::Arc;

use megaphone_common::{internal, tracing};
use tracing::Instrument;

pub use guard::{RunGuard, SingleFlight};
pub use notice::Notice;

use crate::{
    config::BroadcastConfig,
    dispatcher::BatchDispatcher,
    error::BroadcastError,
    prune::{DestinationPruner, PruneCapabilities},
    request::{BroadcastCommand, DeliveryRequest},
    traits::{Directory, StatusHandle, StatusSink, Transport},
    types::{BroadcastSummary, DeliveryReport, Destination, DestinationKind, RunId},
};

/// The external services a broadcast runs against
#[derive(Clone)]
pub struct Collaborators {
    pub directory: Arc<dyn Directory>,
    pub transport: Arc<dyn Transport>,
    pub capabilities: PruneCapabilities,
}

/// Coordinates broadcast runs, one at a time
pub struct BroadcastOrchestrator {
    config: BroadcastConfig,
    directory: Arc<dyn Directory>,
    dispatcher: BatchDispatcher,
    flight: SingleFlight,
}

impl BroadcastOrchestrator {
    /// Build an orchestrator sharing the process-wide run guard, so at most one
    /// broadcast runs per process however many orchestrators exist.
    #[must_use]
    pub fn new(config: BroadcastConfig, collaborators: Collaborators) -> Self {
        Self::with_flight(config, collaborators, SingleFlight::process_wide())
    }

    /// Build an orchestrator guarded by `flight` instead of the process-wide guard.
    #[must_use]
    pub fn with_flight(
        config: BroadcastConfig,
        collaborators: Collaborators,
        flight: SingleFlight,
    ) -> Self {
        internal!(
            "Initialising broadcast orchestrator (chat batch {}, user batch {}, {} secondary identities)",
            config.chat_batch_size,
            config.user_batch_size,
            config.secondary_identities.len()
        );

        let pruner = Arc::new(DestinationPruner::new(collaborators.capabilities));
        let dispatcher = BatchDispatcher::new(
            collaborators.transport,
            pruner,
            config.backoff(),
            config.pacing(),
        );

        Self {
            config,
            directory: collaborators.directory,
            dispatcher,
            flight,
        }
    }

    /// Whether a run is currently in progress
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.flight.is_running()
    }

    #[must_use]
    pub const fn config(&self) -> &BroadcastConfig {
        &self.config
    }

    /// Execute a broadcast command.
    ///
    /// Malformed commands and commands arriving while another run is active
    /// are refused with a notice to `sink` and leave no trace. Once a run has
    /// started it always completes; individual delivery failures only show up
    /// in the returned counts.
    pub async fn broadcast(
        &self,
        command: &BroadcastCommand,
        sink: &dyn StatusSink,
    ) -> Result<BroadcastSummary, BroadcastError> {
        let request = match DeliveryRequest::from_command(command) {
            Ok(request) => request,
            Err(e) => return Err(reject(sink, e).await),
        };

        let Some(_guard) = self.flight.try_acquire() else {
            return Err(reject(sink, BroadcastError::AlreadyRunning).await);
        };

        let run_id = RunId::new();
        let span = tracing::info_span!("broadcast", run_id = %run_id);

        Ok(self.run(run_id, &request, sink).instrument(span).await)
    }

    async fn run(
        &self,
        run_id: RunId,
        request: &DeliveryRequest,
        sink: &dyn StatusSink,
    ) -> BroadcastSummary {
        let flags = request.flags();
        tracing::info!(flags = ?flags, "Broadcast started");
        notify(sink, &Notice::Started).await;

        let mut summary = BroadcastSummary {
            run_id,
            chats: None,
            users: None,
            identities: Vec::new(),
            errors: Vec::new(),
        };

        if !flags.exclude_primary_chats {
            match self.pass(DestinationKind::PrimaryChat, request, sink).await {
                Ok(report) => {
                    notify(
                        sink,
                        &Notice::ChatSummary {
                            sent: report.sent,
                            pinned: report.pinned,
                        },
                    )
                    .await;
                    summary.chats = Some(report);
                }
                Err(e) => summary.errors.push(e),
            }
        }

        if flags.include_secondary_users {
            match self.pass(DestinationKind::SecondaryUser, request, sink).await {
                Ok(report) => {
                    notify(sink, &Notice::UserSummary { sent: report.sent }).await;
                    summary.users = Some(report);
                }
                Err(e) => summary.errors.push(e),
            }
        }

        if flags.include_secondary_identities {
            summary.identities = identity::deliver_via_identities(
                &*self.directory,
                &self.config.secondary_identities,
                request.payload(),
                self.config.pacing(),
                sink,
            )
            .await;
        }

        tracing::info!(
            chats_sent = summary.chats.as_ref().map_or(0, |r| r.sent),
            chats_failed = summary.chats.as_ref().map_or(0, |r| r.failed.len()),
            users_sent = summary.users.as_ref().map_or(0, |r| r.sent),
            users_failed = summary.users.as_ref().map_or(0, |r| r.failed.len()),
            "Broadcast finished"
        );

        summary
    }

    /// Snapshot one destination class and dispatch to it.
    ///
    /// Fails only when the snapshot cannot be fetched; the run carries on with
    /// its next pass.
    async fn pass(
        &self,
        kind: DestinationKind,
        request: &DeliveryRequest,
        sink: &dyn StatusSink,
    ) -> Result<DeliveryReport, BroadcastError> {
        let (snapshot, batch_size, pin) = match kind {
            DestinationKind::PrimaryChat => (
                self.directory.primary_chats().await,
                self.config.chat_batch_size,
                request.flags().pin_mode(),
            ),
            DestinationKind::SecondaryUser => (
                self.directory.secondary_users().await,
                self.config.user_batch_size,
                None,
            ),
        };

        let ids = match snapshot {
            Ok(ids) => ids,
            Err(e) => {
                tracing::warn!(kind = %kind, error = %e, "Could not fetch destinations");
                notify(sink, &Notice::PassFailed(kind)).await;
                return Err(e.into());
            }
        };

        let destinations: Vec<Destination> = ids
            .into_iter()
            .map(|id| Destination { id, kind })
            .collect();

        tracing::info!(kind = %kind, count = destinations.len(), "Delivering pass");

        let report = self
            .dispatcher
            .dispatch(&destinations, request.payload(), pin, batch_size)
            .await;

        tracing::info!(
            kind = %kind,
            attempted = report.attempted(),
            sent = report.sent,
            pruned = report.terminal.len(),
            "Pass complete"
        );

        Ok(report)
    }
}

/// Send a notice, swallowing sink failures.
pub(crate) async fn notify(sink: &dyn StatusSink, notice: &Notice) -> Option<StatusHandle> {
    match sink.reply(&notice.to_string()).await {
        Ok(handle) => Some(handle),
        Err(e) => {
            tracing::debug!(error = %e, "Failed to deliver notice");
            None
        }
    }
}

async fn reject(sink: &dyn StatusSink, error: BroadcastError) -> BroadcastError {
    tracing::info!(reason = %error, "Broadcast refused");
    notify(sink, &Notice::Rejected(error.clone())).await;
    error
}
