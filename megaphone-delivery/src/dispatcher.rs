//! Batched, paced delivery of one payload to a destination snapshot
//!
//! Destinations are processed strictly in order, one at a time. Every
//! destination resolves to a [`DeliveryOutcome`]; no error can leave the
//! batch loop.

use std::sync::Arc;

use megaphone_common::{outbound, tracing};

use crate::{
    classify::classify,
    error::DeliveryError,
    prune::DestinationPruner,
    rate_limiter::{Backoff, BackoffPolicy, Pacing},
    traits::Transport,
    types::{DeliveryOutcome, DeliveryReport, Destination, Payload, PinMode, SentMessage},
};

/// Delivers a payload to a list of destinations in fixed-size batches
#[derive(Clone)]
pub struct BatchDispatcher {
    transport: Arc<dyn Transport>,
    pruner: Arc<DestinationPruner>,
    backoff: BackoffPolicy,
    pacing: Pacing,
}

impl BatchDispatcher {
    #[must_use]
    pub fn new(
        transport: Arc<dyn Transport>,
        pruner: Arc<DestinationPruner>,
        backoff: BackoffPolicy,
        pacing: Pacing,
    ) -> Self {
        Self {
            transport,
            pruner,
            backoff,
            pacing,
        }
    }

    /// Deliver `payload` to every destination, `batch_size` at a time.
    ///
    /// The per-message pause follows every destination and the per-batch pause
    /// follows every batch, including the last one.
    pub async fn dispatch(
        &self,
        destinations: &[Destination],
        payload: &Payload,
        pin: Option<PinMode>,
        batch_size: usize,
    ) -> DeliveryReport {
        let mut report = DeliveryReport::default();

        for batch in destinations.chunks(batch_size.max(1)) {
            report.batches += 1;
            tracing::debug!(
                batch = report.batches,
                size = batch.len(),
                "Delivering batch"
            );

            for destination in batch {
                let outcome = self.deliver(*destination, payload, pin).await;
                report.record(destination.id, outcome);
                self.pacing.after_message().await;
            }

            self.pacing.after_batch().await;
        }

        report
    }

    /// Deliver to a single destination, retrying once after a served backoff.
    async fn deliver(
        &self,
        destination: Destination,
        payload: &Payload,
        pin: Option<PinMode>,
    ) -> DeliveryOutcome {
        outbound!(destination = destination.id, kind = %destination.kind, "Delivering");

        let result = match payload.send(&*self.transport, destination.id).await {
            Err(error) => match error.rate_limit_wait() {
                Some(wait_secs) => match self.backoff.wait_for(wait_secs).await {
                    Backoff::Retry => payload.send(&*self.transport, destination.id).await,
                    Backoff::Skip => Err(error),
                },
                None => Err(error),
            },
            sent => sent,
        };

        match result {
            Ok(sent) => match pin {
                Some(mode) if self.pin(&sent, mode).await => DeliveryOutcome::DeliveredAndPinned,
                _ => DeliveryOutcome::Delivered,
            },
            Err(error) => self.fail(destination, &error).await,
        }
    }

    async fn pin(&self, sent: &SentMessage, mode: PinMode) -> bool {
        match self.transport.pin(sent, mode.is_silent()).await {
            Ok(()) => true,
            Err(e) => {
                tracing::debug!(
                    destination = sent.chat_id,
                    message_id = sent.message_id,
                    error = %e,
                    "Pin failed"
                );
                false
            }
        }
    }

    async fn fail(&self, destination: Destination, error: &DeliveryError) -> DeliveryOutcome {
        let class = classify(error);

        tracing::warn!(
            destination = destination.id,
            kind = %destination.kind,
            class = ?class,
            error = %error,
            "Skipping destination"
        );

        if class.should_prune() {
            self.pruner.prune(destination).await;
            DeliveryOutcome::FailedTerminal
        } else {
            DeliveryOutcome::FailedTransient
        }
    }
}
