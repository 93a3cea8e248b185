//! Supplementary delivery through secondary sender identities
//!
//! Unlike the primary-chat and secondary-user passes, each identity's dialogs
//! are enumerated live while delivering rather than snapshotted up front.
//! Every failure here is logged and skipped: nothing is classified or pruned.
//! The identity pause follows successful sends only.

use futures_util::StreamExt;
use megaphone_common::tracing;

use crate::{
    orchestrator::{Notice, notify},
    rate_limiter::Pacing,
    traits::{Directory, StatusSink},
    types::{IdentityReport, Payload},
};

/// Deliver `payload` through each identity in `identities`, in order.
///
/// The status message is edited after each identity with one more summary line.
pub(crate) async fn deliver_via_identities(
    directory: &dyn Directory,
    identities: &[u32],
    payload: &Payload,
    pacing: Pacing,
    sink: &dyn StatusSink,
) -> Vec<IdentityReport> {
    let status = notify(sink, &Notice::IdentityPassStarted).await;
    let mut text = Notice::IdentityHeader.to_string();
    let mut reports = Vec::with_capacity(identities.len());

    for &index in identities {
        let sent = deliver_via_identity(directory, index, payload, pacing).await;
        tracing::info!(identity = index, sent, "Identity pass complete");

        reports.push(IdentityReport { index, sent });
        text.push_str(&Notice::IdentityLine { index, sent }.to_string());

        if let Some(handle) = &status {
            if let Err(e) = sink.edit(handle, &text).await {
                tracing::debug!(error = %e, "Failed to update identity status");
            }
        }
    }

    reports
}

async fn deliver_via_identity(
    directory: &dyn Directory,
    index: u32,
    payload: &Payload,
    pacing: Pacing,
) -> usize {
    let client = match directory.secondary_identity(index).await {
        Ok(client) => client,
        Err(e) => {
            tracing::warn!(identity = index, error = %e, "Secondary identity unavailable");
            return 0;
        }
    };

    let mut sent = 0;
    let mut dialogs = client.dialogs();

    while let Some(dialog) = dialogs.next().await {
        let chat_id = match dialog {
            Ok(chat_id) => chat_id,
            Err(e) => {
                tracing::warn!(identity = index, error = %e, "Dialog enumeration failed");
                break;
            }
        };

        match payload.send(&*client, chat_id).await {
            Ok(_) => {
                sent += 1;
                pacing.after_identity_send().await;
            }
            Err(e) => {
                tracing::debug!(identity = index, destination = chat_id, error = %e, "Identity skip");
            }
        }
    }

    sent
}
