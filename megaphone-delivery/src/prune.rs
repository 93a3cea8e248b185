//! Best-effort removal of destinations that failed terminally
//!
//! Removal is an optional directory capability. Whether it is present is
//! decided once, when the pruner is built; a missing capability makes
//! pruning a no-op and a failing one is logged and swallowed.

use std::{fmt, future::Future, sync::Arc};

use futures_util::{FutureExt, future::BoxFuture};
use megaphone_common::{internal, tracing};

use crate::{
    error::DirectoryError,
    types::{ChatId, Destination, DestinationKind},
};

type RemoveFn = dyn Fn(ChatId) -> BoxFuture<'static, Result<(), DirectoryError>> + Send + Sync;

/// A directory removal capability
#[derive(Clone)]
pub struct Remover(Arc<RemoveFn>);

impl Remover {
    pub fn new<F, Fut>(remove: F) -> Self
    where
        F: Fn(ChatId) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), DirectoryError>> + Send + 'static,
    {
        Self(Arc::new(move |id| remove(id).boxed()))
    }

    pub async fn remove(&self, id: ChatId) -> Result<(), DirectoryError> {
        (self.0)(id).await
    }
}

impl fmt::Debug for Remover {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Remover")
    }
}

/// The optional removal capabilities of the directory service
#[derive(Debug, Clone, Default)]
pub struct PruneCapabilities {
    pub remove_primary_chat: Option<Remover>,
    pub remove_secondary_user: Option<Remover>,
}

impl PruneCapabilities {
    /// No removal support at all
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }
}

/// Removes terminally failed destinations from the directory
#[derive(Debug, Clone)]
pub struct DestinationPruner {
    chats: Option<Remover>,
    users: Option<Remover>,
}

impl DestinationPruner {
    #[must_use]
    pub fn new(capabilities: PruneCapabilities) -> Self {
        internal!(
            "Destination pruning: chats {}, users {}",
            if capabilities.remove_primary_chat.is_some() { "enabled" } else { "disabled" },
            if capabilities.remove_secondary_user.is_some() { "enabled" } else { "disabled" }
        );

        Self {
            chats: capabilities.remove_primary_chat,
            users: capabilities.remove_secondary_user,
        }
    }

    /// Remove `destination` from the directory.
    ///
    /// Returns `true` if the directory confirmed the removal. Never fails.
    pub async fn prune(&self, destination: Destination) -> bool {
        let remover = match destination.kind {
            DestinationKind::PrimaryChat => self.chats.as_ref(),
            DestinationKind::SecondaryUser => self.users.as_ref(),
        };

        let Some(remover) = remover else {
            return false;
        };

        match remover.remove(destination.id).await {
            Ok(()) => {
                tracing::info!(
                    destination = destination.id,
                    kind = %destination.kind,
                    "Pruned unreachable destination"
                );
                true
            }
            Err(e) => {
                tracing::debug!(
                    destination = destination.id,
                    kind = %destination.kind,
                    error = %e,
                    "Failed to prune destination"
                );
                false
            }
        }
    }
}
