//! Periodic refresh of the per-chat operator cache
//!
//! Every tick, each active chat that is not yet cached gets its operator
//! list built from:
//! - chat administrators allowed to manage video chats
//! - operators explicitly authorised in the directory
//!
//! A chat whose lookup fails stays uncached and is retried on the next tick.

use std::{sync::Arc, time::Duration};

use dashmap::DashMap;
use megaphone_common::{Signal, internal, tracing};
use tokio::sync::broadcast;

use crate::{
    config::ReconcilerConfig,
    error::{DirectoryError, ReconcileError},
    traits::{Directory, Transport},
    types::{ChatId, UserId},
};

const ALPHABET: &[u8; 10] = b"abcdefghij";

/// Decode an alpha-encoded user id, where each decimal digit is stored as
/// the letter `a` to `j`.
pub fn decode_alpha_id(name: &str) -> Result<UserId, DirectoryError> {
    let invalid = || DirectoryError::InvalidOperatorName(name.to_string());

    if name.is_empty() {
        return Err(invalid());
    }

    name.bytes().try_fold(0, |id: UserId, letter| {
        let digit = ALPHABET
            .iter()
            .position(|&l| l == letter)
            .ok_or_else(invalid)?;
        id.checked_mul(10)
            .and_then(|id| id.checked_add(digit as UserId))
            .ok_or_else(invalid)
    })
}

/// Encode a user id the way the directory stores operator names.
#[must_use]
pub fn encode_alpha_id(id: UserId) -> String {
    id.to_string()
        .bytes()
        .map(|digit| char::from(ALPHABET[usize::from(digit - b'0')]))
        .collect()
}

/// Operators allowed to control each chat, shared between the reconciler and
/// the command layer
#[derive(Debug, Clone, Default)]
pub struct AdminCache {
    inner: Arc<DashMap<ChatId, Vec<UserId>, ahash::RandomState>>,
}

impl AdminCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, chat_id: ChatId) -> Option<Vec<UserId>> {
        self.inner.get(&chat_id).map(|entry| entry.value().clone())
    }

    #[must_use]
    pub fn contains(&self, chat_id: ChatId) -> bool {
        self.inner.contains_key(&chat_id)
    }

    /// Whether `user_id` may operate in `chat_id`
    #[must_use]
    pub fn is_operator(&self, chat_id: ChatId, user_id: UserId) -> bool {
        self.inner
            .get(&chat_id)
            .is_some_and(|entry| entry.value().contains(&user_id))
    }

    pub fn insert(&self, chat_id: ChatId, operators: Vec<UserId>) {
        self.inner.insert(chat_id, operators);
    }

    /// Drop a chat so the next tick rebuilds it
    pub fn invalidate(&self, chat_id: ChatId) {
        self.inner.remove(&chat_id);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

/// Long-lived task keeping [`AdminCache`] populated for active chats
pub struct BackgroundReconciler {
    interval: Duration,
    directory: Arc<dyn Directory>,
    transport: Arc<dyn Transport>,
    cache: AdminCache,
}

impl BackgroundReconciler {
    #[must_use]
    pub fn new(
        config: &ReconcilerConfig,
        directory: Arc<dyn Directory>,
        transport: Arc<dyn Transport>,
        cache: AdminCache,
    ) -> Self {
        Self {
            interval: Duration::from_secs(config.interval_secs.max(1)),
            directory,
            transport,
            cache,
        }
    }

    #[must_use]
    pub fn cache(&self) -> AdminCache {
        self.cache.clone()
    }

    /// Run until a shutdown signal arrives.
    ///
    /// The first tick happens one interval after start. Tick failures are
    /// logged and never end the loop.
    pub async fn serve(&self, mut shutdown: broadcast::Receiver<Signal>) {
        internal!(level = INFO, "Reconciler starting, interval {:?}", self.interval);

        let mut timer = tokio::time::interval(self.interval);
        timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        // Skip the first tick to avoid immediate execution
        timer.tick().await;

        loop {
            tokio::select! {
                _ = timer.tick() => {
                    let cached = self.tick().await;
                    if cached > 0 {
                        tracing::debug!(cached, total = self.cache.len(), "Reconciled operator cache");
                    }
                }
                sig = shutdown.recv() => {
                    match sig {
                        Ok(Signal::Shutdown | Signal::Finalised) => {
                            internal!(level = INFO, "Reconciler received shutdown signal");
                        }
                        Err(e) => {
                            tracing::error!("Reconciler shutdown channel error: {e}");
                        }
                    }
                    break;
                }
            }
        }

        internal!("Reconciler stopped");
    }

    /// Cache every active chat that is not cached yet.
    ///
    /// Returns the number of chats newly cached.
    pub async fn tick(&self) -> usize {
        let active = match self.directory.active_chats().await {
            Ok(active) => active,
            Err(e) => {
                tracing::debug!(error = %e, "Failed to list active chats");
                return 0;
            }
        };

        let mut cached = 0;
        for chat_id in active {
            if self.cache.contains(chat_id) {
                continue;
            }

            match self.operators(chat_id).await {
                Ok(operators) => {
                    self.cache.insert(chat_id, operators);
                    cached += 1;
                }
                Err(e) => {
                    tracing::debug!(chat_id, error = %e, "Failed to reconcile chat operators");
                }
            }
        }

        cached
    }

    async fn operators(&self, chat_id: ChatId) -> Result<Vec<UserId>, ReconcileError> {
        let mut operators: Vec<UserId> = self
            .transport
            .administrators(chat_id)
            .await?
            .into_iter()
            .filter(|admin| admin.can_manage_video_chats)
            .map(|admin| admin.user_id)
            .collect();

        for name in self.directory.authorized_operator_names(chat_id).await? {
            match decode_alpha_id(&name) {
                Ok(user_id) => operators.push(user_id),
                Err(e) => tracing::debug!(chat_id, error = %e, "Skipping operator"),
            }
        }

        Ok(operators)
    }
}
