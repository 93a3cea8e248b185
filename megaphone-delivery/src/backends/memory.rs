use std::sync::{
    Arc,
    atomic::{AtomicBool, AtomicI32, Ordering},
};

use ahash::{AHashMap, AHashSet};
use async_trait::async_trait;
use futures_util::stream::{self, BoxStream, StreamExt};
use parking_lot::Mutex;

use crate::{
    error::{DeliveryError, DirectoryError},
    prune::{PruneCapabilities, Remover},
    traits::{Directory, IdentityClient, MessageSender},
    types::{ChatId, MessageRef, SentMessage},
};

/// Directory service held entirely in memory
#[derive(Debug, Default)]
pub struct MemoryDirectory {
    primary_chats: Mutex<Vec<ChatId>>,
    secondary_users: Mutex<Vec<ChatId>>,
    active_chats: Mutex<Vec<ChatId>>,
    operators: Mutex<AHashMap<ChatId, Vec<String>>>,
    identities: Mutex<AHashMap<u32, Arc<MemoryIdentity>>>,
    removed: Mutex<Vec<ChatId>>,
    unavailable: AtomicBool,
    failing_removals: AtomicBool,
    failing_operator_lookups: Mutex<AHashSet<ChatId>>,
}

impl MemoryDirectory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_primary_chats(&self, chats: impl IntoIterator<Item = ChatId>) {
        *self.primary_chats.lock() = chats.into_iter().collect();
    }

    pub fn set_secondary_users(&self, users: impl IntoIterator<Item = ChatId>) {
        *self.secondary_users.lock() = users.into_iter().collect();
    }

    pub fn set_active_chats(&self, chats: impl IntoIterator<Item = ChatId>) {
        *self.active_chats.lock() = chats.into_iter().collect();
    }

    /// Authorise operators in a chat, by alpha-encoded name
    pub fn set_operator_names(&self, chat_id: ChatId, names: Vec<String>) {
        self.operators.lock().insert(chat_id, names);
    }

    pub fn add_identity(&self, index: u32, identity: Arc<MemoryIdentity>) {
        self.identities.lock().insert(index, identity);
    }

    /// Make every list lookup fail
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Make every removal fail
    pub fn set_failing_removals(&self, failing: bool) {
        self.failing_removals.store(failing, Ordering::SeqCst);
    }

    /// Make operator-name lookups for `chat_id` fail
    pub fn fail_operator_lookup(&self, chat_id: ChatId, failing: bool) {
        let mut failing_chats = self.failing_operator_lookups.lock();
        if failing {
            failing_chats.insert(chat_id);
        } else {
            failing_chats.remove(&chat_id);
        }
    }

    #[must_use]
    pub fn primary_chat_list(&self) -> Vec<ChatId> {
        self.primary_chats.lock().clone()
    }

    #[must_use]
    pub fn secondary_user_list(&self) -> Vec<ChatId> {
        self.secondary_users.lock().clone()
    }

    /// Every id a removal was requested for, in order, including failed ones
    #[must_use]
    pub fn removal_requests(&self) -> Vec<ChatId> {
        self.removed.lock().clone()
    }

    /// Removal capabilities backed by this directory
    #[must_use]
    pub fn capabilities(self: &Arc<Self>) -> PruneCapabilities {
        let chats = Arc::clone(self);
        let users = Arc::clone(self);

        PruneCapabilities {
            remove_primary_chat: Some(Remover::new(move |id| {
                let directory = Arc::clone(&chats);
                async move { directory.remove(id, |d| &d.primary_chats) }
            })),
            remove_secondary_user: Some(Remover::new(move |id| {
                let directory = Arc::clone(&users);
                async move { directory.remove(id, |d| &d.secondary_users) }
            })),
        }
    }

    fn remove(
        &self,
        id: ChatId,
        list: impl Fn(&Self) -> &Mutex<Vec<ChatId>>,
    ) -> Result<(), DirectoryError> {
        self.removed.lock().push(id);

        if self.failing_removals.load(Ordering::SeqCst) {
            return Err(DirectoryError::Backend(format!("removal of {id} rejected")));
        }

        list(self).lock().retain(|&existing| existing != id);
        Ok(())
    }

    fn check_available(&self) -> Result<(), DirectoryError> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(DirectoryError::Unavailable("memory directory offline".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl Directory for MemoryDirectory {
    async fn primary_chats(&self) -> Result<Vec<ChatId>, DirectoryError> {
        self.check_available()?;
        Ok(self.primary_chat_list())
    }

    async fn secondary_users(&self) -> Result<Vec<ChatId>, DirectoryError> {
        self.check_available()?;
        Ok(self.secondary_user_list())
    }

    async fn active_chats(&self) -> Result<Vec<ChatId>, DirectoryError> {
        self.check_available()?;
        Ok(self.active_chats.lock().clone())
    }

    async fn authorized_operator_names(
        &self,
        chat_id: ChatId,
    ) -> Result<Vec<String>, DirectoryError> {
        self.check_available()?;
        if self.failing_operator_lookups.lock().contains(&chat_id) {
            return Err(DirectoryError::Backend(format!(
                "operator lookup for {chat_id} failed"
            )));
        }
        Ok(self
            .operators
            .lock()
            .get(&chat_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn secondary_identity(
        &self,
        index: u32,
    ) -> Result<Arc<dyn IdentityClient>, DirectoryError> {
        self.identities
            .lock()
            .get(&index)
            .map(|identity| Arc::clone(identity) as Arc<dyn IdentityClient>)
            .ok_or(DirectoryError::UnknownIdentity(index))
    }
}

/// Secondary identity whose dialogs are a mutable in-memory list.
///
/// Dialogs are read one at a time while the enumeration is polled, so
/// dialogs added mid-enumeration are still visited.
#[derive(Debug, Default)]
pub struct MemoryIdentity {
    dialogs: Mutex<Vec<ChatId>>,
    failing: Mutex<AHashSet<ChatId>>,
    sent: Mutex<Vec<ChatId>>,
    next_message_id: AtomicI32,
}

impl MemoryIdentity {
    #[must_use]
    pub fn new(dialogs: impl IntoIterator<Item = ChatId>) -> Self {
        Self {
            dialogs: Mutex::new(dialogs.into_iter().collect()),
            ..Self::default()
        }
    }

    pub fn add_dialog(&self, chat_id: ChatId) {
        self.dialogs.lock().push(chat_id);
    }

    /// Make every delivery to `chat_id` fail
    pub fn fail_delivery_to(&self, chat_id: ChatId) {
        self.failing.lock().insert(chat_id);
    }

    /// Chats successfully delivered to, in order
    #[must_use]
    pub fn sent(&self) -> Vec<ChatId> {
        self.sent.lock().clone()
    }

    fn deliver(&self, chat_id: ChatId) -> Result<SentMessage, DeliveryError> {
        if self.failing.lock().contains(&chat_id) {
            return Err(DeliveryError::Unclassified(format!(
                "identity cannot write to {chat_id}"
            )));
        }

        self.sent.lock().push(chat_id);
        Ok(SentMessage {
            chat_id,
            message_id: self.next_message_id.fetch_add(1, Ordering::SeqCst) + 1,
        })
    }
}

#[async_trait]
impl MessageSender for MemoryIdentity {
    async fn send_text(&self, chat_id: ChatId, _text: &str) -> Result<SentMessage, DeliveryError> {
        self.deliver(chat_id)
    }

    async fn forward(
        &self,
        chat_id: ChatId,
        _source: MessageRef,
    ) -> Result<SentMessage, DeliveryError> {
        self.deliver(chat_id)
    }
}

impl IdentityClient for MemoryIdentity {
    fn dialogs(&self) -> BoxStream<'_, Result<ChatId, DeliveryError>> {
        stream::unfold(0, move |position| async move {
            let chat_id = self.dialogs.lock().get(position).copied()?;
            Some((Ok(chat_id), position + 1))
        })
        .boxed()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_capabilities_remove_from_lists() {
        let directory = Arc::new(MemoryDirectory::new());
        directory.set_primary_chats([-1, -2, -3]);
        directory.set_secondary_users([1, 2]);

        let capabilities = directory.capabilities();
        let remove_chat = capabilities.remove_primary_chat.unwrap();
        let remove_user = capabilities.remove_secondary_user.unwrap();

        remove_chat.remove(-2).await.unwrap();
        remove_user.remove(1).await.unwrap();

        assert_eq!(directory.primary_chat_list(), vec![-1, -3]);
        assert_eq!(directory.secondary_user_list(), vec![2]);
        assert_eq!(directory.removal_requests(), vec![-2, 1]);
    }

    #[tokio::test]
    async fn test_dialogs_are_enumerated_live() {
        let identity = MemoryIdentity::new([10, 20]);
        let mut dialogs = identity.dialogs();

        assert_eq!(dialogs.next().await, Some(Ok(10)));
        identity.add_dialog(30);
        assert_eq!(dialogs.next().await, Some(Ok(20)));
        assert_eq!(dialogs.next().await, Some(Ok(30)));
        assert_eq!(dialogs.next().await, None);
    }

    #[tokio::test]
    async fn test_unknown_identity() {
        let directory = MemoryDirectory::new();
        let result = directory.secondary_identity(3).await;
        assert!(matches!(result, Err(DirectoryError::UnknownIdentity(3))));
    }
}
