//! Seams to the external collaborators the engine drives.

use std::sync::Arc;

use async_trait::async_trait;
use futures_util::stream::BoxStream;

use crate::{
    error::{DeliveryError, DirectoryError, SinkError},
    types::{ChatId, MessageId, MessageRef, SentMessage, UserId},
};

/// Anything that can put a message into a chat.
#[async_trait]
pub trait MessageSender: Send + Sync {
    async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<SentMessage, DeliveryError>;

    async fn forward(&self, chat_id: ChatId, source: MessageRef)
    -> Result<SentMessage, DeliveryError>;
}

/// A chat administrator as reported by the provider
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChatAdministrator {
    pub user_id: UserId,
    pub can_manage_video_chats: bool,
}

/// The primary bot identity's connection to the messaging provider.
#[async_trait]
pub trait Transport: MessageSender {
    /// Pin a previously sent message, optionally without notifying members.
    async fn pin(&self, message: &SentMessage, silent: bool) -> Result<(), DeliveryError>;

    /// List the administrators of a chat.
    async fn administrators(&self, chat_id: ChatId)
    -> Result<Vec<ChatAdministrator>, DeliveryError>;
}

/// A secondary sender identity with its own set of dialogs.
pub trait IdentityClient: MessageSender {
    /// Enumerate the identity's dialogs as they exist while the stream is polled.
    fn dialogs(&self) -> BoxStream<'_, Result<ChatId, DeliveryError>>;
}

/// Read access to the directory of served destinations.
///
/// Removal of destinations is not part of this trait; it is supplied
/// separately through [`crate::prune::PruneCapabilities`] since not every
/// directory supports it.
#[async_trait]
pub trait Directory: Send + Sync {
    async fn primary_chats(&self) -> Result<Vec<ChatId>, DirectoryError>;

    async fn secondary_users(&self) -> Result<Vec<ChatId>, DirectoryError>;

    /// Chats with an active session right now.
    async fn active_chats(&self) -> Result<Vec<ChatId>, DirectoryError>;

    /// Alpha-encoded ids of the operators authorised in `chat_id`.
    async fn authorized_operator_names(&self, chat_id: ChatId)
    -> Result<Vec<String>, DirectoryError>;

    async fn secondary_identity(&self, index: u32)
    -> Result<Arc<dyn IdentityClient>, DirectoryError>;
}

/// Handle to a status message that can be edited later
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusHandle {
    pub chat_id: ChatId,
    pub message_id: MessageId,
}

/// Where operator-facing progress and results go.
#[async_trait]
pub trait StatusSink: Send + Sync {
    async fn reply(&self, text: &str) -> Result<StatusHandle, SinkError>;

    async fn edit(&self, handle: &StatusHandle, text: &str) -> Result<(), SinkError>;
}
