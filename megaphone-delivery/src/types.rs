//! Type definitions for destinations, payloads and delivery results

use std::fmt;

use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::{
    error::{BroadcastError, DeliveryError},
    traits::MessageSender,
};

/// Platform-assigned chat identifier (groups and channels are negative).
pub type ChatId = i64;

/// Platform-assigned message identifier, unique within a chat.
pub type MessageId = i32;

/// Platform-assigned user identifier.
pub type UserId = u64;

/// Which directory list a destination came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DestinationKind {
    PrimaryChat,
    SecondaryUser,
}

impl fmt::Display for DestinationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PrimaryChat => write!(f, "chat"),
            Self::SecondaryUser => write!(f, "user"),
        }
    }
}

/// A single delivery target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Destination {
    pub id: ChatId,
    pub kind: DestinationKind,
}

impl Destination {
    #[must_use]
    pub const fn chat(id: ChatId) -> Self {
        Self {
            id,
            kind: DestinationKind::PrimaryChat,
        }
    }

    #[must_use]
    pub const fn user(id: ChatId) -> Self {
        Self {
            id,
            kind: DestinationKind::SecondaryUser,
        }
    }
}

/// Reference to an existing message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageRef {
    pub chat_id: ChatId,
    pub message_id: MessageId,
}

/// What gets delivered to every destination
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// Forward an existing message by reference.
    Forward(MessageRef),
    /// Send literal text.
    Text(String),
}

impl Payload {
    /// Deliver this payload to `chat_id` through `sender`.
    pub async fn send<S>(&self, sender: &S, chat_id: ChatId) -> Result<SentMessage, DeliveryError>
    where
        S: MessageSender + ?Sized,
    {
        match self {
            Self::Forward(source) => sender.forward(chat_id, *source).await,
            Self::Text(text) => sender.send_text(chat_id, text).await,
        }
    }
}

/// Handle to a message the provider accepted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SentMessage {
    pub chat_id: ChatId,
    pub message_id: MessageId,
}

/// Whether pinned messages notify the chat members
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinMode {
    Silent,
    Loud,
}

impl PinMode {
    #[must_use]
    pub const fn is_silent(self) -> bool {
        matches!(self, Self::Silent)
    }
}

/// Result of delivering to one destination
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Delivered,
    DeliveredAndPinned,
    /// Failed, but the destination may become reachable later.
    FailedTransient,
    /// Failed permanently; the destination was handed to the pruner.
    FailedTerminal,
}

/// Accumulated counters for one pass over a destination list
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    /// Number of batches processed
    pub batches: usize,
    pub sent: usize,
    pub pinned: usize,
    /// Failed destination ids, in delivery order
    pub failed: Vec<ChatId>,
    /// Subset of `failed` that failed terminally
    pub terminal: Vec<ChatId>,
}

impl DeliveryReport {
    /// Fold a single destination's outcome into the report.
    pub fn record(&mut self, id: ChatId, outcome: DeliveryOutcome) {
        match outcome {
            DeliveryOutcome::Delivered => self.sent += 1,
            DeliveryOutcome::DeliveredAndPinned => {
                self.sent += 1;
                self.pinned += 1;
            }
            DeliveryOutcome::FailedTransient => self.failed.push(id),
            DeliveryOutcome::FailedTerminal => {
                self.failed.push(id);
                self.terminal.push(id);
            }
        }
    }

    /// Total destinations attempted
    #[must_use]
    pub const fn attempted(&self) -> usize {
        self.sent + self.failed.len()
    }
}

/// Messages delivered by one secondary identity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdentityReport {
    pub index: u32,
    pub sent: usize,
}

/// Identifier attached to every log event of a broadcast run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RunId(Ulid);

impl RunId {
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Everything a finished broadcast run produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BroadcastSummary {
    pub run_id: RunId,
    /// `None` when the primary-chat pass was excluded or could not run
    pub chats: Option<DeliveryReport>,
    /// `None` when the secondary-user pass was not requested or could not run
    pub users: Option<DeliveryReport>,
    pub identities: Vec<IdentityReport>,
    /// Passes that could not run
    pub errors: Vec<BroadcastError>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_record() {
        let mut report = DeliveryReport::default();
        report.record(1, DeliveryOutcome::Delivered);
        report.record(2, DeliveryOutcome::DeliveredAndPinned);
        report.record(3, DeliveryOutcome::FailedTransient);
        report.record(4, DeliveryOutcome::FailedTerminal);

        assert_eq!(report.sent, 2);
        assert_eq!(report.pinned, 1);
        assert_eq!(report.failed, vec![3, 4]);
        assert_eq!(report.terminal, vec![4]);
        assert_eq!(report.attempted(), 4);
    }

    #[test]
    fn test_run_ids_are_unique() {
        assert_ne!(RunId::new(), RunId::new());
    }
}
