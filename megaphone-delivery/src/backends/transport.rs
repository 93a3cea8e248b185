use std::{
    collections::VecDeque,
    sync::atomic::{AtomicI32, Ordering},
};

use ahash::{AHashMap, AHashSet};
use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::time::Instant;

use crate::{
    error::{DeliveryError, TemporaryError},
    traits::{ChatAdministrator, MessageSender, Transport},
    types::{ChatId, MessageRef, SentMessage},
};

/// What a recorded provider call did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallAction {
    SendText(String),
    Forward(MessageRef),
    Pin { silent: bool },
    Administrators,
}

/// A provider call, stamped with the (possibly paused) tokio clock
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub chat_id: ChatId,
    pub action: CallAction,
    pub at: Instant,
}

/// Provider connection whose failures are scripted per destination.
///
/// Each destination has a queue of errors; every send pops the front of the
/// queue and fails with it. An empty queue means the send succeeds.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    scripts: Mutex<AHashMap<ChatId, VecDeque<DeliveryError>>>,
    failing_pins: Mutex<AHashSet<ChatId>>,
    administrators: Mutex<AHashMap<ChatId, Vec<ChatAdministrator>>>,
    failing_administrators: Mutex<AHashSet<ChatId>>,
    calls: Mutex<Vec<RecordedCall>>,
    next_message_id: AtomicI32,
}

impl ScriptedTransport {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue errors for the next sends to `chat_id`
    pub fn script(&self, chat_id: ChatId, errors: impl IntoIterator<Item = DeliveryError>) {
        self.scripts
            .lock()
            .entry(chat_id)
            .or_default()
            .extend(errors);
    }

    /// Make every pin in `chat_id` fail
    pub fn fail_pin(&self, chat_id: ChatId) {
        self.failing_pins.lock().insert(chat_id);
    }

    pub fn set_administrators(&self, chat_id: ChatId, administrators: Vec<ChatAdministrator>) {
        self.administrators.lock().insert(chat_id, administrators);
    }

    /// Make administrator lookups for `chat_id` fail
    pub fn fail_administrators(&self, chat_id: ChatId) {
        self.failing_administrators.lock().insert(chat_id);
    }

    #[must_use]
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    /// Send attempts made to `chat_id`, successful or not
    #[must_use]
    pub fn attempts(&self, chat_id: ChatId) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|call| {
                call.chat_id == chat_id
                    && matches!(call.action, CallAction::SendText(_) | CallAction::Forward(_))
            })
            .count()
    }

    /// Chats a message was pinned in, in order
    #[must_use]
    pub fn pins(&self) -> Vec<(ChatId, bool)> {
        self.calls
            .lock()
            .iter()
            .filter_map(|call| match call.action {
                CallAction::Pin { silent } => Some((call.chat_id, silent)),
                _ => None,
            })
            .collect()
    }

    fn record(&self, chat_id: ChatId, action: CallAction) {
        self.calls.lock().push(RecordedCall {
            chat_id,
            action,
            at: Instant::now(),
        });
    }

    fn deliver(&self, chat_id: ChatId, action: CallAction) -> Result<SentMessage, DeliveryError> {
        self.record(chat_id, action);

        if let Some(error) = self
            .scripts
            .lock()
            .get_mut(&chat_id)
            .and_then(VecDeque::pop_front)
        {
            return Err(error);
        }

        Ok(SentMessage {
            chat_id,
            message_id: self.next_message_id.fetch_add(1, Ordering::SeqCst) + 1,
        })
    }
}

#[async_trait]
impl MessageSender for ScriptedTransport {
    async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<SentMessage, DeliveryError> {
        self.deliver(chat_id, CallAction::SendText(text.to_string()))
    }

    async fn forward(
        &self,
        chat_id: ChatId,
        source: MessageRef,
    ) -> Result<SentMessage, DeliveryError> {
        self.deliver(chat_id, CallAction::Forward(source))
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn pin(&self, message: &SentMessage, silent: bool) -> Result<(), DeliveryError> {
        self.record(message.chat_id, CallAction::Pin { silent });

        if self.failing_pins.lock().contains(&message.chat_id) {
            return Err(TemporaryError::AdminRequired(message.chat_id).into());
        }
        Ok(())
    }

    async fn administrators(
        &self,
        chat_id: ChatId,
    ) -> Result<Vec<ChatAdministrator>, DeliveryError> {
        self.record(chat_id, CallAction::Administrators);

        if self.failing_administrators.lock().contains(&chat_id) {
            return Err(TemporaryError::Network(format!("administrators of {chat_id}")).into());
        }
        Ok(self
            .administrators
            .lock()
            .get(&chat_id)
            .cloned()
            .unwrap_or_default())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::error::PermanentError;

    #[tokio::test]
    async fn test_scripts_are_consumed_in_order() {
        let transport = ScriptedTransport::new();
        transport.script(
            7,
            [
                DeliveryError::RateLimited { wait_secs: 1 },
                PermanentError::UserBlocked(7).into(),
            ],
        );

        assert_eq!(
            transport.send_text(7, "hi").await,
            Err(DeliveryError::RateLimited { wait_secs: 1 })
        );
        assert!(transport.send_text(7, "hi").await.unwrap_err().is_permanent());
        assert!(transport.send_text(7, "hi").await.is_ok());
        assert_eq!(transport.attempts(7), 3);
        assert_eq!(transport.attempts(8), 0);
    }

    #[tokio::test]
    async fn test_message_ids_increase() {
        let transport = ScriptedTransport::new();
        let first = transport.send_text(1, "a").await.unwrap();
        let second = transport
            .forward(2, MessageRef { chat_id: 1, message_id: first.message_id })
            .await
            .unwrap();

        assert!(second.message_id > first.message_id);
        assert_eq!(
            transport.calls()[1].action,
            CallAction::Forward(MessageRef { chat_id: 1, message_id: first.message_id })
        );
    }

    #[tokio::test]
    async fn test_pin_failure() {
        let transport = ScriptedTransport::new();
        transport.fail_pin(3);

        let message = transport.send_text(3, "x").await.unwrap();
        assert!(transport.pin(&message, true).await.is_err());
        assert_eq!(transport.pins(), vec![(3, true)]);
    }
}
