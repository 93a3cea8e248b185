use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::{
    error::SinkError,
    traits::{StatusHandle, StatusSink},
    types::ChatId,
};

/// Status sink that keeps every reply and edit it receives
#[derive(Debug, Default)]
pub struct RecordingSink {
    chat_id: ChatId,
    replies: Mutex<Vec<String>>,
    edits: Mutex<Vec<(StatusHandle, String)>>,
    failing: AtomicBool,
    next_message_id: AtomicI32,
}

impl RecordingSink {
    #[must_use]
    pub fn new(chat_id: ChatId) -> Self {
        Self {
            chat_id,
            ..Self::default()
        }
    }

    /// Make every reply and edit fail
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    #[must_use]
    pub fn replies(&self) -> Vec<String> {
        self.replies.lock().clone()
    }

    #[must_use]
    pub fn edits(&self) -> Vec<(StatusHandle, String)> {
        self.edits.lock().clone()
    }

    fn check(&self) -> Result<(), SinkError> {
        if self.failing.load(Ordering::SeqCst) {
            Err(SinkError("recording sink offline".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl StatusSink for RecordingSink {
    async fn reply(&self, text: &str) -> Result<StatusHandle, SinkError> {
        self.check()?;
        self.replies.lock().push(text.to_string());

        Ok(StatusHandle {
            chat_id: self.chat_id,
            message_id: self.next_message_id.fetch_add(1, Ordering::SeqCst) + 1,
        })
    }

    async fn edit(&self, handle: &StatusHandle, text: &str) -> Result<(), SinkError> {
        self.check()?;
        self.edits.lock().push((*handle, text.to_string()));
        Ok(())
    }
}
