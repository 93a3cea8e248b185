//! Operator-facing progress and result texts

use std::fmt;

use crate::{error::BroadcastError, types::DestinationKind};

/// A progress or result notice; `Display` renders the default English text
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Started,
    Rejected(BroadcastError),
    ChatSummary { sent: usize, pinned: usize },
    UserSummary { sent: usize },
    PassFailed(DestinationKind),
    IdentityPassStarted,
    IdentityHeader,
    IdentityLine { index: u32, sent: usize },
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Started => write!(f, "Broadcast started."),
            Self::Rejected(reason) => write!(f, "Broadcast refused: {reason}."),
            Self::ChatSummary { sent, pinned } => {
                write!(f, "Broadcast delivered to {sent} chats, pinned in {pinned}.")
            }
            Self::UserSummary { sent } => write!(f, "Broadcast delivered to {sent} users."),
            Self::PassFailed(kind) => {
                write!(f, "Could not load the {kind} list, that pass was skipped.")
            }
            Self::IdentityPassStarted => write!(f, "Broadcasting through assistants..."),
            Self::IdentityHeader => write!(f, "Assistant broadcast:"),
            Self::IdentityLine { index, sent } => {
                write!(f, "\nAssistant {index} delivered to {sent} chats.")
            }
        }
    }
}
