//! Typed error handling for broadcast delivery.
//!
//! Provider failures for a single destination are split into:
//! - Rate limiting - the provider asks us to wait before calling again
//! - Permanent failures - the destination can never be reached again
//! - Temporary failures - the destination may become reachable later
//! - Unclassified failures - anything the provider did not tag

use thiserror::Error;

use crate::types::ChatId;

/// Failure reported by the messaging provider for one delivery call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeliveryError {
    /// The provider asked for a pause before the next call.
    #[error("Rate limited: wait {wait_secs}s")]
    RateLimited { wait_secs: u64 },

    /// Destination is gone for good; it should be pruned.
    #[error("Permanent failure: {0}")]
    Permanent(#[from] PermanentError),

    /// Destination could not be reached this time.
    #[error("Temporary failure: {0}")]
    Temporary(#[from] TemporaryError),

    /// Provider error carrying no recognised tag.
    #[error("Unclassified provider error: {0}")]
    Unclassified(String),
}

/// Permanent delivery errors, the destination will not accept messages from
/// this sender again without outside intervention.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PermanentError {
    #[error("Destination {0} can no longer be resolved")]
    PeerUnresolvable(ChatId),

    #[error("Destination {0} has blocked the sender")]
    UserBlocked(ChatId),

    #[error("Destination {0} has been deactivated")]
    UserDeactivated(ChatId),

    #[error("Channel {0} is now private")]
    ChannelPrivate(ChatId),

    #[error("Writing to {0} is forbidden")]
    WriteForbidden(ChatId),
}

/// Temporary delivery errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemporaryError {
    /// The sender lacks admin rights in the destination (may be granted later).
    #[error("Admin rights required in {0}")]
    AdminRequired(ChatId),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out: {0}")]
    Timeout(String),
}

impl DeliveryError {
    /// Returns `true` if this error is permanent and the destination should be pruned.
    #[must_use]
    pub const fn is_permanent(&self) -> bool {
        matches!(self, Self::Permanent(_))
    }

    /// Returns `true` if this error is temporary.
    #[must_use]
    pub const fn is_temporary(&self) -> bool {
        matches!(self, Self::Temporary(_))
    }

    /// The provider-requested wait, if this is a rate-limit signal.
    #[must_use]
    pub const fn rate_limit_wait(&self) -> Option<u64> {
        match self {
            Self::RateLimited { wait_secs } => Some(*wait_secs),
            _ => None,
        }
    }
}

/// Failures of the external directory service.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DirectoryError {
    #[error("Directory service unavailable: {0}")]
    Unavailable(String),

    #[error("No secondary identity configured at index {0}")]
    UnknownIdentity(u32),

    #[error("Invalid operator name: {0:?}")]
    InvalidOperatorName(String),

    #[error("Directory backend error: {0}")]
    Backend(String),
}

/// Failures of the reply/status sink. These are always swallowed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Status sink error: {0}")]
pub struct SinkError(pub String);

/// Reasons a broadcast is refused or a pass could not run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BroadcastError {
    /// Neither a replied-to message nor any argument text was supplied.
    #[error("Nothing to broadcast: reply to a message or supply text")]
    MissingPayload,

    /// Argument text was empty once the flags were stripped.
    #[error("Broadcast text is empty after removing flags")]
    EmptyText,

    /// Another broadcast run is in progress.
    #[error("A broadcast is already in progress")]
    AlreadyRunning,

    /// A destination snapshot could not be fetched.
    #[error("Directory error: {0}")]
    Directory(#[from] DirectoryError),
}

/// Errors from one reconciliation of a chat's operator list.
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("Directory error: {0}")]
    Directory(#[from] DirectoryError),

    #[error("Provider error: {0}")]
    Provider(#[from] DeliveryError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_predicates() {
        let error = DeliveryError::Permanent(PermanentError::UserBlocked(42));
        assert!(error.is_permanent());
        assert!(!error.is_temporary());
        assert_eq!(error.rate_limit_wait(), None);

        let error = DeliveryError::Temporary(TemporaryError::Network("reset".to_string()));
        assert!(error.is_temporary());
        assert!(!error.is_permanent());

        let error = DeliveryError::RateLimited { wait_secs: 3 };
        assert_eq!(error.rate_limit_wait(), Some(3));
        assert!(!error.is_permanent());
        assert!(!error.is_temporary());
    }

    #[test]
    fn test_error_display() {
        let error = DeliveryError::Permanent(PermanentError::ChannelPrivate(-100_123));
        assert_eq!(
            error.to_string(),
            "Permanent failure: Channel -100123 is now private"
        );

        let error = DeliveryError::RateLimited { wait_secs: 12 };
        assert_eq!(error.to_string(), "Rate limited: wait 12s");
    }

    #[test]
    fn test_from_conversions() {
        let error: DeliveryError = PermanentError::WriteForbidden(7).into();
        assert!(error.is_permanent());

        let error: BroadcastError = DirectoryError::Unavailable("down".to_string()).into();
        assert_eq!(
            error.to_string(),
            "Directory error: Directory service unavailable: down"
        );
    }
}
