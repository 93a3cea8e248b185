//! Classification of per-destination delivery failures

use crate::error::DeliveryError;

/// How a failed delivery should be treated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// The destination is permanently unreachable and should be pruned.
    Terminal,
    /// The destination may be reachable later.
    Transient,
    /// Untagged provider error, handled like [`FailureClass::Transient`].
    Unknown,
}

impl FailureClass {
    #[must_use]
    pub const fn should_prune(self) -> bool {
        matches!(self, Self::Terminal)
    }
}

/// Classify a delivery error.
#[must_use]
pub const fn classify(error: &DeliveryError) -> FailureClass {
    if error.is_permanent() {
        FailureClass::Terminal
    } else if error.is_temporary() || error.rate_limit_wait().is_some() {
        FailureClass::Transient
    } else {
        FailureClass::Unknown
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{PermanentError, TemporaryError};

    #[test]
    fn test_permanent_errors_are_terminal() {
        let errors = [
            PermanentError::PeerUnresolvable(1),
            PermanentError::UserBlocked(1),
            PermanentError::UserDeactivated(1),
            PermanentError::ChannelPrivate(1),
            PermanentError::WriteForbidden(1),
        ];

        for error in errors {
            let class = classify(&DeliveryError::Permanent(error));
            assert_eq!(class, FailureClass::Terminal);
            assert!(class.should_prune());
        }
    }

    #[test]
    fn test_admin_required_is_not_terminal() {
        let class = classify(&TemporaryError::AdminRequired(-100).into());
        assert_eq!(class, FailureClass::Transient);
        assert!(!class.should_prune());
    }

    #[test]
    fn test_rate_limit_is_transient() {
        let class = classify(&DeliveryError::RateLimited { wait_secs: 10 });
        assert_eq!(class, FailureClass::Transient);
    }

    #[test]
    fn test_unclassified_is_unknown() {
        let class = classify(&DeliveryError::Unclassified("MESSAGE_EMPTY".to_string()));
        assert_eq!(class, FailureClass::Unknown);
        assert!(!class.should_prune());
    }
}
