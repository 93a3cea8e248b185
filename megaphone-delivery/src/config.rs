//! Engine configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::rate_limiter::{BackoffPolicy, Pacing};

/// Broadcast run configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BroadcastConfig {
    /// Primary chats delivered per batch
    ///
    /// Default: 50
    #[serde(default = "defaults::chat_batch_size")]
    pub chat_batch_size: usize,

    /// Secondary users delivered per batch
    ///
    /// Default: 100
    #[serde(default = "defaults::user_batch_size")]
    pub user_batch_size: usize,

    /// Pause after every destination, whatever the outcome (in milliseconds)
    ///
    /// Default: 500
    #[serde(default = "defaults::message_delay_ms")]
    pub message_delay_ms: u64,

    /// Pause after every batch (in milliseconds)
    ///
    /// Default: 5000
    #[serde(default = "defaults::batch_delay_ms")]
    pub batch_delay_ms: u64,

    /// Pause after every dialog in the secondary-identity pass (in milliseconds)
    ///
    /// Default: 3000
    #[serde(default = "defaults::identity_delay_ms")]
    pub identity_delay_ms: u64,

    /// Longest provider-requested wait we are willing to sit through (in seconds)
    ///
    /// A destination whose rate-limit wait exceeds this is recorded as failed
    /// instead of retried. `None` waits for any duration.
    ///
    /// Default: None
    #[serde(default)]
    pub max_rate_limit_wait_secs: Option<u64>,

    /// Secondary identities to deliver through, in order
    #[serde(default)]
    pub secondary_identities: Vec<u32>,
}

impl Default for BroadcastConfig {
    fn default() -> Self {
        Self {
            chat_batch_size: defaults::chat_batch_size(),
            user_batch_size: defaults::user_batch_size(),
            message_delay_ms: defaults::message_delay_ms(),
            batch_delay_ms: defaults::batch_delay_ms(),
            identity_delay_ms: defaults::identity_delay_ms(),
            max_rate_limit_wait_secs: None,
            secondary_identities: Vec::new(),
        }
    }
}

impl BroadcastConfig {
    #[must_use]
    pub const fn pacing(&self) -> Pacing {
        Pacing {
            message_delay: Duration::from_millis(self.message_delay_ms),
            batch_delay: Duration::from_millis(self.batch_delay_ms),
            identity_delay: Duration::from_millis(self.identity_delay_ms),
        }
    }

    #[must_use]
    pub const fn backoff(&self) -> BackoffPolicy {
        BackoffPolicy::new(self.max_rate_limit_wait_secs)
    }
}

/// Background reconciler configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcilerConfig {
    /// Time between reconciliation ticks (in seconds)
    ///
    /// Default: 10
    #[serde(default = "defaults::reconcile_interval_secs")]
    pub interval_secs: u64,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            interval_secs: defaults::reconcile_interval_secs(),
        }
    }
}

mod defaults {
    pub const fn chat_batch_size() -> usize {
        50
    }

    pub const fn user_batch_size() -> usize {
        100
    }

    pub const fn message_delay_ms() -> u64 {
        500
    }

    pub const fn batch_delay_ms() -> u64 {
        5000
    }

    pub const fn identity_delay_ms() -> u64 {
        3000
    }

    pub const fn reconcile_interval_secs() -> u64 {
        10
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = BroadcastConfig::default();
        assert_eq!(config.chat_batch_size, 50);
        assert_eq!(config.user_batch_size, 100);
        assert_eq!(config.pacing().message_delay, Duration::from_millis(500));
        assert_eq!(config.pacing().batch_delay, Duration::from_secs(5));
        assert_eq!(config.pacing().identity_delay, Duration::from_secs(3));
        assert_eq!(config.max_rate_limit_wait_secs, None);
        assert!(config.secondary_identities.is_empty());
        assert_eq!(ReconcilerConfig::default().interval_secs, 10);
    }

    #[test]
    fn test_partial_ron_uses_defaults() {
        let config: BroadcastConfig =
            ron::from_str("(chat_batch_size: 10, max_rate_limit_wait_secs: Some(60))").unwrap();
        assert_eq!(config.chat_batch_size, 10);
        assert_eq!(config.user_batch_size, 100);
        assert_eq!(config.max_rate_limit_wait_secs, Some(60));
    }
}
