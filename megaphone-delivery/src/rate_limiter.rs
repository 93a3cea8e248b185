//! Provider rate-limit handling and fixed pacing
//!
//! Two mechanisms keep a broadcast under the provider's limits:
//!
//! - **Pacing**: fixed pauses after every destination and after every batch.
//!   These amortise the provider's burst limits without needing feedback.
//! - **Backoff**: when the provider still answers with a rate-limit signal,
//!   wait exactly as long as it asks and retry once, unless the wait exceeds
//!   the configured ceiling.
//!
//! # Example
//!
//! ```text
//! 120 chats, batch size 50, 500ms per message, 5s per batch
//! - batch 1: 50 sends, 25s of message pacing, then 5s
//! - batch 2: 50 sends, 25s of message pacing, then 5s
//! - batch 3: 20 sends, 10s of message pacing, then 5s
//! ```

use std::time::Duration;

use megaphone_common::tracing;

/// What to do after a rate-limit signal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// The wait was served; retry the call once.
    Retry,
    /// The wait exceeds the ceiling; give up on this destination.
    Skip,
}

/// Interprets provider rate-limit signals
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BackoffPolicy {
    /// Longest wait we will serve, `None` for unbounded
    max_wait_secs: Option<u64>,
}

impl BackoffPolicy {
    #[must_use]
    pub const fn new(max_wait_secs: Option<u64>) -> Self {
        Self { max_wait_secs }
    }

    /// How long to wait for a signal of `wait_secs`, or `None` if it exceeds the ceiling.
    #[must_use]
    pub const fn wait_duration(&self, wait_secs: u64) -> Option<Duration> {
        match self.max_wait_secs {
            Some(max) if wait_secs > max => None,
            _ => Some(Duration::from_secs(wait_secs)),
        }
    }

    /// Serve the provider-requested wait if allowed.
    pub async fn wait_for(&self, wait_secs: u64) -> Backoff {
        let Some(wait) = self.wait_duration(wait_secs) else {
            tracing::warn!(
                wait_secs,
                max_wait_secs = self.max_wait_secs,
                "Rate-limit wait exceeds ceiling, skipping destination"
            );
            return Backoff::Skip;
        };

        tracing::warn!(wait_secs, "Rate limited by provider, sleeping before retry");
        tokio::time::sleep(wait).await;
        Backoff::Retry
    }
}

/// Fixed pauses between provider calls
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacing {
    pub message_delay: Duration,
    pub batch_delay: Duration,
    pub identity_delay: Duration,
}

impl Pacing {
    pub async fn after_message(&self) {
        tokio::time::sleep(self.message_delay).await;
    }

    pub async fn after_batch(&self) {
        tokio::time::sleep(self.batch_delay).await;
    }

    pub async fn after_identity_send(&self) {
        tokio::time::sleep(self.identity_delay).await;
    }
}

#[cfg(test)]
mod tests {
    use tokio::time::Instant;

    use super::*;

    #[test]
    fn test_unbounded_policy_always_waits() {
        let policy = BackoffPolicy::new(None);
        assert_eq!(policy.wait_duration(0), Some(Duration::ZERO));
        assert_eq!(policy.wait_duration(3), Some(Duration::from_secs(3)));
        assert_eq!(
            policy.wait_duration(86_400),
            Some(Duration::from_secs(86_400))
        );
    }

    #[test]
    fn test_ceiling_is_inclusive() {
        let policy = BackoffPolicy::new(Some(30));
        assert_eq!(policy.wait_duration(30), Some(Duration::from_secs(30)));
        assert_eq!(policy.wait_duration(31), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_sleeps_signalled_duration() {
        let policy = BackoffPolicy::new(None);
        let start = Instant::now();

        assert_eq!(policy.wait_for(3).await, Backoff::Retry);
        assert_eq!(start.elapsed(), Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_skips_without_sleeping() {
        let policy = BackoffPolicy::new(Some(5));
        let start = Instant::now();

        assert_eq!(policy.wait_for(6).await, Backoff::Skip);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pacing_delays() {
        let pacing = Pacing {
            message_delay: Duration::from_millis(500),
            batch_delay: Duration::from_secs(5),
            identity_delay: Duration::from_secs(3),
        };
        let start = Instant::now();

        pacing.after_message().await;
        assert_eq!(start.elapsed(), Duration::from_millis(500));

        pacing.after_batch().await;
        assert_eq!(start.elapsed(), Duration::from_millis(5500));

        pacing.after_identity_send().await;
        assert_eq!(start.elapsed(), Duration::from_millis(8500));
    }
}
