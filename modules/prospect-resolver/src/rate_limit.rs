use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::{debug, warn};

use prospect_common::ProspectError;

use crate::traits::RateLimitLog;

/// Trailing window over which invocations are counted.
pub fn rate_window() -> Duration {
    Duration::hours(1)
}

/// Per-caller sliding-window gate in front of a batch.
///
/// Check-then-insert, not atomic: concurrent calls from one caller can overshoot
/// the limit slightly.
#[derive(Clone)]
pub struct RateLimiter {
    log: Arc<dyn RateLimitLog>,
}

impl RateLimiter {
    pub fn new(log: Arc<dyn RateLimitLog>) -> Self {
        Self { log }
    }

    /// Fail with `RateLimitExceeded` when `caller` already ran `action` `limit`
    /// times in the last hour; otherwise log one more invocation.
    pub async fn check_and_consume(
        &self,
        caller: &str,
        action: &str,
        limit: u32,
    ) -> Result<(), ProspectError> {
        if self.record_and_check(caller, action, limit).await? {
            Ok(())
        } else {
            Err(ProspectError::RateLimitExceeded {
                action: action.to_string(),
                limit,
            })
        }
    }

    /// `true` when the call is allowed (and was recorded), `false` when over the limit.
    pub async fn record_and_check(
        &self,
        caller: &str,
        action: &str,
        limit: u32,
    ) -> Result<bool, ProspectError> {
        let since = Utc::now() - rate_window();
        let count = self.log.count_since(caller, action, since).await?;

        if count >= u64::from(limit) {
            warn!(caller, action, count, limit, "Rate limit exceeded");
            return Ok(false);
        }

        self.log.record(caller, action).await?;
        debug!(caller, action, count = count + 1, limit, "Rate limit check passed");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::InMemoryRateLog;

    #[tokio::test]
    async fn allows_up_to_limit_then_rejects() {
        let log = Arc::new(InMemoryRateLog::new());
        let limiter = RateLimiter::new(log.clone());

        for _ in 0..3 {
            limiter.check_and_consume("user-1", "resolve", 3).await.unwrap();
        }
        let err = limiter.check_and_consume("user-1", "resolve", 3).await.unwrap_err();
        assert!(matches!(err, ProspectError::RateLimitExceeded { limit: 3, .. }));
        // A rejected call does not consume.
        assert_eq!(log.rows("user-1", "resolve"), 3);
    }

    #[tokio::test]
    async fn counts_per_caller_and_action() {
        let log = Arc::new(InMemoryRateLog::new());
        let limiter = RateLimiter::new(log.clone());

        limiter.check_and_consume("user-1", "resolve", 1).await.unwrap();
        limiter.check_and_consume("user-2", "resolve", 1).await.unwrap();
        limiter.check_and_consume("user-1", "export", 1).await.unwrap();
        assert!(!limiter.record_and_check("user-1", "resolve", 1).await.unwrap());
    }

    #[tokio::test]
    async fn entries_older_than_window_expire() {
        let old = Utc::now() - Duration::minutes(61);
        let log = Arc::new(InMemoryRateLog::new().with_entry("user-1", "resolve", old));
        let limiter = RateLimiter::new(log.clone());

        assert!(limiter.record_and_check("user-1", "resolve", 1).await.unwrap());
        assert_eq!(log.rows("user-1", "resolve"), 2);
    }

    #[tokio::test]
    async fn zero_limit_always_rejects() {
        let limiter = RateLimiter::new(Arc::new(InMemoryRateLog::new()));
        assert!(!limiter.record_and_check("user-1", "resolve", 0).await.unwrap());
    }
}
