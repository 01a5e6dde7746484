//! Reconnect-and-retry with exponential backoff for producer-state writes
//! (spec §4.8 "Retry policy"): a transport reset reconnects and retries up
//! to a bound, any other error fails fast.

use sonic_gnmi_model::GnmiError;
use std::time::Duration;

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

/// A transport reset is recognized by message, not by a dedicated
/// `GnmiError` variant: both the in-process Redis path and the ZMQ path
/// surface a dropped connection as `Unavailable`, and neither has a richer
/// error type of its own to distinguish "reset" from "down".
pub fn is_transport_reset(err: &GnmiError) -> bool {
    matches!(err, GnmiError::Unavailable(msg) if msg.contains("reset") || msg.contains("connection") || msg.contains("connect"))
}

/// Runs `op`, reconnecting via `reconnect` and retrying on a transport
/// reset up to `policy.max_attempts` total tries; any other error, or
/// exhausting the attempt budget, returns immediately.
pub async fn with_retry<T, Op, OpFut, Reconnect, ReconnectFut>(
    policy: &RetryPolicy,
    mut op: Op,
    mut reconnect: Reconnect,
) -> Result<T, GnmiError>
where
    Op: FnMut() -> OpFut,
    OpFut: std::future::Future<Output = Result<T, GnmiError>>,
    Reconnect: FnMut() -> ReconnectFut,
    ReconnectFut: std::future::Future<Output = Result<(), GnmiError>>,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(v) => return Ok(v),
            Err(e) if is_transport_reset(&e) && attempt + 1 < policy.max_attempts => {
                tracing::warn!(attempt, error = %e, "producer-state sink transport reset, reconnecting and retrying");
                tokio::time::sleep(policy.delay_for_attempt(attempt)).await;
                reconnect().await?;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn retries_on_reset_then_succeeds() {
        let attempts = Arc::new(AtomicU32::new(0));
        let reconnects = Arc::new(AtomicU32::new(0));
        let policy = RetryPolicy::default();

        let op_attempts = attempts.clone();
        let result = with_retry(
            &policy,
            move || {
                let attempts = op_attempts.clone();
                async move {
                    let n = attempts.fetch_add(1, Ordering::SeqCst);
                    if n < 2 {
                        Err(GnmiError::unavailable("connection reset by peer"))
                    } else {
                        Ok(42)
                    }
                }
            },
            {
                let reconnects = reconnects.clone();
                move || {
                    let reconnects = reconnects.clone();
                    async move {
                        reconnects.fetch_add(1, Ordering::SeqCst);
                        Ok(())
                    }
                }
            },
        )
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
        assert_eq!(reconnects.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn non_reset_errors_fail_fast_without_retry() {
        let attempts = Arc::new(AtomicU32::new(0));
        let policy = RetryPolicy::default();
        let op_attempts = attempts.clone();

        let result: Result<(), GnmiError> = with_retry(
            &policy,
            move || {
                let attempts = op_attempts.clone();
                async move {
                    attempts.fetch_add(1, Ordering::SeqCst);
                    Err(GnmiError::invalid_argument("bad value"))
                }
            },
            || async { Ok(()) },
        )
        .await;

        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausting_the_attempt_budget_returns_the_last_error() {
        let policy = RetryPolicy { max_attempts: 2, ..RetryPolicy::default() };
        let attempts = Arc::new(AtomicU32::new(0));
        let op_attempts = attempts.clone();

        let result: Result<(), GnmiError> = with_retry(
            &policy,
            move || {
                let attempts = op_attempts.clone();
                async move {
                    attempts.fetch_add(1, Ordering::SeqCst);
                    Err(GnmiError::unavailable("connection reset by peer"))
                }
            },
            || async { Ok(()) },
        )
        .await;

        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn delay_grows_exponentially_then_clamps() {
        let policy = RetryPolicy { base_delay: Duration::from_millis(10), max_delay: Duration::from_millis(100), ..RetryPolicy::default() };
        assert_eq!(policy.delay_for_attempt(0), Duration::from_millis(10));
        assert_eq!(policy.delay_for_attempt(1), Duration::from_millis(20));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_millis(40));
        assert_eq!(policy.delay_for_attempt(10), Duration::from_millis(100));
    }
}
