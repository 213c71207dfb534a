//! Bounded retry with capped exponential backoff.
//!
//! One retry loop serves both notification and webhook sends: attempts are
//! strictly sequential, the delay doubles from `initial` up to `cap`, and
//! the owning service's deletion signal aborts between attempts without
//! counting as a failure.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

/// Retry timing configuration for a single dispatch item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackoffPolicy {
    /// Maximum number of attempts, including the first.
    pub max_tries: u8,
    /// Delay before the second attempt.
    pub initial: Duration,
    /// Upper bound for any backoff delay.
    pub cap: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            max_tries: 3,
            initial: Duration::from_secs(1),
            cap: Duration::from_secs(30),
        }
    }
}

impl BackoffPolicy {
    /// Policy with the standard 1s→30s curve and the given attempt bound.
    pub fn with_max_tries(max_tries: u8) -> Self {
        Self {
            max_tries,
            ..Self::default()
        }
    }

    /// Backoff delay after the given 1-based failed attempt.
    pub fn delay_after(&self, attempt: u8) -> Duration {
        let exponent = u32::from(attempt.saturating_sub(1)).min(20);
        let delay = self
            .initial
            .saturating_mul(2_u32.saturating_pow(exponent));
        delay.min(self.cap)
    }
}

/// Terminal state of a retry loop.
#[derive(Debug)]
pub enum RetryOutcome<E> {
    /// An attempt succeeded.
    Success,
    /// The owning service was deleted mid-loop; not a reportable failure.
    Cancelled,
    /// Every attempt failed; holds each attempt's error in order.
    Exhausted(Vec<E>),
}

impl<E> RetryOutcome<E> {
    /// Whether the loop ended in success.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

/// Runs `attempt` up to `policy.max_tries` times.
///
/// The closure receives the 1-based attempt number and is invoked exactly
/// once per attempt: `n` times for an always-failing operation, `k` times
/// for one that succeeds on attempt `k`. Cancellation is polled before
/// every attempt and interrupts backoff sleeps immediately.
pub async fn retry_with_backoff<E, F, Fut>(
    policy: &BackoffPolicy,
    cancelled: &CancellationToken,
    mut attempt: F,
) -> RetryOutcome<E>
where
    F: FnMut(u8) -> Fut,
    Fut: Future<Output = Result<(), E>>,
{
    let mut errors = Vec::new();

    for try_number in 1..=policy.max_tries {
        if cancelled.is_cancelled() {
            return RetryOutcome::Cancelled;
        }

        match attempt(try_number).await {
            Ok(()) => return RetryOutcome::Success,
            Err(err) => errors.push(err),
        }

        if try_number < policy.max_tries {
            tokio::select! {
                () = cancelled.cancelled() => return RetryOutcome::Cancelled,
                () = tokio::time::sleep(policy.delay_after(try_number)) => {}
            }
        }
    }

    RetryOutcome::Exhausted(errors)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    #[test]
    fn backoff_doubles_and_caps() {
        let policy = BackoffPolicy::default();
        assert_eq!(policy.delay_after(1), Duration::from_secs(1));
        assert_eq!(policy.delay_after(2), Duration::from_secs(2));
        assert_eq!(policy.delay_after(3), Duration::from_secs(4));
        assert_eq!(policy.delay_after(6), Duration::from_secs(30));
        assert_eq!(policy.delay_after(20), Duration::from_secs(30));
    }

    #[tokio::test(start_paused = true)]
    async fn always_failing_attempts_exactly_max_tries() {
        let calls = AtomicU32::new(0);
        let outcome = retry_with_backoff(
            &BackoffPolicy::with_max_tries(5),
            &CancellationToken::new(),
            |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err::<(), _>("boom") }
            },
        )
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 5);
        match outcome {
            RetryOutcome::Exhausted(errs) => assert_eq!(errs.len(), 5),
            _ => panic!("expected exhausted outcome"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn success_on_attempt_k_stops_there() {
        let calls = AtomicU32::new(0);
        let outcome = retry_with_backoff(
            &BackoffPolicy::with_max_tries(5),
            &CancellationToken::new(),
            |try_number| {
                calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if try_number == 3 {
                        Ok(())
                    } else {
                        Err("boom")
                    }
                }
            },
        )
        .await;

        assert!(outcome.is_success());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_aborts_without_failure() {
        let token = CancellationToken::new();
        token.cancel();
        let outcome = retry_with_backoff(&BackoffPolicy::default(), &token, |_| async {
            Err::<(), _>("never runs")
        })
        .await;
        assert!(matches!(outcome, RetryOutcome::Cancelled));
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_interrupts_backoff_sleep() {
        let token = CancellationToken::new();
        let inner = token.clone();
        let outcome = retry_with_backoff(
            &BackoffPolicy::with_max_tries(10),
            &token,
            move |try_number| {
                let inner = inner.clone();
                async move {
                    if try_number == 2 {
                        inner.cancel();
                    }
                    Err::<(), _>("boom")
                }
            },
        )
        .await;
        assert!(matches!(outcome, RetryOutcome::Cancelled));
    }
}
