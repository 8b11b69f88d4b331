//! Retry with exponential backoff for calls to the completion provider.
//!
//! The executor reattempts only failures classified as retryable, doubles
//! (or whatever the configured multiplier is) the wait between attempts up
//! to a cap, and gives up once the elapsed wall-clock time since the first
//! attempt exceeds the policy deadline. Time is read through the [`Clock`]
//! trait so the deadline behavior is testable without real sleeps.

use std::fmt::Display;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use thiserror::Error;
use tracing::warn;

/// Backoff parameters for calls to the remote completion capability.
///
/// Immutable; constructed once at startup.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: f64,
    pub deadline: Duration,
}

#[derive(Debug, Error, PartialEq)]
pub enum RetryPolicyError {
    #[error("initial_delay must be greater than zero")]
    ZeroInitialDelay,

    #[error("multiplier must be greater than 1 (got {0})")]
    MultiplierTooSmall(f64),

    #[error("max_delay must not be smaller than initial_delay")]
    MaxBelowInitial,

    #[error("deadline must be greater than zero")]
    ZeroDeadline,
}

impl RetryPolicy {
    /// Validating constructor.
    pub fn new(
        initial_delay: Duration,
        max_delay: Duration,
        multiplier: f64,
        deadline: Duration,
    ) -> Result<Self, RetryPolicyError> {
        if initial_delay.is_zero() {
            return Err(RetryPolicyError::ZeroInitialDelay);
        }
        if multiplier <= 1.0 {
            return Err(RetryPolicyError::MultiplierTooSmall(multiplier));
        }
        if max_delay < initial_delay {
            return Err(RetryPolicyError::MaxBelowInitial);
        }
        if deadline.is_zero() {
            return Err(RetryPolicyError::ZeroDeadline);
        }

        Ok(Self {
            initial_delay,
            max_delay,
            multiplier,
            deadline,
        })
    }
}

impl Default for RetryPolicy {
    /// 1s initial, 60s cap, doubling, 15 minute deadline.
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            multiplier: 2.0,
            deadline: Duration::from_secs(900),
        }
    }
}

/// Classifies whether reattempting the same request may succeed.
pub trait Retryable {
    fn is_retryable(&self) -> bool;
}

/// Time source used by the retry executor.
#[async_trait]
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;

    async fn sleep(&self, duration: Duration);
}

/// Production clock backed by `tokio::time`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioClock;

#[async_trait]
impl Clock for TokioClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Run `operation` under `policy`, retrying retryable failures.
///
/// # Returns
/// The first success, the first non-retryable error, or the last retryable
/// error once the deadline is exhausted.
pub async fn execute_with_retry<C, F, Fut, T, E>(
    policy: &RetryPolicy,
    clock: &C,
    mut operation: F,
) -> Result<T, E>
where
    C: Clock + ?Sized,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Retryable + Display,
{
    let start = clock.now();
    let mut delay = policy.initial_delay;
    let mut attempt = 0_usize;

    loop {
        attempt += 1;
        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) if !e.is_retryable() => return Err(e),
            Err(e) => {
                let elapsed = clock.now().saturating_duration_since(start);
                if elapsed >= policy.deadline {
                    warn!(
                        "Request failed (attempt {attempt}): {e}. \
                         Retry deadline of {:?} exhausted after {elapsed:?}.",
                        policy.deadline
                    );
                    return Err(e);
                }

                warn!("Request failed (attempt {attempt}): {e}. Retrying after {delay:?}...");
                clock.sleep(delay).await;
                delay = delay.mul_f64(policy.multiplier).min(policy.max_delay);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Clone, Error)]
    #[error("{message} (retryable: {retryable})")]
    struct TestError {
        message: String,
        retryable: bool,
    }

    impl Retryable for TestError {
        fn is_retryable(&self) -> bool {
            self.retryable
        }
    }

    fn transient(msg: &str) -> TestError {
        TestError {
            message: msg.to_string(),
            retryable: true,
        }
    }

    fn fatal(msg: &str) -> TestError {
        TestError {
            message: msg.to_string(),
            retryable: false,
        }
    }

    /// Virtual clock: sleeps advance time instantly and are recorded.
    struct FakeClock {
        base: Instant,
        advanced: Mutex<Duration>,
        sleeps: Mutex<Vec<Duration>>,
    }

    impl FakeClock {
        fn new() -> Self {
            Self {
                base: Instant::now(),
                advanced: Mutex::new(Duration::ZERO),
                sleeps: Mutex::new(Vec::new()),
            }
        }

        fn sleeps(&self) -> Vec<Duration> {
            self.sleeps.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Clock for FakeClock {
        fn now(&self) -> Instant {
            self.base + *self.advanced.lock().unwrap()
        }

        async fn sleep(&self, duration: Duration) {
            *self.advanced.lock().unwrap() += duration;
            self.sleeps.lock().unwrap().push(duration);
        }
    }

    fn test_policy() -> RetryPolicy {
        RetryPolicy::new(
            Duration::from_secs(1),
            Duration::from_secs(60),
            2.0,
            Duration::from_secs(900),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn succeeds_on_first_attempt_without_sleeping() {
        let clock = FakeClock::new();
        let attempts = Arc::new(AtomicUsize::new(0));

        let result: Result<&str, TestError> = execute_with_retry(&test_policy(), &clock, || {
            let attempts = attempts.clone();
            async move {
                attempts.fetch_add(1, Ordering::SeqCst);
                Ok("ok")
            }
        })
        .await;

        assert_eq!(result.unwrap(), "ok");
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
        assert!(clock.sleeps().is_empty());
    }

    #[tokio::test]
    async fn fails_twice_then_succeeds_with_doubling_waits() {
        let clock = FakeClock::new();
        let attempts = Arc::new(AtomicUsize::new(0));

        let result = execute_with_retry(&test_policy(), &clock, || {
            let attempts = attempts.clone();
            async move {
                let n = attempts.fetch_add(1, Ordering::SeqCst) + 1;
                if n < 3 {
                    Err(transient("rate limited"))
                } else {
                    Ok("third time lucky")
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), "third time lucky");
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
        assert_eq!(
            clock.sleeps(),
            vec![Duration::from_secs(1), Duration::from_secs(2)]
        );
    }

    #[tokio::test]
    async fn stops_once_deadline_is_exhausted() {
        let clock = FakeClock::new();
        let attempts = Arc::new(AtomicUsize::new(0));
        let policy = test_policy();

        let result: Result<(), TestError> = execute_with_retry(&policy, &clock, || {
            let attempts = attempts.clone();
            async move {
                attempts.fetch_add(1, Ordering::SeqCst);
                Err(transient("still down"))
            }
        })
        .await;

        assert_eq!(result.unwrap_err().message, "still down");
        // Waits: 1, 2, 4, ..., capped at 60. Total slept time must have
        // reached the deadline before the executor gave up.
        let slept: Duration = clock.sleeps().iter().sum();
        assert!(slept >= policy.deadline);
        assert!(*clock.sleeps().iter().max().unwrap() <= policy.max_delay);
    }

    #[tokio::test]
    async fn non_retryable_error_returns_immediately() {
        let clock = FakeClock::new();
        let attempts = Arc::new(AtomicUsize::new(0));

        let result: Result<(), TestError> = execute_with_retry(&test_policy(), &clock, || {
            let attempts = attempts.clone();
            async move {
                attempts.fetch_add(1, Ordering::SeqCst);
                Err(fatal("bad credentials"))
            }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
        assert!(clock.sleeps().is_empty());
    }

    #[test]
    fn policy_rejects_invalid_parameters() {
        let secs = Duration::from_secs;

        assert_eq!(
            RetryPolicy::new(Duration::ZERO, secs(60), 2.0, secs(900)).unwrap_err(),
            RetryPolicyError::ZeroInitialDelay
        );
        assert!(matches!(
            RetryPolicy::new(secs(1), secs(60), 1.0, secs(900)).unwrap_err(),
            RetryPolicyError::MultiplierTooSmall(_)
        ));
        assert_eq!(
            RetryPolicy::new(secs(10), secs(5), 2.0, secs(900)).unwrap_err(),
            RetryPolicyError::MaxBelowInitial
        );
        assert_eq!(
            RetryPolicy::new(secs(1), secs(60), 2.0, Duration::ZERO).unwrap_err(),
            RetryPolicyError::ZeroDeadline
        );
    }
}
