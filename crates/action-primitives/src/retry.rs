//! Retry/backoff controller
//!
//! Wraps a single driver interaction with bounded exponential backoff.
//! Only transient failures are retried; fatal ones propagate on the first
//! attempt. Backoff delays are wait points and honour the run's
//! cancellation token and deadline.

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{
    errors::{DriverError, Interruption},
    types::RunCtx,
};

/// Backoff policy shared read-only by every retried operation of an engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub max_attempts: u32,

    /// Delay before the second attempt (milliseconds)
    pub base_delay_ms: u64,

    /// Growth factor applied per failed attempt
    pub multiplier: f64,

    /// Upper bound for any single delay (milliseconds)
    pub max_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 250,
            multiplier: 2.0,
            max_delay_ms: 5_000,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum RetryPolicyError {
    #[error("retry max_attempts must be at least 1")]
    NoAttempts,

    #[error("retry multiplier must be a finite number >= 1.0 (got {0})")]
    Multiplier(f64),
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration, multiplier: f64, max_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay_ms: base_delay.as_millis() as u64,
            multiplier,
            max_delay_ms: max_delay.as_millis() as u64,
        }
    }

    /// Policy that never retries
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), RetryPolicyError> {
        if self.max_attempts == 0 {
            return Err(RetryPolicyError::NoAttempts);
        }
        if !self.multiplier.is_finite() || self.multiplier < 1.0 {
            return Err(RetryPolicyError::Multiplier(self.multiplier));
        }
        Ok(())
    }

    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }

    /// Delay to wait after failed attempt `attempt` (1-based) before the next one
    ///
    /// `base_delay * multiplier^(attempt-1)`, capped at `max_delay`.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let raw = self.base_delay_ms as f64 * self.multiplier.max(1.0).powi(exponent);
        let capped = if raw.is_finite() {
            raw.min(self.max_delay_ms as f64)
        } else {
            self.max_delay_ms as f64
        };
        Duration::from_millis(capped.max(0.0) as u64)
    }

    /// Whether another attempt is allowed after `attempt` attempts
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }
}

/// Outcome of a retried operation that eventually succeeded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Retried<T> {
    pub value: T,
    pub attempts: u32,
}

/// Failure of a retried operation
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RetryError {
    /// Every attempt failed with a transient error
    #[error("{operation} failed after {attempts} attempts: {last}")]
    Exhausted {
        operation: String,
        attempts: u32,
        last: DriverError,
    },

    /// A non-transient error; not retried
    #[error("{operation} failed: {source}")]
    Fatal {
        operation: String,
        attempts: u32,
        #[source]
        source: DriverError,
    },

    /// The run was cancelled or hit its deadline
    #[error("{operation} interrupted after {attempts} attempts: {reason}")]
    Interrupted {
        operation: String,
        attempts: u32,
        reason: Interruption,
    },
}

impl RetryError {
    pub fn attempts(&self) -> u32 {
        match self {
            RetryError::Exhausted { attempts, .. }
            | RetryError::Fatal { attempts, .. }
            | RetryError::Interrupted { attempts, .. } => *attempts,
        }
    }

    /// Last driver error, when the failure came from the driver
    pub fn driver_error(&self) -> Option<&DriverError> {
        match self {
            RetryError::Exhausted { last, .. } => Some(last),
            RetryError::Fatal { source, .. } => Some(source),
            RetryError::Interrupted { .. } => None,
        }
    }

    pub fn is_exhausted(&self) -> bool {
        matches!(self, RetryError::Exhausted { .. })
    }
}

/// Receives a notice before every backoff sleep
pub trait RetryObserver: Send + Sync {
    fn on_retry(&self, operation: &str, attempt: u32, delay: Duration, error: &DriverError);
}

/// Retry controller bound to a policy and an optional observer
pub struct Retrier<'a> {
    policy: &'a RetryPolicy,
    observer: Option<&'a dyn RetryObserver>,
}

impl<'a> Retrier<'a> {
    pub fn new(policy: &'a RetryPolicy) -> Self {
        Self {
            policy,
            observer: None,
        }
    }

    pub fn with_observer(mut self, observer: &'a dyn RetryObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        self.policy
    }

    /// Run `op` until it succeeds, fails fatally, exhausts the policy or the run is interrupted
    pub async fn run<T, F, Fut>(
        &self,
        ctx: &RunCtx,
        operation: &str,
        mut op: F,
    ) -> Result<Retried<T>, RetryError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, DriverError>>,
    {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            if let Err(reason) = ctx.check() {
                return Err(RetryError::Interrupted {
                    operation: operation.to_string(),
                    attempts: attempt,
                    reason,
                });
            }

            attempt += 1;
            match op().await {
                Ok(value) => {
                    if attempt > 1 {
                        info!(
                            run_id = %ctx.run_id,
                            operation,
                            attempts = attempt,
                            "operation succeeded after retry"
                        );
                    }
                    return Ok(Retried {
                        value,
                        attempts: attempt,
                    });
                }
                Err(err) if !err.is_transient() => {
                    warn!(
                        run_id = %ctx.run_id,
                        operation,
                        attempt,
                        error = %err,
                        "non-retryable failure"
                    );
                    return Err(RetryError::Fatal {
                        operation: operation.to_string(),
                        attempts: attempt,
                        source: err,
                    });
                }
                Err(err) if attempt >= max_attempts => {
                    warn!(
                        run_id = %ctx.run_id,
                        operation,
                        attempts = attempt,
                        error = %err,
                        "retries exhausted"
                    );
                    return Err(RetryError::Exhausted {
                        operation: operation.to_string(),
                        attempts: attempt,
                        last: err,
                    });
                }
                Err(err) => {
                    let delay = self.policy.delay_after(attempt);
                    debug!(
                        run_id = %ctx.run_id,
                        operation,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "transient failure, backing off"
                    );
                    if let Some(observer) = self.observer {
                        observer.on_retry(operation, attempt, delay, &err);
                    }
                    if let Err(reason) = ctx.pause(delay).await {
                        return Err(RetryError::Interrupted {
                            operation: operation.to_string(),
                            attempts: attempt,
                            reason,
                        });
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use formpilot_core_types::RunId;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;
    use tokio::time::Instant;
    use tokio_util::sync::CancellationToken;

    fn policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::new(
            max_attempts,
            Duration::from_millis(100),
            2.0,
            Duration::from_millis(1_000),
        )
    }

    #[derive(Default)]
    struct Recorder {
        delays: Mutex<Vec<Duration>>,
    }

    impl RetryObserver for Recorder {
        fn on_retry(&self, _operation: &str, _attempt: u32, delay: Duration, _error: &DriverError) {
            self.delays.lock().unwrap().push(delay);
        }
    }

    #[test]
    fn test_delay_grows_then_caps() {
        let policy = policy(10);
        assert_eq!(policy.delay_after(1), Duration::from_millis(100));
        assert_eq!(policy.delay_after(2), Duration::from_millis(200));
        assert_eq!(policy.delay_after(3), Duration::from_millis(400));
        assert_eq!(policy.delay_after(4), Duration::from_millis(800));
        assert_eq!(policy.delay_after(5), Duration::from_millis(1_000));
        assert_eq!(policy.delay_after(60), Duration::from_millis(1_000));
    }

    #[test]
    fn test_delay_is_monotonic() {
        for multiplier in [1.0, 1.5, 2.0, 3.7] {
            let policy = RetryPolicy {
                max_attempts: 30,
                base_delay_ms: 7,
                multiplier,
                max_delay_ms: 2_500,
            };
            let mut previous = Duration::ZERO;
            for attempt in 1..30 {
                let delay = policy.delay_after(attempt);
                assert!(delay >= previous, "delay shrank at attempt {}", attempt);
                assert!(delay <= policy.max_delay());
                previous = delay;
            }
        }
    }

    #[test]
    fn test_policy_validation() {
        assert!(RetryPolicy::default().validate().is_ok());
        assert_eq!(
            RetryPolicy {
                max_attempts: 0,
                ..RetryPolicy::default()
            }
            .validate(),
            Err(RetryPolicyError::NoAttempts)
        );
        assert!(RetryPolicy {
            multiplier: 0.5,
            ..RetryPolicy::default()
        }
        .validate()
        .is_err());
    }

    #[test]
    fn test_should_retry() {
        let policy = policy(3);
        assert!(policy.should_retry(1));
        assert!(policy.should_retry(2));
        assert!(!policy.should_retry(3));
    }

    #[test]
    fn test_first_success_needs_no_backoff() {
        let policy = policy(3);
        let ctx = RunCtx::unbounded(RunId::new());
        let result = tokio_test::block_on(
            Retrier::new(&policy).run(&ctx, "read", || async { Ok::<_, DriverError>("ok") }),
        )
        .unwrap();
        assert_eq!(result.value, "ok");
        assert_eq!(result.attempts, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_succeeds_after_transient_failures() {
        let policy = policy(5);
        let recorder = Recorder::default();
        let retrier = Retrier::new(&policy).with_observer(&recorder);
        let ctx = RunCtx::unbounded(RunId::new());
        let calls = AtomicU32::new(0);
        let calls = &calls;

        let start = Instant::now();
        let result = retrier
            .run(&ctx, "locate", move || async move {
                let call = calls.fetch_add(1, Ordering::SeqCst) + 1;
                if call < 3 {
                    Err(DriverError::NotFound("#email".into()))
                } else {
                    Ok(call)
                }
            })
            .await
            .unwrap();

        assert_eq!(result.value, 3);
        assert_eq!(result.attempts, 3);
        assert_eq!(start.elapsed(), Duration::from_millis(300));
        assert_eq!(
            *recorder.delays.lock().unwrap(),
            vec![Duration::from_millis(100), Duration::from_millis(200)]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhaustion_reports_attempts_and_cause() {
        let policy = policy(3);
        let retrier = Retrier::new(&policy);
        let ctx = RunCtx::unbounded(RunId::new());
        let calls = AtomicU32::new(0);
        let calls = &calls;

        let err = retrier
            .run(&ctx, "click", move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(DriverError::StaleElement("#submit".into()))
            })
            .await
            .unwrap_err();

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(
            err,
            RetryError::Exhausted {
                operation: "click".into(),
                attempts: 3,
                last: DriverError::StaleElement("#submit".into()),
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_fatal_error_is_not_retried() {
        let policy = policy(5);
        let retrier = Retrier::new(&policy);
        let ctx = RunCtx::unbounded(RunId::new());
        let calls = AtomicU32::new(0);
        let calls = &calls;

        let err = retrier
            .run(&ctx, "locate", move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(DriverError::InvalidSelector("//[".into()))
            })
            .await
            .unwrap_err();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(matches!(err, RetryError::Fatal { attempts: 1, .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_aborts_on_deadline() {
        let policy = RetryPolicy::new(10, Duration::from_secs(1), 2.0, Duration::from_secs(30));
        let retrier = Retrier::new(&policy);
        let start = Instant::now();
        let ctx = RunCtx::new(
            RunId::new(),
            Some(start + Duration::from_millis(1_500)),
            CancellationToken::new(),
        );

        let err = retrier
            .run(&ctx, "locate", || async {
                Err::<(), _>(DriverError::NotFound("#late".into()))
            })
            .await
            .unwrap_err();

        assert_eq!(
            err,
            RetryError::Interrupted {
                operation: "locate".into(),
                attempts: 2,
                reason: Interruption::DeadlineExceeded,
            }
        );
        assert_eq!(start.elapsed(), Duration::from_millis(1_500));
    }
}
