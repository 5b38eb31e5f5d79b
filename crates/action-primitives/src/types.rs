//! Core data types for driver interactions

use formpilot_core_types::{Locator, RunId};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep, sleep_until, Instant};
use tokio_util::sync::CancellationToken;

use crate::errors::Interruption;

/// Opaque reference to an element located by the driver
///
/// Handles may go stale when the page re-renders; the driver reports
/// `DriverError::StaleElement` and callers re-locate.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElementHandle {
    /// Driver-assigned element reference
    pub id: String,

    /// Locator the handle was resolved from
    pub locator: Locator,
}

impl ElementHandle {
    pub fn new(id: impl Into<String>, locator: Locator) -> Self {
        Self {
            id: id.into(),
            locator,
        }
    }
}

/// Select method for dropdown selection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectBy {
    /// Select by value attribute
    #[default]
    Value,

    /// Select by visible text
    Text,
}

impl SelectBy {
    pub fn as_str(&self) -> &'static str {
        match self {
            SelectBy::Value => "value",
            SelectBy::Text => "text",
        }
    }
}

/// Currently selected option of a dropdown
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectedOption {
    /// Option value attribute
    pub value: String,

    /// Option visible text
    pub text: String,
}

impl SelectedOption {
    pub fn new(value: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            text: text.into(),
        }
    }

    /// Project the field matching the select method
    pub fn by(&self, method: SelectBy) -> &str {
        match method {
            SelectBy::Value => &self.value,
            SelectBy::Text => &self.text,
        }
    }
}

/// Execution context for one form run
///
/// Carries the run identifier plus the caller's overall deadline and
/// cancellation token. Every wait point in the engine goes through
/// [`RunCtx::pause`] or [`RunCtx::interruptible`], which abort promptly
/// when either fires.
#[derive(Debug, Clone)]
pub struct RunCtx {
    /// Identifier of the run this context belongs to
    pub run_id: RunId,

    /// Optional overall deadline imposed by the caller
    pub deadline: Option<Instant>,

    /// Cancellation token for cooperative cancellation
    pub cancel_token: CancellationToken,
}

impl RunCtx {
    /// Create a new run context
    pub fn new(run_id: RunId, deadline: Option<Instant>, cancel_token: CancellationToken) -> Self {
        Self {
            run_id,
            deadline,
            cancel_token,
        }
    }

    /// Context with no deadline and a fresh token
    pub fn unbounded(run_id: RunId) -> Self {
        Self::new(run_id, None, CancellationToken::new())
    }

    /// Check if this context has been cancelled
    pub fn is_cancelled(&self) -> bool {
        self.cancel_token.is_cancelled()
    }

    /// Check if this context has exceeded its deadline
    pub fn is_timeout(&self) -> bool {
        self.deadline
            .map(|deadline| Instant::now() >= deadline)
            .unwrap_or(false)
    }

    /// Get remaining time until deadline (None when unbounded)
    pub fn remaining_time(&self) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    /// Clamp a wait budget to what is left of the run deadline
    pub fn clamp(&self, budget: Duration) -> Duration {
        match self.remaining_time() {
            Some(remaining) => budget.min(remaining),
            None => budget,
        }
    }

    /// Fail fast if the run was cancelled or ran out of time
    pub fn check(&self) -> Result<(), Interruption> {
        if self.is_cancelled() {
            return Err(Interruption::Cancelled);
        }
        if self.is_timeout() {
            return Err(Interruption::DeadlineExceeded);
        }
        Ok(())
    }

    /// Suspend for `duration`, aborting early on cancellation or deadline
    pub async fn pause(&self, duration: Duration) -> Result<(), Interruption> {
        self.interruptible(sleep(duration)).await
    }

    /// Drive `future` to completion unless the run is cancelled or its deadline passes first
    pub async fn interruptible<F>(&self, future: F) -> Result<F::Output, Interruption>
    where
        F: Future,
    {
        self.check()?;
        let deadline = self.deadline;
        let expired = async move {
            match deadline {
                Some(deadline) => sleep_until(deadline).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            _ = self.cancel_token.cancelled() => Err(Interruption::Cancelled),
            _ = expired => Err(Interruption::DeadlineExceeded),
            output = future => Ok(output),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_by_default() {
        assert_eq!(SelectBy::default(), SelectBy::Value);
        let option = SelectedOption::new("opt2", "Option 2");
        assert_eq!(option.by(SelectBy::Value), "opt2");
        assert_eq!(option.by(SelectBy::Text), "Option 2");
    }

    #[test]
    fn test_select_by_serde() {
        let parsed: SelectBy = serde_json::from_str("\"text\"").unwrap();
        assert_eq!(parsed, SelectBy::Text);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_completes_without_deadline() {
        let ctx = RunCtx::unbounded(RunId::new());
        let start = Instant::now();
        ctx.pause(Duration::from_millis(300)).await.unwrap();
        assert_eq!(start.elapsed(), Duration::from_millis(300));
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_stops_at_deadline() {
        let start = Instant::now();
        let ctx = RunCtx::new(
            RunId::new(),
            Some(start + Duration::from_millis(100)),
            CancellationToken::new(),
        );
        let result = ctx.pause(Duration::from_secs(5)).await;
        assert_eq!(result, Err(Interruption::DeadlineExceeded));
        assert_eq!(start.elapsed(), Duration::from_millis(100));
        assert!(ctx.is_timeout());
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_observes_cancellation() {
        let ctx = RunCtx::unbounded(RunId::new());
        let token = ctx.cancel_token.clone();
        tokio::spawn(async move {
            sleep(Duration::from_millis(50)).await;
            token.cancel();
        });
        let start = Instant::now();
        let result = ctx.pause(Duration::from_secs(10)).await;
        assert_eq!(result, Err(Interruption::Cancelled));
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn test_check_after_cancel() {
        let ctx = RunCtx::unbounded(RunId::new());
        assert!(ctx.check().is_ok());
        ctx.cancel_token.cancel();
        assert_eq!(ctx.check(), Err(Interruption::Cancelled));
    }
}
