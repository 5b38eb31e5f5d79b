//! Built-in page readiness waiting

use crate::{
    driver::DriverPort,
    errors::{DriverError, Interruption},
    types::RunCtx,
};
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// Why the page never became ready
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReadyError {
    /// Page did not report ready within the load timeout
    #[error("page not ready after {0}ms")]
    Timeout(u64),

    /// Driver failed while waiting
    #[error("driver failed while waiting for page: {0}")]
    Driver(DriverError),

    /// Run was cancelled or hit its deadline
    #[error(transparent)]
    Interrupted(#[from] Interruption),
}

/// Waiting strategy trait
#[async_trait]
pub trait WaitStrategy: Send + Sync {
    /// Wait until the current document is ready for interaction
    async fn wait_ready(
        &self,
        driver: &dyn DriverPort,
        ctx: &RunCtx,
        timeout: Duration,
    ) -> Result<(), ReadyError>;
}

/// Default waiting strategy: delegate to the driver's readiness gate
#[derive(Debug, Clone, Default)]
pub struct DefaultWaitStrategy;

#[async_trait]
impl WaitStrategy for DefaultWaitStrategy {
    async fn wait_ready(
        &self,
        driver: &dyn DriverPort,
        ctx: &RunCtx,
        timeout: Duration,
    ) -> Result<(), ReadyError> {
        let budget = ctx.clamp(timeout);
        debug!(
            run_id = %ctx.run_id,
            timeout_ms = budget.as_millis() as u64,
            "waiting for page readiness"
        );

        let waited = ctx
            .interruptible(tokio::time::timeout(budget, driver.wait_ready(budget)))
            .await?;

        match waited {
            Ok(Ok(())) => Ok(()),
            Ok(Err(DriverError::Timeout(detail))) => {
                warn!(run_id = %ctx.run_id, %detail, "page readiness timed out");
                Err(ReadyError::Timeout(budget.as_millis() as u64))
            }
            Ok(Err(err)) => Err(ReadyError::Driver(err)),
            Err(_) => {
                ctx.check()?;
                warn!(run_id = %ctx.run_id, "driver did not answer readiness wait in time");
                Err(ReadyError::Timeout(budget.as_millis() as u64))
            }
        }
    }
}
