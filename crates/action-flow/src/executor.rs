//! Form execution engine

use action_fields::{FieldError, FieldSpec, FieldStrategy, FieldStrategyRegistry};
use action_gate::{ConditionEvaluator, GateError, Observation, SuccessCondition};
use action_primitives::{
    DefaultWaitStrategy, DriverPort, ReadyError, Retrier, RetryPolicy, RunCtx, WaitStrategy,
};
use chrono::Utc;
use formpilot_core_types::RunId;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, info, warn};

use crate::{
    errors::{ConfigurationError, EngineError},
    events::{EventKind, EventSink, EventTrail, TracingEventSink},
    preflight::{build_plan, ExecutionPlan},
    screenshots::{Checkpoint, ScreenshotRecorder},
    strategies::{DefaultFailureHandler, FailureHandler, FailureStrategy},
    types::{
        EngineState, ExecutionOutcome, FieldResult, FieldStatus, FormConfig, RunOptions, RunStatus,
    },
};

/// Drives one browser session through fill, submit and verify
///
/// The engine owns its driver handle; runs take `&mut self` so a session
/// never sees two runs at once. Independent engines over separate sessions
/// can run concurrently.
pub struct FormEngine {
    driver: Arc<dyn DriverPort>,
    registry: FieldStrategyRegistry,
    retry_policy: RetryPolicy,
    wait_strategy: Arc<dyn WaitStrategy>,
    failure_handler: Arc<dyn FailureHandler>,
    events: Arc<dyn EventSink>,
}

pub struct FormEngineBuilder {
    driver: Arc<dyn DriverPort>,
    registry: Option<FieldStrategyRegistry>,
    retry_policy: RetryPolicy,
    wait_strategy: Option<Arc<dyn WaitStrategy>>,
    failure_handler: Option<Arc<dyn FailureHandler>>,
    events: Option<Arc<dyn EventSink>>,
}

impl FormEngineBuilder {
    pub fn new(driver: Arc<dyn DriverPort>) -> Self {
        Self {
            driver,
            registry: None,
            retry_policy: RetryPolicy::default(),
            wait_strategy: None,
            failure_handler: None,
            events: None,
        }
    }

    pub fn with_registry(mut self, registry: FieldStrategyRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    pub fn with_wait_strategy(mut self, strategy: Arc<dyn WaitStrategy>) -> Self {
        self.wait_strategy = Some(strategy);
        self
    }

    pub fn with_failure_handler(mut self, handler: Arc<dyn FailureHandler>) -> Self {
        self.failure_handler = Some(handler);
        self
    }

    pub fn with_events(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.events = Some(sink);
        self
    }

    pub fn build(self) -> FormEngine {
        FormEngine {
            driver: self.driver,
            registry: self
                .registry
                .unwrap_or_else(FieldStrategyRegistry::with_builtins),
            retry_policy: self.retry_policy,
            wait_strategy: self
                .wait_strategy
                .unwrap_or_else(|| Arc::new(DefaultWaitStrategy)),
            failure_handler: self
                .failure_handler
                .unwrap_or_else(|| Arc::new(DefaultFailureHandler::new())),
            events: self.events.unwrap_or_else(|| Arc::new(TracingEventSink)),
        }
    }
}

impl FormEngine {
    pub fn builder(driver: Arc<dyn DriverPort>) -> FormEngineBuilder {
        FormEngineBuilder::new(driver)
    }

    /// Engine with built-in strategies, default retry policy and tracing events
    pub fn new(driver: Arc<dyn DriverPort>) -> Self {
        Self::builder(driver).build()
    }

    pub fn registry(&self) -> &FieldStrategyRegistry {
        &self.registry
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry_policy
    }

    /// Validate `config` against this engine without touching the driver
    pub fn preflight(&self, config: &FormConfig) -> Result<ExecutionPlan, ConfigurationError> {
        build_plan(config, &self.registry, &self.retry_policy)
    }

    /// Run with no deadline
    pub async fn execute(
        &mut self,
        config: &FormConfig,
    ) -> Result<ExecutionOutcome, ConfigurationError> {
        self.execute_with(config, RunOptions::default()).await
    }

    /// Run under the caller's deadline and cancellation token
    ///
    /// Only pre-flight failures are returned as `Err`; everything after
    /// that is reported inside the outcome.
    pub async fn execute_with(
        &mut self,
        config: &FormConfig,
        options: RunOptions,
    ) -> Result<ExecutionOutcome, ConfigurationError> {
        let plan = self.preflight(config).map_err(|err| {
            warn!(error = %err, "pre-flight rejected configuration");
            err
        })?;

        let run_id = RunId::new();
        let ctx = RunCtx::new(run_id.clone(), options.deadline, options.cancel);
        let run = Run {
            driver: self.driver.as_ref(),
            retry_policy: &self.retry_policy,
            wait_strategy: self.wait_strategy.as_ref(),
            failure_handler: self.failure_handler.as_ref(),
            config,
            plan: &plan,
            trail: EventTrail::new(run_id.clone(), self.events.clone()),
            shots: ScreenshotRecorder::new(config.screenshot_dir.clone(), &run_id),
            screenshots: Vec::new(),
            fields: Vec::with_capacity(config.fields.len()),
            submitted: false,
            ctx,
        };
        Ok(run.drive().await)
    }
}

/// State for a single execution
struct Run<'a> {
    driver: &'a dyn DriverPort,
    retry_policy: &'a RetryPolicy,
    wait_strategy: &'a dyn WaitStrategy,
    failure_handler: &'a dyn FailureHandler,
    config: &'a FormConfig,
    plan: &'a ExecutionPlan,
    ctx: RunCtx,
    trail: EventTrail,
    shots: ScreenshotRecorder,
    screenshots: Vec<PathBuf>,
    fields: Vec<FieldResult>,
    submitted: bool,
}

impl<'a> Run<'a> {
    async fn drive(mut self) -> ExecutionOutcome {
        let started_at = Utc::now();
        let clock = Instant::now();
        info!(
            run_id = %self.ctx.run_id,
            url = %self.config.url,
            fields = self.config.fields.len(),
            "form run started"
        );

        let (status, error) = match self.steps().await {
            Ok(()) => {
                let status = if self.fields.iter().any(|f| f.status == FieldStatus::Failed) {
                    RunStatus::PartialSuccess
                } else {
                    RunStatus::Success
                };
                self.trail.transition(EngineState::Completed);
                self.checkpoint(Checkpoint::After).await;
                self.trail
                    .emit(EventKind::RunCompleted, None, format!("run finished: {}", status));
                (status, None)
            }
            Err(err) => {
                let message = err.to_string();
                let kind = if err.is_interruption() {
                    EventKind::RunInterrupted
                } else {
                    EventKind::RunFailed
                };
                self.trail.emit(kind, None, message.clone());
                self.checkpoint(Checkpoint::Failure).await;
                self.trail.transition(EngineState::Failed);
                (RunStatus::Failed, Some(message))
            }
        };

        let latency_ms = clock.elapsed().as_millis() as u64;
        info!(
            run_id = %self.ctx.run_id,
            status = %status,
            latency_ms,
            screenshots = self.screenshots.len(),
            "form run finished"
        );

        ExecutionOutcome {
            run_id: self.ctx.run_id.clone(),
            status,
            final_state: self.trail.state(),
            submitted: self.submitted,
            fields: self.fields,
            screenshots: self.screenshots,
            events: self.trail.into_events(),
            error,
            started_at,
            finished_at: Utc::now(),
            latency_ms,
        }
    }

    async fn steps(&mut self) -> Result<(), EngineError> {
        self.navigate().await?;
        self.await_page_ready().await?;
        self.checkpoint(Checkpoint::Before).await;
        self.fill_fields().await?;
        self.submit().await?;
        self.await_success().await
    }

    fn retrier(&self) -> Retrier<'_> {
        Retrier::new(self.retry_policy).with_observer(&self.trail)
    }

    async fn navigate(&mut self) -> Result<(), EngineError> {
        self.trail.transition(EngineState::NavigatingToPage);
        // Single attempt; any navigation error ends the run
        self.ctx
            .interruptible(self.driver.navigate(&self.config.url))
            .await?
            .map_err(EngineError::Navigation)
    }

    async fn await_page_ready(&mut self) -> Result<(), EngineError> {
        self.trail.transition(EngineState::AwaitingPageReady);
        self.wait_strategy
            .wait_ready(self.driver, &self.ctx, self.config.page_load_timeout())
            .await
            .map_err(|err| match err {
                ReadyError::Interrupted(reason) => EngineError::Interrupted(reason),
                other => EngineError::PageNotReady(other),
            })
    }

    async fn fill_fields(&mut self) -> Result<(), EngineError> {
        self.trail.transition(EngineState::FillingFields);
        let config = self.config;
        let plan = self.plan;

        for (index, (spec, strategy)) in config.fields.iter().zip(plan.strategies.iter()).enumerate() {
            match self.fill_one(spec, strategy.as_ref()).await {
                Ok(attempts) => {
                    self.trail.emit(
                        EventKind::FieldApplied,
                        Some(spec.label()),
                        format!(
                            "{} set to {} after {} attempt(s)",
                            strategy.name(),
                            spec.display_value(),
                            attempts
                        ),
                    );
                    self.fields.push(
                        FieldResult::new(index, spec, FieldStatus::Success).with_attempts(attempts),
                    );
                }
                Err((attempts, error)) => {
                    let decision = self.failure_handler.on_field_failure(spec, &error);
                    self.trail
                        .emit(EventKind::FieldFailed, Some(spec.label()), error.to_string());
                    self.fields.push(
                        FieldResult::new(index, spec, FieldStatus::Failed)
                            .with_attempts(attempts)
                            .with_reason(error.to_string()),
                    );
                    if decision == FailureStrategy::Abort {
                        self.skip_remaining(index + 1, &spec.label());
                        return Err(EngineError::FieldAborted {
                            field: spec.label(),
                            source: error,
                        });
                    }
                }
            }
        }

        let pause = config.wait_after_fill();
        if !pause.is_zero() {
            debug!(run_id = %self.ctx.run_id, wait_ms = pause.as_millis() as u64, "waiting after fill");
            self.ctx.pause(pause).await?;
        }
        Ok(())
    }

    /// One retry unit: locate, apply, read back. Verification runs once it succeeds.
    async fn fill_one(
        &self,
        spec: &FieldSpec,
        strategy: &dyn FieldStrategy,
    ) -> Result<u32, (u32, FieldError)> {
        let driver = self.driver;
        let operation = format!("fill {}", spec.label());
        let applied = self
            .retrier()
            .run(&self.ctx, &operation, move || async move {
                let element = driver.locate(&spec.locator).await?;
                strategy.apply(driver, &element, spec).await
            })
            .await
            .map_err(|err| (err.attempts(), FieldError::from(err)))?;

        if !strategy.verify(&applied.value, spec) {
            return Err((
                applied.attempts,
                FieldError::VerificationFailed {
                    field: spec.label(),
                    expected: spec.display_value(),
                    actual: applied.value.describe(spec.sensitive),
                },
            ));
        }
        Ok(applied.attempts)
    }

    fn skip_remaining(&mut self, from: usize, cause: &str) {
        let config = self.config;
        for (index, spec) in config.fields.iter().enumerate().skip(from) {
            let reason = format!("not attempted after {} aborted the run", cause);
            self.trail
                .emit(EventKind::FieldSkipped, Some(spec.label()), reason.clone());
            self.fields
                .push(FieldResult::new(index, spec, FieldStatus::Skipped).with_reason(reason));
        }
    }

    async fn submit(&mut self) -> Result<(), EngineError> {
        self.trail.transition(EngineState::Submitting);
        let config = self.config;
        let Some(locator) = config.submit.as_ref() else {
            debug!(run_id = %self.ctx.run_id, "no submit locator configured");
            return Ok(());
        };

        let driver = self.driver;
        let element = self
            .retrier()
            .run(&self.ctx, "submit", move || driver.locate(locator))
            .await
            .map_err(EngineError::Submit)?
            .value;
        // Locating is retried, the click is not
        self.ctx
            .interruptible(driver.click(&element))
            .await?
            .map_err(EngineError::SubmitClick)?;
        self.submitted = true;
        info!(run_id = %self.ctx.run_id, %locator, "form submitted");
        Ok(())
    }

    /// Poll until satisfied or the condition's timeout; the last poll lands on the timeout
    async fn await_success(&mut self) -> Result<(), EngineError> {
        let config = self.config;
        let plan = self.plan;
        let (Some(condition), Some(evaluator)) = (
            config.success_condition.as_ref(),
            plan.condition.as_deref(),
        ) else {
            return Ok(());
        };
        self.trail.transition(EngineState::AwaitingSuccessCondition);

        let timeout = condition.timeout();
        let interval = condition.poll_interval();
        let deadline = Instant::now() + timeout;
        let mut polls = 0u32;
        let mut last_observed = None;

        loop {
            polls += 1;
            let Some(evaluation) = self.poll(evaluator, deadline).await? else {
                debug!(run_id = %self.ctx.run_id, polls, "condition evaluation outlived the timeout");
                return Err(condition_timeout(evaluator, condition, last_observed));
            };
            match evaluation {
                Ok(observation) => {
                    self.trail.emit(
                        EventKind::ConditionPolled,
                        None,
                        format!(
                            "poll {}: {} satisfied={} observed={}",
                            polls,
                            evaluator.describe(),
                            observation.satisfied,
                            observation.observed.as_deref().unwrap_or("-")
                        ),
                    );
                    if observation.satisfied {
                        info!(run_id = %self.ctx.run_id, polls, "success condition met");
                        return Ok(());
                    }
                    last_observed = observation.observed;
                }
                Err(err) if err.is_transient() => {
                    debug!(run_id = %self.ctx.run_id, polls, error = %err, "condition not evaluable yet");
                }
                Err(err) => return Err(EngineError::Condition(err)),
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(condition_timeout(evaluator, condition, last_observed));
            }
            self.ctx.pause(interval.min(deadline - now)).await?;
        }
    }

    /// One evaluation, cut off at the condition deadline (`None`)
    async fn poll(
        &self,
        evaluator: &dyn ConditionEvaluator,
        deadline: Instant,
    ) -> Result<Option<Result<Observation, GateError>>, EngineError> {
        let evaluation = timeout_at(deadline, evaluator.evaluate(self.driver));
        Ok(self.ctx.interruptible(evaluation).await?.ok())
    }

    /// Best effort; failures are logged and recorded, never escalated
    async fn checkpoint(&mut self, checkpoint: Checkpoint) {
        if !self.shots.enabled() {
            return;
        }
        match self.shots.capture(self.driver, checkpoint).await {
            Ok(Some(path)) => {
                self.trail.emit(
                    EventKind::ScreenshotCaptured,
                    None,
                    format!("{} screenshot saved to {}", checkpoint, path.display()),
                );
                self.screenshots.push(path);
            }
            Ok(None) => {}
            Err(err) => {
                warn!(run_id = %self.ctx.run_id, %checkpoint, error = %err, "screenshot failed");
                self.trail.emit(
                    EventKind::ScreenshotFailed,
                    None,
                    format!("{} screenshot failed: {}", checkpoint, err),
                );
            }
        }
    }
}

fn condition_timeout(
    evaluator: &dyn ConditionEvaluator,
    condition: &SuccessCondition,
    last_observed: Option<String>,
) -> EngineError {
    EngineError::ConditionTimeout {
        condition: evaluator.describe(),
        timeout_ms: condition.timeout_ms,
        last_observed,
    }
}
