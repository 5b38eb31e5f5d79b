//! Core types for form execution

use action_fields::{redact, FieldSpec};
use action_gate::SuccessCondition;
use chrono::{DateTime, Utc};
use formpilot_core_types::{FieldValue, Locator, RunId};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::events::RunEvent;

pub const DEFAULT_PAGE_LOAD_TIMEOUT_MS: u64 = 30_000;

/// Validated form description consumed by the engine
///
/// Built by the configuration loader and read-only afterwards. Field
/// values already have secrets substituted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormConfig {
    /// Page holding the form
    pub url: String,

    /// Budget for the page to report ready, in milliseconds
    #[serde(default = "default_page_load_timeout_ms")]
    pub page_load_timeout_ms: u64,

    /// Fields in fill order
    pub fields: Vec<FieldSpec>,

    /// Control clicked to submit the form
    #[serde(default)]
    pub submit: Option<Locator>,

    /// Post-submission predicate
    #[serde(default)]
    pub success_condition: Option<SuccessCondition>,

    /// Where checkpoint screenshots go; none are taken when unset
    #[serde(default)]
    pub screenshot_dir: Option<PathBuf>,

    /// Pause between the last field and submission, in milliseconds
    #[serde(default)]
    pub wait_after_fill_ms: u64,
}

fn default_page_load_timeout_ms() -> u64 {
    DEFAULT_PAGE_LOAD_TIMEOUT_MS
}

impl FormConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            page_load_timeout_ms: DEFAULT_PAGE_LOAD_TIMEOUT_MS,
            fields: Vec::new(),
            submit: None,
            success_condition: None,
            screenshot_dir: None,
            wait_after_fill_ms: 0,
        }
    }

    pub fn with_field(mut self, field: FieldSpec) -> Self {
        self.fields.push(field);
        self
    }

    pub fn with_submit(mut self, locator: Locator) -> Self {
        self.submit = Some(locator);
        self
    }

    pub fn with_success_condition(mut self, condition: SuccessCondition) -> Self {
        self.success_condition = Some(condition);
        self
    }

    pub fn with_screenshot_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.screenshot_dir = Some(dir.into());
        self
    }

    pub fn with_page_load_timeout(mut self, timeout: Duration) -> Self {
        self.page_load_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn with_wait_after_fill(mut self, wait: Duration) -> Self {
        self.wait_after_fill_ms = wait.as_millis() as u64;
        self
    }

    pub fn page_load_timeout(&self) -> Duration {
        Duration::from_millis(self.page_load_timeout_ms)
    }

    pub fn wait_after_fill(&self) -> Duration {
        Duration::from_millis(self.wait_after_fill_ms)
    }

    /// Copy safe to print: sensitive field values replaced by the mask
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        for field in copy.fields.iter_mut().filter(|field| field.sensitive) {
            field.value = FieldValue::text(redact::MASK);
        }
        copy
    }
}

/// Caller-imposed limits for one run
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Overall deadline; every wait point aborts once it passes
    pub deadline: Option<Instant>,

    /// Cooperative cancellation
    pub cancel: CancellationToken,
}

impl RunOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deadline `timeout` from now
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.deadline = Some(Instant::now() + timeout);
        self
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }
}

/// Engine state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EngineState {
    Initializing,
    NavigatingToPage,
    AwaitingPageReady,
    FillingFields,
    Submitting,
    AwaitingSuccessCondition,
    Completed,
    Failed,
}

impl EngineState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, EngineState::Completed | EngineState::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EngineState::Initializing => "Initializing",
            EngineState::NavigatingToPage => "NavigatingToPage",
            EngineState::AwaitingPageReady => "AwaitingPageReady",
            EngineState::FillingFields => "FillingFields",
            EngineState::Submitting => "Submitting",
            EngineState::AwaitingSuccessCondition => "AwaitingSuccessCondition",
            EngineState::Completed => "Completed",
            EngineState::Failed => "Failed",
        }
    }
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldStatus {
    Success,
    Skipped,
    Failed,
}

/// Per-field outcome
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldResult {
    /// Position in the declared field order
    pub index: usize,

    /// Locator label, e.g. `id=email`
    pub field: String,

    pub field_type: String,

    pub required: bool,

    pub status: FieldStatus,

    /// Locate-and-apply attempts made (0 when skipped)
    pub attempts: u32,

    /// Intended value, redacted when sensitive
    pub value: String,

    /// Why the field failed or was skipped
    pub reason: Option<String>,
}

impl FieldResult {
    pub fn new(index: usize, spec: &FieldSpec, status: FieldStatus) -> Self {
        Self {
            index,
            field: spec.label(),
            field_type: spec.type_key(),
            required: spec.required,
            status,
            attempts: 0,
            value: spec.display_value(),
            reason: None,
        }
    }

    pub fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts;
        self
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunStatus {
    Success,
    PartialSuccess,
    Failed,
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RunStatus::Success => "Success",
            RunStatus::PartialSuccess => "PartialSuccess",
            RunStatus::Failed => "Failed",
        };
        f.write_str(label)
    }
}

/// Everything a caller learns about one run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionOutcome {
    pub run_id: RunId,

    pub status: RunStatus,

    /// Completed or Failed
    pub final_state: EngineState,

    /// Whether the submit control was clicked
    pub submitted: bool,

    /// One entry per declared field, in order (none if the run failed before filling)
    pub fields: Vec<FieldResult>,

    /// Screenshot files written during the run
    pub screenshots: Vec<PathBuf>,

    /// Structured event trail
    pub events: Vec<RunEvent>,

    /// Cause of a failed run
    pub error: Option<String>,

    pub started_at: DateTime<Utc>,

    pub finished_at: DateTime<Utc>,

    pub latency_ms: u64,
}

impl ExecutionOutcome {
    pub fn is_success(&self) -> bool {
        self.status == RunStatus::Success
    }

    pub fn field_statuses(&self) -> Vec<FieldStatus> {
        self.fields.iter().map(|field| field.status).collect()
    }

    pub fn failed_fields(&self) -> impl Iterator<Item = &FieldResult> {
        self.fields
            .iter()
            .filter(|field| field.status == FieldStatus::Failed)
    }
}
