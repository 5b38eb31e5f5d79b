//! Structured event trail
//!
//! Every state transition, field result, retry and screenshot becomes a
//! [`RunEvent`]. The engine keeps them in the outcome and forwards each one
//! to an injected [`EventSink`]; formatting and persistence are the sink's
//! business.

use action_primitives::{DriverError, RetryObserver};
use chrono::{DateTime, Utc};
use formpilot_core_types::RunId;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::types::EngineState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    StateChanged,
    FieldApplied,
    FieldFailed,
    FieldSkipped,
    RetryScheduled,
    ConditionPolled,
    ScreenshotCaptured,
    ScreenshotFailed,
    RunFailed,
    /// Cancelled by the caller or past the run deadline
    RunInterrupted,
    RunCompleted,
}

impl EventKind {
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            EventKind::FieldFailed
                | EventKind::ScreenshotFailed
                | EventKind::RunFailed
                | EventKind::RunInterrupted
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunEvent {
    /// Position in the trail, starting at 1
    pub seq: u64,
    pub at: DateTime<Utc>,
    /// State the engine was in when the event happened
    pub state: EngineState,
    pub kind: EventKind,
    /// Field label, for field and retry events
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    pub message: String,
}

/// Consumer of run events
pub trait EventSink: Send + Sync {
    fn record(&self, run_id: &RunId, event: &RunEvent);
}

/// Renders events as `tracing` records
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn record(&self, run_id: &RunId, event: &RunEvent) {
        let field = event.field.as_deref().unwrap_or("");
        match event.kind {
            kind if kind.is_failure() => warn!(
                run_id = %run_id,
                seq = event.seq,
                state = %event.state,
                kind = ?kind,
                field,
                "{}",
                event.message
            ),
            EventKind::RetryScheduled | EventKind::ConditionPolled => debug!(
                run_id = %run_id,
                seq = event.seq,
                state = %event.state,
                kind = ?event.kind,
                field,
                "{}",
                event.message
            ),
            kind => info!(
                run_id = %run_id,
                seq = event.seq,
                state = %event.state,
                kind = ?kind,
                field,
                "{}",
                event.message
            ),
        }
    }
}

/// Keeps every event in memory
#[derive(Debug, Default)]
pub struct MemoryEventSink {
    events: Mutex<Vec<(RunId, RunEvent)>>,
}

impl MemoryEventSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<RunEvent> {
        self.events
            .lock()
            .iter()
            .map(|(_, event)| event.clone())
            .collect()
    }

    pub fn events_for(&self, run_id: &RunId) -> Vec<RunEvent> {
        self.events
            .lock()
            .iter()
            .filter(|(id, _)| id == run_id)
            .map(|(_, event)| event.clone())
            .collect()
    }

    pub fn kinds(&self) -> Vec<EventKind> {
        self.events.lock().iter().map(|(_, event)| event.kind).collect()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl EventSink for MemoryEventSink {
    fn record(&self, run_id: &RunId, event: &RunEvent) {
        self.events.lock().push((run_id.clone(), event.clone()));
    }
}

struct TrailState {
    state: EngineState,
    events: Vec<RunEvent>,
}

/// Per-run event trail; also observes retries
pub(crate) struct EventTrail {
    run_id: RunId,
    sink: Arc<dyn EventSink>,
    inner: Mutex<TrailState>,
}

impl EventTrail {
    pub(crate) fn new(run_id: RunId, sink: Arc<dyn EventSink>) -> Self {
        Self {
            run_id,
            sink,
            inner: Mutex::new(TrailState {
                state: EngineState::Initializing,
                events: Vec::new(),
            }),
        }
    }

    pub(crate) fn state(&self) -> EngineState {
        self.inner.lock().state
    }

    pub(crate) fn transition(&self, next: EngineState) {
        let previous = {
            let mut inner = self.inner.lock();
            std::mem::replace(&mut inner.state, next)
        };
        self.emit(
            EventKind::StateChanged,
            None,
            format!("{} -> {}", previous, next),
        );
    }

    pub(crate) fn emit(&self, kind: EventKind, field: Option<String>, message: String) {
        let event = {
            let mut inner = self.inner.lock();
            let event = RunEvent {
                seq: inner.events.len() as u64 + 1,
                at: Utc::now(),
                state: inner.state,
                kind,
                field,
                message,
            };
            inner.events.push(event.clone());
            event
        };
        self.sink.record(&self.run_id, &event);
    }

    pub(crate) fn into_events(self) -> Vec<RunEvent> {
        self.inner.into_inner().events
    }
}

impl RetryObserver for EventTrail {
    fn on_retry(&self, operation: &str, attempt: u32, delay: Duration, error: &DriverError) {
        self.emit(
            EventKind::RetryScheduled,
            None,
            format!(
                "{} attempt {} failed ({}), retrying in {}ms",
                operation,
                attempt,
                error.kind(),
                delay.as_millis()
            ),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trail_numbers_events_and_tracks_state() {
        let sink = MemoryEventSink::new();
        let run_id = RunId::new();
        let trail = EventTrail::new(run_id.clone(), sink.clone());

        trail.transition(EngineState::NavigatingToPage);
        trail.emit(EventKind::FieldApplied, Some("id=email".into()), "applied".into());
        assert_eq!(trail.state(), EngineState::NavigatingToPage);

        let events = trail.into_events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].seq, 1);
        assert_eq!(events[0].state, EngineState::NavigatingToPage);
        assert_eq!(events[0].message, "Initializing -> NavigatingToPage");
        assert_eq!(events[1].seq, 2);
        assert_eq!(sink.events_for(&run_id), events);
    }

    #[test]
    fn test_retry_observer_records_event() {
        let sink = MemoryEventSink::new();
        let trail = EventTrail::new(RunId::new(), sink.clone());
        trail.on_retry(
            "fill id=email",
            1,
            Duration::from_millis(250),
            &DriverError::StaleElement("id=email".into()),
        );
        let events = sink.events();
        assert_eq!(sink.kinds(), vec![EventKind::RetryScheduled]);
        assert!(events[0].message.contains("stale_element"));
        assert!(events[0].message.contains("250ms"));
    }
}
