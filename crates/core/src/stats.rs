//! Fire-and-forget dialogue event recording. A sink failure must never
//! fail the chat turn that produced the event, so the trait is infallible
//! from the caller's side; implementations swallow and log their own
//! errors.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatsKind {
    UserMessage,
    AiReply,
    DepartmentSelected,
    HandoffRequested,
    SessionCleared,
}

impl StatsKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UserMessage => "user_message",
            Self::AiReply => "ai_reply",
            Self::DepartmentSelected => "department_selected",
            Self::HandoffRequested => "handoff_requested",
            Self::SessionCleared => "session_cleared",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsEvent {
    pub event_id: String,
    pub kind: StatsKind,
    pub session_id: String,
    pub detail: String,
    pub occurred_at: DateTime<Utc>,
}

impl StatsEvent {
    pub fn new(kind: StatsKind, session_id: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            event_id: Uuid::new_v4().to_string(),
            kind,
            session_id: session_id.into(),
            detail: detail.into(),
            occurred_at: Utc::now(),
        }
    }
}

pub trait StatsSink: Send + Sync {
    fn record(&self, event: StatsEvent);
}

#[derive(Clone, Copy, Debug, Default)]
pub struct NoopStatsSink;

impl StatsSink for NoopStatsSink {
    fn record(&self, _event: StatsEvent) {}
}

/// Collects events in memory so tests can assert on what a turn recorded.
#[derive(Clone, Default)]
pub struct InMemoryStatsSink {
    events: Arc<Mutex<Vec<StatsEvent>>>,
}

impl InMemoryStatsSink {
    pub fn events(&self) -> Vec<StatsEvent> {
        self.events.lock().expect("stats lock poisoned").clone()
    }
}

impl StatsSink for InMemoryStatsSink {
    fn record(&self, event: StatsEvent) {
        self.events.lock().expect("stats lock poisoned").push(event);
    }
}

/// Emits each event as a structured log line; the default production sink
/// when no external recorder is wired in.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingStatsSink;

impl StatsSink for TracingStatsSink {
    fn record(&self, event: StatsEvent) {
        tracing::info!(
            event_name = "stats.recorded",
            kind = event.kind.as_str(),
            session_id = %event.session_id,
            detail = %event.detail,
            "dialogue event recorded"
        );
    }
}
