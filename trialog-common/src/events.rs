//! Event types for the Trialog event system
//!
//! Provides the shared event enum and EventBus for both services. Events are
//! broadcast in-process and serialized for SSE transmission to the dashboard.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Trialog event types
///
/// Every store mutation emits exactly one event; the dashboard recomputes
/// its rollup on any of them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TrialogEvent {
    /// A new candidate was registered (session 1 seeded)
    CandidateAdded {
        candidate_name: String,
        timestamp: DateTime<Utc>,
    },

    /// A session row was inserted or updated
    SessionUpserted {
        candidate_name: String,
        session_number: u8,
        timestamp: DateTime<Utc>,
    },

    /// A single field edit was persisted (debounced flush)
    FieldsFlushed {
        candidate_name: String,
        session_number: u8,
        field_count: usize,
        timestamp: DateTime<Utc>,
    },

    /// All 14 sessions were stamped complete and the shift closed
    ShiftCompleted {
        candidate_name: String,
        timestamp: DateTime<Utc>,
    },

    /// The summarization service finished a run
    AnalysisCompleted {
        candidate_count: usize,
        timestamp: DateTime<Utc>,
    },
}

impl TrialogEvent {
    /// Event type name, used as the SSE event name
    pub fn event_type(&self) -> &'static str {
        match self {
            TrialogEvent::CandidateAdded { .. } => "CandidateAdded",
            TrialogEvent::SessionUpserted { .. } => "SessionUpserted",
            TrialogEvent::FieldsFlushed { .. } => "FieldsFlushed",
            TrialogEvent::ShiftCompleted { .. } => "ShiftCompleted",
            TrialogEvent::AnalysisCompleted { .. } => "AnalysisCompleted",
        }
    }
}

/// Broadcast event bus shared by all components of a service
pub struct EventBus {
    tx: broadcast::Sender<TrialogEvent>,
    capacity: usize,
}

impl EventBus {
    /// Create a new EventBus with the specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<TrialogEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)`, or `Err` if no subscribers exist.
    pub fn emit(
        &self,
        event: TrialogEvent,
    ) -> std::result::Result<usize, broadcast::error::SendError<TrialogEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, silently dropping it if no subscribers are listening
    pub fn emit_lossy(&self, event: TrialogEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
