//! In-process event bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`EventBus`] is the publish/subscribe hub for [`DaysheetEvent`]s emitted
//! by the daily firings. It is shared via `Arc<EventBus>`.

use chrono::{DateTime, Utc};
use daysheet_core::types::EmployeeId;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Per-document statistics from the aggregate firing.
pub const DAY_STATS: &str = "day.stats";

/// Summary of a completed lock firing.
pub const FIRING_LOCK: &str = "firing.lock";

/// Summary of a completed aggregate firing.
pub const FIRING_AGGREGATE: &str = "firing.aggregate";

// ---------------------------------------------------------------------------
// DaysheetEvent
// ---------------------------------------------------------------------------

/// Something that happened while processing day documents.
///
/// Constructed via [`DaysheetEvent::new`] and enriched with
/// [`with_employee`](DaysheetEvent::with_employee),
/// [`with_document`](DaysheetEvent::with_document), and
/// [`with_payload`](DaysheetEvent::with_payload).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaysheetEvent {
    /// Dot-separated event name, e.g. `"firing.lock"`.
    pub event_type: String,

    /// Employee the event concerns, if any.
    pub employee_id: Option<EmployeeId>,

    /// Day document the event concerns, if any.
    pub document_id: Option<String>,

    /// Free-form JSON payload carrying event-specific data.
    pub payload: serde_json::Value,

    /// When the event was created (UTC).
    pub timestamp: DateTime<Utc>,
}

impl DaysheetEvent {
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            employee_id: None,
            document_id: None,
            payload: serde_json::Value::Object(Default::default()),
            timestamp: Utc::now(),
        }
    }

    pub fn with_employee(mut self, employee_id: impl Into<EmployeeId>) -> Self {
        self.employee_id = Some(employee_id.into());
        self
    }

    pub fn with_document(mut self, document_id: impl Into<String>) -> Self {
        self.document_id = Some(document_id.into());
        self
    }

    /// Set the JSON payload for the event.
    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 1024;

/// In-process fan-out event bus.
///
/// ```rust
/// use daysheet_events::bus::{DaysheetEvent, EventBus, FIRING_LOCK};
///
/// let bus = EventBus::default();
/// let mut rx = bus.subscribe();
///
/// bus.publish(DaysheetEvent::new(FIRING_LOCK));
/// ```
pub struct EventBus {
    sender: broadcast::Sender<DaysheetEvent>,
}

impl EventBus {
    /// Create a bus with a specific channel capacity.
    ///
    /// When the buffer is full the oldest unread events are dropped and slow
    /// receivers observe `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all current subscribers. Dropped silently when
    /// nobody is subscribed.
    pub fn publish(&self, event: DaysheetEvent) {
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DaysheetEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
