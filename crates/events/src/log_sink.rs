//! Observability sink for firing events.
//!
//! [`EventLogSink`] subscribes to the [`EventBus`](crate::bus::EventBus) and
//! writes every received [`DaysheetEvent`] to the tracing log. It runs as a
//! long-lived background task and exits when the bus is dropped.

use tokio::sync::broadcast;

use crate::bus::DaysheetEvent;

/// Background task that logs every event published on the bus.
pub struct EventLogSink;

impl EventLogSink {
    /// Run the logging loop until the channel closes. Returns the number of
    /// events logged.
    pub async fn run(mut receiver: broadcast::Receiver<DaysheetEvent>) -> u64 {
        let mut logged = 0;
        loop {
            match receiver.recv().await {
                Ok(event) => {
                    Self::log(&event);
                    logged += 1;
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "Event log sink lagged, some events were not logged");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!(logged, "Event bus closed, log sink shutting down");
                    break;
                }
            }
        }
        logged
    }

    fn log(event: &DaysheetEvent) {
        tracing::info!(
            event_type = %event.event_type,
            employee_id = event.employee_id.as_deref().unwrap_or("-"),
            document_id = event.document_id.as_deref().unwrap_or("-"),
            payload = %event.payload,
            "Event"
        );
    }
}
