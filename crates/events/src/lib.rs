//! Event bus for the daily firings.
//!
//! - [`EventBus`]: in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`.
//! - [`DaysheetEvent`]: the event envelope.
//! - [`EventLogSink`]: background task that logs every event.

pub mod bus;
pub mod log_sink;

pub use bus::{DaysheetEvent, EventBus};
pub use log_sink::EventLogSink;
