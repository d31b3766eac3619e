//! Background worker that drives the daily lock and aggregate firings.

pub mod config;
pub mod scheduler;

pub use config::{GoogleCredentials, StoreBackend, WorkerConfig};
pub use scheduler::{next_firings, FiringSchedule, FiringScheduler};
