//! Sheet-backed record store.
//!
//! Everything that touches day documents lives here:
//!
//! - [`Hierarchy`]: Root → Employee → Month containers.
//! - [`template`]: day document instantiation.
//! - [`RecordRepo`]: reads and writes at the fixed document addresses.
//! - [`DailyFirings`]: the daily lock and aggregate jobs.
//! - [`productivity`]: monthly productivity read back from documents.
//! - [`sync`] / [`generate`]: reconciliation and month generation.
//! - [`Workspace`]: the caller-facing facade.
//! - [`directory`]: the employee directory those operations consult.

pub mod directory;
pub mod generate;
pub mod hierarchy;
pub mod lock;
pub mod productivity;
pub mod records;
pub mod service;
pub mod sync;
pub mod template;

pub use directory::{DirectoryError, EmployeeDirectory, EmployeeRecord, JsonDirectory};
pub use generate::GenerationSummary;
pub use hierarchy::Hierarchy;
pub use lock::{DailyFirings, Firing, FiringReport};
pub use records::RecordRepo;
pub use service::Workspace;
pub use sync::SyncSummary;
