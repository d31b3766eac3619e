//! Domain types for the sheet-backed daily record store.
//!
//! This crate has no internal dependencies. It defines the fixed address
//! space of a Day Document, the container naming conventions, the record
//! row types read from and written to documents, and the attendance and
//! productivity arithmetic that runs over them.

pub mod attendance;
pub mod error;
pub mod naming;
pub mod productivity;
pub mod report;
pub mod schema;
pub mod types;
