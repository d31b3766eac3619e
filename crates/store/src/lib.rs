//! Remote document store surface.
//!
//! Every other crate talks to the store only through [`DocumentStore`]:
//! listing, creating and trashing containers and documents, reading and
//! writing cell ranges, applying formatting, and moving whole documents in
//! and out as CSV.
//!
//! - [`MemoryStore`]: in-process store used by tests and local runs.
//! - [`GoogleStore`]: Drive v3 / Sheets v4 adapter.
//! - [`StoreHandle`]: holder whose inner store can be swapped after
//!   re-authentication without re-wiring anything that holds the handle.
//! - [`GoogleSession`]: service-account token refresh that performs that swap.

pub mod auth;
pub mod csv;
pub mod error;
pub mod google;
pub mod handle;
pub mod memory;
pub mod model;
pub mod store;

pub use auth::{AccessToken, GoogleSession, ServiceAccount, ServiceAccountKey, TokenSource};
pub use error::StoreError;
pub use google::{GoogleConfig, GoogleStore};
pub use handle::StoreHandle;
pub use memory::MemoryStore;
pub use model::{CellStyle, Color, FormatRequest, NewResource, Query, Resource, ResourceKind};
pub use store::DocumentStore;
