//! The narrow store surface every component depends on.

use std::path::Path;

use async_trait::async_trait;
use daysheet_core::schema::CellRange;

use crate::error::StoreError;
use crate::model::{FormatRequest, NewResource, Query, Resource};

/// A remote document store: folder-like containers holding single-sheet
/// spreadsheet documents.
///
/// Implementations provide no transactions and no conflict detection; the
/// last write to a cell wins.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Resources matching `query`, oldest first.
    async fn list(&self, query: &Query) -> Result<Vec<Resource>, StoreError>;

    /// Create a container or an empty document.
    async fn create(&self, resource: NewResource) -> Result<Resource, StoreError>;

    /// Move a resource to the trash. Trashed resources drop out of `list`.
    async fn trash(&self, id: &str) -> Result<(), StoreError>;

    /// Read a block of cells.
    ///
    /// Like the Sheets API, trailing blank cells of each row and trailing
    /// blank rows are omitted; callers pad as needed.
    async fn get_cell_range(
        &self,
        id: &str,
        range: CellRange,
    ) -> Result<Vec<Vec<String>>, StoreError>;

    /// Overwrite a block of cells. `values` may be smaller than `range` but
    /// never larger. Fails with [`StoreError::ReadOnly`] on a protected
    /// document.
    async fn set_cell_range(
        &self,
        id: &str,
        range: CellRange,
        values: Vec<Vec<String>>,
    ) -> Result<(), StoreError>;

    /// Whether the document carries protection.
    async fn is_protected(&self, id: &str) -> Result<bool, StoreError>;

    /// Apply formatting and protection requests in one call.
    async fn batch_format(&self, id: &str, requests: Vec<FormatRequest>) -> Result<(), StoreError>;

    /// Create a document from a local CSV file.
    async fn upload(&self, path: &Path, resource: NewResource) -> Result<Resource, StoreError>;

    /// Export a document's cells as CSV.
    async fn download(&self, id: &str) -> Result<Vec<u8>, StoreError>;
}
