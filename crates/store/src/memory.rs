//! In-process [`DocumentStore`] used by tests and local runs.
//!
//! Emulates the parts of the Drive/Sheets behaviour the rest of the system
//! relies on: trimmed range reads, trash flags, creation order, and
//! whole-document protection. Individual resources can be made to fail so
//! batch jobs can be exercised against partial outages.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use daysheet_core::schema::CellRange;
use daysheet_core::types::{ResourceId, Timestamp};
use tokio::sync::RwLock;

use crate::csv;
use crate::error::StoreError;
use crate::model::{FormatRequest, NewResource, Query, Resource, ResourceKind};
use crate::store::DocumentStore;

/// Cells and protection state of one document.
#[derive(Debug, Default)]
struct Sheet {
    cells: BTreeMap<(u32, u32), String>,
    formats: Vec<FormatRequest>,
    protected: bool,
}

impl Sheet {
    /// Rows of `range`, trimmed the way the Sheets API trims them.
    fn read(&self, range: CellRange) -> Vec<Vec<String>> {
        let mut rows: Vec<Vec<String>> = (range.start_row..=range.end_row)
            .map(|r| {
                let mut row: Vec<String> = (range.start_col..=range.end_col)
                    .map(|c| self.cells.get(&(r, c)).cloned().unwrap_or_default())
                    .collect();
                while row.last().is_some_and(String::is_empty) {
                    row.pop();
                }
                row
            })
            .collect();
        while rows.last().is_some_and(Vec::is_empty) {
            rows.pop();
        }
        rows
    }

    /// Bounding box of every non-empty cell.
    fn used_range(&self) -> Option<CellRange> {
        let (mut max_row, mut max_col) = (0, 0);
        for (&(r, c), v) in &self.cells {
            if !v.is_empty() {
                max_row = max_row.max(r);
                max_col = max_col.max(c);
            }
        }
        (max_row > 0).then(|| CellRange::new(1, 1, max_row, max_col))
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    resources: HashMap<ResourceId, Resource>,
    sheets: HashMap<ResourceId, Sheet>,
    failing: HashSet<ResourceId>,
    last_created: Option<Timestamp>,
    create_calls: u64,
}

impl MemoryState {
    fn check_failure(&self, id: &str) -> Result<(), StoreError> {
        if self.failing.contains(id) {
            return Err(StoreError::Api {
                status: 503,
                body: format!("injected failure for {id}"),
            });
        }
        Ok(())
    }

    fn live_sheet(&self, id: &str) -> Result<&Sheet, StoreError> {
        self.check_failure(id)?;
        match self.resources.get(id) {
            Some(r) if !r.trashed => {}
            _ => return Err(StoreError::NotFound(id.to_string())),
        }
        self.sheets
            .get(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    fn live_sheet_mut(&mut self, id: &str) -> Result<&mut Sheet, StoreError> {
        self.live_sheet(id)?;
        self.sheets
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    /// Strictly increasing creation timestamps so "oldest" is well defined.
    fn next_created_at(&mut self) -> Timestamp {
        let now = Utc::now();
        let at = match self.last_created {
            Some(last) if now <= last => last + Duration::microseconds(1),
            _ => now,
        };
        self.last_created = Some(at);
        at
    }

    fn insert(&mut self, new: NewResource) -> Result<Resource, StoreError> {
        if let Some(parent) = &new.parent {
            self.check_failure(parent)?;
            match self.resources.get(parent) {
                Some(p) if p.kind == ResourceKind::Container && !p.trashed => {}
                _ => return Err(StoreError::NotFound(parent.clone())),
            }
        }
        self.create_calls += 1;
        let resource = Resource {
            id: uuid::Uuid::new_v4().to_string(),
            name: new.name,
            kind: new.kind,
            parents: new.parent.into_iter().collect(),
            properties: new.properties,
            created_at: self.next_created_at(),
            trashed: false,
        };
        if resource.kind == ResourceKind::Document {
            self.sheets.insert(resource.id.clone(), Sheet::default());
        }
        self.resources.insert(resource.id.clone(), resource.clone());
        Ok(resource)
    }
}

/// Thread-safe in-memory document store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call touching `id` (as target or as parent) fail with a
    /// 503 until [`heal`](Self::heal) is called.
    pub async fn fail_on(&self, id: impl Into<ResourceId>) {
        self.state.write().await.failing.insert(id.into());
    }

    pub async fn heal(&self, id: &str) {
        self.state.write().await.failing.remove(id);
    }

    /// Metadata of a resource, trashed or not.
    pub async fn resource(&self, id: &str) -> Option<Resource> {
        self.state.read().await.resources.get(id).cloned()
    }

    /// Formatting requests applied to a document so far.
    pub async fn formats(&self, id: &str) -> Vec<FormatRequest> {
        self.state
            .read()
            .await
            .sheets
            .get(id)
            .map(|s| s.formats.clone())
            .unwrap_or_default()
    }

    /// Number of successful `create` and `upload` calls.
    pub async fn create_calls(&self) -> u64 {
        self.state.read().await.create_calls
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn list(&self, query: &Query) -> Result<Vec<Resource>, StoreError> {
        let state = self.state.read().await;
        if let Some(parent) = &query.parent {
            state.check_failure(parent)?;
        }
        let mut found: Vec<Resource> = state
            .resources
            .values()
            .filter(|r| query.matches(r))
            .cloned()
            .collect();
        found.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(found)
    }

    async fn create(&self, resource: NewResource) -> Result<Resource, StoreError> {
        self.state.write().await.insert(resource)
    }

    async fn trash(&self, id: &str) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        state.check_failure(id)?;
        let resource = state
            .resources
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        resource.trashed = true;
        Ok(())
    }

    async fn get_cell_range(
        &self,
        id: &str,
        range: CellRange,
    ) -> Result<Vec<Vec<String>>, StoreError> {
        range
            .validate()
            .map_err(|e| StoreError::InvalidRange(e.to_string()))?;
        let state = self.state.read().await;
        Ok(state.live_sheet(id)?.read(range))
    }

    async fn is_protected(&self, id: &str) -> Result<bool, StoreError> {
        let state = self.state.read().await;
        Ok(state.live_sheet(id)?.protected)
    }

    async fn set_cell_range(
        &self,
        id: &str,
        range: CellRange,
        values: Vec<Vec<String>>,
    ) -> Result<(), StoreError> {
        range
            .validate()
            .map_err(|e| StoreError::InvalidRange(e.to_string()))?;
        if values.len() > range.height() as usize
            || values.iter().any(|row| row.len() > range.width() as usize)
        {
            return Err(StoreError::InvalidRange(format!(
                "{} values do not fit {}",
                values.len(),
                range.to_a1()
            )));
        }

        let mut state = self.state.write().await;
        let sheet = state.live_sheet_mut(id)?;
        if sheet.protected {
            return Err(StoreError::ReadOnly(id.to_string()));
        }
        for (r, row) in values.into_iter().enumerate() {
            for (c, value) in row.into_iter().enumerate() {
                let key = (range.start_row + r as u32, range.start_col + c as u32);
                if value.is_empty() {
                    sheet.cells.remove(&key);
                } else {
                    sheet.cells.insert(key, value);
                }
            }
        }
        Ok(())
    }

    async fn batch_format(&self, id: &str, requests: Vec<FormatRequest>) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        let sheet = state.live_sheet_mut(id)?;
        for request in requests {
            if matches!(request, FormatRequest::Protect { .. }) {
                sheet.protected = true;
            }
            sheet.formats.push(request);
        }
        Ok(())
    }

    async fn upload(&self, path: &Path, resource: NewResource) -> Result<Resource, StoreError> {
        let text = tokio::fs::read_to_string(path).await?;
        let rows = csv::parse(&text).map_err(StoreError::Decode)?;

        let mut state = self.state.write().await;
        let created = state.insert(NewResource {
            kind: ResourceKind::Document,
            ..resource
        })?;
        let sheet = state.live_sheet_mut(&created.id)?;
        for (r, row) in rows.into_iter().enumerate() {
            for (c, value) in row.into_iter().enumerate() {
                if !value.is_empty() {
                    sheet.cells.insert((r as u32 + 1, c as u32 + 1), value);
                }
            }
        }
        Ok(created)
    }

    async fn download(&self, id: &str) -> Result<Vec<u8>, StoreError> {
        let state = self.state.read().await;
        let sheet = state.live_sheet(id)?;
        let rows = match sheet.used_range() {
            Some(used) => {
                // Export keeps every row and column of the used range.
                (used.start_row..=used.end_row)
                    .map(|r| {
                        (used.start_col..=used.end_col)
                            .map(|c| sheet.cells.get(&(r, c)).cloned().unwrap_or_default())
                            .collect()
                    })
                    .collect()
            }
            None => Vec::new(),
        };
        Ok(csv::render(&rows).into_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn cells(rows: &[&[&str]]) -> Vec<Vec<String>> {
        rows.iter()
            .map(|r| r.iter().map(|c| c.to_string()).collect())
            .collect()
    }

    async fn store_with_document() -> (MemoryStore, String) {
        let store = MemoryStore::new();
        let folder = store.create(NewResource::container("root")).await.unwrap();
        let doc = store
            .create(NewResource::document("Day 1").under(folder.id))
            .await
            .unwrap();
        (store, doc.id)
    }

    #[tokio::test]
    async fn reads_are_trimmed_like_sheets() {
        let (store, doc) = store_with_document().await;
        store
            .set_cell_range(&doc, CellRange::new(5, 1, 6, 5), cells(&[&["a", "b", "", "", ""], &["", "", "", "", ""]]))
            .await
            .unwrap();

        let rows = store.get_cell_range(&doc, CellRange::new(5, 1, 12, 5)).await.unwrap();
        assert_eq!(rows, cells(&[&["a", "b"]]));
    }

    #[tokio::test]
    async fn interior_blank_rows_are_kept() {
        let (store, doc) = store_with_document().await;
        store.set_cell_range(&doc, CellRange::cell(7, 2), cells(&[&["x"]])).await.unwrap();

        let rows = store.get_cell_range(&doc, CellRange::new(5, 1, 12, 5)).await.unwrap();
        assert_eq!(rows, cells(&[&[], &[], &["", "x"]]));
    }

    #[tokio::test]
    async fn oversized_values_are_rejected() {
        let (store, doc) = store_with_document().await;
        let result = store
            .set_cell_range(&doc, CellRange::cell(1, 1), cells(&[&["a", "b"]]))
            .await;
        assert_matches!(result, Err(StoreError::InvalidRange(_)));
    }

    #[tokio::test]
    async fn protection_blocks_writes_but_not_reads() {
        let (store, doc) = store_with_document().await;
        store.set_cell_range(&doc, CellRange::cell(1, 1), cells(&[&["DATE"]])).await.unwrap();
        store
            .batch_format(&doc, vec![FormatRequest::Protect { description: "locked".into() }])
            .await
            .unwrap();

        assert!(store.is_protected(&doc).await.unwrap());
        assert_matches!(
            store.set_cell_range(&doc, CellRange::cell(1, 2), cells(&[&["x"]])).await,
            Err(StoreError::ReadOnly(_))
        );
        assert_eq!(
            store.get_cell_range(&doc, CellRange::cell(1, 1)).await.unwrap(),
            cells(&[&["DATE"]])
        );
    }

    #[tokio::test]
    async fn list_is_scoped_and_ordered_oldest_first() {
        let store = MemoryStore::new();
        let root = store.create(NewResource::container("root")).await.unwrap();
        let a = store.create(NewResource::container("A").under(root.id.clone())).await.unwrap();
        let b = store.create(NewResource::container("A").under(root.id.clone())).await.unwrap();
        store.create(NewResource::container("nested").under(a.id.clone())).await.unwrap();

        let children = store.list(&Query::children_of(root.id.clone())).await.unwrap();
        let ids: Vec<_> = children.iter().map(|r| r.id.clone()).collect();
        assert_eq!(ids, vec![a.id.clone(), b.id.clone()]);

        store.trash(&a.id).await.unwrap();
        let live = store.list(&Query::children_of(root.id).with_name("A")).await.unwrap();
        assert_eq!(live.len(), 1);
        assert_eq!(live[0].id, b.id);
    }

    #[tokio::test]
    async fn trashed_documents_cannot_be_read() {
        let (store, doc) = store_with_document().await;
        store.trash(&doc).await.unwrap();
        assert_matches!(
            store.get_cell_range(&doc, CellRange::cell(1, 1)).await,
            Err(StoreError::NotFound(_))
        );
    }

    #[tokio::test]
    async fn create_under_missing_parent_fails() {
        let store = MemoryStore::new();
        assert_matches!(
            store.create(NewResource::document("Day 1").under("nope")).await,
            Err(StoreError::NotFound(_))
        );
    }

    #[tokio::test]
    async fn injected_failures_surface_as_api_errors() {
        let (store, doc) = store_with_document().await;
        store.fail_on(doc.clone()).await;
        assert_matches!(
            store.get_cell_range(&doc, CellRange::cell(1, 1)).await,
            Err(StoreError::Api { status: 503, .. })
        );
        store.heal(&doc).await;
        assert!(store.get_cell_range(&doc, CellRange::cell(1, 1)).await.is_ok());
    }

    #[tokio::test]
    async fn upload_then_download() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("day.csv");
        tokio::fs::write(&path, "DATE,2025-03-03\nIN TIME,\"09:30\"\n").await.unwrap();

        let store = MemoryStore::new();
        let doc = store.upload(&path, NewResource::document("Imported")).await.unwrap();
        assert_eq!(doc.kind, ResourceKind::Document);
        assert_eq!(
            store.get_cell_range(&doc.id, CellRange::new(1, 1, 2, 2)).await.unwrap(),
            cells(&[&["DATE", "2025-03-03"], &["IN TIME", "09:30"]])
        );

        let csv = String::from_utf8(store.download(&doc.id).await.unwrap()).unwrap();
        assert_eq!(csv, "DATE,2025-03-03\nIN TIME,09:30\n");
    }
}
