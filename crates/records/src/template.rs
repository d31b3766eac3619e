//! Day document instantiation.

use chrono::{Datelike, NaiveDate};
use daysheet_core::error::CoreError;
use daysheet_core::naming::day_document_name;
use daysheet_core::schema::{
    template_blocks, ActivityZone, CellRange, TemplateBlock, COL_A, COL_B, COL_E, COL_G, COL_J,
    HEADER_ZONE, MENTOR_HEADER_ROW, OFFICE_HEADER_ROW, TASK_HEADER,
};
use daysheet_core::types::ResourceId;
use daysheet_store::{CellStyle, Color, DocumentStore, FormatRequest, NewResource};

use crate::hierarchy::Hierarchy;

const HEADER_BAND: Color = Color::rgb(0.2, 0.2, 0.2);
const OFFICE_HEADER: Color = Color::rgb(0.0, 0.6, 0.8);
const MENTOR_HEADER: Color = Color::rgb(0.2, 0.2, 0.6);
const TASK_HEADER_COLOR: Color = Color::rgb(0.8, 0.4, 0.0);
const BREAK_ROW: Color = Color::rgb(0.85, 0.9, 0.95);

fn header_style(background: Color) -> CellStyle {
    CellStyle {
        background: Some(background),
        foreground: Some(Color::WHITE),
        bold: true,
        centered: true,
        ..CellStyle::default()
    }
}

/// Cosmetic formatting applied to every new day document.
pub fn template_formats() -> Vec<FormatRequest> {
    let mut requests = vec![
        FormatRequest::Style {
            range: HEADER_ZONE,
            style: header_style(HEADER_BAND),
        },
        FormatRequest::Style {
            range: CellRange::row(OFFICE_HEADER_ROW, COL_A, COL_E),
            style: header_style(OFFICE_HEADER),
        },
        FormatRequest::Style {
            range: CellRange::row(MENTOR_HEADER_ROW, COL_A, COL_E),
            style: header_style(MENTOR_HEADER),
        },
        FormatRequest::Style {
            range: TASK_HEADER,
            style: header_style(TASK_HEADER_COLOR),
        },
    ];

    let office = ActivityZone::Office;
    for slot in (0..office.slot_count()).filter(|s| office.is_break_slot(*s)) {
        let row = office.first_row() + slot as u32;
        requests.push(FormatRequest::Style {
            range: CellRange::row(row, COL_A, COL_E),
            style: CellStyle {
                background: Some(BREAK_ROW),
                italic: true,
                ..CellStyle::default()
            },
        });
    }

    requests.extend([
        FormatRequest::ColumnWidth {
            start_col: COL_A,
            end_col: COL_A,
            pixels: 150,
        },
        FormatRequest::ColumnWidth {
            start_col: COL_B,
            end_col: COL_E,
            pixels: 200,
        },
        FormatRequest::ColumnWidth {
            start_col: COL_G,
            end_col: COL_J,
            pixels: 150,
        },
    ]);
    requests
}

/// How [`instantiate`] found the day document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instantiated {
    /// Created with the full layout.
    Created(ResourceId),
    /// Already present with its layout.
    Existing(ResourceId),
    /// Already present without its layout labels, which were written back.
    Repaired(ResourceId),
}

impl Instantiated {
    pub fn id(&self) -> &str {
        match self {
            Self::Created(id) | Self::Existing(id) | Self::Repaired(id) => id,
        }
    }

    pub fn into_id(self) -> ResourceId {
        match self {
            Self::Created(id) | Self::Existing(id) | Self::Repaired(id) => id,
        }
    }
}

/// Create `"Day {n}"` for `date` in `container` and write the fixed layout.
///
/// A new document whose layout cannot be written is trashed again, so the
/// next run starts from scratch. An existing document is left as it is
/// unless its labels are missing; those are written back around whatever
/// values it already holds.
pub async fn instantiate(
    hierarchy: &Hierarchy,
    container: &str,
    date: NaiveDate,
) -> Result<Instantiated, CoreError> {
    let name = day_document_name(date.day());
    let (document, created) = hierarchy
        .create_once(
            &Hierarchy::document_query(container, &name),
            NewResource::document(name.clone()).under(container),
        )
        .await?;
    let store = hierarchy.store();
    if !created {
        return restore_layout(store, document.id, date).await;
    }

    if let Err(e) = write_layout(store, &document.id, template_blocks(date)).await {
        tracing::warn!(document_id = %document.id, error = %e, "Failed to write day template; trashing the document");
        if let Err(trash) = store.trash(&document.id).await {
            tracing::error!(document_id = %document.id, error = %trash, "Failed to trash half-written day document");
        }
        return Err(e);
    }

    tracing::debug!(document_id = %document.id, name = %name, "Instantiated day document");
    Ok(Instantiated::Created(document.id))
}

async fn write_layout(
    store: &dyn DocumentStore,
    document_id: &str,
    blocks: Vec<TemplateBlock>,
) -> Result<(), CoreError> {
    for block in blocks {
        store
            .set_cell_range(document_id, block.range, block.values)
            .await?;
    }
    store.batch_format(document_id, template_formats()).await?;
    Ok(())
}

/// Blocks are written in order, so the first and last carrying their labels
/// means the layout is complete.
async fn restore_layout(
    store: &dyn DocumentStore,
    document_id: ResourceId,
    date: NaiveDate,
) -> Result<Instantiated, CoreError> {
    let blocks = template_blocks(date);
    let (Some(first), Some(last)) = (blocks.first(), blocks.last()) else {
        return Ok(Instantiated::Existing(document_id));
    };
    if has_labels(store, &document_id, first).await? && has_labels(store, &document_id, last).await? {
        return Ok(Instantiated::Existing(document_id));
    }
    if store.is_protected(&document_id).await? {
        tracing::warn!(document_id = %document_id, "Locked day document has no layout; leaving it");
        return Ok(Instantiated::Existing(document_id));
    }

    let mut restored = Vec::with_capacity(blocks.len());
    for block in blocks {
        let current = store.get_cell_range(&document_id, block.range).await?;
        restored.push(TemplateBlock {
            range: block.range,
            values: fill_labels(block.values, &current),
        });
    }
    write_layout(store, &document_id, restored).await?;
    tracing::warn!(document_id = %document_id, "Restored missing layout on day document");
    Ok(Instantiated::Repaired(document_id))
}

async fn has_labels(
    store: &dyn DocumentStore,
    document_id: &str,
    block: &TemplateBlock,
) -> Result<bool, CoreError> {
    let current = store.get_cell_range(document_id, block.range).await?;
    Ok(block.values.iter().enumerate().all(|(r, row)| {
        row.iter()
            .enumerate()
            .all(|(c, label)| label.is_empty() || cell_at(&current, r, c) == label)
    }))
}

fn cell_at(rows: &[Vec<String>], row: usize, col: usize) -> &str {
    rows.get(row)
        .and_then(|cells| cells.get(col))
        .map_or("", String::as_str)
}

/// Template labels, with the template's blank cells keeping their current
/// values.
fn fill_labels(template: Vec<Vec<String>>, current: &[Vec<String>]) -> Vec<Vec<String>> {
    template
        .into_iter()
        .enumerate()
        .map(|(r, row)| {
            row.into_iter()
                .enumerate()
                .map(|(c, label)| {
                    if label.is_empty() {
                        cell_at(current, r, c).to_string()
                    } else {
                        label
                    }
                })
                .collect()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use std::sync::Arc;

    use assert_matches::assert_matches;
    use daysheet_core::schema::{MENTOR_SLOTS, OFFICE_SLOTS, TASK_HEADERS};
    use daysheet_store::{MemoryStore, Query, Resource, StoreError, StoreHandle};

    fn setup() -> (Arc<MemoryStore>, Hierarchy) {
        let store = Arc::new(MemoryStore::new());
        (store.clone(), Hierarchy::new(StoreHandle::new(store), "EMS_Root"))
    }

    #[tokio::test]
    async fn fresh_document_carries_the_layout() {
        let (store, h) = setup();
        let root = h.root().await.unwrap();
        let date = NaiveDate::from_ymd_opt(2025, 3, 3).unwrap();
        let doc = match instantiate(&h, &root, date).await.unwrap() {
            Instantiated::Created(id) => id,
            other => panic!("expected a new document, got {other:?}"),
        };

        let header = store.get_cell_range(&doc, HEADER_ZONE).await.unwrap();
        assert_eq!(header[0], vec!["DATE", "2025-03-03", "DAY", "Monday"]);
        assert_eq!(header[1], vec!["IN TIME", "", "OUT TIME", "", "TOTAL HOURS"]);

        let tasks = store.get_cell_range(&doc, TASK_HEADER).await.unwrap();
        assert_eq!(tasks, vec![TASK_HEADERS.to_vec()]);

        let office = store
            .get_cell_range(&doc, ActivityZone::Office.zone_range())
            .await
            .unwrap();
        let labels: Vec<_> = office.iter().map(|r| r[0].as_str()).collect();
        assert_eq!(labels, OFFICE_SLOTS.to_vec());

        let mentor = store
            .get_cell_range(&doc, ActivityZone::Mentor.zone_range())
            .await
            .unwrap();
        let labels: Vec<_> = mentor.iter().map(|r| r[0].as_str()).collect();
        assert_eq!(labels, MENTOR_SLOTS.to_vec());

        assert_eq!(store.formats(&doc).await, template_formats());
    }

    #[tokio::test]
    async fn existing_document_is_left_alone() {
        let (store, h) = setup();
        let root = h.root().await.unwrap();
        let date = NaiveDate::from_ymd_opt(2025, 3, 3).unwrap();
        let first = instantiate(&h, &root, date).await.unwrap().into_id();
        store
            .set_cell_range(&first, CellRange::cell(2, 2), vec![vec!["09:30".into()]])
            .await
            .unwrap();

        let second = instantiate(&h, &root, date).await.unwrap();
        assert_eq!(second, Instantiated::Existing(first.clone()));
        assert_eq!(
            store.get_cell_range(&first, CellRange::cell(2, 2)).await.unwrap(),
            vec![vec!["09:30".to_string()]]
        );
        assert_eq!(store.formats(&first).await, template_formats());
    }

    #[tokio::test]
    async fn bare_document_gets_its_labels_back() {
        let (store, h) = setup();
        let root = h.root().await.unwrap();
        let date = NaiveDate::from_ymd_opt(2025, 3, 3).unwrap();
        let bare = store
            .create(NewResource::document("Day 3").under(root.clone()))
            .await
            .unwrap();
        store
            .set_cell_range(&bare.id, CellRange::cell(2, 2), vec![vec!["09:30".into()]])
            .await
            .unwrap();

        let outcome = instantiate(&h, &root, date).await.unwrap();
        assert_eq!(outcome, Instantiated::Repaired(bare.id.clone()));

        let header = store.get_cell_range(&bare.id, HEADER_ZONE).await.unwrap();
        assert_eq!(header[0], vec!["DATE", "2025-03-03", "DAY", "Monday"]);
        assert_eq!(header[1], vec!["IN TIME", "09:30", "OUT TIME", "", "TOTAL HOURS"]);
        let office = store
            .get_cell_range(&bare.id, ActivityZone::Office.zone_range())
            .await
            .unwrap();
        let labels: Vec<_> = office.iter().map(|r| r[0].as_str()).collect();
        assert_eq!(labels, OFFICE_SLOTS.to_vec());

        assert_eq!(
            instantiate(&h, &root, date).await.unwrap(),
            Instantiated::Existing(bare.id)
        );
    }

    #[tokio::test]
    async fn failed_layout_write_trashes_the_new_document() {
        let (store, h) = setup();
        let root = h.root().await.unwrap();
        let date = NaiveDate::from_ymd_opt(2025, 3, 3).unwrap();
        let name = day_document_name(date.day());
        let blocked = FailingTemplate {
            inner: store.clone(),
        };
        let failing = Hierarchy::new(StoreHandle::new(Arc::new(blocked)), "EMS_Root");

        assert_matches!(
            instantiate(&failing, &root, date).await,
            Err(CoreError::RemoteUnavailable(_))
        );
        assert!(h.find_document(&root, &name).await.unwrap().is_none());

        let retried = instantiate(&h, &root, date).await.unwrap();
        assert_matches!(retried, Instantiated::Created(_));
        let header = store.get_cell_range(retried.id(), HEADER_ZONE).await.unwrap();
        assert_eq!(header[0][0], "DATE");
    }

    /// Creates documents but rejects every cell write.
    struct FailingTemplate {
        inner: Arc<MemoryStore>,
    }

    #[async_trait::async_trait]
    impl DocumentStore for FailingTemplate {
        async fn list(&self, query: &Query) -> Result<Vec<Resource>, StoreError> {
            self.inner.list(query).await
        }

        async fn create(&self, resource: NewResource) -> Result<Resource, StoreError> {
            self.inner.create(resource).await
        }

        async fn trash(&self, id: &str) -> Result<(), StoreError> {
            self.inner.trash(id).await
        }

        async fn get_cell_range(&self, id: &str, range: CellRange) -> Result<Vec<Vec<String>>, StoreError> {
            self.inner.get_cell_range(id, range).await
        }

        async fn set_cell_range(
            &self,
            _id: &str,
            _range: CellRange,
            _values: Vec<Vec<String>>,
        ) -> Result<(), StoreError> {
            Err(StoreError::Api {
                status: 503,
                body: "backend unavailable".into(),
            })
        }

        async fn is_protected(&self, id: &str) -> Result<bool, StoreError> {
            self.inner.is_protected(id).await
        }

        async fn batch_format(&self, id: &str, requests: Vec<FormatRequest>) -> Result<(), StoreError> {
            self.inner.batch_format(id, requests).await
        }

        async fn upload(&self, path: &Path, resource: NewResource) -> Result<Resource, StoreError> {
            self.inner.upload(path, resource).await
        }

        async fn download(&self, id: &str) -> Result<Vec<u8>, StoreError> {
            self.inner.download(id).await
        }
    }

    #[test]
    fn break_rows_are_greyed() {
        let greyed: Vec<_> = template_formats()
            .into_iter()
            .filter_map(|r| match r {
                FormatRequest::Style { range, style } if style.italic => Some(range.start_row),
                _ => None,
            })
            .collect();
        assert_eq!(greyed, vec![8, 11]);
    }
}
