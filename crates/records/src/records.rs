//! Reads and writes against the fixed addresses of a day document.

use daysheet_core::error::CoreError;
use daysheet_core::report::{ActivityFields, DayReport, TaskAssignment};
use daysheet_core::schema::{
    task_rows, ActivityZone, CellRange, HEADER_ZONE, IN_TIME_CELL, OUT_TIME_CELL, TASK_WIDTH,
    TASK_ZONE,
};
use daysheet_store::{DocumentStore, FormatRequest};

/// Description attached to the protection applied by [`RecordRepo::lock`].
pub const LOCK_DESCRIPTION: &str = "Locked by daily cutoff";

/// Provides record operations on a single day document.
pub struct RecordRepo;

impl RecordRepo {
    /// Overwrite the in/out time cells (`B2`, `D2`). `None` leaves a cell as
    /// it is. Total hours are never computed here.
    pub async fn write_header(
        store: &dyn DocumentStore,
        document_id: &str,
        in_time: Option<&str>,
        out_time: Option<&str>,
    ) -> Result<(), CoreError> {
        for (cell, value) in [(IN_TIME_CELL, in_time), (OUT_TIME_CELL, out_time)] {
            if let Some(value) = value {
                store
                    .set_cell_range(document_id, cell, vec![vec![value.to_string()]])
                    .await?;
            }
        }
        Ok(())
    }

    /// Append task rows after the last populated row of `G2:J20`.
    ///
    /// Rows are validated and the capacity is checked before anything is
    /// written. Returns the range that was written.
    pub async fn write_task_assignment(
        store: &dyn DocumentStore,
        document_id: &str,
        rows: &[TaskAssignment],
    ) -> Result<CellRange, CoreError> {
        if rows.is_empty() {
            return Err(CoreError::Validation("No task rows to assign".into()));
        }
        for row in rows {
            row.check()?;
        }

        let existing = store.get_cell_range(document_id, TASK_ZONE).await?;
        let used = existing
            .iter()
            .rposition(|r| r.iter().any(|c| !c.trim().is_empty()))
            .map_or(0, |i| i + 1);
        let range = task_rows(used, rows.len())?;

        let values = rows.iter().map(TaskAssignment::to_cells).collect();
        store.set_cell_range(document_id, range, values).await?;
        tracing::debug!(document_id, rows = rows.len(), range = %range.to_a1(), "Appended task rows");
        Ok(range)
    }

    /// Every row of the task zone up to the last populated one, blank rows
    /// included.
    pub async fn read_task_assignment(
        store: &dyn DocumentStore,
        document_id: &str,
    ) -> Result<Vec<TaskAssignment>, CoreError> {
        let rows = store.get_cell_range(document_id, TASK_ZONE).await?;
        Ok(rows
            .into_iter()
            .map(|mut cells| {
                cells.resize(TASK_WIDTH, String::new());
                TaskAssignment::from_cells(&cells)
            })
            .collect())
    }

    /// Overwrite one slot row of an activity zone.
    pub async fn write_activity_row(
        store: &dyn DocumentStore,
        document_id: &str,
        zone: ActivityZone,
        slot: usize,
        fields: &ActivityFields,
    ) -> Result<(), CoreError> {
        if fields.zone() != zone {
            return Err(CoreError::Validation(format!(
                "{} fields cannot be written to the {} zone",
                fields.zone().name(),
                zone.name()
            )));
        }
        let range = zone.slot_range(slot)?;
        if zone.is_break_slot(slot) {
            return Err(CoreError::Validation(format!(
                "Slot {slot} of the {} zone is a break and cannot be edited",
                zone.name()
            )));
        }

        let cells = match fields {
            ActivityFields::Office(entry) => entry.clone().resolved()?.to_cells(),
            ActivityFields::Mentor(entry) => {
                let mut entry = entry.clone();
                if entry.time_label.trim().is_empty() {
                    entry.time_label = zone.slot_labels()[slot].to_string();
                }
                entry.to_cells()
            }
        };
        store.set_cell_range(document_id, range, vec![cells]).await?;
        Ok(())
    }

    /// Header time log plus both activity zones. Works on locked documents.
    pub async fn read_report(store: &dyn DocumentStore, document_id: &str) -> Result<DayReport, CoreError> {
        let header = store.get_cell_range(document_id, HEADER_ZONE).await?;
        let office = store
            .get_cell_range(document_id, ActivityZone::Office.zone_range())
            .await?;
        let mentor = store
            .get_cell_range(document_id, ActivityZone::Mentor.zone_range())
            .await?;
        Ok(DayReport::from_zones(&header, &office, &mentor))
    }

    /// Whether the document has been locked.
    pub async fn is_locked(store: &dyn DocumentStore, document_id: &str) -> Result<bool, CoreError> {
        Ok(store.is_protected(document_id).await?)
    }

    /// Protect the document against further cell writes. This is the only
    /// transition to the locked state.
    pub async fn lock(store: &dyn DocumentStore, document_id: &str) -> Result<(), CoreError> {
        store
            .batch_format(
                document_id,
                vec![FormatRequest::Protect {
                    description: LOCK_DESCRIPTION.to_string(),
                }],
            )
            .await?;
        tracing::info!(document_id, "Locked day document");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use daysheet_core::report::{MentorEntry, OfficeEntry};
    use daysheet_store::{MemoryStore, NewResource};

    async fn document() -> (MemoryStore, String) {
        let store = MemoryStore::new();
        let doc = store.create(NewResource::document("Day 1")).await.unwrap();
        (store, doc.id)
    }

    fn office(task: &str, status: &str) -> ActivityFields {
        ActivityFields::Office(OfficeEntry::new(task, "", status, ""))
    }

    #[tokio::test]
    async fn header_writes_only_value_cells() {
        let (store, doc) = document().await;
        store
            .set_cell_range(&doc, CellRange::row(2, 1, 5), vec![vec![
                "IN TIME".into(),
                "".into(),
                "OUT TIME".into(),
                "".into(),
                "TOTAL HOURS".into(),
            ]])
            .await
            .unwrap();

        RecordRepo::write_header(&store, &doc, Some("09:30"), None).await.unwrap();
        RecordRepo::write_header(&store, &doc, None, Some("17:30")).await.unwrap();

        let report = RecordRepo::read_report(&store, &doc).await.unwrap();
        assert_eq!(report.header.in_time, "09:30");
        assert_eq!(report.header.out_time, "17:30");
        let row = store.get_cell_range(&doc, CellRange::row(2, 1, 5)).await.unwrap();
        assert_eq!(row[0], vec!["IN TIME", "09:30", "OUT TIME", "17:30", "TOTAL HOURS"]);
    }

    #[tokio::test]
    async fn task_rows_append_in_call_order() {
        let (store, doc) = document().await;
        RecordRepo::write_task_assignment(&store, &doc, &[TaskAssignment::new("High", "A", "", "2")])
            .await
            .unwrap();
        let second = RecordRepo::write_task_assignment(
            &store,
            &doc,
            &[
                TaskAssignment::new("Low", "B", "", "1"),
                TaskAssignment::new("Low", "C", "", "1"),
            ],
        )
        .await
        .unwrap();
        assert_eq!(second.start_row, 3);

        let tasks: Vec<_> = RecordRepo::read_task_assignment(&store, &doc)
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.task)
            .collect();
        assert_eq!(tasks, vec!["A", "B", "C"]);
    }

    #[tokio::test]
    async fn task_overflow_writes_nothing() {
        let (store, doc) = document().await;
        let rows: Vec<_> = (0..18)
            .map(|i| TaskAssignment::new("", format!("T{i}"), "", "1"))
            .collect();
        RecordRepo::write_task_assignment(&store, &doc, &rows).await.unwrap();

        let overflow = [
            TaskAssignment::new("", "X", "", "1"),
            TaskAssignment::new("", "Y", "", "1"),
        ];
        assert_matches!(
            RecordRepo::write_task_assignment(&store, &doc, &overflow).await,
            Err(CoreError::InvalidSlot { zone: "task_assignment", .. })
        );
        assert_eq!(RecordRepo::read_task_assignment(&store, &doc).await.unwrap().len(), 18);
    }

    #[tokio::test]
    async fn invalid_task_rows_are_rejected() {
        let (store, doc) = document().await;
        assert_matches!(
            RecordRepo::write_task_assignment(&store, &doc, &[TaskAssignment::new("High", "", "", "2")]).await,
            Err(CoreError::Validation(_))
        );
        assert_matches!(
            RecordRepo::write_task_assignment(&store, &doc, &[]).await,
            Err(CoreError::Validation(_))
        );
    }

    #[tokio::test]
    async fn read_pads_short_task_rows() {
        let (store, doc) = document().await;
        store
            .set_cell_range(&doc, CellRange::row(3, 7, 8), vec![vec!["High".into(), "Ship".into()]])
            .await
            .unwrap();
        let tasks = RecordRepo::read_task_assignment(&store, &doc).await.unwrap();
        assert_eq!(tasks.len(), 2);
        assert!(tasks[0].is_blank());
        assert_eq!(tasks[1].task, "Ship");
        assert_eq!(tasks[1].expected_time, "");
    }

    #[tokio::test]
    async fn activity_row_round_trip() {
        let (store, doc) = document().await;
        let entry = OfficeEntry::new("Coding", "API work", "Done", "on time");
        RecordRepo::write_activity_row(&store, &doc, ActivityZone::Office, 2, &ActivityFields::Office(entry.clone()))
            .await
            .unwrap();
        let mentor = MentorEntry {
            time_label: String::new(),
            grade: "7".into(),
            topic: "Algebra".into(),
            activity: "Lecture".into(),
            remarks: String::new(),
        };
        RecordRepo::write_activity_row(&store, &doc, ActivityZone::Mentor, 1, &ActivityFields::Mentor(mentor))
            .await
            .unwrap();

        let report = RecordRepo::read_report(&store, &doc).await.unwrap();
        assert_eq!(report.office[2].entry, entry);
        assert_eq!(report.mentor[1].entry.time_label, "09:00 - 10:00");
        assert_eq!(report.mentor[1].entry.topic, "Algebra");
    }

    #[tokio::test]
    async fn padded_values_come_back_as_written() {
        let (store, doc) = document().await;
        RecordRepo::write_header(&store, &doc, Some(" 09:30 "), None).await.unwrap();
        let entry = OfficeEntry::new("  Code review", "Parser PR  ", " Done", "see notes ");
        RecordRepo::write_activity_row(&store, &doc, ActivityZone::Office, 1, &ActivityFields::Office(entry.clone()))
            .await
            .unwrap();

        let report = RecordRepo::read_report(&store, &doc).await.unwrap();
        assert_eq!(report.header.in_time, " 09:30 ");
        assert_eq!(report.office[1].entry, entry);
        assert!(report.office[1].has_content());
    }

    #[tokio::test]
    async fn others_is_stored_under_its_description() {
        let (store, doc) = document().await;
        let fields = ActivityFields::Office(OfficeEntry::new("Others", "Client call", "Done", ""));
        RecordRepo::write_activity_row(&store, &doc, ActivityZone::Office, 0, &fields)
            .await
            .unwrap();
        let report = RecordRepo::read_report(&store, &doc).await.unwrap();
        assert_eq!(report.office[0].entry.task, "Client call");
    }

    #[tokio::test]
    async fn slot_bounds_breaks_and_zone_mismatch() {
        let (store, doc) = document().await;
        assert_matches!(
            RecordRepo::write_activity_row(&store, &doc, ActivityZone::Office, 8, &office("x", "")).await,
            Err(CoreError::InvalidSlot { zone: "office", index: 8 })
        );
        assert_matches!(
            RecordRepo::write_activity_row(&store, &doc, ActivityZone::Office, 3, &office("x", "")).await,
            Err(CoreError::Validation(_))
        );
        assert_matches!(
            RecordRepo::write_activity_row(&store, &doc, ActivityZone::Mentor, 0, &office("x", "")).await,
            Err(CoreError::Validation(_))
        );
    }

    #[tokio::test]
    async fn locked_document_rejects_writes_but_reads() {
        let (store, doc) = document().await;
        RecordRepo::write_activity_row(&store, &doc, ActivityZone::Office, 0, &office("Coding", "Done"))
            .await
            .unwrap();
        assert!(!RecordRepo::is_locked(&store, &doc).await.unwrap());
        RecordRepo::lock(&store, &doc).await.unwrap();
        assert!(RecordRepo::is_locked(&store, &doc).await.unwrap());

        assert_matches!(
            RecordRepo::write_activity_row(&store, &doc, ActivityZone::Office, 1, &office("More", "Done")).await,
            Err(CoreError::Locked(_))
        );
        assert_matches!(
            RecordRepo::write_header(&store, &doc, Some("10:00"), None).await,
            Err(CoreError::Locked(_))
        );
        let report = RecordRepo::read_report(&store, &doc).await.unwrap();
        assert_eq!(report.office[0].entry.task, "Coding");
    }
}
