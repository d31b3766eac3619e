//! Record rows stored in a Day Document.
//!
//! Writers turn these types into cell values with `to_cells`; readers rebuild
//! them from whatever the store returned with `from_cells`, which tolerates
//! short rows because the remote store trims trailing blank cells.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::CoreError;
use crate::schema::{ActivityZone, TASK_HEADERS};

/// Task label that switches the description into the authoritative task name.
pub const OTHERS_TASK: &str = "Others";

/// Marker written into an empty office zone by the lock firing.
pub const ABSENT_MARKER: &str = "Absent";

/// Status value the UI stores on break placeholder rows.
pub const PLACEHOLDER_STATUS: &str = "Locked";

/// Cell `i` of a row the store may have shortened, as stored.
fn cell(cells: &[String], i: usize) -> String {
    cells.get(i).cloned().unwrap_or_default()
}

// ---------------------------------------------------------------------------
// Task assignment
// ---------------------------------------------------------------------------

/// One row of the task assignment zone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct TaskAssignment {
    pub priority: String,
    #[validate(length(min = 1, message = "task must not be empty"))]
    pub task: String,
    pub deadline: String,
    #[validate(length(min = 1, message = "expected_time must not be empty"))]
    pub expected_time: String,
}

impl TaskAssignment {
    pub fn new(
        priority: impl Into<String>,
        task: impl Into<String>,
        deadline: impl Into<String>,
        expected_time: impl Into<String>,
    ) -> Self {
        Self {
            priority: priority.into(),
            task: task.into(),
            deadline: deadline.into(),
            expected_time: expected_time.into(),
        }
    }

    pub fn to_cells(&self) -> Vec<String> {
        vec![
            self.priority.clone(),
            self.task.clone(),
            self.deadline.clone(),
            self.expected_time.clone(),
        ]
    }

    pub fn from_cells(cells: &[String]) -> Self {
        Self {
            priority: cell(cells, 0),
            task: cell(cells, 1),
            deadline: cell(cells, 2),
            expected_time: cell(cells, 3),
        }
    }

    pub fn is_blank(&self) -> bool {
        [&self.priority, &self.task, &self.deadline, &self.expected_time]
            .iter()
            .all(|v| v.trim().is_empty())
    }

    /// True for a row that repeats the zone headers instead of holding a task.
    pub fn is_header_like(&self) -> bool {
        self.task.trim().eq_ignore_ascii_case(TASK_HEADERS[1])
    }

    /// Validate an incoming assignment row.
    pub fn check(&self) -> Result<(), CoreError> {
        self.validate()
            .map_err(|e| CoreError::Validation(format!("Invalid task assignment: {e}")))
    }
}

/// Drop blank and header-like rows from a raw task zone read.
pub fn assigned_tasks(rows: Vec<TaskAssignment>) -> Vec<TaskAssignment> {
    rows.into_iter()
        .filter(|r| !r.task.trim().is_empty() && !r.is_header_like())
        .collect()
}

// ---------------------------------------------------------------------------
// Activity entries
// ---------------------------------------------------------------------------

/// Fields of one office activity slot (columns `B..E`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfficeEntry {
    pub task: String,
    pub description: String,
    pub status: String,
    #[serde(default)]
    pub remarks: String,
}

impl OfficeEntry {
    pub fn new(
        task: impl Into<String>,
        description: impl Into<String>,
        status: impl Into<String>,
        remarks: impl Into<String>,
    ) -> Self {
        Self {
            task: task.into(),
            description: description.into(),
            status: status.into(),
            remarks: remarks.into(),
        }
    }

    /// The row the lock firing writes into an office zone with no entries.
    pub fn absent() -> Self {
        Self::new(ABSENT_MARKER, "", ABSENT_MARKER, "")
    }

    /// Task label this entry stands for.
    ///
    /// When the task is the free-text `"Others"` choice, the description is the
    /// label and must not be blank.
    pub fn task_label(&self) -> Result<String, CoreError> {
        if self.task.trim() == OTHERS_TASK {
            let description = self.description.trim();
            if description.is_empty() {
                return Err(CoreError::Validation(
                    "A description is required when the task is 'Others'".to_string(),
                ));
            }
            return Ok(description.to_string());
        }
        Ok(self.task.trim().to_string())
    }

    /// Resolve the `"Others"` rule, returning the entry as it is stored.
    /// Any other task is kept exactly as given.
    pub fn resolved(mut self) -> Result<Self, CoreError> {
        if self.task.trim() == OTHERS_TASK {
            self.task = self.task_label()?;
        }
        Ok(self)
    }

    pub fn to_cells(&self) -> Vec<String> {
        vec![
            self.task.clone(),
            self.description.clone(),
            self.status.clone(),
            self.remarks.clone(),
        ]
    }

    pub fn is_empty(&self) -> bool {
        self.task.trim().is_empty() && self.description.trim().is_empty()
    }

    /// Break rows filled in by the UI (`--- LUNCH BREAK ---` / `Locked`).
    pub fn is_placeholder(&self) -> bool {
        self.task.trim_start().starts_with("---") || self.status.trim() == PLACEHOLDER_STATUS
    }

    pub fn is_absent(&self) -> bool {
        self.task.trim() == ABSENT_MARKER && self.status.trim() == ABSENT_MARKER
    }
}

/// Fields of one mentor activity slot (columns `A..E`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MentorEntry {
    pub time_label: String,
    pub grade: String,
    pub topic: String,
    pub activity: String,
    #[serde(default)]
    pub remarks: String,
}

impl MentorEntry {
    pub fn to_cells(&self) -> Vec<String> {
        vec![
            self.time_label.clone(),
            self.grade.clone(),
            self.topic.clone(),
            self.activity.clone(),
            self.remarks.clone(),
        ]
    }

    pub fn is_empty(&self) -> bool {
        [&self.grade, &self.topic, &self.activity, &self.remarks]
            .iter()
            .all(|v| v.trim().is_empty())
    }
}

/// Fields for a single slot write, tagged with the zone they belong to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "zone", rename_all = "snake_case")]
pub enum ActivityFields {
    Office(OfficeEntry),
    Mentor(MentorEntry),
}

impl ActivityFields {
    pub fn zone(&self) -> ActivityZone {
        match self {
            Self::Office(_) => ActivityZone::Office,
            Self::Mentor(_) => ActivityZone::Mentor,
        }
    }

    pub fn to_cells(&self) -> Vec<String> {
        match self {
            Self::Office(entry) => entry.to_cells(),
            Self::Mentor(entry) => entry.to_cells(),
        }
    }
}

// ---------------------------------------------------------------------------
// Read-back rows
// ---------------------------------------------------------------------------

/// One office slot as read back from a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfficeRow {
    pub slot: usize,
    pub time_slot: String,
    #[serde(flatten)]
    pub entry: OfficeEntry,
}

impl OfficeRow {
    /// Build from a row of `A..E` cells.
    pub fn from_cells(slot: usize, cells: &[String]) -> Self {
        Self {
            slot,
            time_slot: cell(cells, 0),
            entry: OfficeEntry {
                task: cell(cells, 1),
                description: cell(cells, 2),
                status: cell(cells, 3),
                remarks: cell(cells, 4),
            },
        }
    }

    pub fn is_break(&self) -> bool {
        ActivityZone::Office.is_break_slot(self.slot)
    }

    /// A real entry: not a break slot, not blank, not a placeholder.
    pub fn has_content(&self) -> bool {
        !self.is_break() && !self.entry.is_empty() && !self.entry.is_placeholder()
    }

    /// An entry that represents logged work (absence markers excluded).
    pub fn is_logged_work(&self) -> bool {
        self.has_content() && !self.entry.is_absent()
    }
}

/// One mentor slot as read back from a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MentorRow {
    pub slot: usize,
    #[serde(flatten)]
    pub entry: MentorEntry,
}

impl MentorRow {
    pub fn from_cells(slot: usize, cells: &[String]) -> Self {
        Self {
            slot,
            entry: MentorEntry {
                time_label: cell(cells, 0),
                grade: cell(cells, 1),
                topic: cell(cells, 2),
                activity: cell(cells, 3),
                remarks: cell(cells, 4),
            },
        }
    }
}

/// The header zone values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderLog {
    pub date: String,
    pub day: String,
    pub in_time: String,
    pub out_time: String,
}

impl HeaderLog {
    /// Build from the `A1:E2` block.
    pub fn from_rows(rows: &[Vec<String>]) -> Self {
        let empty = Vec::new();
        let first = rows.first().unwrap_or(&empty);
        let second = rows.get(1).unwrap_or(&empty);
        Self {
            date: cell(first, 1),
            day: cell(first, 3),
            in_time: cell(second, 1),
            out_time: cell(second, 3),
        }
    }
}

/// Everything a day document records about activity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayReport {
    pub header: HeaderLog,
    pub office: Vec<OfficeRow>,
    pub mentor: Vec<MentorRow>,
}

impl DayReport {
    /// Rebuild from raw zone reads. Missing trailing rows become blank slots.
    pub fn from_zones(header: &[Vec<String>], office: &[Vec<String>], mentor: &[Vec<String>]) -> Self {
        let empty = Vec::new();
        Self {
            header: HeaderLog::from_rows(header),
            office: (0..ActivityZone::Office.slot_count())
                .map(|slot| OfficeRow::from_cells(slot, office.get(slot).unwrap_or(&empty)))
                .collect(),
            mentor: (0..ActivityZone::Mentor.slot_count())
                .map(|slot| MentorRow::from_cells(slot, mentor.get(slot).unwrap_or(&empty)))
                .collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Submissions
// ---------------------------------------------------------------------------

/// An entry addressed to a specific slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotEntry<T> {
    pub slot: usize,
    #[serde(flatten)]
    pub fields: T,
}

/// A daily report as submitted by an employee.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyReportSubmission {
    #[serde(default)]
    pub in_time: Option<String>,
    #[serde(default)]
    pub out_time: Option<String>,
    #[serde(default)]
    pub office: Vec<SlotEntry<OfficeEntry>>,
    #[serde(default)]
    pub mentor: Vec<SlotEntry<MentorEntry>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn strings(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn others_uses_description_as_label() {
        let entry = OfficeEntry::new("Others", "  Client call  ", "Done", "");
        assert_eq!(entry.task_label().unwrap(), "Client call");
        assert_eq!(entry.resolved().unwrap().task, "Client call");
    }

    #[test]
    fn others_without_description_is_rejected() {
        let entry = OfficeEntry::new("Others", "   ", "Done", "");
        assert_matches!(entry.task_label(), Err(CoreError::Validation(_)));
    }

    #[test]
    fn regular_task_keeps_its_label() {
        let entry = OfficeEntry::new("Write report", "", "Pending", "");
        assert_eq!(entry.task_label().unwrap(), "Write report");
    }

    #[test]
    fn placeholder_rows_are_detected() {
        assert!(OfficeEntry::new("--- LUNCH BREAK ---", "Locked", "Locked", "Locked").is_placeholder());
        assert!(!OfficeEntry::new("Coding", "", "Done", "").is_placeholder());
    }

    #[test]
    fn office_row_from_short_cells() {
        let row = OfficeRow::from_cells(0, &strings(&["09:30 - 10:30", "Coding"]));
        assert_eq!(row.time_slot, "09:30 - 10:30");
        assert_eq!(row.entry.task, "Coding");
        assert_eq!(row.entry.status, "");
        assert!(row.has_content());
        assert!(row.is_logged_work());
    }

    #[test]
    fn cells_are_read_as_stored() {
        let row = OfficeRow::from_cells(1, &strings(&["10:30 - 11:30", " Coding ", "", "   "]));
        assert_eq!(row.entry.task, " Coding ");
        assert_eq!(row.entry.status, "   ");
        assert_eq!(row.entry.task_label().unwrap(), "Coding");

        let blank = OfficeRow::from_cells(2, &strings(&["11:30 - 12:30", "  ", " "]));
        assert!(blank.entry.is_empty());
        assert!(!blank.has_content());

        let padded = TaskAssignment::from_cells(&strings(&[" ", " task ", "", ""]));
        assert!(assigned_tasks(vec![padded.clone()]).is_empty());
        assert!(TaskAssignment::from_cells(&strings(&["", "  ", " "])).is_blank());
        assert_eq!(padded.task, " task ");
    }

    #[test]
    fn break_slot_never_counts_as_content() {
        let row = OfficeRow::from_cells(3, &strings(&["12:30 - 01:30 (LUNCH)", "Coding", "", "Done"]));
        assert!(!row.has_content());
    }

    #[test]
    fn absent_marker_is_content_but_not_work() {
        let row = OfficeRow {
            slot: 0,
            time_slot: String::new(),
            entry: OfficeEntry::absent(),
        };
        assert!(row.has_content());
        assert!(!row.is_logged_work());
    }

    #[test]
    fn blank_and_header_task_rows_are_filtered() {
        let rows = vec![
            TaskAssignment::from_cells(&strings(&["PRIORITY", "TASK", "DEADLINE", "EXPECTED TIME"])),
            TaskAssignment::from_cells(&[]),
            TaskAssignment::from_cells(&strings(&["High", "Ship it", "2025-03-04", "4"])),
        ];
        let tasks = assigned_tasks(rows);
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].task, "Ship it");
    }

    #[test]
    fn task_assignment_validation() {
        assert!(TaskAssignment::new("High", "Ship it", "", "4").check().is_ok());
        assert_matches!(
            TaskAssignment::new("High", "", "", "4").check(),
            Err(CoreError::Validation(_))
        );
        assert_matches!(
            TaskAssignment::new("High", "Ship it", "", "").check(),
            Err(CoreError::Validation(_))
        );
    }

    #[test]
    fn day_report_pads_missing_rows() {
        let report = DayReport::from_zones(&[], &[strings(&["09:30 - 10:30", "Coding"])], &[]);
        assert_eq!(report.office.len(), 8);
        assert_eq!(report.mentor.len(), 7);
        assert_eq!(report.office[0].entry.task, "Coding");
        assert!(report.office[7].entry.is_empty());
    }

    #[test]
    fn header_log_reads_value_cells() {
        let header = HeaderLog::from_rows(&[
            strings(&["DATE", "2025-03-03", "DAY", "Monday"]),
            strings(&["IN TIME", "09:30", "OUT TIME", "17:30", "TOTAL HOURS"]),
        ]);
        assert_eq!(header.date, "2025-03-03");
        assert_eq!(header.day, "Monday");
        assert_eq!(header.in_time, "09:30");
        assert_eq!(header.out_time, "17:30");
    }

    #[test]
    fn submission_deserializes_slot_entries() {
        let json = serde_json::json!({
            "in_time": "09:30",
            "office": [{"slot": 0, "task": "Coding", "description": "", "status": "Done"}],
            "mentor": [{"slot": 1, "time_label": "09:00 - 10:00", "grade": "5", "topic": "Fractions", "activity": "Quiz"}]
        });
        let submission: DailyReportSubmission = serde_json::from_value(json).unwrap();
        assert_eq!(submission.office[0].fields.task, "Coding");
        assert_eq!(submission.mentor[0].slot, 1);
        assert_eq!(submission.mentor[0].fields.remarks, "");
        assert!(submission.out_time.is_none());
    }
}
