//! Absence detection and per-day statistics for the daily firings.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::report::DayReport;

/// True when the office zone has no real entry, so the lock firing must
/// write an absence marker before locking.
pub fn needs_absent_marker(report: &DayReport) -> bool {
    !report.office.iter().any(|row| row.has_content())
}

/// Summary of one day document computed by the aggregate firing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DailyStats {
    /// Count of office rows per status value. Rows with a blank status are
    /// counted under `"Unspecified"`.
    pub status_counts: BTreeMap<String, u32>,
    /// Office rows holding logged work.
    pub logged_slots: u32,
    /// Mentor rows holding any entry.
    pub mentor_slots: u32,
    /// The office zone holds only the absence marker.
    pub absent: bool,
}

/// Status key used for rows whose status cell is blank.
pub const UNSPECIFIED_STATUS: &str = "Unspecified";

impl DailyStats {
    pub fn from_report(report: &DayReport) -> Self {
        let mut stats = Self::default();
        let mut any_work = false;
        let mut any_absent = false;

        for row in report.office.iter().filter(|r| r.has_content()) {
            *stats.status_counts.entry(status_key(&row.entry.status)).or_insert(0) += 1;
            if row.entry.is_absent() {
                any_absent = true;
            } else {
                any_work = true;
                stats.logged_slots += 1;
            }
        }

        stats.mentor_slots = report.mentor.iter().filter(|r| !r.entry.is_empty()).count() as u32;
        stats.absent = any_absent && !any_work;
        stats
    }
}

/// Histogram key for a raw status cell.
pub fn status_key(status: &str) -> String {
    let trimmed = status.trim();
    if trimmed.is_empty() {
        UNSPECIFIED_STATUS.to_string()
    } else {
        trimmed.to_string()
    }
}
