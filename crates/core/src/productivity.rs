//! Expected-vs-actual hour arithmetic for the productivity aggregator.
//!
//! Expected time is free text typed by an admin (`"8"`, `"2.5 hrs"`,
//! `"1h 30m"`, `"2:30"`); anything that does not parse is skipped. Actual time
//! for a day is the header time log when both ends parse, and otherwise the
//! sum of the office slots holding logged work.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::attendance::status_key;
use crate::report::{assigned_tasks, DayReport, TaskAssignment};
use crate::schema::OFFICE_SLOTS;
use crate::types::EmployeeId;

const MINUTES_PER_HOUR: f64 = 60.0;

static DURATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^\s*(?:(\d+(?:\.\d+)?)\s*(?:hours|hour|hrs|hr|h)\.?)?\s*(?:(\d+(?:\.\d+)?)\s*(?:minutes|minute|mins|min|m)\.?)?\s*$",
    )
    .expect("valid regex")
});

static HOURS_MINUTES_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(\d{1,2}):([0-5]\d)\s*$").expect("valid regex"));

static CLOCK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(\d{1,2}):([0-5]\d)(?::[0-5]\d)?\s*(am|pm)?\s*$").expect("valid regex")
});

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Parse a free-text expected duration into hours.
pub fn parse_expected_hours(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(hours) = trimmed.parse::<f64>() {
        return (hours.is_finite() && hours >= 0.0).then_some(hours);
    }
    if let Some(caps) = HOURS_MINUTES_RE.captures(trimmed) {
        let h: f64 = caps[1].parse().ok()?;
        let m: f64 = caps[2].parse().ok()?;
        return Some(h + m / MINUTES_PER_HOUR);
    }
    let caps = DURATION_RE.captures(trimmed)?;
    let hours = caps.get(1).and_then(|m| m.as_str().parse::<f64>().ok());
    let minutes = caps.get(2).and_then(|m| m.as_str().parse::<f64>().ok());
    match (hours, minutes) {
        (None, None) => None,
        (h, m) => Some(h.unwrap_or(0.0) + m.unwrap_or(0.0) / MINUTES_PER_HOUR),
    }
}

/// A wall-clock reading in minutes after midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Clock {
    minutes: i64,
    /// Written with an explicit AM/PM suffix.
    meridiem: bool,
    hour: u32,
}

fn parse_clock(text: &str) -> Option<Clock> {
    let caps = CLOCK_RE.captures(text)?;
    let mut hour: u32 = caps[1].parse().ok()?;
    let minute: u32 = caps[2].parse().ok()?;
    let meridiem = caps.get(3).map(|m| m.as_str().to_ascii_lowercase());
    match meridiem.as_deref() {
        Some(_) if hour == 0 || hour > 12 => return None,
        Some("am") if hour == 12 => hour = 0,
        Some("pm") if hour != 12 => hour += 12,
        _ if hour > 23 => return None,
        _ => {}
    }
    Some(Clock {
        minutes: i64::from(hour * 60 + minute),
        meridiem: meridiem.is_some(),
        hour,
    })
}

/// Minutes from `start` to `end`, reading the sheet's bare `hh:mm` values
/// as a twelve-hour clock when both fit one.
fn span_minutes(start: Clock, end: Clock) -> Option<i64> {
    let mut minutes = end.minutes - start.minutes;
    if minutes <= 0 {
        let twelve_hour = !start.meridiem && !end.meridiem && start.hour <= 12 && end.hour <= 12;
        minutes += if twelve_hour { 12 * 60 } else { 24 * 60 };
    }
    (minutes > 0).then_some(minutes)
}

/// Length of a slot label such as `"12:30 - 01:30 (LUNCH)"`, in hours.
pub fn slot_duration_hours(label: &str) -> Option<f64> {
    let bare = label.split('(').next()?.trim();
    let (start, end) = bare.split_once('-')?;
    let minutes = span_minutes(parse_clock(start)?, parse_clock(end)?)?;
    Some(minutes as f64 / MINUTES_PER_HOUR)
}

/// Hours between the in and out times of the header log.
pub fn worked_hours(in_time: &str, out_time: &str) -> Option<f64> {
    let minutes = span_minutes(parse_clock(in_time)?, parse_clock(out_time)?)?;
    Some(minutes as f64 / MINUTES_PER_HOUR)
}

// ---------------------------------------------------------------------------
// Aggregation
// ---------------------------------------------------------------------------

/// Totals for a single day document.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DayProductivity {
    pub expected_hours: f64,
    pub actual_hours: f64,
    pub status_counts: BTreeMap<String, u32>,
}

impl DayProductivity {
    /// Compute from a raw task zone read and an activity report.
    pub fn from_day(task_rows: Vec<TaskAssignment>, report: &DayReport) -> Self {
        let expected_hours = assigned_tasks(task_rows)
            .iter()
            .filter_map(|t| parse_expected_hours(&t.expected_time))
            .sum();

        let logged: Vec<_> = report.office.iter().filter(|r| r.is_logged_work()).collect();

        let actual_hours = worked_hours(&report.header.in_time, &report.header.out_time)
            .unwrap_or_else(|| {
                logged
                    .iter()
                    .filter_map(|row| {
                        let label = if row.time_slot.is_empty() {
                            OFFICE_SLOTS.get(row.slot).copied().unwrap_or_default()
                        } else {
                            row.time_slot.as_str()
                        };
                        slot_duration_hours(label)
                    })
                    .sum()
            });

        let mut status_counts = BTreeMap::new();
        for row in report.office.iter().filter(|r| r.has_content()) {
            *status_counts.entry(status_key(&row.entry.status)).or_insert(0) += 1;
        }

        Self {
            expected_hours,
            actual_hours,
            status_counts,
        }
    }
}

/// Monthly productivity for one employee.
///
/// `days_with_data` and `days_missing` let callers tell "no document" apart
/// from "zero hours": missing days contribute nothing to the totals.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Productivity {
    pub employee_id: EmployeeId,
    pub year: i32,
    pub month: u32,
    pub expected_hours: f64,
    pub actual_hours: f64,
    pub status_counts: BTreeMap<String, u32>,
    pub days_with_data: Vec<u32>,
    pub days_missing: Vec<u32>,
    pub errors: Vec<String>,
}

impl Productivity {
    pub fn new(employee_id: impl Into<EmployeeId>, year: i32, month: u32) -> Self {
        Self {
            employee_id: employee_id.into(),
            year,
            month,
            ..Self::default()
        }
    }

    /// Fold one day's totals in.
    pub fn absorb(&mut self, day: u32, totals: DayProductivity) {
        self.expected_hours += totals.expected_hours;
        self.actual_hours += totals.actual_hours;
        for (status, count) in totals.status_counts {
            *self.status_counts.entry(status).or_insert(0) += count;
        }
        self.days_with_data.push(day);
    }

    pub fn mark_missing(&mut self, day: u32) {
        self.days_missing.push(day);
    }

    /// Actual over expected, as a percentage rounded to one decimal.
    pub fn efficiency_percent(&self) -> Option<f64> {
        (self.expected_hours > 0.0)
            .then(|| (self.actual_hours / self.expected_hours * 1000.0).round() / 10.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::OfficeEntry;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn expected_hours_formats() {
        assert_eq!(parse_expected_hours("8"), Some(8.0));
        assert_eq!(parse_expected_hours(" 2.5 "), Some(2.5));
        assert_eq!(parse_expected_hours("8h"), Some(8.0));
        assert_eq!(parse_expected_hours("2.5 hrs"), Some(2.5));
        assert_eq!(parse_expected_hours("90m"), Some(1.5));
        assert_eq!(parse_expected_hours("1h 30m"), Some(1.5));
        assert_eq!(parse_expected_hours("1 hour 30 minutes"), Some(1.5));
        assert_eq!(parse_expected_hours("2:30"), Some(2.5));
    }

    #[test]
    fn expected_hours_rejects_noise() {
        assert_eq!(parse_expected_hours(""), None);
        assert_eq!(parse_expected_hours("??"), None);
        assert_eq!(parse_expected_hours("soon"), None);
        assert_eq!(parse_expected_hours("-3"), None);
        assert_eq!(parse_expected_hours("h"), None);
    }

    #[test]
    fn slot_durations() {
        let hours: Vec<_> = OFFICE_SLOTS.iter().map(|s| slot_duration_hours(s).unwrap()).collect();
        assert_eq!(hours, vec![1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 0.5, 1.5]);
        assert_eq!(slot_duration_hours("12:00 - 01:00"), Some(1.0));
        assert_eq!(slot_duration_hours("nonsense"), None);
    }

    #[test]
    fn worked_hours_handles_both_clocks() {
        assert_eq!(worked_hours("09:30", "15:30"), Some(6.0));
        assert_eq!(worked_hours("09:30", "05:30"), Some(8.0));
        assert_eq!(worked_hours("9:00 AM", "5:30 PM"), Some(8.5));
        assert_eq!(worked_hours("22:00", "06:00"), Some(8.0));
        assert_eq!(worked_hours("", "17:00"), None);
        assert_eq!(worked_hours("25:00", "17:00"), None);
    }

    #[test]
    fn day_prefers_time_log() {
        let mut report = DayReport::from_zones(&[], &[], &[]);
        report.header.in_time = "09:30".into();
        report.header.out_time = "15:30".into();
        report.office[0].entry = OfficeEntry::new("Coding", "", "Done", "");

        let tasks = vec![TaskAssignment::new("High", "Coding", "", "8")];
        let day = DayProductivity::from_day(tasks, &report);
        assert!(approx(day.expected_hours, 8.0));
        assert!(approx(day.actual_hours, 6.0));
        assert_eq!(day.status_counts.get("Done"), Some(&1));
    }

    #[test]
    fn day_falls_back_to_slot_durations() {
        let mut report = DayReport::from_zones(&[], &[], &[]);
        report.office[0].time_slot = OFFICE_SLOTS[0].into();
        report.office[0].entry = OfficeEntry::new("Coding", "", "Done", "");
        report.office[7].entry = OfficeEntry::new("Review", "", "Pending", "");

        let day = DayProductivity::from_day(Vec::new(), &report);
        assert!(approx(day.actual_hours, 2.5));
        assert!(approx(day.expected_hours, 0.0));
        assert_eq!(day.status_counts.len(), 2);
    }

    #[test]
    fn unparsable_expected_time_is_skipped() {
        let tasks = vec![
            TaskAssignment::new("High", "A", "", "3h"),
            TaskAssignment::new("Low", "B", "", "??"),
        ];
        let day = DayProductivity::from_day(tasks, &DayReport::from_zones(&[], &[], &[]));
        assert!(approx(day.expected_hours, 3.0));
    }

    #[test]
    fn month_totals_and_efficiency() {
        let mut month = Productivity::new("E-1", 2025, 3);
        month.absorb(
            1,
            DayProductivity {
                expected_hours: 8.0,
                actual_hours: 6.0,
                status_counts: BTreeMap::from([("Done".to_string(), 1)]),
            },
        );
        month.mark_missing(2);
        assert_eq!(month.days_with_data, vec![1]);
        assert_eq!(month.days_missing, vec![2]);
        assert_eq!(month.efficiency_percent(), Some(75.0));
        assert_eq!(Productivity::new("E-2", 2025, 3).efficiency_percent(), None);
    }
}
