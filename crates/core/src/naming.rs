//! Container and document naming conventions.
//!
//! Month containers are named `"{MonthName}_{Year}"` and day documents
//! `"Day {n}"`. Both names are matched bit-exactly against the remote store,
//! so they must never change.

use chrono::{Datelike, NaiveDate};

use crate::error::CoreError;

/// Prefix shared by every day document name.
pub const DAY_DOCUMENT_PREFIX: &str = "Day ";

/// Name of the month container for `year`/`month`, e.g. `"March_2025"`.
pub fn month_container_name(year: i32, month: u32) -> Result<String, CoreError> {
    let first = first_of_month(year, month)?;
    Ok(first.format("%B_%Y").to_string())
}

/// Name of the day document for day-of-month `day`, e.g. `"Day 7"`.
pub fn day_document_name(day: u32) -> String {
    format!("{DAY_DOCUMENT_PREFIX}{day}")
}

/// Parse the day-of-month back out of a day document name.
///
/// Returns `None` for anything that is not exactly `"Day {n}"` with
/// `1 <= n <= 31`.
pub fn parse_day_document_name(name: &str) -> Option<u32> {
    let digits = name.strip_prefix(DAY_DOCUMENT_PREFIX)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let day: u32 = digits.parse().ok()?;
    (1..=31).contains(&day).then_some(day)
}

/// Number of calendar days in `year`/`month`.
///
/// This is the only day-count policy: a month container always holds exactly
/// this many day documents.
pub fn days_in_month(year: i32, month: u32) -> Result<u32, CoreError> {
    let first = first_of_month(year, month)?;
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    }
    .ok_or_else(|| CoreError::Validation(format!("Month {year}-{month} is out of range")))?;
    let days = next.signed_duration_since(first).num_days();
    u32::try_from(days).map_err(|_| CoreError::Internal(format!("Bad day count {days}")))
}

/// Every date of `year`/`month`, in order.
pub fn month_dates(year: i32, month: u32) -> Result<Vec<NaiveDate>, CoreError> {
    let count = days_in_month(year, month)?;
    (1..=count)
        .map(|day| {
            NaiveDate::from_ymd_opt(year, month, day)
                .ok_or_else(|| CoreError::Internal(format!("Bad date {year}-{month}-{day}")))
        })
        .collect()
}

/// English weekday name written into the header zone, e.g. `"Monday"`.
pub fn weekday_name(date: NaiveDate) -> String {
    date.format("%A").to_string()
}

/// Date string written into the header zone (`YYYY-MM-DD`).
pub fn header_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Month container name for the month containing `date`.
pub fn month_container_name_for(date: NaiveDate) -> Result<String, CoreError> {
    month_container_name(date.year(), date.month())
}

fn first_of_month(year: i32, month: u32) -> Result<NaiveDate, CoreError> {
    NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or_else(|| CoreError::Validation(format!("Invalid month {year}-{month}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn month_name_uses_full_month_and_year() {
        assert_eq!(month_container_name(2025, 3).unwrap(), "March_2025");
        assert_eq!(month_container_name(2024, 12).unwrap(), "December_2024");
    }

    #[test]
    fn month_name_rejects_bad_month() {
        assert!(month_container_name(2025, 13).is_err());
        assert!(month_container_name(2025, 0).is_err());
    }

    #[test]
    fn day_names_round_trip() {
        assert_eq!(day_document_name(1), "Day 1");
        assert_eq!(parse_day_document_name("Day 31"), Some(31));
        assert_eq!(parse_day_document_name("Day 0"), None);
        assert_eq!(parse_day_document_name("Day 32"), None);
        assert_eq!(parse_day_document_name("Day 1 (copy)"), None);
        assert_eq!(parse_day_document_name("day 1"), None);
    }

    #[test]
    fn days_in_month_is_calendar_accurate() {
        assert_eq!(days_in_month(2025, 1).unwrap(), 31);
        assert_eq!(days_in_month(2025, 2).unwrap(), 28);
        assert_eq!(days_in_month(2024, 2).unwrap(), 29);
        assert_eq!(days_in_month(2025, 4).unwrap(), 30);
        assert_eq!(days_in_month(2025, 12).unwrap(), 31);
    }

    #[test]
    fn month_dates_cover_whole_month() {
        let dates = month_dates(2025, 2).unwrap();
        assert_eq!(dates.len(), 28);
        assert_eq!(dates[0], NaiveDate::from_ymd_opt(2025, 2, 1).unwrap());
        assert_eq!(dates[27], NaiveDate::from_ymd_opt(2025, 2, 28).unwrap());
    }

    #[test]
    fn header_strings() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 3).unwrap();
        assert_eq!(weekday_name(date), "Monday");
        assert_eq!(header_date(date), "2025-03-03");
        assert_eq!(month_container_name_for(date).unwrap(), "March_2025");
    }
}
