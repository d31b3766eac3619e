//! Monthly productivity computed by reading day documents back.

use std::collections::BTreeMap;

use daysheet_core::error::CoreError;
use daysheet_core::naming::{days_in_month, parse_day_document_name};
use daysheet_core::productivity::{DayProductivity, Productivity};
use daysheet_core::types::ResourceId;

use crate::directory::EmployeeRecord;
use crate::hierarchy::Hierarchy;
use crate::records::RecordRepo;

/// Compute one employee's productivity for `year`/`month`.
///
/// The month container is listed once and every existing day document is
/// read in turn. Days without a document are reported in `days_missing`;
/// read failures land in `errors` and the remaining days are still counted.
/// Fails only when the month itself is invalid or the hierarchy cannot be
/// listed.
pub async fn compute(
    hierarchy: &Hierarchy,
    employee: &EmployeeRecord,
    year: i32,
    month: u32,
) -> Result<Productivity, CoreError> {
    let day_count = days_in_month(year, month)?;
    let mut productivity = Productivity::new(employee.id.clone(), year, month);

    let documents = match hierarchy.find_employee(employee).await? {
        Some(folder) => match hierarchy.month_container(&folder, year, month, false).await? {
            Some(container) => day_documents(hierarchy, &container).await?,
            None => BTreeMap::new(),
        },
        None => BTreeMap::new(),
    };

    let store = hierarchy.store();
    for day in 1..=day_count {
        let Some(document) = documents.get(&day) else {
            productivity.mark_missing(day);
            continue;
        };
        let read = async {
            let tasks = RecordRepo::read_task_assignment(store, document).await?;
            let report = RecordRepo::read_report(store, document).await?;
            Ok::<_, CoreError>(DayProductivity::from_day(tasks, &report))
        };
        match read.await {
            Ok(totals) => productivity.absorb(day, totals),
            Err(e) => {
                tracing::warn!(
                    employee_id = %employee.id,
                    document_id = %document,
                    day,
                    error = %e,
                    "Failed to read day document"
                );
                productivity.errors.push(format!("Day {day}: {e}"));
            }
        }
    }

    tracing::debug!(
        employee_id = %employee.id,
        year,
        month,
        days_with_data = productivity.days_with_data.len(),
        days_missing = productivity.days_missing.len(),
        "Computed productivity"
    );
    Ok(productivity)
}

/// Day-of-month → oldest live document of that name.
async fn day_documents(hierarchy: &Hierarchy, container: &str) -> Result<BTreeMap<u32, ResourceId>, CoreError> {
    let mut by_day = BTreeMap::new();
    for document in hierarchy.documents(container).await? {
        if let Some(day) = parse_day_document_name(&document.name) {
            by_day.entry(day).or_insert(document.id);
        }
    }
    Ok(by_day)
}
