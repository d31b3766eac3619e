//! Month generation: one day document per calendar day.

use daysheet_core::error::CoreError;
use daysheet_core::naming::{month_container_name, month_dates};
use serde::Serialize;

use crate::directory::{EmployeeDirectory, EmployeeRecord};
use crate::hierarchy::Hierarchy;
use crate::template::{instantiate, Instantiated};

/// What a generation run did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GenerationSummary {
    /// Day documents created.
    pub created: u32,
    /// Day documents that already existed.
    pub skipped: u32,
    /// Existing day documents whose missing layout was written back.
    pub repaired: u32,
    /// Employees left out entirely, e.g. for a placeholder folder reference.
    pub skipped_employees: Vec<String>,
    pub errors: Vec<String>,
}

impl GenerationSummary {
    fn merge(&mut self, other: GenerationSummary) {
        self.created += other.created;
        self.skipped += other.skipped;
        self.repaired += other.repaired;
        self.skipped_employees.extend(other.skipped_employees);
        self.errors.extend(other.errors);
    }
}

/// Make sure `container` holds a day document for every day of the month.
async fn fill_month(
    hierarchy: &Hierarchy,
    container: &str,
    year: i32,
    month: u32,
    label: &str,
) -> Result<GenerationSummary, CoreError> {
    let mut summary = GenerationSummary::default();
    for date in month_dates(year, month)? {
        match instantiate(hierarchy, container, date).await {
            Ok(Instantiated::Created(_)) => summary.created += 1,
            Ok(Instantiated::Existing(_)) => summary.skipped += 1,
            Ok(Instantiated::Repaired(_)) => summary.repaired += 1,
            Err(e) => {
                tracing::warn!(container_id = container, %date, error = %e, "Failed to create day document");
                summary.errors.push(format!("{label} - {date}: {e}"));
            }
        }
    }
    Ok(summary)
}

/// Ensure the month container and all its day documents for one employee,
/// creating the employee container if needed.
pub async fn generate_month(
    hierarchy: &Hierarchy,
    employee: &EmployeeRecord,
    year: i32,
    month: u32,
) -> Result<GenerationSummary, CoreError> {
    let folder = hierarchy.resolve_employee(employee).await?;
    let container = hierarchy
        .month_container(&folder, year, month, true)
        .await?
        .ok_or_else(|| CoreError::Internal("month container was not created".into()))?;
    let summary = fill_month(hierarchy, &container, year, month, &employee.id).await?;
    tracing::info!(
        employee_id = %employee.id,
        year,
        month,
        created = summary.created,
        skipped = summary.skipped,
        repaired = summary.repaired,
        errors = summary.errors.len(),
        "Generated month"
    );
    Ok(summary)
}

/// Generate a month for every directory employee.
///
/// Works from each employee's recorded folder reference; employees whose
/// reference is missing or a placeholder are reported and skipped. Never
/// aborts part-way.
pub async fn generate_month_for_all(
    hierarchy: &Hierarchy,
    directory: &dyn EmployeeDirectory,
    year: i32,
    month: u32,
) -> GenerationSummary {
    let mut summary = GenerationSummary::default();
    let month_name = match month_container_name(year, month) {
        Ok(name) => name,
        Err(e) => {
            summary.errors.push(e.to_string());
            return summary;
        }
    };
    let employees = match directory.list().await {
        Ok(employees) => employees,
        Err(e) => {
            summary.errors.push(format!("directory: {e}"));
            return summary;
        }
    };

    for employee in &employees {
        let Some(folder) = employee.folder_ref() else {
            summary
                .skipped_employees
                .push(format!("{} ({}): invalid folder reference", employee.name, employee.id));
            continue;
        };

        let container = match hierarchy.resolve_or_create(&month_name, Some(folder)).await {
            Ok(container) => container,
            Err(e) => {
                tracing::error!(employee_id = %employee.id, error = %e, "Failed to create month container");
                summary
                    .errors
                    .push(format!("{}: failed to create {month_name}: {e}", employee.id));
                continue;
            }
        };

        match fill_month(hierarchy, &container, year, month, &employee.id).await {
            Ok(part) => summary.merge(part),
            Err(e) => summary.errors.push(format!("{}: {e}", employee.id)),
        }
    }

    tracing::info!(
        %month_name,
        employees = employees.len(),
        created = summary.created,
        skipped = summary.skipped,
        repaired = summary.repaired,
        skipped_employees = summary.skipped_employees.len(),
        errors = summary.errors.len(),
        "Bulk month generation complete"
    );
    summary
}
