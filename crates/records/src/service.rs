//! Caller-facing operations over employees, dates and day documents.

use std::sync::Arc;

use chrono::{Datelike, NaiveDate};
use daysheet_core::error::CoreError;
use daysheet_core::naming::{day_document_name, month_container_name};
use daysheet_core::productivity::Productivity;
use daysheet_core::report::{
    assigned_tasks, ActivityFields, DailyReportSubmission, DayReport, TaskAssignment,
};
use daysheet_core::schema::{ActivityZone, CellRange};
use daysheet_core::types::ResourceId;
use daysheet_store::DocumentStore;

use crate::directory::{EmployeeDirectory, EmployeeRecord};
use crate::generate::{self, GenerationSummary};
use crate::hierarchy::Hierarchy;
use crate::productivity;
use crate::records::RecordRepo;
use crate::sync::{self, SyncSummary};

/// Entry point for everything a caller can do with the record store.
///
/// Built once at startup and shared. All store access goes through the
/// hierarchy's [`StoreHandle`](daysheet_store::StoreHandle), so swapping the
/// store after re-authentication needs no change here.
pub struct Workspace {
    hierarchy: Arc<Hierarchy>,
    directory: Arc<dyn EmployeeDirectory>,
}

impl Workspace {
    pub fn new(hierarchy: Arc<Hierarchy>, directory: Arc<dyn EmployeeDirectory>) -> Self {
        Self {
            hierarchy,
            directory,
        }
    }

    pub fn hierarchy(&self) -> &Arc<Hierarchy> {
        &self.hierarchy
    }

    pub fn directory(&self) -> &Arc<dyn EmployeeDirectory> {
        &self.directory
    }

    async fn employee(&self, employee_id: &str) -> Result<EmployeeRecord, CoreError> {
        Ok(self.directory.get(employee_id).await?)
    }

    /// The existing day document for `employee` on `date`.
    async fn day_document(&self, employee: &EmployeeRecord, date: NaiveDate) -> Result<ResourceId, CoreError> {
        let folder = self
            .hierarchy
            .find_employee(employee)
            .await?
            .ok_or_else(|| CoreError::NotFound {
                entity: "employee container",
                name: employee.id.clone(),
            })?;
        let month_name = month_container_name(date.year(), date.month())?;
        let month = self
            .hierarchy
            .find(&month_name, Some(folder.as_str()))
            .await?
            .ok_or(CoreError::NotFound {
                entity: "month container",
                name: month_name,
            })?;
        let day_name = day_document_name(date.day());
        self.hierarchy
            .find_document(&month, &day_name)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "day document",
                name: day_name,
            })
    }

    /// Resolve or create the employee's container and record it in the
    /// directory.
    pub async fn create_employee_workspace(&self, employee_id: &str) -> Result<ResourceId, CoreError> {
        let employee = self.employee(employee_id).await?;
        let folder = self.hierarchy.resolve_employee(&employee).await?;
        if employee.folder_id.as_deref() != Some(folder.as_str()) {
            self.directory
                .set_folder(employee_id, Some(folder.clone()))
                .await?;
        }
        tracing::info!(employee_id, container_id = %folder, "Employee workspace ready");
        Ok(folder)
    }

    /// Append task rows to the employee's day document and notify them.
    pub async fn assign_tasks(
        &self,
        employee_id: &str,
        date: NaiveDate,
        rows: &[TaskAssignment],
    ) -> Result<CellRange, CoreError> {
        let employee = self.employee(employee_id).await?;
        let document = self.day_document(&employee, date).await?;
        let range = RecordRepo::write_task_assignment(self.hierarchy.store(), &document, rows).await?;

        let message = format!("{} new task(s) assigned for {date}", rows.len());
        if let Err(e) = self.directory.notify(employee_id, &message).await {
            tracing::warn!(employee_id, error = %e, "Failed to record task notification");
        }
        Ok(range)
    }

    /// Write a submitted daily report.
    ///
    /// The whole submission is validated before the first write: mentor rows
    /// require mentor capability, office rows follow the `"Others"` rule, and
    /// break slots only accept the placeholder the form fills in (which is
    /// then skipped).
    pub async fn submit_daily_report(
        &self,
        employee_id: &str,
        date: NaiveDate,
        report: &DailyReportSubmission,
    ) -> Result<(), CoreError> {
        let employee = self.employee(employee_id).await?;
        if !report.mentor.is_empty() && !employee.is_mentor {
            return Err(CoreError::Forbidden(format!(
                "Employee '{employee_id}' cannot write mentor activity"
            )));
        }

        let mut writes = Vec::new();
        for row in &report.office {
            let zone = ActivityZone::Office;
            zone.slot_range(row.slot)?;
            if zone.is_break_slot(row.slot) {
                if row.fields.is_empty() || row.fields.is_placeholder() {
                    continue;
                }
                return Err(CoreError::Validation(format!(
                    "Slot {} is a break and cannot be edited",
                    row.slot
                )));
            }
            let entry = row.fields.clone().resolved()?;
            writes.push((zone, row.slot, ActivityFields::Office(entry)));
        }
        for row in &report.mentor {
            ActivityZone::Mentor.slot_range(row.slot)?;
            writes.push((ActivityZone::Mentor, row.slot, ActivityFields::Mentor(row.fields.clone())));
        }

        let document = self.day_document(&employee, date).await?;
        let store = self.hierarchy.store();
        if report.in_time.is_some() || report.out_time.is_some() {
            RecordRepo::write_header(store, &document, report.in_time.as_deref(), report.out_time.as_deref())
                .await?;
        }
        for (zone, slot, fields) in &writes {
            RecordRepo::write_activity_row(store, &document, *zone, *slot, fields).await?;
        }
        tracing::info!(employee_id, %date, rows = writes.len(), "Daily report submitted");
        Ok(())
    }

    pub async fn get_report(&self, employee_id: &str, date: NaiveDate) -> Result<DayReport, CoreError> {
        let employee = self.employee(employee_id).await?;
        let document = self.day_document(&employee, date).await?;
        RecordRepo::read_report(self.hierarchy.store(), &document).await
    }

    /// Assigned tasks for the day, blank and header-like rows removed.
    pub async fn get_assigned_tasks(
        &self,
        employee_id: &str,
        date: NaiveDate,
    ) -> Result<Vec<TaskAssignment>, CoreError> {
        let employee = self.employee(employee_id).await?;
        let document = self.day_document(&employee, date).await?;
        let rows = RecordRepo::read_task_assignment(self.hierarchy.store(), &document).await?;
        Ok(assigned_tasks(rows))
    }

    pub async fn get_monthly_productivity(
        &self,
        employee_id: &str,
        year: i32,
        month: u32,
    ) -> Result<Productivity, CoreError> {
        let employee = self.employee(employee_id).await?;
        productivity::compute(&self.hierarchy, &employee, year, month).await
    }

    pub async fn generate_month(
        &self,
        employee_id: &str,
        year: i32,
        month: u32,
    ) -> Result<GenerationSummary, CoreError> {
        let employee = self.employee(employee_id).await?;
        generate::generate_month(&self.hierarchy, &employee, year, month).await
    }

    pub async fn generate_month_for_all(&self, year: i32, month: u32) -> GenerationSummary {
        generate::generate_month_for_all(&self.hierarchy, self.directory.as_ref(), year, month).await
    }

    pub async fn sync_containers(&self) -> SyncSummary {
        sync::sync(&self.hierarchy, self.directory.as_ref()).await
    }

    /// The day document exported as CSV.
    pub async fn export_report(&self, employee_id: &str, date: NaiveDate) -> Result<Vec<u8>, CoreError> {
        let employee = self.employee(employee_id).await?;
        let document = self.day_document(&employee, date).await?;
        Ok(self.hierarchy.store().download(&document).await?)
    }

    /// Move the employee's container to the trash and clear their folder
    /// reference. Returns the trashed container id.
    pub async fn archive_employee_workspace(&self, employee_id: &str) -> Result<ResourceId, CoreError> {
        let employee = self.employee(employee_id).await?;
        let folder = self
            .hierarchy
            .find_employee(&employee)
            .await?
            .ok_or_else(|| CoreError::NotFound {
                entity: "employee container",
                name: employee_id.to_string(),
            })?;
        self.hierarchy.store().trash(&folder).await?;
        self.directory.set_folder(employee_id, None).await?;
        tracing::info!(employee_id, container_id = %folder, "Archived employee workspace");
        Ok(folder)
    }
}
