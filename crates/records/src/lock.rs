//! The two daily firings: lock and aggregate.
//!
//! A day document is `OPEN` until the lock firing protects it, after which
//! it is `LOCKED` for good. The lock firing first writes an absence marker
//! into any office zone that holds no real entry. The aggregate firing only
//! reads. Both walk every directory employee, collect per-employee failures
//! into a [`FiringReport`], and never stop early.

use std::fmt;
use std::sync::Arc;

use chrono::{Datelike, NaiveDate};
use daysheet_core::attendance::{needs_absent_marker, DailyStats};
use daysheet_core::error::CoreError;
use daysheet_core::naming::day_document_name;
use daysheet_core::report::{ActivityFields, OfficeEntry};
use daysheet_core::schema::ActivityZone;
use daysheet_core::types::ResourceId;
use daysheet_events::bus::{DaysheetEvent, EventBus, DAY_STATS, FIRING_AGGREGATE, FIRING_LOCK};
use serde::Serialize;

use crate::directory::{EmployeeDirectory, EmployeeRecord};
use crate::hierarchy::Hierarchy;
use crate::records::RecordRepo;

/// Office slot that receives the absence marker.
pub const ABSENT_MARKER_SLOT: usize = 0;

/// Which daily job to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Firing {
    Lock,
    Aggregate,
}

impl Firing {
    pub fn event_type(self) -> &'static str {
        match self {
            Self::Lock => FIRING_LOCK,
            Self::Aggregate => FIRING_AGGREGATE,
        }
    }
}

impl fmt::Display for Firing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Lock => f.write_str("lock"),
            Self::Aggregate => f.write_str("aggregate"),
        }
    }
}

/// Outcome of one firing over the whole directory.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FiringReport {
    pub firing: Firing,
    pub date: NaiveDate,
    /// Day documents the firing acted on.
    pub processed: u32,
    /// Documents newly locked.
    pub locked: u32,
    /// Documents that received the absence marker.
    pub absent_marked: u32,
    /// Documents that were already locked before this firing.
    pub already_locked: u32,
    /// Employees with nothing to act on, and why.
    pub skipped: Vec<String>,
    pub errors: Vec<String>,
}

impl FiringReport {
    pub fn new(firing: Firing, date: NaiveDate) -> Self {
        Self {
            firing,
            date,
            processed: 0,
            locked: 0,
            absent_marked: 0,
            already_locked: 0,
            skipped: Vec::new(),
            errors: Vec::new(),
        }
    }
}

enum LockOutcome {
    Locked { absent_marked: bool },
    AlreadyLocked,
}

/// Runs the daily firings against every directory employee.
pub struct DailyFirings {
    hierarchy: Arc<Hierarchy>,
    directory: Arc<dyn EmployeeDirectory>,
    events: Arc<EventBus>,
}

impl DailyFirings {
    pub fn new(
        hierarchy: Arc<Hierarchy>,
        directory: Arc<dyn EmployeeDirectory>,
        events: Arc<EventBus>,
    ) -> Self {
        Self {
            hierarchy,
            directory,
            events,
        }
    }

    /// Run one firing for `date` to completion and publish its report.
    pub async fn run(&self, firing: Firing, date: NaiveDate) -> FiringReport {
        let mut report = FiringReport::new(firing, date);

        let employees = match self.directory.list().await {
            Ok(employees) => employees,
            Err(e) => {
                tracing::error!(error = %e, %firing, "Failed to list employees");
                report.errors.push(format!("directory: {e}"));
                self.publish(&report);
                return report;
            }
        };

        for employee in &employees {
            let document = match self.locate(employee, date).await {
                Ok(Some(document)) => document,
                Ok(None) => {
                    report
                        .skipped
                        .push(format!("{}: no day document for {date}", employee.id));
                    continue;
                }
                Err(e) => {
                    tracing::error!(employee_id = %employee.id, error = %e, %firing, "Failed to resolve day document");
                    report.errors.push(format!("{}: {e}", employee.id));
                    continue;
                }
            };

            let outcome = match firing {
                Firing::Lock => self.lock_one(&document, &mut report).await,
                Firing::Aggregate => self.aggregate_one(employee, &document).await,
            };
            match outcome {
                Ok(()) => report.processed += 1,
                Err(e) => {
                    tracing::error!(
                        employee_id = %employee.id,
                        document_id = %document,
                        error = %e,
                        %firing,
                        "Firing failed for employee"
                    );
                    report.errors.push(format!("{}: {e}", employee.id));
                }
            }
        }

        tracing::info!(
            %firing,
            %date,
            processed = report.processed,
            locked = report.locked,
            absent_marked = report.absent_marked,
            skipped = report.skipped.len(),
            errors = report.errors.len(),
            "Firing complete"
        );
        self.publish(&report);
        report
    }

    /// Today's day document for `employee`, if the hierarchy has one.
    async fn locate(&self, employee: &EmployeeRecord, date: NaiveDate) -> Result<Option<ResourceId>, CoreError> {
        let Some(folder) = self.hierarchy.find_employee(employee).await? else {
            return Ok(None);
        };
        let Some(month) = self
            .hierarchy
            .month_container(&folder, date.year(), date.month(), false)
            .await?
        else {
            return Ok(None);
        };
        self.hierarchy
            .find_document(&month, &day_document_name(date.day()))
            .await
    }

    async fn lock_one(&self, document: &str, report: &mut FiringReport) -> Result<(), CoreError> {
        match self.lock_document(document).await? {
            LockOutcome::Locked { absent_marked } => {
                report.locked += 1;
                if absent_marked {
                    report.absent_marked += 1;
                }
            }
            LockOutcome::AlreadyLocked => report.already_locked += 1,
        }
        Ok(())
    }

    async fn lock_document(&self, document: &str) -> Result<LockOutcome, CoreError> {
        let store = self.hierarchy.store();
        if RecordRepo::is_locked(store, document).await? {
            return Ok(LockOutcome::AlreadyLocked);
        }
        let day = RecordRepo::read_report(store, document).await?;

        let mut absent_marked = false;
        if needs_absent_marker(&day) {
            let marker = ActivityFields::Office(OfficeEntry::absent());
            match RecordRepo::write_activity_row(store, document, ActivityZone::Office, ABSENT_MARKER_SLOT, &marker)
                .await
            {
                Ok(()) => absent_marked = true,
                Err(CoreError::Locked(_)) => return Ok(LockOutcome::AlreadyLocked),
                Err(e) => return Err(e),
            }
        }

        RecordRepo::lock(store, document).await?;
        Ok(LockOutcome::Locked { absent_marked })
    }

    async fn aggregate_one(&self, employee: &EmployeeRecord, document: &str) -> Result<(), CoreError> {
        let day = RecordRepo::read_report(self.hierarchy.store(), document).await?;
        let stats = DailyStats::from_report(&day);
        tracing::info!(
            employee_id = %employee.id,
            document_id = document,
            logged_slots = stats.logged_slots,
            mentor_slots = stats.mentor_slots,
            absent = stats.absent,
            "Day statistics"
        );
        let payload = serde_json::to_value(&stats).map_err(|e| CoreError::Internal(e.to_string()))?;
        self.events.publish(
            DaysheetEvent::new(DAY_STATS)
                .with_employee(employee.id.clone())
                .with_document(document)
                .with_payload(payload),
        );
        Ok(())
    }

    fn publish(&self, report: &FiringReport) {
        match serde_json::to_value(report) {
            Ok(payload) => self
                .events
                .publish(DaysheetEvent::new(report.firing.event_type()).with_payload(payload)),
            Err(e) => tracing::error!(error = %e, "Failed to serialize firing report"),
        }
    }
}
