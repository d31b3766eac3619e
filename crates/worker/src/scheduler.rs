//! Firing scheduler.
//!
//! [`FiringScheduler`] is the single background task that drives the daily
//! firings. It works out which firing is due next, sleeps until then, runs
//! it to completion and only then looks for the next one, so no firing ever
//! overlaps another. The next firing is taken after the previous one's
//! scheduled time, so a firing that overruns delays its successor instead
//! of skipping it.

use std::time::Duration;

use chrono::{Local, NaiveDateTime, NaiveTime};
use daysheet_records::{DailyFirings, Firing};
use tokio_util::sync::CancellationToken;

/// The earliest firing time strictly after `now`, with every firing due at
/// that moment. Lock comes before aggregate when both share a time.
pub fn next_firings(
    now: NaiveDateTime,
    lock_at: NaiveTime,
    aggregate_at: NaiveTime,
) -> (NaiveDateTime, Vec<Firing>) {
    let upcoming = |at: NaiveTime| {
        let today = now.date().and_time(at);
        if today > now {
            today
        } else {
            today + chrono::Duration::days(1)
        }
    };
    let lock = upcoming(lock_at);
    let aggregate = upcoming(aggregate_at);

    let at = lock.min(aggregate);
    let mut due = Vec::with_capacity(2);
    if lock == at {
        due.push(Firing::Lock);
    }
    if aggregate == at {
        due.push(Firing::Aggregate);
    }
    (at, due)
}

/// Walks the firing times in order, one moment at a time.
#[derive(Debug, Clone)]
pub struct FiringSchedule {
    lock_at: NaiveTime,
    aggregate_at: NaiveTime,
    last: NaiveDateTime,
}

impl FiringSchedule {
    /// A schedule whose first firing comes strictly after `start`.
    pub fn starting_at(start: NaiveDateTime, lock_at: NaiveTime, aggregate_at: NaiveTime) -> Self {
        Self {
            lock_at,
            aggregate_at,
            last: start,
        }
    }

    /// The firings due after the previous moment returned, however late the
    /// caller is in asking.
    pub fn advance(&mut self) -> (NaiveDateTime, Vec<Firing>) {
        let (at, due) = next_firings(self.last, self.lock_at, self.aggregate_at);
        self.last = at;
        (at, due)
    }
}

// ---------------------------------------------------------------------------
// FiringScheduler
// ---------------------------------------------------------------------------

pub struct FiringScheduler {
    firings: DailyFirings,
    lock_at: NaiveTime,
    aggregate_at: NaiveTime,
}

impl FiringScheduler {
    pub fn new(firings: DailyFirings, lock_at: NaiveTime, aggregate_at: NaiveTime) -> Self {
        Self {
            firings,
            lock_at,
            aggregate_at,
        }
    }

    /// Run until `cancel` fires.
    ///
    /// Cancellation is only observed while waiting; a firing that has
    /// started always runs to completion.
    pub async fn run(&self, cancel: CancellationToken) {
        tracing::info!(lock_at = %self.lock_at, aggregate_at = %self.aggregate_at, "Firing scheduler started");
        let mut schedule = FiringSchedule::starting_at(Local::now().naive_local(), self.lock_at, self.aggregate_at);
        loop {
            let (at, due) = schedule.advance();
            let now = Local::now().naive_local();
            let wait = (at - now).to_std().unwrap_or(Duration::ZERO);
            if wait.is_zero() {
                tracing::warn!(next = %at, ?due, "Previous firing overran; running the next one late");
            }
            tracing::debug!(next = %at, ?due, wait_secs = wait.as_secs(), "Waiting for next firing");

            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Firing scheduler cancelled");
                    break;
                }
                _ = tokio::time::sleep(wait) => {
                    for firing in due {
                        let report = self.firings.run(firing, at.date()).await;
                        if !report.errors.is_empty() {
                            tracing::warn!(
                                %firing,
                                errors = report.errors.len(),
                                first = %report.errors[0],
                                "Firing finished with errors"
                            );
                        }
                    }
                }
            }
        }
    }
}
