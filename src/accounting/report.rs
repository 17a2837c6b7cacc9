//! Typed per-run results for the daily accounting job.

use chrono::NaiveDate;

/// Immutable per-run snapshot of the facts the job decides on.
///
/// Read once at the start of a run; a post arriving mid-run is not seen by
/// that run at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DaySnapshot {
    /// The UTC calendar date being accounted for.
    pub today: NaiveDate,

    /// Whether the admin posted in the channel on that date.
    pub admin_posted: bool,
}

/// Which record a per-record failure refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Subject {
    Managed(i64),
    Offline(i64),
}

/// A captured per-record failure. Processing continues past these.
#[derive(Debug, Clone)]
pub struct RecordError {
    pub subject: Subject,
    pub message: String,
}

/// Aggregated outcome of one daily run.
#[derive(Debug, Default)]
pub struct DailyReport {
    /// True when the run was skipped because the job already ran today.
    pub already_ran: bool,

    /// Non-lifetime records examined.
    pub processed: usize,

    /// Records whose remaining-days counter was decremented.
    pub counted: usize,

    /// Records that had today appended to their no-post log instead.
    pub deferred: usize,

    /// Managed subscribers that reached zero and were deactivated.
    pub expired: usize,

    /// Reminder messages delivered.
    pub reminders_sent: usize,

    /// Reminder or expiry messages that could not be delivered.
    pub delivery_failures: usize,

    /// Per-record persistence failures.
    pub record_errors: Vec<RecordError>,
}

impl DailyReport {
    /// A report for a run skipped by the same-day guard.
    #[must_use]
    pub fn skipped() -> Self {
        Self {
            already_ran: true,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skipped_report() {
        let report = DailyReport::skipped();
        assert!(report.already_ran);
        assert_eq!(report.processed, 0);
        assert!(report.record_errors.is_empty());
    }
}
