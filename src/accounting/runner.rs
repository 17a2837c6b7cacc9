//! Daily trigger loop for the accounting job.
//!
//! One scheduled background task fires the job shortly after 00:01 UTC each
//! day. Control messages allow a manual trigger and shutdown. Duplicate
//! same-day triggers are harmless: the job's own run guard skips them.

use std::sync::Arc;
use std::time::Duration;

use chrono::{Timelike, Utc};
use tokio::sync::mpsc;
use tracing::{error, info};

use super::job::AccountingJob;
use super::report::DaySnapshot;
use crate::ledger::Ledger;
use crate::telegram::Notifier;

/// Seconds past midnight UTC at which the daily run fires.
const RUN_OFFSET_SECS: u64 = 60;

/// Messages that can be sent to the runner.
#[derive(Debug, Clone)]
pub enum AccountingMessage {
    /// Trigger an immediate accounting run.
    TriggerRun,
    /// Stop the runner.
    Shutdown,
}

/// Daily accounting runner.
pub struct AccountingRunner {
    ledger: Ledger,
    notifier: Arc<dyn Notifier>,
}

impl AccountingRunner {
    /// Creates a new runner.
    #[must_use]
    pub fn new(ledger: Ledger, notifier: Arc<dyn Notifier>) -> Self {
        Self { ledger, notifier }
    }

    /// Runs the scheduling loop until shutdown.
    pub async fn run(&self, mut rx: mpsc::Receiver<AccountingMessage>) {
        info!("Daily accounting runner started");

        loop {
            let now = Utc::now();
            let wait = Duration::from_secs(secs_until_next_run(u64::from(
                now.time().num_seconds_from_midnight(),
            )));

            tokio::select! {
                () = tokio::time::sleep(wait) => {
                    self.tick().await;
                }
                msg = rx.recv() => {
                    match msg {
                        Some(AccountingMessage::TriggerRun) => {
                            info!("Manual accounting run requested");
                            self.tick().await;
                        }
                        Some(AccountingMessage::Shutdown) | None => {
                            info!("Accounting runner shutting down");
                            break;
                        }
                    }
                }
            }
        }
    }

    /// Single accounting run: capture the snapshot, run the job, log the report.
    async fn tick(&self) {
        let snapshot = match DaySnapshot::capture(&self.ledger).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                error!("Could not capture day snapshot: {}", e);
                return;
            }
        };

        info!(
            "Running daily subscription check for {} (admin_posted: {})",
            snapshot.today, snapshot.admin_posted
        );

        let job = AccountingJob::new(&self.ledger, self.notifier.as_ref());
        match job.run(snapshot).await {
            Ok(report) if report.already_ran => {
                info!("Accounting already ran on {}, nothing to do", snapshot.today);
            }
            Ok(report) => {
                info!(
                    processed = report.processed,
                    counted = report.counted,
                    deferred = report.deferred,
                    expired = report.expired,
                    reminders_sent = report.reminders_sent,
                    delivery_failures = report.delivery_failures,
                    record_errors = report.record_errors.len(),
                    "Daily subscription check completed"
                );
                for failure in &report.record_errors {
                    error!("Record failure ({:?}): {}", failure.subject, failure.message);
                }
            }
            Err(e) => error!("Daily subscription check failed: {}", e),
        }
    }
}

/// Seconds to sleep from the given time-of-day until the next run instant.
const fn secs_until_next_run(secs_since_midnight: u64) -> u64 {
    const DAY: u64 = 24 * 60 * 60;
    if secs_since_midnight < RUN_OFFSET_SECS {
        RUN_OFFSET_SECS - secs_since_midnight
    } else {
        DAY - secs_since_midnight + RUN_OFFSET_SECS
    }
}

impl std::fmt::Debug for AccountingRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountingRunner").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secs_until_next_run() {
        // At midnight, wait the full offset.
        assert_eq!(secs_until_next_run(0), 60);
        // Just before the run instant.
        assert_eq!(secs_until_next_run(59), 1);
        // At the run instant, schedule tomorrow's run.
        assert_eq!(secs_until_next_run(60), 24 * 60 * 60);
        // Mid-day.
        assert_eq!(secs_until_next_run(12 * 60 * 60), 12 * 60 * 60 + 60);
    }
}
