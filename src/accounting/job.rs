//! The daily subscription accounting job.
//!
//! Once per UTC calendar day, decides for every non-lifetime record whether
//! the day counts against its plan:
//! 1. Read one `DaySnapshot` (today + whether the admin posted today).
//! 2. If the admin posted: decrement, floored at 0. A new value of 1..=3
//!    sends the subscriber a reminder; 0 deactivates the record and alerts
//!    the admin with an extend affordance.
//! 3. If the admin did not post: record today as a no-post day instead, at
//!    most once per date. No plan time is consumed.
//! 4. Lifetime records are never touched.
//!
//! Offline records follow the identical decrement-or-defer rule but are never
//! messaged and never escalate to the admin.
//!
//! The job refuses to run twice for the same date: a `last_run_date` marker is
//! checked and persisted before any record is touched, so a duplicate trigger
//! cannot double-decrement.

use chrono::Utc;
use tracing::{debug, warn};

use super::report::{DailyReport, DaySnapshot, RecordError, Subject};
use crate::ledger::{Ledger, LedgerError, ManagedSubscriber, OfflineRecord};
use crate::telegram::Notifier;

impl DaySnapshot {
    /// Captures today's snapshot from the ledger.
    ///
    /// # Errors
    ///
    /// Returns an error if the admin-activity row cannot be read.
    pub async fn capture(ledger: &Ledger) -> Result<Self, LedgerError> {
        let today = Utc::now().date_naive();
        let admin_posted = ledger.last_post_date().await? == Some(today);
        Ok(Self {
            today,
            admin_posted,
        })
    }
}

/// The daily accounting job over one ledger and one notifier.
pub struct AccountingJob<'a> {
    ledger: &'a Ledger,
    notifier: &'a dyn Notifier,
}

impl<'a> AccountingJob<'a> {
    /// Creates a new job.
    #[must_use]
    pub fn new(ledger: &'a Ledger, notifier: &'a dyn Notifier) -> Self {
        Self { ledger, notifier }
    }

    /// Runs the job for the given snapshot.
    ///
    /// Per-record failures are captured in the report and do not interrupt
    /// processing of subsequent records.
    ///
    /// # Errors
    ///
    /// Returns an error only if the ledger cannot be listed or the run guard
    /// cannot be persisted.
    pub async fn run(&self, snapshot: DaySnapshot) -> Result<DailyReport, LedgerError> {
        if self.ledger.last_run_date().await? == Some(snapshot.today) {
            debug!("Accounting already ran on {}, skipping", snapshot.today);
            return Ok(DailyReport::skipped());
        }
        self.ledger.set_last_run_date(snapshot.today).await?;

        let mut report = DailyReport::default();

        for subscriber in self.ledger.list_managed(true).await? {
            if subscriber.is_lifetime() {
                continue;
            }
            report.processed += 1;
            if let Err(e) = self.process_managed(&subscriber, snapshot, &mut report).await {
                warn!("Failed to process subscriber {}: {}", subscriber.user_id, e);
                report.record_errors.push(RecordError {
                    subject: Subject::Managed(subscriber.user_id),
                    message: e.to_string(),
                });
            }
        }

        for record in self.ledger.list_offline().await? {
            if record.is_lifetime() {
                continue;
            }
            report.processed += 1;
            if let Err(e) = self.process_offline(&record, snapshot, &mut report).await {
                warn!("Failed to process offline record {}: {}", record.id, e);
                report.record_errors.push(RecordError {
                    subject: Subject::Offline(record.id),
                    message: e.to_string(),
                });
            }
        }

        Ok(report)
    }

    async fn process_managed(
        &self,
        subscriber: &ManagedSubscriber,
        snapshot: DaySnapshot,
        report: &mut DailyReport,
    ) -> Result<(), LedgerError> {
        if !snapshot.admin_posted {
            self.ledger
                .append_no_post_day(subscriber.user_id, snapshot.today)
                .await?;
            report.deferred += 1;
            return Ok(());
        }

        let remaining = (subscriber.remaining_days - 1).max(0);
        self.ledger
            .set_remaining_days(subscriber.user_id, remaining)
            .await?;
        report.counted += 1;

        if (1..=3).contains(&remaining) {
            match self
                .notifier
                .remind_subscriber(subscriber.user_id, remaining)
                .await
            {
                Ok(()) => report.reminders_sent += 1,
                Err(e) => {
                    warn!("Could not send reminder to {}: {}", subscriber.user_id, e);
                    report.delivery_failures += 1;
                }
            }
        }

        if remaining == 0 {
            self.ledger.set_active(subscriber.user_id, false).await?;
            report.expired += 1;

            if let Err(e) = self.notifier.notify_expiry(subscriber).await {
                warn!(
                    "Could not notify admin about expiry of {}: {}",
                    subscriber.user_id, e
                );
                report.delivery_failures += 1;
            }
        }

        Ok(())
    }

    async fn process_offline(
        &self,
        record: &OfflineRecord,
        snapshot: DaySnapshot,
        report: &mut DailyReport,
    ) -> Result<(), LedgerError> {
        if snapshot.admin_posted {
            let remaining = (record.remaining_days - 1).max(0);
            self.ledger
                .set_offline_remaining_days(record.id, remaining)
                .await?;
            report.counted += 1;
        } else {
            self.ledger
                .append_offline_no_post_day(record.id, snapshot.today)
                .await?;
            report.deferred += 1;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use tokio::sync::Mutex;

    use super::*;
    use crate::telegram::ChannelError;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn snapshot(day: &str, admin_posted: bool) -> DaySnapshot {
        DaySnapshot {
            today: date(day),
            admin_posted,
        }
    }

    /// Records every notification; can be told to fail for one recipient.
    #[derive(Default)]
    struct RecordingNotifier {
        reminders: Mutex<Vec<(i64, i64)>>,
        expiries: Mutex<Vec<i64>>,
        unreachable_user: Option<i64>,
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn remind_subscriber(
            &self,
            user_id: i64,
            days_left: i64,
        ) -> Result<(), ChannelError> {
            if self.unreachable_user == Some(user_id) {
                return Err(ChannelError::Unreachable);
            }
            self.reminders.lock().await.push((user_id, days_left));
            Ok(())
        }

        async fn notify_expiry(
            &self,
            subscriber: &ManagedSubscriber,
        ) -> Result<(), ChannelError> {
            self.expiries.lock().await.push(subscriber.user_id);
            Ok(())
        }
    }

    async fn ledger_with(subs: &[(i64, i64, i64)]) -> Ledger {
        // (user_id, plan_days, remaining_days)
        let ledger = Ledger::open_in_memory().await.unwrap();
        for &(user_id, plan_days, remaining_days) in subs {
            let mut sub = ManagedSubscriber::new(
                user_id,
                format!("User {user_id}"),
                None,
                plan_days,
                date("2024-01-01"),
                String::new(),
            );
            sub.remaining_days = remaining_days;
            ledger.upsert_managed(&sub).await.unwrap();
        }
        ledger
    }

    #[tokio::test]
    async fn test_posted_day_decrements_and_reminds() {
        let ledger = ledger_with(&[(1, 7, 2)]).await;
        let notifier = RecordingNotifier::default();

        let report = AccountingJob::new(&ledger, &notifier)
            .run(snapshot("2024-01-05", true))
            .await
            .unwrap();

        let sub = ledger.managed(1).await.unwrap().unwrap();
        assert_eq!(sub.remaining_days, 1);
        assert!(sub.is_active);
        assert!(sub.no_post_days.is_empty());
        assert_eq!(*notifier.reminders.lock().await, vec![(1, 1)]);
        assert_eq!(report.counted, 1);
        assert_eq!(report.reminders_sent, 1);
        assert_eq!(report.expired, 0);
    }

    #[tokio::test]
    async fn test_no_post_day_defers_and_logs_date() {
        let ledger = ledger_with(&[(1, 7, 2)]).await;
        let notifier = RecordingNotifier::default();

        let report = AccountingJob::new(&ledger, &notifier)
            .run(snapshot("2024-01-05", false))
            .await
            .unwrap();

        let sub = ledger.managed(1).await.unwrap().unwrap();
        assert_eq!(sub.remaining_days, 2);
        assert_eq!(sub.no_post_days, vec![date("2024-01-05")]);
        assert!(notifier.reminders.lock().await.is_empty());
        assert_eq!(report.deferred, 1);
        assert_eq!(report.counted, 0);
    }

    #[tokio::test]
    async fn test_same_day_rerun_is_a_no_op() {
        let ledger = ledger_with(&[(1, 7, 5)]).await;
        let notifier = RecordingNotifier::default();
        let job = AccountingJob::new(&ledger, &notifier);

        let first = job.run(snapshot("2024-01-05", true)).await.unwrap();
        assert!(!first.already_ran);

        let second = job.run(snapshot("2024-01-05", true)).await.unwrap();
        assert!(second.already_ran);

        // No double decrement.
        let sub = ledger.managed(1).await.unwrap().unwrap();
        assert_eq!(sub.remaining_days, 4);
    }

    #[tokio::test]
    async fn test_lifetime_records_are_invariant() {
        let ledger = ledger_with(&[(1, -1, -1)]).await;
        let offline = OfflineRecord::new("Zed".to_owned(), -1, date("2024-01-01"), String::new());
        let offline_id = ledger.insert_offline(&offline).await.unwrap();
        let notifier = RecordingNotifier::default();
        let job = AccountingJob::new(&ledger, &notifier);

        job.run(snapshot("2024-01-05", true)).await.unwrap();
        job.run(snapshot("2024-01-06", false)).await.unwrap();

        let sub = ledger.managed(1).await.unwrap().unwrap();
        assert_eq!(sub.remaining_days, -1);
        assert!(sub.no_post_days.is_empty());

        let rec = ledger.offline(offline_id).await.unwrap().unwrap();
        assert_eq!(rec.remaining_days, -1);
        assert!(rec.no_post_days.is_empty());
        assert!(notifier.reminders.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_expiry_fires_once_and_deactivates() {
        let ledger = ledger_with(&[(1, 7, 1)]).await;
        let notifier = RecordingNotifier::default();
        let job = AccountingJob::new(&ledger, &notifier);

        let report = job.run(snapshot("2024-01-05", true)).await.unwrap();

        let sub = ledger.managed(1).await.unwrap().unwrap();
        assert_eq!(sub.remaining_days, 0);
        assert!(!sub.is_active);
        assert_eq!(*notifier.expiries.lock().await, vec![1]);
        assert_eq!(report.expired, 1);

        // Deactivated records are not revisited the next day.
        let next = job.run(snapshot("2024-01-06", true)).await.unwrap();
        assert_eq!(next.processed, 0);
        assert_eq!(notifier.expiries.lock().await.len(), 1);
    }

    #[tokio::test]
    async fn test_offline_records_follow_decrement_law_silently() {
        let ledger = Ledger::open_in_memory().await.unwrap();
        let mut record =
            OfflineRecord::new("John".to_owned(), 7, date("2024-01-01"), String::new());
        record.remaining_days = 1;
        let id = ledger.insert_offline(&record).await.unwrap();
        let notifier = RecordingNotifier::default();
        let job = AccountingJob::new(&ledger, &notifier);

        job.run(snapshot("2024-01-05", true)).await.unwrap();
        let rec = ledger.offline(id).await.unwrap().unwrap();
        assert_eq!(rec.remaining_days, 0);

        // Stays at the floor, keeps being examined, never messages anyone.
        let report = job.run(snapshot("2024-01-06", true)).await.unwrap();
        let rec = ledger.offline(id).await.unwrap().unwrap();
        assert_eq!(rec.remaining_days, 0);
        assert_eq!(report.counted, 1);
        assert!(notifier.reminders.lock().await.is_empty());
        assert!(notifier.expiries.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_delivery_failure_does_not_block_other_records() {
        let ledger = ledger_with(&[(1, 7, 3), (2, 7, 3)]).await;
        let notifier = RecordingNotifier {
            unreachable_user: Some(1),
            ..RecordingNotifier::default()
        };

        let report = AccountingJob::new(&ledger, &notifier)
            .run(snapshot("2024-01-05", true))
            .await
            .unwrap();

        assert_eq!(report.counted, 2);
        assert_eq!(report.delivery_failures, 1);
        assert_eq!(report.reminders_sent, 1);
        assert_eq!(*notifier.reminders.lock().await, vec![(2, 2)]);
        assert!(report.record_errors.is_empty());

        // Both records still decremented.
        assert_eq!(ledger.managed(1).await.unwrap().unwrap().remaining_days, 2);
        assert_eq!(ledger.managed(2).await.unwrap().unwrap().remaining_days, 2);
    }

    #[tokio::test]
    async fn test_decrement_floors_at_zero() {
        let ledger = ledger_with(&[(1, 7, 0)]).await;
        let notifier = RecordingNotifier::default();

        AccountingJob::new(&ledger, &notifier)
            .run(snapshot("2024-01-05", true))
            .await
            .unwrap();

        let sub = ledger.managed(1).await.unwrap().unwrap();
        assert_eq!(sub.remaining_days, 0);
        assert!(!sub.is_active);
    }
}
