//! SQLite-backed subscription ledger.
//!
//! Owns all read/write access to subscriber state. Every operation is atomic at
//! per-record granularity; the daily job processes one record at a time and
//! never needs a cross-record transaction.

use std::path::Path;

use chrono::NaiveDate;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use thiserror::Error;
use tracing::info;

use super::records::{is_valid_plan, ManagedSubscriber, OfflineRecord};

/// Errors that can occur during ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Corrupt no-post-day list: {0}")]
    CorruptDayList(#[from] serde_json::Error),

    #[error("Plan length out of range: {0} (must be -1 or 1..=36500)")]
    InvalidPlan(i64),

    #[error("Record not found: {0}")]
    NotFound(i64),
}

/// Aggregate counts for the dashboard stats view.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LedgerStats {
    pub managed_active: i64,
    pub offline_total: i64,
    pub managed_lifetime: i64,
    pub offline_lifetime: i64,
    pub expiring_managed: i64,
    pub expiring_offline: i64,
}

impl LedgerStats {
    #[must_use]
    pub const fn total_active(&self) -> i64 {
        self.managed_active + self.offline_total
    }

    #[must_use]
    pub const fn total_lifetime(&self) -> i64 {
        self.managed_lifetime + self.offline_lifetime
    }

    #[must_use]
    pub const fn total_expiring(&self) -> i64 {
        self.expiring_managed + self.expiring_offline
    }
}

/// A single row of the combined user directory (for the paginated list view).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectoryEntry {
    Managed { user_id: i64, name: String },
    Offline { id: i64, identifier: String },
}

/// The subscription ledger.
#[derive(Debug, Clone)]
pub struct Ledger {
    pool: SqlitePool,
}

impl Ledger {
    /// Opens (creating if missing) the ledger database at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or initialized.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, LedgerError> {
        let options = SqliteConnectOptions::new()
            .filename(path.as_ref())
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        let ledger = Self { pool };
        ledger.init_schema().await?;
        info!("Ledger database ready at {}", path.as_ref().display());
        Ok(ledger)
    }

    /// Opens an in-memory ledger (used by tests).
    ///
    /// # Errors
    ///
    /// Returns an error if initialization fails.
    pub async fn open_in_memory() -> Result<Self, LedgerError> {
        let options = SqliteConnectOptions::new().in_memory(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        let ledger = Self { pool };
        ledger.init_schema().await?;
        Ok(ledger)
    }

    async fn init_schema(&self) -> Result<(), LedgerError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS subscribers (
                user_id INTEGER PRIMARY KEY,
                display_name TEXT NOT NULL,
                username TEXT,
                plan_days INTEGER NOT NULL,
                remaining_days INTEGER NOT NULL,
                start_date TEXT NOT NULL,
                payment_info TEXT NOT NULL DEFAULT '',
                is_active INTEGER NOT NULL DEFAULT 1,
                no_post_days TEXT NOT NULL DEFAULT '[]'
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS offline_subscribers (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                identifier TEXT NOT NULL,
                plan_days INTEGER NOT NULL,
                remaining_days INTEGER NOT NULL,
                start_date TEXT NOT NULL,
                payment_info TEXT NOT NULL DEFAULT '',
                no_post_days TEXT NOT NULL DEFAULT '[]'
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS admin_activity (
                id INTEGER PRIMARY KEY,
                last_post_date TEXT,
                last_run_date TEXT
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "INSERT OR IGNORE INTO admin_activity (id, last_post_date, last_run_date)
             VALUES (1, NULL, NULL)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    // --- Managed subscribers ---

    /// Looks up a managed subscriber by user id.
    pub async fn managed(&self, user_id: i64) -> Result<Option<ManagedSubscriber>, LedgerError> {
        let row = sqlx::query("SELECT * FROM subscribers WHERE user_id = ?")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|r| managed_from_row(&r)).transpose()
    }

    /// Lists managed subscribers, optionally only active ones, ordered by name.
    pub async fn list_managed(
        &self,
        active_only: bool,
    ) -> Result<Vec<ManagedSubscriber>, LedgerError> {
        let query = if active_only {
            "SELECT * FROM subscribers WHERE is_active = 1 ORDER BY display_name"
        } else {
            "SELECT * FROM subscribers ORDER BY display_name"
        };

        let rows = sqlx::query(query).fetch_all(&self.pool).await?;
        rows.iter().map(managed_from_row).collect()
    }

    /// Inserts or replaces a managed subscriber record.
    ///
    /// # Errors
    ///
    /// Rejects records whose plan length is outside `{-1} ∪ [1, 36500]`.
    pub async fn upsert_managed(&self, record: &ManagedSubscriber) -> Result<(), LedgerError> {
        if !is_valid_plan(record.plan_days) {
            return Err(LedgerError::InvalidPlan(record.plan_days));
        }

        let no_post_days = serde_json::to_string(&record.no_post_days)?;

        sqlx::query(
            "INSERT OR REPLACE INTO subscribers
             (user_id, display_name, username, plan_days, remaining_days,
              start_date, payment_info, is_active, no_post_days)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(record.user_id)
        .bind(&record.display_name)
        .bind(&record.username)
        .bind(record.plan_days)
        .bind(record.remaining_days)
        .bind(record.start_date)
        .bind(&record.payment_info)
        .bind(record.is_active)
        .bind(no_post_days)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Sets the remaining-days counter for a managed subscriber.
    pub async fn set_remaining_days(&self, user_id: i64, value: i64) -> Result<(), LedgerError> {
        let result = sqlx::query("UPDATE subscribers SET remaining_days = ? WHERE user_id = ?")
            .bind(value)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(LedgerError::NotFound(user_id));
        }
        Ok(())
    }

    /// Sets the activity flag for a managed subscriber.
    pub async fn set_active(&self, user_id: i64, active: bool) -> Result<(), LedgerError> {
        let result = sqlx::query("UPDATE subscribers SET is_active = ? WHERE user_id = ?")
            .bind(active)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(LedgerError::NotFound(user_id));
        }
        Ok(())
    }

    /// Appends a no-post day to a managed subscriber, once per date.
    pub async fn append_no_post_day(
        &self,
        user_id: i64,
        date: NaiveDate,
    ) -> Result<(), LedgerError> {
        let record = self
            .managed(user_id)
            .await?
            .ok_or(LedgerError::NotFound(user_id))?;

        if record.no_post_days.contains(&date) {
            return Ok(());
        }

        let mut days = record.no_post_days;
        days.push(date);
        let json = serde_json::to_string(&days)?;

        sqlx::query("UPDATE subscribers SET no_post_days = ? WHERE user_id = ?")
            .bind(json)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Extends a managed subscription by the given number of days and
    /// reactivates it, regardless of prior state.
    pub async fn extend_managed(&self, user_id: i64, days: i64) -> Result<(), LedgerError> {
        let result = sqlx::query(
            "UPDATE subscribers SET remaining_days = remaining_days + ?, is_active = 1
             WHERE user_id = ?",
        )
        .bind(days)
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(LedgerError::NotFound(user_id));
        }
        Ok(())
    }

    // --- Offline records ---

    /// Looks up an offline record by its sequence number.
    pub async fn offline(&self, id: i64) -> Result<Option<OfflineRecord>, LedgerError> {
        let row = sqlx::query("SELECT * FROM offline_subscribers WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|r| offline_from_row(&r)).transpose()
    }

    /// Lists all offline records, ordered by identifier.
    pub async fn list_offline(&self) -> Result<Vec<OfflineRecord>, LedgerError> {
        let rows = sqlx::query("SELECT * FROM offline_subscribers ORDER BY identifier")
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(offline_from_row).collect()
    }

    /// Inserts a new offline record and returns its assigned sequence number.
    ///
    /// # Errors
    ///
    /// Rejects records whose plan length is outside `{-1} ∪ [1, 36500]`.
    pub async fn insert_offline(&self, record: &OfflineRecord) -> Result<i64, LedgerError> {
        if !is_valid_plan(record.plan_days) {
            return Err(LedgerError::InvalidPlan(record.plan_days));
        }

        let no_post_days = serde_json::to_string(&record.no_post_days)?;

        let result = sqlx::query(
            "INSERT INTO offline_subscribers
             (identifier, plan_days, remaining_days, start_date, payment_info, no_post_days)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&record.identifier)
        .bind(record.plan_days)
        .bind(record.remaining_days)
        .bind(record.start_date)
        .bind(&record.payment_info)
        .bind(no_post_days)
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// Sets the remaining-days counter for an offline record.
    pub async fn set_offline_remaining_days(&self, id: i64, value: i64) -> Result<(), LedgerError> {
        let result = sqlx::query("UPDATE offline_subscribers SET remaining_days = ? WHERE id = ?")
            .bind(value)
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(LedgerError::NotFound(id));
        }
        Ok(())
    }

    /// Appends a no-post day to an offline record, once per date.
    pub async fn append_offline_no_post_day(
        &self,
        id: i64,
        date: NaiveDate,
    ) -> Result<(), LedgerError> {
        let record = self.offline(id).await?.ok_or(LedgerError::NotFound(id))?;

        if record.no_post_days.contains(&date) {
            return Ok(());
        }

        let mut days = record.no_post_days;
        days.push(date);
        let json = serde_json::to_string(&days)?;

        sqlx::query("UPDATE offline_subscribers SET no_post_days = ? WHERE id = ?")
            .bind(json)
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    // --- Admin activity ---

    /// Returns the most recent date the admin posted in the channel.
    pub async fn last_post_date(&self) -> Result<Option<NaiveDate>, LedgerError> {
        let date: Option<NaiveDate> =
            sqlx::query_scalar("SELECT last_post_date FROM admin_activity WHERE id = 1")
                .fetch_one(&self.pool)
                .await?;
        Ok(date)
    }

    /// Records an admin post on the given date.
    pub async fn record_admin_post(&self, date: NaiveDate) -> Result<(), LedgerError> {
        sqlx::query("UPDATE admin_activity SET last_post_date = ? WHERE id = 1")
            .bind(date)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Returns the date the daily accounting job last ran, if ever.
    pub async fn last_run_date(&self) -> Result<Option<NaiveDate>, LedgerError> {
        let date: Option<NaiveDate> =
            sqlx::query_scalar("SELECT last_run_date FROM admin_activity WHERE id = 1")
                .fetch_one(&self.pool)
                .await?;
        Ok(date)
    }

    /// Marks the daily accounting job as having run on the given date.
    pub async fn set_last_run_date(&self, date: NaiveDate) -> Result<(), LedgerError> {
        sqlx::query("UPDATE admin_activity SET last_run_date = ? WHERE id = 1")
            .bind(date)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    // --- Dashboard queries ---

    /// Computes the aggregate stats shown on the dashboard.
    pub async fn stats(&self) -> Result<LedgerStats, LedgerError> {
        let managed_active: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM subscribers WHERE is_active = 1")
                .fetch_one(&self.pool)
                .await?;

        let offline_total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM offline_subscribers")
            .fetch_one(&self.pool)
            .await?;

        let managed_lifetime: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM subscribers WHERE is_active = 1 AND plan_days = -1",
        )
        .fetch_one(&self.pool)
        .await?;

        let offline_lifetime: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM offline_subscribers WHERE plan_days = -1")
                .fetch_one(&self.pool)
                .await?;

        let expiring_managed: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM subscribers
             WHERE remaining_days BETWEEN 1 AND 3 AND is_active = 1",
        )
        .fetch_one(&self.pool)
        .await?;

        let expiring_offline: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM offline_subscribers WHERE remaining_days BETWEEN 1 AND 3",
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(LedgerStats {
            managed_active,
            offline_total,
            managed_lifetime,
            offline_lifetime,
            expiring_managed,
            expiring_offline,
        })
    }

    /// Lists managed subscribers with 1-3 days left, as (name, remaining) pairs.
    pub async fn expiring_managed(&self) -> Result<Vec<(String, i64)>, LedgerError> {
        let rows = sqlx::query(
            "SELECT display_name, remaining_days FROM subscribers
             WHERE remaining_days BETWEEN 1 AND 3 AND is_active = 1
             ORDER BY remaining_days, display_name",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|r| Ok((r.try_get("display_name")?, r.try_get("remaining_days")?)))
            .collect()
    }

    /// Lists offline records with 1-3 days left, as (identifier, remaining) pairs.
    pub async fn expiring_offline(&self) -> Result<Vec<(String, i64)>, LedgerError> {
        let rows = sqlx::query(
            "SELECT identifier, remaining_days FROM offline_subscribers
             WHERE remaining_days BETWEEN 1 AND 3
             ORDER BY remaining_days, identifier",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|r| Ok((r.try_get("identifier")?, r.try_get("remaining_days")?)))
            .collect()
    }

    /// Returns the combined directory of managed and offline entries, managed
    /// first, each group ordered by name.
    pub async fn directory(&self) -> Result<Vec<DirectoryEntry>, LedgerError> {
        let managed = sqlx::query(
            "SELECT user_id, display_name FROM subscribers ORDER BY display_name",
        )
        .fetch_all(&self.pool)
        .await?;

        let offline =
            sqlx::query("SELECT id, identifier FROM offline_subscribers ORDER BY identifier")
                .fetch_all(&self.pool)
                .await?;

        let mut entries = Vec::with_capacity(managed.len() + offline.len());
        for row in &managed {
            entries.push(DirectoryEntry::Managed {
                user_id: row.try_get("user_id")?,
                name: row.try_get("display_name")?,
            });
        }
        for row in &offline {
            entries.push(DirectoryEntry::Offline {
                id: row.try_get("id")?,
                identifier: row.try_get("identifier")?,
            });
        }

        Ok(entries)
    }
}

fn managed_from_row(row: &SqliteRow) -> Result<ManagedSubscriber, LedgerError> {
    let no_post_days: String = row.try_get("no_post_days")?;
    Ok(ManagedSubscriber {
        user_id: row.try_get("user_id")?,
        display_name: row.try_get("display_name")?,
        username: row.try_get("username")?,
        plan_days: row.try_get("plan_days")?,
        remaining_days: row.try_get("remaining_days")?,
        start_date: row.try_get("start_date")?,
        payment_info: row.try_get("payment_info")?,
        is_active: row.try_get("is_active")?,
        no_post_days: serde_json::from_str(&no_post_days)?,
    })
}

fn offline_from_row(row: &SqliteRow) -> Result<OfflineRecord, LedgerError> {
    let no_post_days: String = row.try_get("no_post_days")?;
    Ok(OfflineRecord {
        id: row.try_get("id")?,
        identifier: row.try_get("identifier")?,
        plan_days: row.try_get("plan_days")?,
        remaining_days: row.try_get("remaining_days")?,
        start_date: row.try_get("start_date")?,
        payment_info: row.try_get("payment_info")?,
        no_post_days: serde_json::from_str(&no_post_days)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn sample_managed(user_id: i64, plan_days: i64) -> ManagedSubscriber {
        ManagedSubscriber::new(
            user_id,
            format!("User {user_id}"),
            None,
            plan_days,
            date("2024-01-01"),
            "proof".to_owned(),
        )
    }

    #[tokio::test]
    async fn test_upsert_and_get_roundtrip() {
        let ledger = Ledger::open_in_memory().await.unwrap();

        let mut sub = sample_managed(1, 7);
        sub.username = Some("alice".to_owned());
        sub.no_post_days = vec![date("2024-01-02")];
        ledger.upsert_managed(&sub).await.unwrap();

        let loaded = ledger.managed(1).await.unwrap().unwrap();
        assert_eq!(loaded, sub);

        assert!(ledger.managed(2).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_upsert_rejects_invalid_plan() {
        let ledger = Ledger::open_in_memory().await.unwrap();

        let sub = sample_managed(1, 0);
        assert!(matches!(
            ledger.upsert_managed(&sub).await,
            Err(LedgerError::InvalidPlan(0))
        ));
        assert!(ledger.managed(1).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_managed_active_only() {
        let ledger = Ledger::open_in_memory().await.unwrap();

        ledger.upsert_managed(&sample_managed(1, 7)).await.unwrap();
        ledger.upsert_managed(&sample_managed(2, 30)).await.unwrap();
        ledger.set_active(2, false).await.unwrap();

        assert_eq!(ledger.list_managed(true).await.unwrap().len(), 1);
        assert_eq!(ledger.list_managed(false).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_append_no_post_day_is_idempotent() {
        let ledger = Ledger::open_in_memory().await.unwrap();
        ledger.upsert_managed(&sample_managed(1, 7)).await.unwrap();

        let day = date("2024-01-05");
        ledger.append_no_post_day(1, day).await.unwrap();
        ledger.append_no_post_day(1, day).await.unwrap();

        let loaded = ledger.managed(1).await.unwrap().unwrap();
        assert_eq!(loaded.no_post_days, vec![day]);
    }

    #[tokio::test]
    async fn test_extend_reactivates_from_zero() {
        let ledger = Ledger::open_in_memory().await.unwrap();
        ledger.upsert_managed(&sample_managed(1, 7)).await.unwrap();
        ledger.set_remaining_days(1, 0).await.unwrap();
        ledger.set_active(1, false).await.unwrap();

        ledger.extend_managed(1, 7).await.unwrap();

        let loaded = ledger.managed(1).await.unwrap().unwrap();
        assert_eq!(loaded.remaining_days, 7);
        assert!(loaded.is_active);
    }

    #[tokio::test]
    async fn test_missing_record_updates_report_not_found() {
        let ledger = Ledger::open_in_memory().await.unwrap();

        assert!(matches!(
            ledger.set_remaining_days(99, 5).await,
            Err(LedgerError::NotFound(99))
        ));
        assert!(matches!(
            ledger.extend_managed(99, 7).await,
            Err(LedgerError::NotFound(99))
        ));
    }

    #[tokio::test]
    async fn test_offline_insert_and_decrement() {
        let ledger = Ledger::open_in_memory().await.unwrap();

        let record = OfflineRecord::new(
            "John (@john_doe)".to_owned(),
            14,
            date("2024-01-01"),
            "cash".to_owned(),
        );
        let id = ledger.insert_offline(&record).await.unwrap();
        assert!(id > 0);

        ledger.set_offline_remaining_days(id, 13).await.unwrap();
        let loaded = ledger.offline(id).await.unwrap().unwrap();
        assert_eq!(loaded.remaining_days, 13);
        assert_eq!(loaded.identifier, "John (@john_doe)");
    }

    #[tokio::test]
    async fn test_admin_activity_dates() {
        let ledger = Ledger::open_in_memory().await.unwrap();

        assert!(ledger.last_post_date().await.unwrap().is_none());
        assert!(ledger.last_run_date().await.unwrap().is_none());

        let day = date("2024-01-05");
        ledger.record_admin_post(day).await.unwrap();
        ledger.set_last_run_date(day).await.unwrap();

        assert_eq!(ledger.last_post_date().await.unwrap(), Some(day));
        assert_eq!(ledger.last_run_date().await.unwrap(), Some(day));
    }

    #[tokio::test]
    async fn test_stats_breakdown() {
        let ledger = Ledger::open_in_memory().await.unwrap();

        ledger.upsert_managed(&sample_managed(1, -1)).await.unwrap();
        let mut expiring = sample_managed(2, 7);
        expiring.remaining_days = 2;
        ledger.upsert_managed(&expiring).await.unwrap();

        let offline = OfflineRecord::new("X".to_owned(), -1, date("2024-01-01"), String::new());
        ledger.insert_offline(&offline).await.unwrap();

        let stats = ledger.stats().await.unwrap();
        assert_eq!(stats.managed_active, 2);
        assert_eq!(stats.offline_total, 1);
        assert_eq!(stats.total_lifetime(), 2);
        assert_eq!(stats.total_expiring(), 1);
    }

    #[tokio::test]
    async fn test_directory_lists_both_kinds() {
        let ledger = Ledger::open_in_memory().await.unwrap();

        ledger.upsert_managed(&sample_managed(1, 7)).await.unwrap();
        let offline = OfflineRecord::new("Zed".to_owned(), 7, date("2024-01-01"), String::new());
        ledger.insert_offline(&offline).await.unwrap();

        let entries = ledger.directory().await.unwrap();
        assert_eq!(entries.len(), 2);
        assert!(matches!(entries[0], DirectoryEntry::Managed { user_id: 1, .. }));
        assert!(matches!(entries[1], DirectoryEntry::Offline { .. }));
    }
}
