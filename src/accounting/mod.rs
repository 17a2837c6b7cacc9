//! Daily subscription accounting module.
//!
//! Walks the ledger once every UTC day, applies the decrement-or-defer rule
//! per record, and emits reminder/expiry notifications.

mod job;
mod report;
mod runner;

pub use job::AccountingJob;
pub use report::{DailyReport, DaySnapshot, RecordError, Subject};
pub use runner::{AccountingMessage, AccountingRunner};
