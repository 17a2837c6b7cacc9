//! Subscription ledger module.
//!
//! Holds the two classes of subscriber record (channel-linked "managed" and
//! identifier-only "offline") plus the admin-activity singleton, and owns all
//! read/write access to subscriber state.

mod records;
mod store;

pub use records::{
    is_valid_plan, parse_plan_days, plan_label, remaining_label, ManagedSubscriber, OfflineRecord,
};
pub use store::{DirectoryEntry, Ledger, LedgerError, LedgerStats};
