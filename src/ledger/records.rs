//! Subscriber record types and plan validation.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::config::{LIFETIME, MAX_PLAN_DAYS};

/// A channel member tracked by numeric identifier, reachable via direct message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagedSubscriber {
    /// Telegram user id (unique key).
    pub user_id: i64,

    /// Display name shown in admin views.
    pub display_name: String,

    /// Public @username, if the user has one.
    pub username: Option<String>,

    /// Total plan length in days, or `-1` for lifetime.
    pub plan_days: i64,

    /// Days left; counts down daily, floored at 0. `-1` for lifetime.
    pub remaining_days: i64,

    /// Calendar date the plan began.
    pub start_date: NaiveDate,

    /// Free-text payment proof or reference.
    pub payment_info: String,

    /// False once the plan has run out. Lifetime plans never deactivate here.
    pub is_active: bool,

    /// Dates on which no day was deducted because nothing was posted.
    pub no_post_days: Vec<NaiveDate>,
}

impl ManagedSubscriber {
    /// Creates a fresh record starting today with a full plan.
    #[must_use]
    pub fn new(
        user_id: i64,
        display_name: String,
        username: Option<String>,
        plan_days: i64,
        start_date: NaiveDate,
        payment_info: String,
    ) -> Self {
        Self {
            user_id,
            display_name,
            username,
            plan_days,
            remaining_days: plan_days,
            start_date,
            payment_info,
            is_active: true,
            no_post_days: Vec::new(),
        }
    }

    /// Whether this is a lifetime plan.
    #[must_use]
    pub const fn is_lifetime(&self) -> bool {
        self.plan_days == LIFETIME
    }
}

/// An identifier-only entry for someone not resolvable as a channel member.
///
/// Offline records are never messaged and carry no activity flag; they simply
/// stop decrementing once at the floor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfflineRecord {
    /// Internally assigned sequence number. 0 until inserted.
    pub id: i64,

    /// Free-text identifier, e.g. "John (@john_doe)".
    pub identifier: String,

    /// Total plan length in days, or `-1` for lifetime.
    pub plan_days: i64,

    /// Days left; counts down daily, floored at 0. `-1` for lifetime.
    pub remaining_days: i64,

    /// Calendar date the plan began.
    pub start_date: NaiveDate,

    /// Free-text payment proof or reference.
    pub payment_info: String,

    /// Dates on which no day was deducted because nothing was posted.
    pub no_post_days: Vec<NaiveDate>,
}

impl OfflineRecord {
    /// Creates a fresh record starting today with a full plan.
    #[must_use]
    pub fn new(
        identifier: String,
        plan_days: i64,
        start_date: NaiveDate,
        payment_info: String,
    ) -> Self {
        Self {
            id: 0,
            identifier,
            plan_days,
            remaining_days: plan_days,
            start_date,
            payment_info,
            no_post_days: Vec::new(),
        }
    }

    /// Whether this is a lifetime plan.
    #[must_use]
    pub const fn is_lifetime(&self) -> bool {
        self.plan_days == LIFETIME
    }
}

/// Checks a plan length against the allowed domain: `-1` or `1..=36500`.
#[must_use]
pub const fn is_valid_plan(days: i64) -> bool {
    days == LIFETIME || (days >= 1 && days <= MAX_PLAN_DAYS)
}

/// Parses user-supplied text into a plan length, rejecting out-of-range values.
#[must_use]
pub fn parse_plan_days(text: &str) -> Option<i64> {
    let days: i64 = text.trim().parse().ok()?;
    is_valid_plan(days).then_some(days)
}

/// Renders a plan length for display ("Lifetime" or "N days").
#[must_use]
pub fn plan_label(days: i64) -> String {
    if days == LIFETIME {
        "Lifetime".to_owned()
    } else {
        format!("{days} days")
    }
}

/// Renders a remaining-days value for display ("Infinite" or the number).
#[must_use]
pub fn remaining_label(days: i64) -> String {
    if days == LIFETIME {
        "Infinite".to_owned()
    } else {
        days.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_valid_plan_domain() {
        assert!(is_valid_plan(-1));
        assert!(is_valid_plan(1));
        assert!(is_valid_plan(36500));
        assert!(!is_valid_plan(0));
        assert!(!is_valid_plan(36501));
        assert!(!is_valid_plan(-2));
    }

    #[test]
    fn test_parse_plan_days() {
        assert_eq!(parse_plan_days("30"), Some(30));
        assert_eq!(parse_plan_days(" 7 "), Some(7));
        assert_eq!(parse_plan_days("-1"), Some(-1));
        assert_eq!(parse_plan_days("0"), None);
        assert_eq!(parse_plan_days("99999"), None);
        assert_eq!(parse_plan_days("soon"), None);
    }

    #[test]
    fn test_new_managed_starts_full_and_active() {
        let sub = ManagedSubscriber::new(
            1,
            "Alice".to_owned(),
            Some("alice".to_owned()),
            7,
            date("2024-01-01"),
            "tx 42".to_owned(),
        );
        assert_eq!(sub.remaining_days, 7);
        assert!(sub.is_active);
        assert!(sub.no_post_days.is_empty());
        assert!(!sub.is_lifetime());
    }

    #[test]
    fn test_lifetime_labels() {
        assert_eq!(plan_label(-1), "Lifetime");
        assert_eq!(plan_label(14), "14 days");
        assert_eq!(remaining_label(-1), "Infinite");
        assert_eq!(remaining_label(3), "3");
    }
}
