//! Inline-keyboard callback actions.
//!
//! Callback buttons carry colon-delimited strings on the wire. Rather than
//! routing on raw strings, every button maps to a closed variant here and the
//! handler dispatches exhaustively.

use std::fmt;

use crate::ledger::is_valid_plan;

/// Plan choice offered by the plan-selection keyboards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanChoice {
    /// A fixed plan length (including `-1` for lifetime).
    Days(i64),
    /// The admin wants to type a custom day count.
    Custom,
}

/// Every callback button the bot can emit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackAction {
    /// Show the detailed stats view.
    Stats,

    /// Show subscribers with 1-3 days left.
    ExpiringSoon,

    /// Start the broadcast flow.
    Broadcast,

    /// Show page 0 of the user directory.
    CheckUser,

    /// Start the manual-entry flow.
    AddManualPrompt,

    /// Return to the dashboard root.
    BackToDashboard,

    /// Navigate to a directory page.
    UserPage(usize),

    /// Show a managed subscriber's details.
    ShowManaged(i64),

    /// Show an offline record's details.
    ShowOffline(i64),

    /// Approve a newly joined user (starts plan selection).
    Approve(i64),

    /// Show user info for a join alert.
    Info(i64),

    /// Plan picked for a managed subscriber.
    UserPlan(PlanChoice),

    /// Plan picked for an offline record.
    OfflinePlan(PlanChoice),

    /// Create an offline record after a failed member search.
    CreateOffline,

    /// Restart the manual-entry search.
    RetrySearch,

    /// Cancel the manual-entry flow.
    CancelManual,

    /// Cancel the approval flow.
    CancelApproval,

    /// Cancel offline record creation.
    CancelOffline,

    /// Extend a managed subscription and reactivate it.
    Extend { user_id: i64, days: i64 },

    /// Dismiss an info message.
    DismissInfo,

    /// Placeholder button (page indicator).
    Noop,
}

impl CallbackAction {
    /// Parses a callback data string.
    ///
    /// Returns `None` for malformed or unknown data.
    #[must_use]
    pub fn parse(data: &str) -> Option<Self> {
        let mut parts = data.split(':');
        let head = parts.next()?;
        let rest: Vec<&str> = parts.collect();

        match (head, rest.as_slice()) {
            ("stats", []) => Some(Self::Stats),
            ("expiring_soon", []) => Some(Self::ExpiringSoon),
            ("broadcast", []) => Some(Self::Broadcast),
            ("check_user", []) => Some(Self::CheckUser),
            ("add_manual_prompt", []) => Some(Self::AddManualPrompt),
            ("back_to_dashboard", []) => Some(Self::BackToDashboard),
            ("user_page", [page]) => page.parse().ok().map(Self::UserPage),
            ("show_detail", ["managed", id]) => id.parse().ok().map(Self::ShowManaged),
            ("show_detail", ["offline", id]) => id.parse().ok().map(Self::ShowOffline),
            ("approve", [id]) => id.parse().ok().map(Self::Approve),
            ("info", [id]) => id.parse().ok().map(Self::Info),
            ("user_plan", [choice]) => parse_plan_choice(choice).map(Self::UserPlan),
            ("offline_plan", [choice]) => parse_plan_choice(choice).map(Self::OfflinePlan),
            ("create_offline", []) => Some(Self::CreateOffline),
            ("retry_search", []) => Some(Self::RetrySearch),
            ("cancel_manual", []) => Some(Self::CancelManual),
            ("cancel_approval", []) => Some(Self::CancelApproval),
            ("cancel_offline", []) => Some(Self::CancelOffline),
            ("extend", [id, days]) => {
                let user_id = id.parse().ok()?;
                let days = days.parse().ok()?;
                Some(Self::Extend { user_id, days })
            }
            ("dismiss_info", []) => Some(Self::DismissInfo),
            ("noop", []) => Some(Self::Noop),
            _ => None,
        }
    }
}

fn parse_plan_choice(text: &str) -> Option<PlanChoice> {
    if text == "custom" {
        return Some(PlanChoice::Custom);
    }
    let days: i64 = text.parse().ok()?;
    is_valid_plan(days).then_some(PlanChoice::Days(days))
}

impl fmt::Display for CallbackAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stats => write!(f, "stats"),
            Self::ExpiringSoon => write!(f, "expiring_soon"),
            Self::Broadcast => write!(f, "broadcast"),
            Self::CheckUser => write!(f, "check_user"),
            Self::AddManualPrompt => write!(f, "add_manual_prompt"),
            Self::BackToDashboard => write!(f, "back_to_dashboard"),
            Self::UserPage(page) => write!(f, "user_page:{page}"),
            Self::ShowManaged(id) => write!(f, "show_detail:managed:{id}"),
            Self::ShowOffline(id) => write!(f, "show_detail:offline:{id}"),
            Self::Approve(id) => write!(f, "approve:{id}"),
            Self::Info(id) => write!(f, "info:{id}"),
            Self::UserPlan(choice) => write!(f, "user_plan:{}", plan_choice_str(*choice)),
            Self::OfflinePlan(choice) => write!(f, "offline_plan:{}", plan_choice_str(*choice)),
            Self::CreateOffline => write!(f, "create_offline"),
            Self::RetrySearch => write!(f, "retry_search"),
            Self::CancelManual => write!(f, "cancel_manual"),
            Self::CancelApproval => write!(f, "cancel_approval"),
            Self::CancelOffline => write!(f, "cancel_offline"),
            Self::Extend { user_id, days } => write!(f, "extend:{user_id}:{days}"),
            Self::DismissInfo => write!(f, "dismiss_info"),
            Self::Noop => write!(f, "noop"),
        }
    }
}

fn plan_choice_str(choice: PlanChoice) -> String {
    match choice {
        PlanChoice::Days(days) => days.to_string(),
        PlanChoice::Custom => "custom".to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_actions() {
        assert_eq!(CallbackAction::parse("stats"), Some(CallbackAction::Stats));
        assert_eq!(
            CallbackAction::parse("back_to_dashboard"),
            Some(CallbackAction::BackToDashboard)
        );
        assert_eq!(CallbackAction::parse("noop"), Some(CallbackAction::Noop));
    }

    #[test]
    fn test_parse_with_arguments() {
        assert_eq!(
            CallbackAction::parse("extend:42:7"),
            Some(CallbackAction::Extend {
                user_id: 42,
                days: 7
            })
        );
        assert_eq!(
            CallbackAction::parse("show_detail:managed:42"),
            Some(CallbackAction::ShowManaged(42))
        );
        assert_eq!(
            CallbackAction::parse("show_detail:offline:3"),
            Some(CallbackAction::ShowOffline(3))
        );
        assert_eq!(
            CallbackAction::parse("user_page:2"),
            Some(CallbackAction::UserPage(2))
        );
    }

    #[test]
    fn test_parse_plan_choices() {
        assert_eq!(
            CallbackAction::parse("user_plan:7"),
            Some(CallbackAction::UserPlan(PlanChoice::Days(7)))
        );
        assert_eq!(
            CallbackAction::parse("user_plan:-1"),
            Some(CallbackAction::UserPlan(PlanChoice::Days(-1)))
        );
        assert_eq!(
            CallbackAction::parse("offline_plan:custom"),
            Some(CallbackAction::OfflinePlan(PlanChoice::Custom))
        );
        // Out-of-domain plan lengths are rejected at parse time.
        assert_eq!(CallbackAction::parse("user_plan:0"), None);
        assert_eq!(CallbackAction::parse("user_plan:99999"), None);
    }

    #[test]
    fn test_parse_malformed() {
        assert_eq!(CallbackAction::parse(""), None);
        assert_eq!(CallbackAction::parse("unknown"), None);
        assert_eq!(CallbackAction::parse("extend:42"), None);
        assert_eq!(CallbackAction::parse("extend:abc:7"), None);
        assert_eq!(CallbackAction::parse("show_detail:weird:1"), None);
        assert_eq!(CallbackAction::parse("stats:extra"), None);
    }

    #[test]
    fn test_display_roundtrip() {
        let actions = [
            CallbackAction::Stats,
            CallbackAction::UserPage(3),
            CallbackAction::ShowManaged(42),
            CallbackAction::ShowOffline(7),
            CallbackAction::Approve(1),
            CallbackAction::UserPlan(PlanChoice::Days(30)),
            CallbackAction::UserPlan(PlanChoice::Custom),
            CallbackAction::OfflinePlan(PlanChoice::Days(-1)),
            CallbackAction::Extend {
                user_id: 42,
                days: 7,
            },
        ];

        for action in actions {
            assert_eq!(CallbackAction::parse(&action.to_string()), Some(action));
        }
    }
}
