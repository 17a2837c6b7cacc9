//! Text and keyboard rendering for the admin dashboard.
//!
//! All message bodies are built here so the handlers stay focused on state
//! transitions. Bodies use Telegram HTML; anything user-supplied goes through
//! [`escape`] first.

use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};

use chrono::NaiveDate;

use crate::dashboard::actions::CallbackAction;
use crate::ledger::{
    plan_label, remaining_label, DirectoryEntry, LedgerStats, ManagedSubscriber, OfflineRecord,
};
use crate::telegram::Profile;

/// Directory entries shown per page.
pub const USERS_PER_PAGE: usize = 8;

const EXPIRING_SHOWN: usize = 10;
const NO_POST_SHOWN: usize = 5;
const NAME_LIMIT: usize = 30;

/// Escapes text for inclusion in a Telegram HTML message body.
#[must_use]
pub fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Truncates display text to a character limit, appending an ellipsis marker.
#[must_use]
pub fn clip(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        text.to_owned()
    } else {
        let cut: String = text.chars().take(limit).collect();
        format!("{cut}...")
    }
}

fn button(text: &str, action: CallbackAction) -> InlineKeyboardButton {
    InlineKeyboardButton::callback(text.to_owned(), action.to_string())
}

/// The dashboard root keyboard.
#[must_use]
pub fn dashboard_markup() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new([
        vec![button("📊 View Stats", CallbackAction::Stats)],
        vec![button("⏳ View Expiring Soon", CallbackAction::ExpiringSoon)],
        vec![button("🗣️ Broadcast Message", CallbackAction::Broadcast)],
        vec![button("🔍 Check a User/Record", CallbackAction::CheckUser)],
        vec![button("➕ Add Manual Entry", CallbackAction::AddManualPrompt)],
    ])
}

/// The dashboard root message body.
#[must_use]
pub fn dashboard_text() -> String {
    "👑 <b>Admin Dashboard</b>".to_owned()
}

/// A single "back to dashboard" row.
#[must_use]
pub fn back_markup() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new([[button("⬅️ Back to Dashboard", CallbackAction::BackToDashboard)]])
}

/// Plan selection keyboard for a managed subscriber.
#[must_use]
pub fn managed_plan_markup() -> InlineKeyboardMarkup {
    use crate::dashboard::actions::PlanChoice;

    InlineKeyboardMarkup::new([
        vec![
            button("7 Days", CallbackAction::UserPlan(PlanChoice::Days(7))),
            button("14 Days", CallbackAction::UserPlan(PlanChoice::Days(14))),
        ],
        vec![
            button("30 Days", CallbackAction::UserPlan(PlanChoice::Days(30))),
            button("Lifetime", CallbackAction::UserPlan(PlanChoice::Days(-1))),
        ],
        vec![button("Custom Days", CallbackAction::UserPlan(PlanChoice::Custom))],
        vec![button("❌ Cancel", CallbackAction::CancelApproval)],
    ])
}

/// Plan selection keyboard for an offline record.
#[must_use]
pub fn offline_plan_markup() -> InlineKeyboardMarkup {
    use crate::dashboard::actions::PlanChoice;

    InlineKeyboardMarkup::new([
        vec![
            button("7 Days", CallbackAction::OfflinePlan(PlanChoice::Days(7))),
            button("14 Days", CallbackAction::OfflinePlan(PlanChoice::Days(14))),
        ],
        vec![
            button("30 Days", CallbackAction::OfflinePlan(PlanChoice::Days(30))),
            button("Lifetime", CallbackAction::OfflinePlan(PlanChoice::Days(-1))),
        ],
        vec![button(
            "Custom Days",
            CallbackAction::OfflinePlan(PlanChoice::Custom),
        )],
        vec![button("❌ Cancel", CallbackAction::CancelOffline)],
    ])
}

/// Choice keyboard shown when a manual-entry search finds nobody.
#[must_use]
pub fn detection_choice_markup() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new([
        vec![button(
            "📝 Yes, Create Offline Record",
            CallbackAction::CreateOffline,
        )],
        vec![button(
            "🔄 Try Different Name/Username",
            CallbackAction::RetrySearch,
        )],
        vec![button("❌ Cancel", CallbackAction::CancelManual)],
    ])
}

/// Approve/Info keyboard attached to a join alert.
#[must_use]
pub fn join_alert_markup(user_id: i64, display_name: &str) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new([
        vec![button(
            &format!("✅ Approve {}", clip(display_name, 20)),
            CallbackAction::Approve(user_id),
        )],
        vec![button("🔍 Check User Info", CallbackAction::Info(user_id))],
    ])
}

/// The alert sent to the admin when someone joins the channel.
#[must_use]
pub fn join_alert_text(profile: &Profile) -> String {
    format!(
        "🚨 <b>New Member Alert</b> 🚨\n\n\
         <b>Name:</b> {}\n\
         <b>Username:</b> {}\n\
         <b>User ID:</b> <code>{}</code>\n\n\
         This user will be actively managed by the bot.",
        escape(&profile.display_name),
        escape(&profile.username_label()),
        profile.id
    )
}

fn no_post_tail(no_post_days: &[NaiveDate], heading: &str) -> String {
    if no_post_days.is_empty() {
        return String::new();
    }

    let mut out = format!("\n{heading}\n");
    let shown = no_post_days
        .iter()
        .skip(no_post_days.len().saturating_sub(NO_POST_SHOWN));
    for day in shown {
        out.push_str(&format!("- {day}\n"));
    }
    if no_post_days.len() > NO_POST_SHOWN {
        out.push_str(&format!(
            "... and {} more dates\n",
            no_post_days.len() - NO_POST_SHOWN
        ));
    }
    out
}

/// The subscriber-facing /status reply.
#[must_use]
pub fn status_text(sub: &ManagedSubscriber) -> String {
    let mut message = format!(
        "✨ Your Subscription Status ✨\n\n\
         ▫️ Plan: {}\n\
         ▫️ Posting Days Remaining: {}\n\
         ▫️ Start Date: {}\n",
        plan_label(sub.plan_days),
        remaining_label(sub.remaining_days),
        sub.start_date
    );
    message.push_str(&no_post_tail(
        &sub.no_post_days,
        "Your subscription was extended on these dates (no content posted):",
    ));
    message
}

/// The detailed stats view.
#[must_use]
pub fn stats_text(stats: &LedgerStats) -> String {
    format!(
        "📊 <b>Detailed Channel Stats</b>\n\n\
         👤 <b>Total Active Subscribers:</b> {}\n   \
         - Managed Members: {}\n   \
         - Offline Records: {}\n\n\
         ✨ <b>Lifetime Subscribers:</b> {}\n   \
         - Managed Members: {}\n   \
         - Offline Records: {}\n\n\
         ⏳ <b>Expiring Soon (≤3 days):</b> {}",
        stats.total_active(),
        stats.managed_active,
        stats.offline_total,
        stats.total_lifetime(),
        stats.managed_lifetime,
        stats.offline_lifetime,
        stats.total_expiring()
    )
}

fn expiring_section(heading: &str, entries: &[(String, i64)]) -> String {
    let mut out = format!("\n<b>{heading}:</b>\n");
    for (name, days) in entries.iter().take(EXPIRING_SHOWN) {
        out.push_str(&format!(
            "- {} - {} days left\n",
            escape(&clip(name, NAME_LIMIT)),
            days
        ));
    }
    if entries.len() > EXPIRING_SHOWN {
        out.push_str(&format!("... and {} more\n", entries.len() - EXPIRING_SHOWN));
    }
    out
}

/// The expiring-soon view over both record kinds.
#[must_use]
pub fn expiring_text(managed: &[(String, i64)], offline: &[(String, i64)]) -> String {
    let mut message = "⏳ <b>Expiring Soon (3 days or less)</b>\n".to_owned();

    if managed.is_empty() && offline.is_empty() {
        message.push_str("\nNo one is expiring soon.");
        return message;
    }

    if !managed.is_empty() {
        message.push_str(&expiring_section("Managed Members", managed));
    }
    if !offline.is_empty() {
        message.push_str(&expiring_section("Offline Records", offline));
    }
    message
}

/// Detail view for a managed subscriber.
#[must_use]
pub fn managed_detail_text(sub: &ManagedSubscriber) -> String {
    let username = sub
        .username
        .as_ref()
        .map_or_else(|| "N/A".to_owned(), |u| format!("@{u}"));

    let mut message = format!(
        "<b>Type: Managed Subscriber</b> ✅\n\n\
         <b>Name:</b> {}\n\
         <b>User ID:</b> <code>{}</code>\n\
         <b>Username:</b> {}\n\
         <b>Plan:</b> {}\n\
         <b>Remaining:</b> {} days\n\
         <b>Start Date:</b> {}\n\
         <b>Payment:</b> {}\n",
        escape(&clip(&sub.display_name, 50)),
        sub.user_id,
        escape(&username),
        plan_label(sub.plan_days),
        remaining_label(sub.remaining_days),
        sub.start_date,
        escape(&clip(&sub.payment_info, 100))
    );
    message.push_str(&no_post_tail(&sub.no_post_days, "<b>Non-Posting Days:</b>"));
    message
}

/// Detail view for an offline record.
#[must_use]
pub fn offline_detail_text(rec: &OfflineRecord) -> String {
    let mut message = format!(
        "<b>Type: Offline Record</b> 📝\n\n\
         <b>Identifier:</b> {}\n\
         <b>Plan:</b> {}\n\
         <b>Remaining:</b> {} days\n\
         <b>Start Date:</b> {}\n\
         <b>Payment:</b> {}\n",
        escape(&clip(&rec.identifier, 50)),
        plan_label(rec.plan_days),
        remaining_label(rec.remaining_days),
        rec.start_date,
        escape(&clip(&rec.payment_info, 100))
    );
    message.push_str(&no_post_tail(&rec.no_post_days, "<b>Non-Posting Days:</b>"));
    message
}

/// Back-to-list row used under a detail view.
#[must_use]
pub fn detail_markup() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new([[button("⬅️ Back to List", CallbackAction::CheckUser)]])
}

/// One page of the user directory.
///
/// Returns the message body and the keyboard for the requested page. The page
/// index is clamped to the last page so stale buttons stay usable.
#[must_use]
pub fn directory_page(entries: &[DirectoryEntry], page: usize) -> (String, InlineKeyboardMarkup) {
    if entries.is_empty() {
        return (
            "You have no subscribers or records yet.".to_owned(),
            back_markup(),
        );
    }

    let total_pages = entries.len().div_ceil(USERS_PER_PAGE);
    let page = page.min(total_pages - 1);
    let start = page * USERS_PER_PAGE;

    let mut rows: Vec<Vec<InlineKeyboardButton>> = Vec::new();
    for entry in entries.iter().skip(start).take(USERS_PER_PAGE) {
        let (label, action) = match entry {
            DirectoryEntry::Managed { user_id, name } => (
                format!("✅ {}", clip(name, NAME_LIMIT)),
                CallbackAction::ShowManaged(*user_id),
            ),
            DirectoryEntry::Offline { id, identifier } => (
                format!("📝 {}", clip(identifier, NAME_LIMIT)),
                CallbackAction::ShowOffline(*id),
            ),
        };
        rows.push(vec![button(&label, action)]);
    }

    let mut nav = Vec::new();
    if page > 0 {
        nav.push(button("⬅️ Prev", CallbackAction::UserPage(page - 1)));
    }
    nav.push(button(
        &format!("Page {}/{total_pages}", page + 1),
        CallbackAction::Noop,
    ));
    if page + 1 < total_pages {
        nav.push(button("Next ➡️", CallbackAction::UserPage(page + 1)));
    }
    rows.push(nav);
    rows.push(vec![button(
        "⬅️ Back to Dashboard",
        CallbackAction::BackToDashboard,
    )]);

    (
        "Select a user or record to view details:".to_owned(),
        InlineKeyboardMarkup::new(rows),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn sample_sub() -> ManagedSubscriber {
        ManagedSubscriber::new(
            42,
            "Alice <3".to_owned(),
            Some("alice".to_owned()),
            30,
            date("2024-01-01"),
            "tx 99".to_owned(),
        )
    }

    #[test]
    fn test_escape() {
        assert_eq!(escape("a<b>&c"), "a&lt;b&gt;&amp;c");
        assert_eq!(escape("plain"), "plain");
    }

    #[test]
    fn test_clip() {
        assert_eq!(clip("short", 10), "short");
        assert_eq!(clip("abcdefghij", 5), "abcde...");
    }

    #[test]
    fn test_status_text_basic() {
        let text = status_text(&sample_sub());
        assert!(text.contains("Plan: 30 days"));
        assert!(text.contains("Posting Days Remaining: 30"));
        assert!(text.contains("Start Date: 2024-01-01"));
        assert!(!text.contains("no content posted"));
    }

    #[test]
    fn test_status_text_no_post_overflow() {
        let mut sub = sample_sub();
        for day in 1..=7 {
            sub.no_post_days.push(date(&format!("2024-02-0{day}")));
        }
        let text = status_text(&sub);
        // Only the last 5 dates are listed.
        assert!(!text.contains("2024-02-01"));
        assert!(text.contains("2024-02-03"));
        assert!(text.contains("2024-02-07"));
        assert!(text.contains("... and 2 more dates"));
    }

    #[test]
    fn test_managed_detail_escapes_name() {
        let text = managed_detail_text(&sample_sub());
        assert!(text.contains("Alice &lt;3"));
        assert!(text.contains("<code>42</code>"));
        assert!(text.contains("@alice"));
    }

    #[test]
    fn test_expiring_text_empty() {
        let text = expiring_text(&[], &[]);
        assert!(text.contains("No one is expiring soon."));
    }

    #[test]
    fn test_expiring_text_overflow() {
        let managed: Vec<(String, i64)> =
            (0..12).map(|i| (format!("user{i}"), 2)).collect();
        let text = expiring_text(&managed, &[]);
        assert!(text.contains("user9"));
        assert!(!text.contains("user10"));
        assert!(text.contains("... and 2 more"));
        assert!(!text.contains("Offline Records"));
    }

    fn entries(n: usize) -> Vec<DirectoryEntry> {
        (0..n)
            .map(|i| DirectoryEntry::Managed {
                user_id: i as i64,
                name: format!("user{i}"),
            })
            .collect()
    }

    #[test]
    fn test_directory_empty() {
        let (text, _) = directory_page(&[], 0);
        assert!(text.contains("no subscribers"));
    }

    #[test]
    fn test_directory_pagination_rows() {
        // 17 entries over 8 per page gives 3 pages.
        let all = entries(17);

        let (_, first) = directory_page(&all, 0);
        // 8 entry rows, nav row, back row.
        assert_eq!(first.inline_keyboard.len(), 10);
        // No Prev on the first page: page label plus Next.
        assert_eq!(first.inline_keyboard[8].len(), 2);

        let (_, mid) = directory_page(&all, 1);
        assert_eq!(mid.inline_keyboard[8].len(), 3);

        let (_, last) = directory_page(&all, 2);
        // 1 entry row, nav row, back row.
        assert_eq!(last.inline_keyboard.len(), 3);
        assert_eq!(last.inline_keyboard[1].len(), 2);
    }

    #[test]
    fn test_directory_page_clamped() {
        let all = entries(3);
        let (_, markup) = directory_page(&all, 99);
        // Clamped to the only page: 3 entry rows, nav, back.
        assert_eq!(markup.inline_keyboard.len(), 5);
    }
}
