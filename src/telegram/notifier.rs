//! Notification seam between the accounting job and the messaging layer.

use async_trait::async_trait;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};

use super::client::{ChannelClient, ChannelError};
use crate::dashboard::views::escape;
use crate::dashboard::CallbackAction;
use crate::ledger::ManagedSubscriber;

/// Days granted by the expiry notice's one-tap extend button.
pub const EXTEND_BUTTON_DAYS: i64 = 7;

/// Subscriber-visible consequences the daily job can trigger.
///
/// The job depends on this trait rather than on the Bot API client so the
/// accounting state machine can be exercised against a recording fake.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Sends an "N days left" reminder to a managed subscriber.
    async fn remind_subscriber(&self, user_id: i64, days_left: i64) -> Result<(), ChannelError>;

    /// Tells the admin a subscription ran out, with an extend affordance.
    async fn notify_expiry(&self, subscriber: &ManagedSubscriber) -> Result<(), ChannelError>;
}

#[async_trait]
impl Notifier for ChannelClient {
    async fn remind_subscriber(&self, user_id: i64, days_left: i64) -> Result<(), ChannelError> {
        let text = format!("👋 You have {days_left} days left on your subscription.");
        self.send_text(user_id, &text).await
    }

    async fn notify_expiry(&self, subscriber: &ManagedSubscriber) -> Result<(), ChannelError> {
        let extend = CallbackAction::Extend {
            user_id: subscriber.user_id,
            days: EXTEND_BUTTON_DAYS,
        };
        let markup = InlineKeyboardMarkup::new(vec![vec![InlineKeyboardButton::callback(
            "📝 Extend Subscription",
            extend.to_string(),
        )]]);

        let text = format!(
            "🔔 <b>Subscription Expired</b> 🔔\n\n\
             Managed user <b>{}</b> (<code>{}</code>) subscription has ended.\n\n\
             ⚠️ <b>Action Required:</b>\n\
             • Manually remove user from channel if needed\n\
             • Or extend their subscription below.",
            escape(&subscriber.display_name),
            subscriber.user_id
        );

        self.send_html_with_markup(self.admin_id(), &text, markup)
            .await
    }
}
