//! Bot API client wrapper for channel and subscriber messaging.

use teloxide::prelude::*;
use teloxide::types::{ChatId, InlineKeyboardMarkup, ParseMode, UserId};
use teloxide::{ApiError, RequestError};
use thiserror::Error;
use tracing::{debug, info};

/// Errors that can occur talking to Telegram.
#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("Recipient unreachable (blocked bot or deleted account)")]
    Unreachable,

    #[error("User or chat not found")]
    NotFound,

    #[error("Telegram API error: {0}")]
    Api(#[from] RequestError),
}

impl ChannelError {
    fn from_request(err: RequestError) -> Self {
        match &err {
            RequestError::Api(ApiError::BotBlocked | ApiError::UserDeactivated) => {
                Self::Unreachable
            }
            RequestError::Api(ApiError::ChatNotFound | ApiError::UserNotFound) => Self::NotFound,
            _ => Self::Api(err),
        }
    }
}

/// A resolved user profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    pub id: i64,
    pub display_name: String,
    pub username: Option<String>,
}

impl Profile {
    /// Renders the @username, or "N/A" when the user has none.
    #[must_use]
    pub fn username_label(&self) -> String {
        self.username
            .as_ref()
            .map_or_else(|| "N/A".to_owned(), |u| format!("@{u}"))
    }
}

/// High-level client over the Bot API, bound to one admin and one channel.
#[derive(Clone)]
pub struct ChannelClient {
    bot: Bot,
    admin_id: i64,
    channel_id: i64,
}

impl ChannelClient {
    /// Creates a new client.
    #[must_use]
    pub const fn new(bot: Bot, admin_id: i64, channel_id: i64) -> Self {
        Self {
            bot,
            admin_id,
            channel_id,
        }
    }

    /// The configured admin user id.
    #[must_use]
    pub const fn admin_id(&self) -> i64 {
        self.admin_id
    }

    /// The configured channel chat id.
    #[must_use]
    pub const fn channel_id(&self) -> i64 {
        self.channel_id
    }

    /// Sends a plain text message to the given chat.
    ///
    /// # Errors
    ///
    /// Returns `Unreachable` for blocked/deleted recipients so callers can
    /// treat delivery failure as a counted, non-fatal outcome.
    pub async fn send_text(&self, chat_id: i64, text: &str) -> Result<(), ChannelError> {
        self.bot
            .send_message(ChatId(chat_id), text)
            .await
            .map_err(ChannelError::from_request)?;
        Ok(())
    }

    /// Sends an HTML-formatted message with an inline keyboard.
    pub async fn send_html_with_markup(
        &self,
        chat_id: i64,
        text: &str,
        markup: InlineKeyboardMarkup,
    ) -> Result<(), ChannelError> {
        self.bot
            .send_message(ChatId(chat_id), text)
            .parse_mode(ParseMode::Html)
            .reply_markup(markup)
            .await
            .map_err(ChannelError::from_request)?;
        Ok(())
    }

    /// Resolves a user's profile via their channel membership entry.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the user cannot be resolved; callers degrade to
    /// an identifier-only label.
    pub async fn profile(&self, user_id: i64) -> Result<Profile, ChannelError> {
        let uid = u64::try_from(user_id).map_err(|_| ChannelError::NotFound)?;

        let member = self
            .bot
            .get_chat_member(ChatId(self.channel_id), UserId(uid))
            .await
            .map_err(ChannelError::from_request)?;

        Ok(Profile {
            id: user_id,
            display_name: member.user.full_name(),
            username: member.user.username.clone(),
        })
    }

    /// Searches the channel's visible member list for a person by username or
    /// first name.
    ///
    /// The Bot API only exposes administrators as a listable set, so a plain
    /// member without a resolvable id will not be found here. Callers offer an
    /// offline record as the fallback.
    pub async fn find_channel_member(
        &self,
        first_name: &str,
        username: Option<&str>,
    ) -> Result<Option<Profile>, ChannelError> {
        let admins = self
            .bot
            .get_chat_administrators(ChatId(self.channel_id))
            .await
            .map_err(ChannelError::from_request)?;

        let wanted_username = username.map(str::to_lowercase);
        let wanted_name = first_name.to_lowercase();

        for member in admins {
            let user = &member.user;
            if user.is_bot {
                continue;
            }

            let username_match = match (&wanted_username, &user.username) {
                (Some(wanted), Some(have)) => wanted == &have.to_lowercase(),
                _ => false,
            };
            let name_match = user.first_name.to_lowercase() == wanted_name;

            if username_match || name_match {
                info!("Found channel member {} by search", user.id);
                let id = i64::try_from(user.id.0).map_err(|_| ChannelError::NotFound)?;
                return Ok(Some(Profile {
                    id,
                    display_name: user.full_name(),
                    username: user.username.clone(),
                }));
            }
        }

        Ok(None)
    }

    /// Checks whether a user is currently present in the managed channel.
    ///
    /// Left, kicked and banned members count as absent; an unresolvable user
    /// is reported as absent rather than as an error.
    pub async fn is_channel_member(&self, user_id: i64) -> Result<bool, ChannelError> {
        let Ok(uid) = u64::try_from(user_id) else {
            return Ok(false);
        };

        match self
            .bot
            .get_chat_member(ChatId(self.channel_id), UserId(uid))
            .await
        {
            Ok(member) => {
                let present = member.is_present();
                debug!("Membership check for {}: present={}", user_id, present);
                Ok(present)
            }
            Err(err) => match ChannelError::from_request(err) {
                ChannelError::NotFound | ChannelError::Unreachable => {
                    info!("User {} not resolvable in channel", user_id);
                    Ok(false)
                }
                other => Err(other),
            },
        }
    }
}

impl std::fmt::Debug for ChannelClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelClient")
            .field("admin_id", &self.admin_id)
            .field("channel_id", &self.channel_id)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_username_label() {
        let with = Profile {
            id: 1,
            display_name: "Alice".to_owned(),
            username: Some("alice".to_owned()),
        };
        let without = Profile {
            id: 2,
            display_name: "Bob".to_owned(),
            username: None,
        };
        assert_eq!(with.username_label(), "@alice");
        assert_eq!(without.username_label(), "N/A");
    }
}
