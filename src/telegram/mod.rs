//! Telegram Bot API wrapper module.
//!
//! Provides the messaging client bound to the configured admin and channel,
//! and the notifier seam the daily accounting job delivers through.

mod client;
mod notifier;

pub use client::{ChannelClient, ChannelError, Profile};
pub use notifier::{Notifier, EXTEND_BUTTON_DAYS};
