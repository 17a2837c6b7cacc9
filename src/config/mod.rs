//! Configuration module for the guardian bot.
//!
//! Handles loading and validation of bot configuration: the bot token,
//! the admin and channel identifiers, and the ledger database path.

mod settings;

pub use settings::{BotConfig, ConfigError};

/// Maximum plan length a custom entry may carry, in days (~100 years).
pub const MAX_PLAN_DAYS: i64 = 36500;

/// Sentinel plan/remaining value meaning "lifetime, no expiry".
pub const LIFETIME: i64 = -1;
