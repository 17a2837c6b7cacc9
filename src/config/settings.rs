//! Application settings loaded from the environment.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Bot configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    /// Bot token (obtain from @BotFather).
    pub bot_token: String,

    /// Telegram user id of the single admin.
    pub admin_id: i64,

    /// Chat id of the managed private channel (starts with -100).
    pub channel_id: i64,

    /// Path to the SQLite ledger database.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("subscribers.db")
}

impl BotConfig {
    /// Creates a new configuration.
    #[must_use]
    pub fn new(bot_token: String, admin_id: i64, channel_id: i64) -> Self {
        Self {
            bot_token,
            admin_id,
            channel_id,
            db_path: default_db_path(),
        }
    }

    /// Creates configuration from environment variables.
    ///
    /// Expects `BOT_TOKEN`, `ADMIN_ID` and `CHANNEL_ID` to be set.
    /// `GUARDIAN_DB` overrides the default database path.
    ///
    /// # Errors
    ///
    /// Returns an error if environment variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        let bot_token =
            std::env::var("BOT_TOKEN").map_err(|_| ConfigError::MissingEnvVar("BOT_TOKEN"))?;
        if bot_token.trim().is_empty() {
            return Err(ConfigError::MissingEnvVar("BOT_TOKEN"));
        }

        let admin_id: i64 = std::env::var("ADMIN_ID")
            .map_err(|_| ConfigError::MissingEnvVar("ADMIN_ID"))?
            .parse()
            .map_err(|_| ConfigError::InvalidId("ADMIN_ID"))?;

        let channel_id: i64 = std::env::var("CHANNEL_ID")
            .map_err(|_| ConfigError::MissingEnvVar("CHANNEL_ID"))?
            .parse()
            .map_err(|_| ConfigError::InvalidId("CHANNEL_ID"))?;

        let db_path = std::env::var("GUARDIAN_DB").map_or_else(|_| default_db_path(), PathBuf::from);

        Ok(Self {
            bot_token,
            admin_id,
            channel_id,
            db_path,
        })
    }

    /// Checks whether the given user id is the configured admin.
    #[must_use]
    pub const fn is_admin(&self, user_id: i64) -> bool {
        user_id == self.admin_id
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("Invalid value for {0} (must be an integer id)")]
    InvalidId(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_uses_default_db_path() {
        let config = BotConfig::new("123:abc".to_owned(), 42, -1001);
        assert_eq!(config.db_path, PathBuf::from("subscribers.db"));
    }

    #[test]
    fn test_is_admin() {
        let config = BotConfig::new("123:abc".to_owned(), 42, -1001);
        assert!(config.is_admin(42));
        assert!(!config.is_admin(43));
    }
}
