use serde::{Deserialize, Serialize};

use super::defaults::*;

/// Channel configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ChannelConfig {
    pub telegram: Option<TelegramConfig>,
}

/// Telegram bot config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub bot_token: String,
    /// Bot API root, overridable for tests and self-hosted API servers.
    #[serde(default = "default_telegram_api_base")]
    pub api_base: String,
    /// Allowed Telegram user ids. Empty = allow all.
    #[serde(default)]
    pub allowed_users: Vec<i64>,
    /// Long-poll timeout passed to `getUpdates`.
    #[serde(default = "default_poll_timeout")]
    pub poll_timeout_secs: u64,
    /// Pause before re-fetching after a failed fetch.
    #[serde(default = "default_fetch_retry")]
    pub fetch_retry_secs: u64,
    /// Reaction set on a message the assistant could not answer.
    #[serde(default = "default_failure_reaction")]
    pub failure_reaction: String,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            bot_token: String::new(),
            api_base: default_telegram_api_base(),
            allowed_users: Vec::new(),
            poll_timeout_secs: default_poll_timeout(),
            fetch_retry_secs: default_fetch_retry(),
            failure_reaction: default_failure_reaction(),
        }
    }
}
