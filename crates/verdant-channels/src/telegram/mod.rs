//! Telegram Bot API transport.
//!
//! Long polling via `getUpdates`, replies via `sendMessage`.
//! Docs: <https://core.telegram.org/bots/api>

mod api;
mod send;
pub(crate) mod types;

#[cfg(test)]
mod tests;

use std::time::Duration;
use verdant_core::config::TelegramConfig;

/// Headroom over the long-poll timeout before the HTTP request gives up.
const POLL_GRACE: Duration = Duration::from_secs(5);

/// Timeout for every call that is not a long poll.
const CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// Telegram transport using the Bot API.
pub struct TelegramChannel {
    client: reqwest::Client,
    base_url: String,
}

impl TelegramChannel {
    /// Create a new Telegram channel from config.
    pub fn new(config: TelegramConfig) -> Self {
        let base_url = format!(
            "{}/bot{}",
            config.api_base.trim_end_matches('/'),
            config.bot_token
        );
        Self {
            client: reqwest::Client::new(),
            base_url,
        }
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/{method}", self.base_url)
    }
}
