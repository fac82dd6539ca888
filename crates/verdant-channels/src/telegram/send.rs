//! Outbound text: chunking and the Markdown fallback.

use super::{TelegramChannel, CALL_TIMEOUT};
use tracing::{debug, warn};
use verdant_core::error::VerdantError;

/// Telegram rejects messages longer than this many characters.
pub(crate) const MAX_MESSAGE_CHARS: usize = 4096;

impl TelegramChannel {
    /// Send text, split into chunks that fit Telegram's limit.
    ///
    /// Each chunk is tried as Markdown first; if Telegram cannot parse the
    /// entities it is re-sent as plain text.
    pub(crate) async fn send_text(&self, chat_id: i64, text: &str) -> Result<(), VerdantError> {
        for chunk in split_message(text, MAX_MESSAGE_CHARS) {
            let body = serde_json::json!({
                "chat_id": chat_id,
                "text": chunk,
                "parse_mode": "Markdown",
            });

            let resp = self
                .client
                .post(self.method_url("sendMessage"))
                .timeout(CALL_TIMEOUT)
                .json(&body)
                .send()
                .await
                .map_err(|e| VerdantError::Channel(format!("telegram send failed: {e}")))?;

            let status = resp.status();
            if status.is_success() {
                continue;
            }

            let error_text = resp.text().await.unwrap_or_default();
            if !error_text.contains("can't parse entities") {
                warn!("telegram send got {status}: {error_text}");
                return Err(VerdantError::Channel(format!(
                    "telegram sendMessage returned {status}"
                )));
            }

            debug!("Markdown parse failed, retrying as plain text");
            let plain_body = serde_json::json!({
                "chat_id": chat_id,
                "text": chunk,
            });
            let resp = self
                .client
                .post(self.method_url("sendMessage"))
                .timeout(CALL_TIMEOUT)
                .json(&plain_body)
                .send()
                .await
                .map_err(|e| VerdantError::Channel(format!("telegram send (plain) failed: {e}")))?;
            if !resp.status().is_success() {
                return Err(VerdantError::Channel(format!(
                    "telegram sendMessage (plain) returned {}",
                    resp.status()
                )));
            }
        }

        Ok(())
    }
}

/// Split a long message into chunks of at most `max_chars` characters,
/// preferring to break after a newline in the second half of a chunk.
pub(crate) fn split_message(text: &str, max_chars: usize) -> Vec<&str> {
    let mut chunks = Vec::new();
    let mut rest = text;

    while rest.chars().count() > max_chars {
        let hard = rest
            .char_indices()
            .nth(max_chars)
            .map_or(rest.len(), |(idx, _)| idx);
        let window = &rest[..hard];
        let end = match window.rfind('\n') {
            Some(pos) if window[..pos].chars().count() >= max_chars / 2 => pos + 1,
            _ => hard,
        };
        chunks.push(&rest[..end]);
        rest = &rest[end..];
    }

    if !rest.is_empty() || chunks.is_empty() {
        chunks.push(rest);
    }
    chunks
}
