//! `Transport` implementation over the Bot API.

use super::types::{TgResponse, TgUpdate, TgUser};
use super::{TelegramChannel, CALL_TIMEOUT, POLL_GRACE};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, info, warn};
use verdant_core::{
    error::VerdantError,
    traits::Transport,
    update::{BotIdentity, FetchOutcome, Update},
};

/// HTTP status (and Bot API `error_code`) for a polling/webhook conflict.
const CONFLICT: u16 = 409;

impl TelegramChannel {
    /// POST a Bot API method and unwrap the `result` field.
    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        body: &serde_json::Value,
    ) -> Result<T, VerdantError> {
        let resp = self
            .client
            .post(self.method_url(method))
            .timeout(CALL_TIMEOUT)
            .json(body)
            .send()
            .await
            .map_err(|e| VerdantError::Channel(format!("telegram {method} failed: {e}")))?;

        let status = resp.status();
        let parsed: TgResponse<T> = resp.json().await.map_err(|e| {
            VerdantError::Channel(format!("telegram {method} parse failed ({status}): {e}"))
        })?;

        if !parsed.ok {
            return Err(VerdantError::Channel(format!(
                "telegram {method} error (code={}): {}",
                parsed.error_code.unwrap_or_default(),
                parsed.description.unwrap_or_default()
            )));
        }
        parsed
            .result
            .ok_or_else(|| VerdantError::Channel(format!("telegram {method} returned no result")))
    }
}

#[async_trait]
impl Transport for TelegramChannel {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn fetch_updates(
        &self,
        offset: i64,
        timeout: Duration,
    ) -> Result<FetchOutcome, VerdantError> {
        let body = serde_json::json!({
            "offset": offset,
            "timeout": timeout.as_secs(),
            "allowed_updates": ["message"],
        });

        let resp = self
            .client
            .post(self.method_url("getUpdates"))
            .timeout(timeout + POLL_GRACE)
            .json(&body)
            .send()
            .await
            .map_err(|e| VerdantError::Channel(format!("telegram poll failed: {e}")))?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| VerdantError::Channel(format!("telegram poll read failed: {e}")))?;
        let parsed = serde_json::from_str::<TgResponse<Vec<TgUpdate>>>(&text);

        let error_code = parsed.as_ref().ok().and_then(|r| r.error_code);
        if status.as_u16() == CONFLICT || error_code == Some(i64::from(CONFLICT)) {
            warn!("telegram: getUpdates conflict (409), a webhook is active");
            return Ok(FetchOutcome::blocked());
        }

        let parsed = parsed.map_err(|e| {
            VerdantError::Channel(format!("telegram poll parse failed ({status}): {e}"))
        })?;
        if !parsed.ok {
            return Err(VerdantError::Channel(format!(
                "telegram getUpdates error (code={}): {}",
                error_code.unwrap_or_default(),
                parsed.description.unwrap_or_default()
            )));
        }

        let updates: Vec<Update> = parsed
            .result
            .unwrap_or_default()
            .into_iter()
            .map(Update::from)
            .collect();
        if !updates.is_empty() {
            debug!("telegram: {} update(s) from offset {offset}", updates.len());
        }
        Ok(FetchOutcome {
            updates,
            webhook_blocked: false,
        })
    }

    async fn send_message(&self, chat_id: i64, text: &str) -> Result<(), VerdantError> {
        self.send_text(chat_id, text).await
    }

    async fn send_reaction(
        &self,
        chat_id: i64,
        message_id: i64,
        emoji: &str,
    ) -> Result<(), VerdantError> {
        let body = serde_json::json!({
            "chat_id": chat_id,
            "message_id": message_id,
            "reaction": [{"type": "emoji", "emoji": emoji}],
        });
        let _: bool = self.call("setMessageReaction", &body).await?;
        Ok(())
    }

    async fn delete_webhook(&self) -> Result<(), VerdantError> {
        let body = serde_json::json!({ "drop_pending_updates": false });
        let _: bool = self.call("deleteWebhook", &body).await?;
        info!("telegram: webhook deleted");
        Ok(())
    }

    async fn get_me(&self) -> Result<BotIdentity, VerdantError> {
        let me: TgUser = self.call("getMe", &serde_json::json!({})).await?;
        let username = me
            .username
            .ok_or_else(|| VerdantError::Channel("telegram getMe returned no username".into()))?;
        info!("telegram: running as @{username}");
        Ok(BotIdentity {
            id: me.id,
            username,
        })
    }
}
