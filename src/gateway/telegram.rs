//! Telegram delivery: turns dispatched updates into replies.

use super::Gateway;
use crate::sources::render_for_chat;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::warn;
use verdant_channels::{Dispatch, UpdateHandler};
use verdant_core::{error::VerdantError, session::SessionIdentity, traits::Transport};

/// Sends the pipeline's reply, or a failure reaction when there is none.
pub struct TelegramResponder {
    gateway: Arc<Gateway>,
    transport: Arc<dyn Transport>,
    failure_reaction: String,
}

impl TelegramResponder {
    pub fn new(
        gateway: Arc<Gateway>,
        transport: Arc<dyn Transport>,
        failure_reaction: impl Into<String>,
    ) -> Self {
        Self {
            gateway,
            transport,
            failure_reaction: failure_reaction.into(),
        }
    }

    async fn react_failed(&self, dispatch: &Dispatch) -> Result<(), VerdantError> {
        self.transport
            .send_reaction(
                dispatch.message.chat_id,
                dispatch.message.message_id,
                &self.failure_reaction,
            )
            .await
    }
}

#[async_trait]
impl UpdateHandler for TelegramResponder {
    async fn handle(&self, dispatch: Dispatch) -> Result<(), VerdantError> {
        let identity = SessionIdentity::telegram(dispatch.sender.id);
        let reply = match self
            .gateway
            .handle_message_with("telegram", &identity, &dispatch.text, None)
            .await
        {
            Ok(reply) => reply,
            Err(e) => {
                warn!("[telegram] pipeline failed for update {}: {e}", dispatch.update_id);
                if let Err(reaction_err) = self.react_failed(&dispatch).await {
                    warn!("[telegram] failure reaction not sent: {reaction_err}");
                }
                return Err(e);
            }
        };

        if !reply.is_answered() || reply.display_text.trim().is_empty() {
            return self.react_failed(&dispatch).await;
        }

        let text = render_for_chat(&reply.display_text, &reply.sources);
        self.transport
            .send_message(dispatch.message.chat_id, &text)
            .await
    }
}
