//! Telegram Bot API deserialization types.

use serde::Deserialize;
use verdant_core::update::{ChatKind, InboundMessage, Sender, Update};

#[derive(Debug, Deserialize)]
pub(crate) struct TgResponse<T> {
    pub ok: bool,
    pub result: Option<T>,
    pub description: Option<String>,
    pub error_code: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TgUpdate {
    pub update_id: i64,
    pub message: Option<TgMessage>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TgMessage {
    pub message_id: i64,
    pub from: Option<TgUser>,
    pub chat: TgChat,
    pub text: Option<String>,
    pub caption: Option<String>,
    pub reply_to_message: Option<TgReplyTo>,
}

/// The part of a replied-to message needed to detect replies to the bot.
#[derive(Debug, Deserialize)]
pub(crate) struct TgReplyTo {
    pub from: Option<TgUser>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TgUser {
    pub id: i64,
    #[serde(default)]
    pub is_bot: bool,
    #[serde(default)]
    pub first_name: String,
    pub username: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TgChat {
    pub id: i64,
    /// Chat type: "private", "group", "supergroup", or "channel".
    #[serde(default, rename = "type")]
    pub chat_type: String,
}

impl From<TgUser> for Sender {
    fn from(user: TgUser) -> Self {
        Self {
            id: user.id,
            first_name: user.first_name,
            username: user.username,
            is_bot: user.is_bot,
        }
    }
}

impl From<TgMessage> for InboundMessage {
    fn from(msg: TgMessage) -> Self {
        Self {
            message_id: msg.message_id,
            chat_id: msg.chat.id,
            chat_kind: ChatKind::parse(&msg.chat.chat_type),
            from: msg.from.map(Sender::from),
            // Captions stand in for text on media messages.
            text: msg.text.or(msg.caption),
            reply_to_user_id: msg.reply_to_message.and_then(|r| r.from).map(|u| u.id),
        }
    }
}

impl From<TgUpdate> for Update {
    fn from(update: TgUpdate) -> Self {
        Self {
            update_id: update.update_id,
            message: update.message.map(InboundMessage::from),
        }
    }
}
