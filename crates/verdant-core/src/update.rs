//! Transport-agnostic update types produced by polling transports.

use serde::{Deserialize, Serialize};

/// Kind of chat an inbound message arrived in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatKind {
    Private,
    Group,
    Supergroup,
    Channel,
}

impl ChatKind {
    pub fn parse(s: &str) -> Self {
        match s {
            "group" => Self::Group,
            "supergroup" => Self::Supergroup,
            "channel" => Self::Channel,
            _ => Self::Private,
        }
    }

    pub fn is_group(&self) -> bool {
        matches!(self, Self::Group | Self::Supergroup)
    }
}

/// Author of an inbound message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sender {
    pub id: i64,
    pub first_name: String,
    pub username: Option<String>,
    #[serde(default)]
    pub is_bot: bool,
}

impl Sender {
    /// `@username` when known, otherwise the first name.
    pub fn display_name(&self) -> String {
        match self.username {
            Some(ref un) => format!("@{un}"),
            None => self.first_name.clone(),
        }
    }
}

/// A chat message carried by an update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundMessage {
    pub message_id: i64,
    pub chat_id: i64,
    pub chat_kind: ChatKind,
    pub from: Option<Sender>,
    pub text: Option<String>,
    /// Author of the message this one replies to, if it is a reply.
    pub reply_to_user_id: Option<i64>,
}

/// One entry of the transport's update stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<InboundMessage>,
}

/// Result of a single fetch against the update stream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchOutcome {
    pub updates: Vec<Update>,
    /// The remote API refused polling because a webhook is active.
    pub webhook_blocked: bool,
}

impl FetchOutcome {
    pub fn blocked() -> Self {
        Self {
            updates: Vec::new(),
            webhook_blocked: true,
        }
    }
}

/// The bot's own account, looked up once per ingestion loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BotIdentity {
    pub id: i64,
    pub username: String,
}
