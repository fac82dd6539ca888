//! Conversation nodes: the append-only message tree rooted at a session.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Author of a conversation node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::System => "system",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "user" => Some(Self::User),
            "assistant" => Some(Self::Assistant),
            "system" => Some(Self::System),
            _ => None,
        }
    }

    /// Capitalized label used in the history block.
    pub fn label(&self) -> &'static str {
        match self {
            Self::User => "User",
            Self::Assistant => "Assistant",
            Self::System => "System",
        }
    }
}

/// One message in a session's conversation tree.
///
/// Every node except the session root has exactly one parent. History is
/// read in `created_at` order regardless of tree shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationNode {
    pub id: String,
    pub parent_id: Option<String>,
    pub session_id: String,
    pub role: Role,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl ConversationNode {
    /// `"<Role>: <content>"` line for the history block.
    pub fn history_line(&self) -> String {
        format!("{}: {}", self.role.label(), self.content)
    }
}
