//! Session identity and durable session records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Which kind of identity created a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentityKind {
    Telegram,
    Cookie,
    Explicit,
}

impl IdentityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Telegram => "telegram",
            Self::Cookie => "cookie",
            Self::Explicit => "explicit",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "telegram" => Some(Self::Telegram),
            "cookie" => Some(Self::Cookie),
            "explicit" => Some(Self::Explicit),
            _ => None,
        }
    }
}

/// Durable conversational identity spanning many messages.
///
/// Sessions have no TTL: once created they stay retrievable until an
/// operator evicts them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub identity_kind: IdentityKind,
    /// Platform account behind the session (e.g. `telegram:42`).
    pub external_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    pub message_count: u64,
}

/// A single identity, already picked from the sources on a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    /// Session id supplied explicitly by the caller.
    Explicit(String),
    /// Session id carried in the identifying cookie.
    Cookie(String),
    /// Telegram user id.
    Telegram(i64),
}

impl Identity {
    pub fn kind(&self) -> IdentityKind {
        match self {
            Self::Explicit(_) => IdentityKind::Explicit,
            Self::Cookie(_) => IdentityKind::Cookie,
            Self::Telegram(_) => IdentityKind::Telegram,
        }
    }

    /// Key of the `platform_id → session_id` mapping, for platform identities.
    pub fn platform_id(&self) -> Option<String> {
        match self {
            Self::Telegram(id) => Some(format!("telegram:{id}")),
            _ => None,
        }
    }
}

/// Every identity source present on an inbound message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionIdentity {
    pub explicit_id: Option<String>,
    pub cookie_id: Option<String>,
    pub telegram_user_id: Option<i64>,
}

impl SessionIdentity {
    pub fn explicit(id: impl Into<String>) -> Self {
        Self {
            explicit_id: Some(id.into()),
            ..Default::default()
        }
    }

    pub fn cookie(id: impl Into<String>) -> Self {
        Self {
            cookie_id: Some(id.into()),
            ..Default::default()
        }
    }

    pub fn telegram(user_id: i64) -> Self {
        Self {
            telegram_user_id: Some(user_id),
            ..Default::default()
        }
    }

    /// Pick the identity to resolve: explicit id, else cookie, else platform id.
    /// Blank ids count as absent. An empty cookie is still a cookie flow and
    /// resolves to a fresh cookie session.
    pub fn primary(&self) -> Option<Identity> {
        let non_blank = |s: &Option<String>| {
            s.as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };

        if let Some(id) = non_blank(&self.explicit_id) {
            return Some(Identity::Explicit(id));
        }
        if let Some(id) = non_blank(&self.cookie_id) {
            return Some(Identity::Cookie(id));
        }
        if let Some(id) = self.telegram_user_id {
            return Some(Identity::Telegram(id));
        }
        self.cookie_id
            .as_ref()
            .map(|_| Identity::Cookie(String::new()))
    }
}

/// Partial update applied atomically to a session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionPatch {
    /// Added to `message_count` in the same write.
    pub message_count_delta: u64,
    pub last_activity: Option<DateTime<Utc>>,
}

impl SessionPatch {
    /// Patch for one inbound user message.
    pub fn inbound_message(now: DateTime<Utc>) -> Self {
        Self {
            message_count_delta: 1,
            last_activity: Some(now),
        }
    }
}

/// Instruction for the HTTP layer to set the long-lived identifying cookie.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetCookie {
    pub name: String,
    pub value: String,
    pub max_age: Duration,
}

impl SetCookie {
    /// Render as a `Set-Cookie` header value.
    pub fn header_value(&self) -> String {
        format!(
            "{}={}; Max-Age={}; Path=/; HttpOnly; SameSite=Lax",
            self.name,
            self.value,
            self.max_age.as_secs()
        )
    }
}
