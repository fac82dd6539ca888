use crate::{
    context::{ChatRequest, EnrichmentRequest, EnrichmentSlot},
    conversation::{ConversationNode, Role},
    error::{LlmError, VerdantError},
    session::{Identity, Session, SessionPatch},
    update::{BotIdentity, FetchOutcome},
};
use async_trait::async_trait;
use std::time::Duration;

/// Durable session records and the platform identity mapping.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Create a session for an identity.
    ///
    /// Explicit identities keep their id; cookie and platform identities get
    /// a fresh one. Platform identities also get a `platform_id → session_id`
    /// mapping; if another writer mapped the same platform id first, that
    /// session is returned instead of a new one.
    async fn create(&self, identity: &Identity) -> Result<Session, VerdantError>;

    async fn get(&self, id: &str) -> Result<Option<Session>, VerdantError>;

    /// Apply a patch as one atomic read-modify-write. `None` if the session is unknown.
    async fn update(&self, id: &str, patch: &SessionPatch)
        -> Result<Option<Session>, VerdantError>;

    /// Look up the session mapped to a platform id (e.g. `telegram:42`).
    async fn map_identity(&self, platform_id: &str) -> Result<Option<String>, VerdantError>;
}

/// Append-only conversation tree storage.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    async fn append_node(
        &self,
        session_id: &str,
        parent_id: Option<&str>,
        role: Role,
        content: &str,
    ) -> Result<ConversationNode, VerdantError>;

    /// All nodes of a session in creation order.
    async fn list_nodes(&self, session_id: &str) -> Result<Vec<ConversationNode>, VerdantError>;

    async fn get_node(&self, id: &str) -> Result<Option<ConversationNode>, VerdantError>;
}

/// Best-effort context source (location, weather, search, graph).
///
/// Implementations never fail across this boundary: internal errors become
/// an empty string.
#[async_trait]
pub trait EnrichmentProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Prompt block this provider contributes to.
    fn slot(&self) -> EnrichmentSlot;

    async fn fetch(&self, request: &EnrichmentRequest) -> String;
}

/// A chat-completion backend. One call is exactly one HTTP request.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    fn name(&self) -> &str;

    /// Issue the request and return the raw reply text, or a classified error.
    async fn chat(&self, request: &ChatRequest) -> Result<String, LlmError>;

    /// Check if the backend is reachable and configured.
    async fn is_available(&self) -> bool;
}

/// A polling message transport (Telegram-like).
#[async_trait]
pub trait Transport: Send + Sync {
    fn name(&self) -> &str;

    /// Long-poll for updates starting at `offset`.
    ///
    /// A webhook conflict is not an error: it yields an empty, blocked outcome.
    async fn fetch_updates(
        &self,
        offset: i64,
        timeout: Duration,
    ) -> Result<FetchOutcome, VerdantError>;

    async fn send_message(&self, chat_id: i64, text: &str) -> Result<(), VerdantError>;

    async fn send_reaction(
        &self,
        chat_id: i64,
        message_id: i64,
        emoji: &str,
    ) -> Result<(), VerdantError>;

    /// Remove an active webhook so polling can resume later.
    async fn delete_webhook(&self) -> Result<(), VerdantError>;

    /// The bot's own account.
    async fn get_me(&self) -> Result<BotIdentity, VerdantError>;
}
