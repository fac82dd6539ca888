//! Message processing pipeline: the main handle_message flow.

use super::keywords::hints_for;
use super::{Gateway, SessionHandle};
use crate::sources;
use std::time::Instant;
use tracing::{info, warn};
use verdant_core::{
    context::EnrichmentHints,
    conversation::Role,
    error::VerdantError,
    message::{Reply, ReplyStatus},
    session::SessionIdentity,
};
use verdant_memory::{AuditEntry, AuditStatus};

impl Gateway {
    /// Handle one user message from the chat API.
    pub async fn handle_message(
        &self,
        identity: &SessionIdentity,
        text: &str,
    ) -> Result<Reply, VerdantError> {
        self.handle_message_with("chat", identity, text, None).await
    }

    /// Handle one user message.
    ///
    /// `hints` overrides the keyword policy for enrichment. An LLM failure
    /// is not an error here: it yields a `NoAnswer` reply, and the user's
    /// message stays stored.
    pub async fn handle_message_with(
        &self,
        origin: &str,
        identity: &SessionIdentity,
        text: &str,
        hints: Option<EnrichmentHints>,
    ) -> Result<Reply, VerdantError> {
        let started = Instant::now();
        let preview: String = text.chars().take(60).collect();
        info!("[{origin}] message: {preview}");

        let handle = self.resolver.resolve(identity).await?;
        let hints = hints.unwrap_or_else(|| hints_for(text));

        match self.respond(origin, &handle, text, &hints, started).await {
            Ok(reply) => Ok(reply),
            Err(e) => {
                self.record(AuditEntry {
                    channel: origin.to_string(),
                    session_id: handle.session.id.clone(),
                    input_text: text.to_string(),
                    output_text: None,
                    backend: None,
                    processing_ms: Some(elapsed_ms(started)),
                    status: AuditStatus::Error,
                    error: Some(e.to_string()),
                })
                .await;
                Err(e)
            }
        }
    }

    async fn respond(
        &self,
        origin: &str,
        handle: &SessionHandle,
        text: &str,
        hints: &EnrichmentHints,
        started: Instant,
    ) -> Result<Reply, VerdantError> {
        let session_id = handle.id();
        let lock = self.session_lock(session_id).await;
        let _turn = lock.lock().await;

        let nodes = self.conversations.list_nodes(session_id).await?;
        let context = self
            .assembler
            .assemble(session_id, &nodes, hints, text)
            .await;

        // The new turn hangs off the session's latest node.
        let parent = nodes.last().map(|n| n.id.as_str());
        let user_node = self
            .conversations
            .append_node(session_id, parent, Role::User, text)
            .await?;

        let prompt = context.render(text);
        let system = self.prompts.system_prompt();
        let completion = self
            .llm
            .complete_with_system(Some(&system), &prompt, origin, None)
            .await;

        let raw = match completion {
            Ok(raw) => raw,
            Err(e) => {
                warn!("[{origin}] no answer for session {session_id}: {e}");
                self.record(AuditEntry {
                    channel: origin.to_string(),
                    session_id: session_id.to_string(),
                    input_text: text.to_string(),
                    output_text: None,
                    backend: Some(self.llm.backend_name().to_string()),
                    processing_ms: Some(elapsed_ms(started)),
                    status: AuditStatus::NoAnswer,
                    error: Some(e.to_string()),
                })
                .await;
                return Ok(Reply {
                    session_id: session_id.to_string(),
                    display_text: String::new(),
                    sources: Vec::new(),
                    status: ReplyStatus::NoAnswer,
                    set_cookie: handle.set_cookie.clone(),
                });
            }
        };

        let extracted = sources::extract(&raw);
        let stored = if extracted.display_text.trim().is_empty() {
            raw.as_str()
        } else {
            extracted.display_text.as_str()
        };
        self.conversations
            .append_node(session_id, Some(user_node.id.as_str()), Role::Assistant, stored)
            .await?;

        self.record(AuditEntry {
            channel: origin.to_string(),
            session_id: session_id.to_string(),
            input_text: text.to_string(),
            output_text: Some(extracted.display_text.clone()),
            backend: Some(self.llm.backend_name().to_string()),
            processing_ms: Some(elapsed_ms(started)),
            status: AuditStatus::Ok,
            error: None,
        })
        .await;

        info!(
            "[{origin}] replied in session {session_id} ({} sources, {}ms)",
            extracted.sources.len(),
            elapsed_ms(started)
        );

        Ok(Reply {
            session_id: session_id.to_string(),
            display_text: extracted.display_text,
            sources: extracted.sources,
            status: ReplyStatus::Answered,
            set_cookie: handle.set_cookie.clone(),
        })
    }

    async fn record(&self, entry: AuditEntry) {
        if let Err(e) = self.audit.log(&entry).await {
            warn!("audit log failed: {e}");
        }
    }
}

fn elapsed_ms(started: Instant) -> i64 {
    i64::try_from(started.elapsed().as_millis()).unwrap_or(i64::MAX)
}
