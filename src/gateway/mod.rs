//! Gateway: the reply pipeline connecting sessions, context, the LLM and
//! the post-processor.

mod assembler;
mod breaker;
mod keywords;
mod pipeline;
mod resolver;
mod telegram;

#[cfg(test)]
mod tests;

pub use assembler::ContextAssembler;
pub use resolver::{SessionHandle, SessionResolver};
pub use telegram::TelegramResponder;

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use verdant_core::{
    config::{Config, Prompts},
    traits::{ConversationStore, EnrichmentProvider},
};
use verdant_memory::{AuditLogger, Memory};
use verdant_providers::LlmGateway;

/// Per-session locks are pruned once the map grows past this.
const LOCK_PRUNE_THRESHOLD: usize = 1024;

/// The reply pipeline and everything it needs.
pub struct Gateway {
    pub(super) resolver: SessionResolver,
    pub(super) conversations: Arc<dyn ConversationStore>,
    pub(super) assembler: ContextAssembler,
    pub(super) llm: LlmGateway,
    pub(super) audit: Arc<AuditLogger>,
    pub(super) prompts: Prompts,
    /// Serializes turns within one session.
    session_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl Gateway {
    pub fn new(
        memory: &Memory,
        llm: LlmGateway,
        providers: Vec<Arc<dyn EnrichmentProvider>>,
        config: &Config,
        prompts: Prompts,
    ) -> Self {
        Self {
            resolver: SessionResolver::new(memory.sessions.clone(), config.session.clone()),
            conversations: memory.conversations.clone(),
            assembler: ContextAssembler::new(
                memory.conversations.clone(),
                providers,
                &config.context,
            ),
            llm,
            audit: memory.audit.clone(),
            prompts,
            session_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn llm(&self) -> &LlmGateway {
        &self.llm
    }

    /// The lock guarding one session's turns.
    pub(super) async fn session_lock(&self, session_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.session_locks.lock().await;
        if locks.len() > LOCK_PRUNE_THRESHOLD {
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        }
        locks
            .entry(session_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}
