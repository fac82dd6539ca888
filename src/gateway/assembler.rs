//! Bounded prompt context: conversation history plus best-effort enrichment.

use super::breaker::CircuitBreaker;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinSet;
use tracing::{debug, warn};
use verdant_core::{
    config::ContextConfig,
    context::{EnrichmentHints, EnrichmentRequest, EnrichmentSlot, PromptContext},
    conversation::ConversationNode,
    error::VerdantError,
    traits::{ConversationStore, EnrichmentProvider},
};

/// An enrichment provider with its own cooldown breaker.
struct Guarded {
    provider: Arc<dyn EnrichmentProvider>,
    breaker: CircuitBreaker,
}

/// Builds a [`PromptContext`] for one request.
///
/// History is never filtered: enrichment only adds blocks. Every provider
/// call is bounded by `timeout` and degrades to an empty block.
pub struct ContextAssembler {
    conversations: Arc<dyn ConversationStore>,
    providers: Vec<Guarded>,
    history_window: usize,
    graph_min_nodes: usize,
    timeout: Duration,
}

impl ContextAssembler {
    pub fn new(
        conversations: Arc<dyn ConversationStore>,
        providers: Vec<Arc<dyn EnrichmentProvider>>,
        config: &ContextConfig,
    ) -> Self {
        let providers = providers
            .into_iter()
            .map(|provider| Guarded {
                provider,
                breaker: CircuitBreaker::new(config.breaker_threshold, config.breaker_cooldown()),
            })
            .collect();
        Self {
            conversations,
            providers,
            history_window: config.history_window,
            graph_min_nodes: config.graph_min_nodes,
            timeout: config.enrichment_timeout(),
        }
    }

    /// Load the session's nodes and assemble the context for `message`.
    pub async fn build(
        &self,
        session_id: &str,
        hints: &EnrichmentHints,
        message: &str,
    ) -> Result<PromptContext, VerdantError> {
        let nodes = self.conversations.list_nodes(session_id).await?;
        Ok(self.assemble(session_id, &nodes, hints, message).await)
    }

    /// Assemble from already-loaded nodes (creation order).
    ///
    /// An empty session yields an empty context and no provider calls.
    pub async fn assemble(
        &self,
        session_id: &str,
        nodes: &[ConversationNode],
        hints: &EnrichmentHints,
        message: &str,
    ) -> PromptContext {
        if nodes.is_empty() {
            return PromptContext::default();
        }

        let mut ctx = PromptContext {
            history: history_block(nodes, self.history_window),
            ..Default::default()
        };

        let include_graph = nodes.len() > self.graph_min_nodes;
        let request = Arc::new(EnrichmentRequest {
            session_id: session_id.to_string(),
            message: message.to_string(),
            hints: *hints,
        });

        let mut tasks = JoinSet::new();
        for (index, guarded) in self.providers.iter().enumerate() {
            let slot = guarded.provider.slot();
            if !wants(slot, hints, include_graph) {
                continue;
            }
            if !guarded.breaker.allow(Instant::now()) {
                debug!("enrichment[{}]: skipped, cooling down", guarded.provider.name());
                continue;
            }
            let provider = guarded.provider.clone();
            let request = request.clone();
            let timeout = self.timeout;
            tasks.spawn(async move {
                let result = tokio::time::timeout(timeout, provider.fetch(&request)).await;
                (index, result)
            });
        }

        let mut blocks: Vec<(usize, String)> = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            let (index, result) = match joined {
                Ok(done) => done,
                Err(e) => {
                    warn!("enrichment task failed: {e}");
                    continue;
                }
            };
            let guarded = &self.providers[index];
            let name = guarded.provider.name();
            match result {
                Ok(text) => {
                    guarded.breaker.record_success();
                    if !text.trim().is_empty() {
                        blocks.push((index, text));
                    }
                }
                Err(_) => {
                    warn!("enrichment[{name}]: timed out after {:?}", self.timeout);
                    if guarded.breaker.record_timeout(Instant::now()) {
                        warn!("enrichment[{name}]: repeated timeouts, cooling down");
                    }
                }
            }
        }

        // Provider order, not completion order.
        blocks.sort_by_key(|(index, _)| *index);
        for (index, text) in blocks {
            let block = ctx.block_mut(self.providers[index].provider.slot());
            if !block.is_empty() {
                block.push('\n');
            }
            block.push_str(text.trim());
        }
        ctx
    }
}

fn wants(slot: EnrichmentSlot, hints: &EnrichmentHints, include_graph: bool) -> bool {
    match slot {
        EnrichmentSlot::Location => hints.location,
        EnrichmentSlot::Weather => hints.weather,
        EnrichmentSlot::Search => hints.web_search || hints.books,
        EnrichmentSlot::Graph => include_graph,
    }
}

/// The last `window` nodes as `"<Role>: <content>"` lines, oldest first.
fn history_block(nodes: &[ConversationNode], window: usize) -> String {
    let start = nodes.len().saturating_sub(window);
    nodes[start..]
        .iter()
        .map(ConversationNode::history_line)
        .collect::<Vec<_>>()
        .join("\n")
}
