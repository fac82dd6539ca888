//! LLM gateway: size hinting, retry policy, and reply validation around a
//! single-call [`ChatBackend`].

use std::sync::Arc;
use tracing::{debug, info, warn};
use verdant_core::{
    config::LlmConfig,
    context::{ChatRequest, SizeHint},
    error::LlmError,
    retry::RetryPolicy,
    traits::ChatBackend,
};

/// Default prompt length (chars) above which the large size hint is used.
const DEFAULT_LARGE_PROMPT_CHARS: usize = 10_000;

/// Replies shorter than this are ambiguous and treated as temporary failures.
const DEFAULT_MIN_REPLY_CHARS: usize = 10;

/// Issues chat completions with retry. Never fabricates a reply: every
/// terminal failure comes back as a typed [`LlmError`].
#[derive(Clone)]
pub struct LlmGateway {
    backend: Arc<dyn ChatBackend>,
    policy: RetryPolicy,
    large_prompt_chars: usize,
    min_reply_chars: usize,
}

impl LlmGateway {
    pub fn new(backend: Arc<dyn ChatBackend>, policy: RetryPolicy) -> Self {
        Self {
            backend,
            policy,
            large_prompt_chars: DEFAULT_LARGE_PROMPT_CHARS,
            min_reply_chars: DEFAULT_MIN_REPLY_CHARS,
        }
    }

    pub fn from_config(backend: Arc<dyn ChatBackend>, config: &LlmConfig) -> Self {
        Self {
            backend,
            policy: config.retry_policy(),
            large_prompt_chars: config.large_prompt_chars,
            min_reply_chars: config.min_reply_chars,
        }
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    pub async fn is_available(&self) -> bool {
        self.backend.is_available().await
    }

    /// Complete a bare prompt.
    pub async fn complete(
        &self,
        prompt: &str,
        origin: &str,
        size_hint: Option<SizeHint>,
    ) -> Result<String, LlmError> {
        self.complete_with_system(None, prompt, origin, size_hint)
            .await
    }

    /// Complete a prompt with an optional system message.
    ///
    /// Without an explicit `size_hint` the hint is derived from prompt length.
    pub async fn complete_with_system(
        &self,
        system: Option<&str>,
        prompt: &str,
        origin: &str,
        size_hint: Option<SizeHint>,
    ) -> Result<String, LlmError> {
        let size_hint =
            size_hint.unwrap_or_else(|| SizeHint::for_prompt(prompt, self.large_prompt_chars));
        let request = ChatRequest {
            system: system.map(str::to_string),
            prompt: prompt.to_string(),
            origin: origin.to_string(),
            size_hint,
        };

        let label = format!("llm[{origin}]");
        let text = self
            .policy
            .run(&label, |attempt| {
                let request = &request;
                async move {
                    debug!("{}: attempt {attempt}", request.origin);
                    let raw = self.backend.chat(request).await?;
                    self.validate(raw)
                }
            })
            .await?;

        info!(
            "{label}: reply of {} chars via {}",
            text.chars().count(),
            self.backend.name()
        );
        Ok(text)
    }

    /// Empty or near-empty replies are an ambiguous service response.
    fn validate(&self, raw: String) -> Result<String, LlmError> {
        let len = raw.trim().chars().count();
        if len == 0 {
            warn!("llm: empty reply");
            return Err(LlmError::Temporary("empty reply".to_string()));
        }
        if len < self.min_reply_chars {
            warn!("llm: reply too short ({len} chars)");
            return Err(LlmError::Temporary(format!(
                "reply too short ({len} chars)"
            )));
        }
        Ok(raw.trim().to_string())
    }
}
