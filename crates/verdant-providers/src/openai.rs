//! OpenAI-compatible chat-completion backend.
//!
//! One `chat` call is exactly one HTTP request. Failures are classified into
//! the temporary/permanent taxonomy here; retrying is the gateway's job.

use async_trait::async_trait;
use verdant_core::{
    config::LlmConfig,
    context::{ApiMessage, ChatRequest, SizeHint},
    error::{LlmError, VerdantError},
    retry::ErrorKind,
    traits::ChatBackend,
};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, warn};

/// OpenAI-compatible backend.
pub struct OpenAiBackend {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    large_model: Option<String>,
}

impl OpenAiBackend {
    /// Create from config values. The HTTP client carries the per-call timeout.
    pub fn from_config(config: &LlmConfig) -> Result<Self, VerdantError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| VerdantError::Config(format!("failed to build http client: {e}")))?;
        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            large_model: config.large_model.clone(),
        })
    }

    fn model_for(&self, hint: SizeHint) -> &str {
        match hint {
            SizeHint::Large => self.large_model.as_deref().unwrap_or(&self.model),
            SizeHint::Normal => &self.model,
        }
    }
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ApiMessage>,
    context_size_hint: SizeHint,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Option<Vec<ChatChoice>>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: Option<ChatMessage>,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

/// Classify a non-2xx HTTP status.
///
/// Throttling (429) and request timeouts (408) are worth retrying; any other
/// 4xx, including bad credentials, is not. Everything else (5xx, odd codes)
/// is treated as temporary.
pub fn classify_status(status: u16) -> ErrorKind {
    match status {
        408 | 429 => ErrorKind::Temporary,
        400..=499 => ErrorKind::Permanent,
        _ => ErrorKind::Temporary,
    }
}

fn status_error(status: u16, body: &str) -> LlmError {
    let body: String = body.chars().take(200).collect();
    let detail = format!("backend returned {status}: {body}");
    match classify_status(status) {
        ErrorKind::Temporary => LlmError::Temporary(detail),
        ErrorKind::Permanent => LlmError::Permanent(detail),
    }
}

fn transport_error(e: &reqwest::Error) -> LlmError {
    if e.is_timeout() {
        LlmError::Temporary(format!("request timed out: {e}"))
    } else {
        LlmError::Temporary(format!("request failed: {e}"))
    }
}

#[async_trait]
impl ChatBackend for OpenAiBackend {
    fn name(&self) -> &str {
        "openai"
    }

    async fn chat(&self, request: &ChatRequest) -> Result<String, LlmError> {
        let model = self.model_for(request.size_hint);
        let body = ChatCompletionRequest {
            model,
            messages: request.to_api_messages(),
            context_size_hint: request.size_hint,
        };

        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        debug!(
            "openai: POST {url} model={model} origin={} hint={:?}",
            request.origin, request.size_hint
        );
        let start = Instant::now();

        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error(&e))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(status_error(status.as_u16(), &text));
        }

        let parsed: ChatCompletionResponse = resp
            .json()
            .await
            .map_err(|e| LlmError::Temporary(format!("malformed response body: {e}")))?;

        let text = parsed
            .choices
            .and_then(|c| c.into_iter().next())
            .and_then(|c| c.message)
            .and_then(|m| m.content)
            .ok_or_else(|| LlmError::Temporary("response has no choices".to_string()))?;

        debug!(
            "openai: {} chars in {}ms",
            text.len(),
            start.elapsed().as_millis()
        );
        Ok(text)
    }

    async fn is_available(&self) -> bool {
        if self.api_key.is_empty() {
            warn!("openai: no API key configured");
            return false;
        }
        let url = format!("{}/models", self.base_url.trim_end_matches('/'));
        match self.client.get(&url).bearer_auth(&self.api_key).send().await {
            Ok(resp) => resp.status().is_success(),
            Err(e) => {
                warn!("openai not available: {e}");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::LlmGateway;
    use std::sync::Arc;
    use verdant_core::retry::RetryPolicy;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn backend_for(server: &MockServer) -> OpenAiBackend {
        OpenAiBackend::from_config(&LlmConfig {
            base_url: format!("{}/v1", server.uri()),
            api_key: "sk-test".into(),
            model: "small".into(),
            large_model: Some("big".into()),
            ..Default::default()
        })
        .unwrap()
    }

    fn gateway_for(server: &MockServer) -> LlmGateway {
        LlmGateway::new(Arc::new(backend_for(server)), RetryPolicy::immediate(3))
    }

    fn completion(content: &str) -> serde_json::Value {
        serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": content}}]
        })
    }

    #[test]
    fn test_classify_status() {
        assert_eq!(classify_status(401), ErrorKind::Permanent);
        assert_eq!(classify_status(403), ErrorKind::Permanent);
        assert_eq!(classify_status(400), ErrorKind::Permanent);
        assert_eq!(classify_status(429), ErrorKind::Temporary);
        assert_eq!(classify_status(408), ErrorKind::Temporary);
        assert_eq!(classify_status(500), ErrorKind::Temporary);
        assert_eq!(classify_status(503), ErrorKind::Temporary);
    }

    #[tokio::test]
    async fn test_success_returns_content() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(serde_json::json!({"model": "small"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion(
                "Birch trees are pioneer species.",
            )))
            .expect(1)
            .mount(&server)
            .await;

        let text = gateway_for(&server)
            .complete("tell me about birch", "test", None)
            .await
            .unwrap();
        assert_eq!(text, "Birch trees are pioneer species.");
    }

    #[tokio::test]
    async fn test_server_error_retried_three_times() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(500).set_body_string("upstream down"))
            .expect(3)
            .mount(&server)
            .await;

        let err = gateway_for(&server)
            .complete("hello there", "test", None)
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::Temporary(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn test_unauthorized_fails_after_one_attempt() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
                "error": {"message": "invalid api key"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let err = gateway_for(&server)
            .complete("hello there", "test", None)
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::Permanent(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn test_malformed_body_is_temporary() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .expect(3)
            .mount(&server)
            .await;

        let err = gateway_for(&server)
            .complete("hello there", "test", None)
            .await
            .unwrap_err();
        assert!(err.is_temporary());
    }

    #[tokio::test]
    async fn test_large_hint_selects_large_model() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(body_partial_json(serde_json::json!({
                "model": "big",
                "context_size_hint": "large"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion(
                "A long answer about wetlands.",
            )))
            .expect(1)
            .mount(&server)
            .await;

        let prompt = "x".repeat(10_001);
        let text = gateway_for(&server)
            .complete(&prompt, "test", None)
            .await
            .unwrap();
        assert_eq!(text, "A long answer about wetlands.");
    }

    #[tokio::test]
    async fn test_is_available_requires_key() {
        let server = MockServer::start().await;
        let backend = OpenAiBackend::from_config(&LlmConfig {
            base_url: server.uri(),
            api_key: String::new(),
            ..Default::default()
        })
        .unwrap();
        assert!(!backend.is_available().await);
    }
}
