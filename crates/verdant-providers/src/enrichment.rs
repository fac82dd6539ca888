//! Enrichment source backed by an HTTP endpoint.
//!
//! The endpoint receives `{session_id, message, hints}` and answers with
//! either `{"text": "..."}` or a plain-text body. Any failure is logged and
//! becomes an empty block.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};
use verdant_core::{
    config::EnrichmentEndpoint,
    context::{EnrichmentRequest, EnrichmentSlot},
    error::VerdantError,
    traits::EnrichmentProvider,
};

/// Headroom over the caller's deadline, so the caller always times out first
/// and sees a timeout rather than an empty block.
const CLIENT_GRACE: Duration = Duration::from_secs(1);

pub struct HttpEnrichmentProvider {
    client: reqwest::Client,
    name: String,
    slot: EnrichmentSlot,
    url: String,
    api_key: Option<String>,
}

#[derive(Deserialize)]
struct BlockResponse {
    text: Option<String>,
}

impl HttpEnrichmentProvider {
    pub fn from_config(
        endpoint: &EnrichmentEndpoint,
        timeout: Duration,
    ) -> Result<Self, VerdantError> {
        let client = reqwest::Client::builder()
            .timeout(timeout + CLIENT_GRACE)
            .build()
            .map_err(|e| VerdantError::Config(format!("failed to build http client: {e}")))?;
        Ok(Self {
            client,
            name: endpoint.name.clone(),
            slot: endpoint.slot,
            url: endpoint.url.clone(),
            api_key: endpoint.api_key.clone().filter(|k| !k.is_empty()),
        })
    }

    async fn try_fetch(&self, request: &EnrichmentRequest) -> Result<String, String> {
        let body = serde_json::json!({
            "session_id": request.session_id,
            "message": request.message,
            "hints": request.hints,
        });
        let mut req = self.client.post(&self.url).json(&body);
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }

        let resp = req.send().await.map_err(|e| e.to_string())?;
        let status = resp.status();
        if !status.is_success() {
            return Err(format!("status {status}"));
        }
        let text = resp.text().await.map_err(|e| e.to_string())?;
        Ok(match serde_json::from_str::<BlockResponse>(&text) {
            Ok(parsed) => parsed.text.unwrap_or_default(),
            Err(_) => text,
        })
    }
}

#[async_trait]
impl EnrichmentProvider for HttpEnrichmentProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn slot(&self) -> EnrichmentSlot {
        self.slot
    }

    async fn fetch(&self, request: &EnrichmentRequest) -> String {
        match self.try_fetch(request).await {
            Ok(text) => {
                debug!("{}: {} chars", self.name, text.len());
                text.trim().to_string()
            }
            Err(e) => {
                warn!("{} enrichment failed: {e}", self.name);
                String::new()
            }
        }
    }
}
