mod channels;
mod defaults;
mod prompts;


pub use channels::*;
pub use prompts::*;

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::context::EnrichmentSlot;
use crate::error::VerdantError;
use crate::retry::RetryPolicy;
use defaults::*;

/// Top-level Verdant configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub verdant: VerdantConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub channel: ChannelConfig,
    #[serde(default)]
    pub memory: MemoryConfig,
    #[serde(default)]
    pub context: ContextConfig,
    #[serde(default)]
    pub session: SessionConfig,
}

/// General settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerdantConfig {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Also write a daily-rotated log under `{data_dir}/logs/`.
    #[serde(default)]
    pub log_to_file: bool,
}

impl Default for VerdantConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            data_dir: default_data_dir(),
            log_level: default_log_level(),
            log_to_file: false,
        }
    }
}

/// Chat-completion backend and retry settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_llm_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_llm_model")]
    pub model: String,
    /// Model used for large prompts. Falls back to `model`.
    #[serde(default)]
    pub large_model: Option<String>,
    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_backoff_base")]
    pub backoff_base_secs: u64,
    #[serde(default = "default_backoff_max")]
    pub backoff_max_secs: u64,
    /// Prompts longer than this (in chars) are sent with the large size hint.
    #[serde(default = "default_large_prompt_chars")]
    pub large_prompt_chars: usize,
    /// Replies shorter than this are treated as a temporary failure.
    #[serde(default = "default_min_reply_chars")]
    pub min_reply_chars: usize,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: default_llm_base_url(),
            api_key: String::new(),
            model: default_llm_model(),
            large_model: None,
            timeout_secs: default_llm_timeout(),
            max_attempts: default_max_attempts(),
            backoff_base_secs: default_backoff_base(),
            backoff_max_secs: default_backoff_max(),
            large_prompt_chars: default_large_prompt_chars(),
            min_reply_chars: default_min_reply_chars(),
        }
    }
}

impl LlmConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.max_attempts,
            Duration::from_secs(self.backoff_base_secs),
            Duration::from_secs(self.backoff_max_secs),
        )
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Memory config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// "sqlite" or "memory".
    #[serde(default = "default_memory_backend")]
    pub backend: String,
    #[serde(default = "default_db_path")]
    pub db_path: String,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            backend: default_memory_backend(),
            db_path: default_db_path(),
        }
    }
}

/// Context assembly settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextConfig {
    /// Number of most recent conversation nodes in the history block.
    #[serde(default = "default_history_window")]
    pub history_window: usize,
    #[serde(default = "default_enrichment_timeout")]
    pub enrichment_timeout_secs: u64,
    /// Graph context is requested only when a session has more nodes than this.
    #[serde(default = "default_graph_min_nodes")]
    pub graph_min_nodes: usize,
    /// Consecutive timeouts before a provider is put on cooldown.
    #[serde(default = "default_breaker_threshold")]
    pub breaker_threshold: u32,
    #[serde(default = "default_breaker_cooldown")]
    pub breaker_cooldown_secs: u64,
    /// HTTP enrichment sources, one per `[[context.providers]]` table.
    #[serde(default)]
    pub providers: Vec<EnrichmentEndpoint>,
}

/// An HTTP endpoint that fills one enrichment block.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichmentEndpoint {
    pub name: String,
    pub slot: EnrichmentSlot,
    pub url: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub api_key: Option<String>,
}

impl ContextConfig {
    pub fn enrichment_timeout(&self) -> Duration {
        Duration::from_secs(self.enrichment_timeout_secs)
    }

    pub fn breaker_cooldown(&self) -> Duration {
        Duration::from_secs(self.breaker_cooldown_secs)
    }
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            history_window: default_history_window(),
            enrichment_timeout_secs: default_enrichment_timeout(),
            graph_min_nodes: default_graph_min_nodes(),
            breaker_threshold: default_breaker_threshold(),
            breaker_cooldown_secs: default_breaker_cooldown(),
            providers: Vec::new(),
        }
    }
}

/// Session identity settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,
    #[serde(default = "default_cookie_max_age_days")]
    pub cookie_max_age_days: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: default_cookie_name(),
            cookie_max_age_days: default_cookie_max_age_days(),
        }
    }
}

impl SessionConfig {
    pub fn cookie_max_age(&self) -> Duration {
        Duration::from_secs(self.cookie_max_age_days * 24 * 3600)
    }
}

/// Expand `~` to home directory.
pub fn shellexpand(path: &str) -> String {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = std::env::var_os("HOME") {
            return format!("{}/{rest}", home.to_string_lossy());
        }
    }
    path.to_string()
}

/// Load configuration from a TOML file.
///
/// Falls back to defaults if the file does not exist. Environment overrides
/// are applied in both cases.
pub fn load(path: &str) -> Result<Config, VerdantError> {
    let path = Path::new(path);
    let mut config = if !path.exists() {
        tracing::info!(
            "Config file not found at {}, using defaults",
            path.display()
        );
        Config::default()
    } else {
        let content = std::fs::read_to_string(path).map_err(|e| {
            VerdantError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        toml::from_str(&content)
            .map_err(|e| VerdantError::Config(format!("failed to parse config: {}", e)))?
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    Ok(config)
}

/// Apply `VERDANT_LLM_API_KEY` and `TELEGRAM_BOT_TOKEN` on top of file values.
fn apply_env_overrides(config: &mut Config, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(key) = lookup("VERDANT_LLM_API_KEY").filter(|v| !v.is_empty()) {
        config.llm.api_key = key;
    }
    if let Some(token) = lookup("TELEGRAM_BOT_TOKEN").filter(|v| !v.is_empty()) {
        config
            .channel
            .telegram
            .get_or_insert_with(TelegramConfig::default)
            .bot_token = token;
    }
}
