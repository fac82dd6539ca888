//! Serde default functions for configuration fields.

pub(super) fn default_true() -> bool {
    true
}

pub(super) fn default_name() -> String {
    "verdant".to_string()
}

pub(super) fn default_data_dir() -> String {
    "~/.verdant".to_string()
}

pub(super) fn default_log_level() -> String {
    "info".to_string()
}

pub(super) fn default_llm_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

pub(super) fn default_llm_model() -> String {
    "gpt-4o-mini".to_string()
}

pub(super) fn default_llm_timeout() -> u64 {
    120
}

pub(super) fn default_max_attempts() -> u32 {
    3
}

pub(super) fn default_backoff_base() -> u64 {
    4
}

pub(super) fn default_backoff_max() -> u64 {
    10
}

pub(super) fn default_large_prompt_chars() -> usize {
    10_000
}

pub(super) fn default_min_reply_chars() -> usize {
    10
}

pub(super) fn default_telegram_api_base() -> String {
    "https://api.telegram.org".to_string()
}

pub(super) fn default_poll_timeout() -> u64 {
    30
}

pub(super) fn default_fetch_retry() -> u64 {
    5
}

pub(super) fn default_failure_reaction() -> String {
    "\u{1f44e}".to_string()
}

pub(super) fn default_memory_backend() -> String {
    "sqlite".to_string()
}

pub(super) fn default_db_path() -> String {
    "~/.verdant/data/verdant.db".to_string()
}

pub(super) fn default_history_window() -> usize {
    50
}

pub(super) fn default_enrichment_timeout() -> u64 {
    8
}

pub(super) fn default_graph_min_nodes() -> usize {
    2
}

pub(super) fn default_breaker_threshold() -> u32 {
    3
}

pub(super) fn default_breaker_cooldown() -> u64 {
    60
}

pub(super) fn default_cookie_name() -> String {
    "verdant_session".to_string()
}

pub(super) fn default_cookie_max_age_days() -> u64 {
    30
}
