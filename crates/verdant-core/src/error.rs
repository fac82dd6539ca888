use crate::retry::{ErrorKind, Retryable};
use thiserror::Error;

/// Top-level error type for Verdant.
#[derive(Debug, Error)]
pub enum VerdantError {
    /// Terminal failure from the LLM gateway.
    #[error("llm error: {0}")]
    Llm(#[from] LlmError),

    /// Error from a messaging transport.
    #[error("channel error: {0}")]
    Channel(String),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// Memory/storage error.
    #[error("memory error: {0}")]
    Memory(String),

    /// Session resolution error.
    #[error("session error: {0}")]
    Session(String),

    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Failure of a chat-completion call, tagged by retryability.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LlmError {
    /// Retry may help: timeouts, 5xx, throttling, network errors, empty or short replies.
    #[error("temporary: {0}")]
    Temporary(String),

    /// Retry is useless: bad credentials, rejected requests.
    #[error("permanent: {0}")]
    Permanent(String),
}

impl LlmError {
    pub fn is_temporary(&self) -> bool {
        matches!(self, Self::Temporary(_))
    }
}

impl Retryable for LlmError {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::Temporary(_) => ErrorKind::Temporary,
            Self::Permanent(_) => ErrorKind::Permanent,
        }
    }
}
