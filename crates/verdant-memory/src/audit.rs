//! Audit log: one row per handled message.

use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;
use verdant_core::error::VerdantError;

/// An entry to write to the audit log.
pub struct AuditEntry {
    pub channel: String,
    pub session_id: String,
    pub input_text: String,
    pub output_text: Option<String>,
    pub backend: Option<String>,
    pub processing_ms: Option<i64>,
    pub status: AuditStatus,
    pub error: Option<String>,
}

/// Outcome of an audited interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditStatus {
    Ok,
    /// The LLM gave no usable answer; the user saw the failure signal.
    NoAnswer,
    Error,
}

impl AuditStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::NoAnswer => "no_answer",
            Self::Error => "error",
        }
    }
}

/// Audit logger. Without a pool entries only go to the trace log.
pub struct AuditLogger {
    pool: Option<SqlitePool>,
}

impl AuditLogger {
    /// Create a new audit logger sharing the given pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool: Some(pool) }
    }

    pub fn disabled() -> Self {
        Self { pool: None }
    }

    /// Write an entry to the audit log.
    pub async fn log(&self, entry: &AuditEntry) -> Result<(), VerdantError> {
        if let Some(pool) = &self.pool {
            sqlx::query(
                "INSERT INTO audit_log \
                 (id, channel, session_id, input_text, output_text, \
                  backend, processing_ms, status, error) \
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(Uuid::new_v4().to_string())
            .bind(&entry.channel)
            .bind(&entry.session_id)
            .bind(&entry.input_text)
            .bind(&entry.output_text)
            .bind(&entry.backend)
            .bind(entry.processing_ms)
            .bind(entry.status.as_str())
            .bind(&entry.error)
            .execute(pool)
            .await
            .map_err(|e| VerdantError::Memory(format!("audit log write failed: {e}")))?;
        }

        debug!(
            "audit: {} {} [{}] {}",
            entry.channel,
            entry.session_id,
            entry.status.as_str(),
            truncate(&entry.input_text, 80)
        );

        Ok(())
    }
}

fn truncate(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
