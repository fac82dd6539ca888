//! # verdant-memory
//!
//! Session and conversation storage for Verdant. SQLite by default, with an
//! in-process arena for tests and ephemeral runs.

pub mod arena;
pub mod audit;
pub mod store;

pub use arena::ArenaStore;
pub use audit::{AuditEntry, AuditLogger, AuditStatus};
pub use store::Store;

use std::sync::Arc;
use tracing::info;
use verdant_core::{
    config::MemoryConfig,
    error::VerdantError,
    traits::{ConversationStore, SessionStore},
};

/// The storage handles the gateway needs, behind their traits.
#[derive(Clone)]
pub struct Memory {
    pub sessions: Arc<dyn SessionStore>,
    pub conversations: Arc<dyn ConversationStore>,
    pub audit: Arc<AuditLogger>,
    /// Present only for the SQLite backend.
    pub store: Option<Store>,
}

impl Memory {
    /// Ephemeral storage; nothing survives the process.
    pub fn in_process() -> Self {
        let arena = Arc::new(ArenaStore::new());
        Self {
            sessions: arena.clone(),
            conversations: arena,
            audit: Arc::new(AuditLogger::disabled()),
            store: None,
        }
    }
}

/// Open the configured backend (`sqlite` or `memory`).
pub async fn open(config: &MemoryConfig) -> Result<Memory, VerdantError> {
    match config.backend.as_str() {
        "sqlite" => {
            let store = Store::new(config).await?;
            let shared = Arc::new(store.clone());
            Ok(Memory {
                sessions: shared.clone(),
                conversations: shared,
                audit: Arc::new(AuditLogger::new(store.pool().clone())),
                store: Some(store),
            })
        }
        "memory" => {
            info!("Memory backend: in-process arena (not persisted)");
            Ok(Memory::in_process())
        }
        other => Err(VerdantError::Config(format!(
            "unknown memory backend '{other}' (expected 'sqlite' or 'memory')"
        ))),
    }
}
