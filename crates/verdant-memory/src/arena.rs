//! In-process store. Nodes live in one map keyed by id and refer to their
//! parent by id, so the tree never needs back-references.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::Mutex;
use uuid::Uuid;
use verdant_core::{
    conversation::{ConversationNode, Role},
    error::VerdantError,
    session::{Identity, Session, SessionPatch},
    traits::{ConversationStore, SessionStore},
};

#[derive(Default)]
struct Arena {
    sessions: HashMap<String, Session>,
    identities: HashMap<String, String>,
    nodes: HashMap<String, ConversationNode>,
    /// Node ids per session, in insertion order.
    order: HashMap<String, Vec<String>>,
}

/// Session and conversation storage that lives only as long as the process.
#[derive(Default)]
pub struct ArenaStore {
    inner: Mutex<Arena>,
}

impl ArenaStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for ArenaStore {
    async fn create(&self, identity: &Identity) -> Result<Session, VerdantError> {
        let mut arena = self.inner.lock().await;
        let platform_id = identity.platform_id();

        if let Some(existing) = platform_id
            .as_ref()
            .and_then(|p| arena.identities.get(p))
            .and_then(|id| arena.sessions.get(id))
        {
            return Ok(existing.clone());
        }

        let id = match identity {
            Identity::Explicit(id) => id.clone(),
            Identity::Cookie(_) | Identity::Telegram(_) => Uuid::new_v4().to_string(),
        };
        if let Some(existing) = arena.sessions.get(&id) {
            return Ok(existing.clone());
        }

        let now = Utc::now();
        let session = Session {
            id: id.clone(),
            identity_kind: identity.kind(),
            external_id: platform_id.clone(),
            created_at: now,
            last_activity: now,
            message_count: 0,
        };
        arena.sessions.insert(id.clone(), session.clone());
        if let Some(platform_id) = platform_id {
            arena.identities.insert(platform_id, id);
        }
        Ok(session)
    }

    async fn get(&self, id: &str) -> Result<Option<Session>, VerdantError> {
        Ok(self.inner.lock().await.sessions.get(id).cloned())
    }

    async fn update(
        &self,
        id: &str,
        patch: &SessionPatch,
    ) -> Result<Option<Session>, VerdantError> {
        let mut arena = self.inner.lock().await;
        let Some(session) = arena.sessions.get_mut(id) else {
            return Ok(None);
        };
        session.message_count = session
            .message_count
            .saturating_add(patch.message_count_delta);
        if let Some(at) = patch.last_activity {
            session.last_activity = at;
        }
        Ok(Some(session.clone()))
    }

    async fn map_identity(&self, platform_id: &str) -> Result<Option<String>, VerdantError> {
        Ok(self.inner.lock().await.identities.get(platform_id).cloned())
    }
}

#[async_trait]
impl ConversationStore for ArenaStore {
    async fn append_node(
        &self,
        session_id: &str,
        parent_id: Option<&str>,
        role: Role,
        content: &str,
    ) -> Result<ConversationNode, VerdantError> {
        let mut arena = self.inner.lock().await;
        if !arena.sessions.contains_key(session_id) {
            return Err(VerdantError::Session(format!("unknown session {session_id}")));
        }

        match parent_id {
            Some(parent) => match arena.nodes.get(parent) {
                Some(p) if p.session_id == session_id => {}
                Some(_) => {
                    return Err(VerdantError::Memory(format!(
                        "parent {parent} belongs to another session"
                    )))
                }
                None => return Err(VerdantError::Memory(format!("unknown parent node {parent}"))),
            },
            None => {
                if arena.order.get(session_id).is_some_and(|ids| !ids.is_empty()) {
                    return Err(VerdantError::Memory(format!(
                        "session {session_id} already has a root node"
                    )));
                }
            }
        }

        let node = ConversationNode {
            id: Uuid::new_v4().to_string(),
            parent_id: parent_id.map(str::to_string),
            session_id: session_id.to_string(),
            role,
            content: content.to_string(),
            created_at: Utc::now(),
        };
        arena
            .order
            .entry(session_id.to_string())
            .or_default()
            .push(node.id.clone());
        arena.nodes.insert(node.id.clone(), node.clone());
        Ok(node)
    }

    async fn list_nodes(&self, session_id: &str) -> Result<Vec<ConversationNode>, VerdantError> {
        let arena = self.inner.lock().await;
        let mut nodes: Vec<ConversationNode> = arena
            .order
            .get(session_id)
            .map(|ids| ids.iter().filter_map(|id| arena.nodes.get(id).cloned()).collect())
            .unwrap_or_default();
        // Stable: equal timestamps keep insertion order.
        nodes.sort_by_key(|n| n.created_at);
        Ok(nodes)
    }

    async fn get_node(&self, id: &str) -> Result<Option<ConversationNode>, VerdantError> {
        Ok(self.inner.lock().await.nodes.get(id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_telegram_identity_maps_once() {
        let store = ArenaStore::new();
        let a = store.create(&Identity::Telegram(42)).await.unwrap();
        let b = store.create(&Identity::Telegram(42)).await.unwrap();
        assert_eq!(a.id, b.id);
        assert_eq!(
            store.map_identity("telegram:42").await.unwrap(),
            Some(a.id.clone())
        );
    }

    #[tokio::test]
    async fn test_update_increments() {
        let store = ArenaStore::new();
        let s = store.create(&Identity::Explicit("x".into())).await.unwrap();
        let patch = SessionPatch::inbound_message(Utc::now());
        store.update(&s.id, &patch).await.unwrap();
        let s = store.update(&s.id, &patch).await.unwrap().unwrap();
        assert_eq!(s.message_count, 2);
        assert!(store.update("nope", &patch).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_tree_in_creation_order() {
        let store = ArenaStore::new();
        let s = store.create(&Identity::Explicit("t".into())).await.unwrap();
        let root = store
            .append_node(&s.id, None, Role::User, "hi")
            .await
            .unwrap();
        let reply = store
            .append_node(&s.id, Some(&root.id), Role::Assistant, "hello")
            .await
            .unwrap();
        let next = store
            .append_node(&s.id, Some(&reply.id), Role::User, "more")
            .await
            .unwrap();

        let nodes = store.list_nodes(&s.id).await.unwrap();
        let ids: Vec<&str> = nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec![root.id.as_str(), reply.id.as_str(), next.id.as_str()]);
        assert!(store.list_nodes("other").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_rejects_second_root_and_foreign_parent() {
        let store = ArenaStore::new();
        let a = store.create(&Identity::Explicit("a".into())).await.unwrap();
        let b = store.create(&Identity::Explicit("b".into())).await.unwrap();
        let root = store
            .append_node(&a.id, None, Role::User, "hi")
            .await
            .unwrap();
        assert!(store.append_node(&a.id, None, Role::User, "again").await.is_err());
        assert!(store
            .append_node(&b.id, Some(&root.id), Role::Assistant, "cross")
            .await
            .is_err());
    }
}
