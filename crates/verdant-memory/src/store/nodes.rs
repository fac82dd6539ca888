//! Append-only conversation tree.

use super::{from_db_time, to_db_time, Store};
use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;
use verdant_core::{
    conversation::{ConversationNode, Role},
    error::VerdantError,
    traits::ConversationStore,
};

type NodeRow = (String, Option<String>, String, String, String, String);

const NODE_COLUMNS: &str = "id, parent_id, session_id, role, content, created_at";

fn node_from_row(row: NodeRow) -> Result<ConversationNode, VerdantError> {
    let (id, parent_id, session_id, role, content, created_at) = row;
    let role = Role::parse(&role)
        .ok_or_else(|| VerdantError::Memory(format!("node {id} has unknown role '{role}'")))?;
    Ok(ConversationNode {
        id,
        parent_id,
        session_id,
        role,
        content,
        created_at: from_db_time(&created_at)?,
    })
}

#[async_trait]
impl ConversationStore for Store {
    /// Append a node. A parent must belong to the same session; a node
    /// without a parent is only accepted as the first node of a session.
    async fn append_node(
        &self,
        session_id: &str,
        parent_id: Option<&str>,
        role: Role,
        content: &str,
    ) -> Result<ConversationNode, VerdantError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| VerdantError::Memory(format!("begin failed: {e}")))?;

        let session: Option<(String,)> = sqlx::query_as("SELECT id FROM sessions WHERE id = ?")
            .bind(session_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| VerdantError::Memory(format!("query failed: {e}")))?;
        if session.is_none() {
            return Err(VerdantError::Session(format!("unknown session {session_id}")));
        }

        match parent_id {
            Some(parent) => {
                let owner: Option<(String,)> =
                    sqlx::query_as("SELECT session_id FROM nodes WHERE id = ?")
                        .bind(parent)
                        .fetch_optional(&mut *tx)
                        .await
                        .map_err(|e| VerdantError::Memory(format!("query failed: {e}")))?;
                match owner {
                    Some((owner,)) if owner == session_id => {}
                    Some(_) => {
                        return Err(VerdantError::Memory(format!(
                            "parent {parent} belongs to another session"
                        )))
                    }
                    None => {
                        return Err(VerdantError::Memory(format!("unknown parent node {parent}")))
                    }
                }
            }
            None => {
                let (count,): (i64,) =
                    sqlx::query_as("SELECT COUNT(*) FROM nodes WHERE session_id = ?")
                        .bind(session_id)
                        .fetch_one(&mut *tx)
                        .await
                        .map_err(|e| VerdantError::Memory(format!("query failed: {e}")))?;
                if count > 0 {
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

        sqlx::query(
            "INSERT INTO nodes (id, parent_id, session_id, role, content, created_at) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&node.id)
        .bind(&node.parent_id)
        .bind(&node.session_id)
        .bind(node.role.as_str())
        .bind(&node.content)
        .bind(to_db_time(node.created_at))
        .execute(&mut *tx)
        .await
        .map_err(|e| VerdantError::Memory(format!("insert node failed: {e}")))?;

        tx.commit()
            .await
            .map_err(|e| VerdantError::Memory(format!("commit failed: {e}")))?;

        Ok(node)
    }

    async fn list_nodes(&self, session_id: &str) -> Result<Vec<ConversationNode>, VerdantError> {
        let sql = format!(
            "SELECT {NODE_COLUMNS} FROM nodes WHERE session_id = ? \
             ORDER BY created_at ASC, seq ASC"
        );
        let rows: Vec<NodeRow> = sqlx::query_as(&sql)
            .bind(session_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| VerdantError::Memory(format!("query failed: {e}")))?;

        rows.into_iter().map(node_from_row).collect()
    }

    async fn get_node(&self, id: &str) -> Result<Option<ConversationNode>, VerdantError> {
        let sql = format!("SELECT {NODE_COLUMNS} FROM nodes WHERE id = ?");
        let row: Option<NodeRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| VerdantError::Memory(format!("query failed: {e}")))?;

        row.map(node_from_row).transpose()
    }
}
