//! Session records and the platform identity map.

use super::{from_db_time, to_db_time, Store};
use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, info};
use uuid::Uuid;
use verdant_core::{
    error::VerdantError,
    session::{Identity, IdentityKind, Session, SessionPatch},
    traits::SessionStore,
};

type SessionRow = (String, String, Option<String>, String, String, i64);

const SESSION_COLUMNS: &str =
    "id, identity_kind, external_id, created_at, last_activity, message_count";

fn session_from_row(row: SessionRow) -> Result<Session, VerdantError> {
    let (id, kind, external_id, created_at, last_activity, message_count) = row;
    let identity_kind = IdentityKind::parse(&kind).ok_or_else(|| {
        VerdantError::Memory(format!("session {id} has unknown identity kind '{kind}'"))
    })?;
    Ok(Session {
        identity_kind,
        external_id,
        created_at: from_db_time(&created_at)?,
        last_activity: from_db_time(&last_activity)?,
        message_count: u64::try_from(message_count).unwrap_or(0),
        id,
    })
}

#[async_trait]
impl SessionStore for Store {
    async fn create(&self, identity: &Identity) -> Result<Session, VerdantError> {
        let id = match identity {
            Identity::Explicit(id) => id.clone(),
            Identity::Cookie(_) | Identity::Telegram(_) => Uuid::new_v4().to_string(),
        };
        let platform_id = identity.platform_id();
        let now = to_db_time(Utc::now());

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| VerdantError::Memory(format!("begin failed: {e}")))?;

        let inserted = sqlx::query(
            "INSERT INTO sessions \
             (id, identity_kind, external_id, created_at, last_activity, message_count) \
             VALUES (?, ?, ?, ?, ?, 0) \
             ON CONFLICT(id) DO NOTHING",
        )
        .bind(&id)
        .bind(identity.kind().as_str())
        .bind(&platform_id)
        .bind(&now)
        .bind(&now)
        .execute(&mut *tx)
        .await
        .map_err(|e| VerdantError::Memory(format!("insert session failed: {e}")))?
        .rows_affected();

        if let Some(platform_id) = &platform_id {
            let mapped = sqlx::query(
                "INSERT INTO identity_map (platform_id, session_id) VALUES (?, ?) \
                 ON CONFLICT(platform_id) DO NOTHING",
            )
            .bind(platform_id)
            .bind(&id)
            .execute(&mut *tx)
            .await
            .map_err(|e| VerdantError::Memory(format!("insert identity failed: {e}")))?
            .rows_affected();

            if mapped == 0 {
                // Another writer mapped this account first: theirs wins.
                tx.rollback()
                    .await
                    .map_err(|e| VerdantError::Memory(format!("rollback failed: {e}")))?;
                let existing = self.map_identity(platform_id).await?.ok_or_else(|| {
                    VerdantError::Session(format!("mapping for {platform_id} vanished"))
                })?;
                debug!("session: {platform_id} already mapped to {existing}");
                return self.get(&existing).await?.ok_or_else(|| {
                    VerdantError::Session(format!("mapped session {existing} not found"))
                });
            }
        }

        tx.commit()
            .await
            .map_err(|e| VerdantError::Memory(format!("commit failed: {e}")))?;

        if inserted > 0 {
            info!(
                "session: created {id} ({}{})",
                identity.kind().as_str(),
                platform_id
                    .as_deref()
                    .map(|p| format!(", {p}"))
                    .unwrap_or_default()
            );
        }

        self.get(&id)
            .await?
            .ok_or_else(|| VerdantError::Session(format!("session {id} missing after insert")))
    }

    async fn get(&self, id: &str) -> Result<Option<Session>, VerdantError> {
        let sql = format!("SELECT {SESSION_COLUMNS} FROM sessions WHERE id = ?");
        let row: Option<SessionRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| VerdantError::Memory(format!("query failed: {e}")))?;

        row.map(session_from_row).transpose()
    }

    async fn update(
        &self,
        id: &str,
        patch: &SessionPatch,
    ) -> Result<Option<Session>, VerdantError> {
        // One statement, so concurrent increments never lose an update.
        let sql = format!(
            "UPDATE sessions \
             SET message_count = message_count + ?, \
                 last_activity = COALESCE(?, last_activity) \
             WHERE id = ? \
             RETURNING {SESSION_COLUMNS}"
        );
        let delta = i64::try_from(patch.message_count_delta).unwrap_or(i64::MAX);
        let row: Option<SessionRow> = sqlx::query_as(&sql)
            .bind(delta)
            .bind(patch.last_activity.map(to_db_time))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| VerdantError::Memory(format!("update session failed: {e}")))?;

        row.map(session_from_row).transpose()
    }

    async fn map_identity(&self, platform_id: &str) -> Result<Option<String>, VerdantError> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT session_id FROM identity_map WHERE platform_id = ?")
                .bind(platform_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| VerdantError::Memory(format!("query failed: {e}")))?;

        Ok(row.map(|(id,)| id))
    }
}
