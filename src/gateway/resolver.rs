//! Identity → durable session.

use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info};
use verdant_core::{
    config::SessionConfig,
    error::VerdantError,
    session::{Identity, IdentityKind, Session, SessionIdentity, SessionPatch, SetCookie},
    traits::SessionStore,
};

/// A resolved session, already counted for the inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionHandle {
    pub session: Session,
    /// Set when a cookie session was created; the HTTP layer must send it.
    pub set_cookie: Option<SetCookie>,
    pub created: bool,
}

impl SessionHandle {
    pub fn id(&self) -> &str {
        &self.session.id
    }
}

/// Maps inbound identities to sessions, creating them on first contact.
pub struct SessionResolver {
    store: Arc<dyn SessionStore>,
    config: SessionConfig,
}

impl SessionResolver {
    pub fn new(store: Arc<dyn SessionStore>, config: SessionConfig) -> Self {
        Self { store, config }
    }

    /// Resolve the identity (explicit id, else cookie, else platform id) and
    /// count one inbound message against the session.
    ///
    /// A message with no identity at all starts a fresh cookie session.
    pub async fn resolve(&self, identity: &SessionIdentity) -> Result<SessionHandle, VerdantError> {
        let identity = identity
            .primary()
            .unwrap_or_else(|| Identity::Cookie(String::new()));

        let (session_id, created) = match self.find(&identity).await? {
            Some(session) => (session.id, false),
            None => {
                let session = self.store.create(&identity).await?;
                // A concurrent writer may have mapped the platform id first;
                // its session comes back already counted.
                let created = session.message_count == 0;
                (session.id, created)
            }
        };

        let session = self
            .store
            .update(&session_id, &SessionPatch::inbound_message(Utc::now()))
            .await?
            .ok_or_else(|| VerdantError::Session(format!("session {session_id} vanished")))?;

        let set_cookie = (created && identity.kind() == IdentityKind::Cookie).then(|| SetCookie {
            name: self.config.cookie_name.clone(),
            value: session.id.clone(),
            max_age: self.config.cookie_max_age(),
        });

        if created {
            info!(
                "session: created {} ({})",
                session.id,
                identity.kind().as_str()
            );
        } else {
            debug!(
                "session: resolved {} (messages: {})",
                session.id, session.message_count
            );
        }

        Ok(SessionHandle {
            session,
            set_cookie,
            created,
        })
    }

    async fn find(&self, identity: &Identity) -> Result<Option<Session>, VerdantError> {
        match identity {
            Identity::Explicit(id) => self.store.get(id).await,
            Identity::Cookie(id) if id.is_empty() => Ok(None),
            Identity::Cookie(id) => self.store.get(id).await,
            Identity::Telegram(_) => {
                let Some(platform_id) = identity.platform_id() else {
                    return Ok(None);
                };
                match self.store.map_identity(&platform_id).await? {
                    Some(session_id) => self.store.get(&session_id).await,
                    None => Ok(None),
                }
            }
        }
    }
}
