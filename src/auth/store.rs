//! Session store collaborator interface and an in-memory implementation.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::domain::{SessionToken, UserId};

/// Failures of a session or user store.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// A unique constraint was violated (e.g. nickname already taken).
    #[error("duplicate record: {0}")]
    Duplicate(String),

    /// The backing database failed.
    #[error("database error: {0}")]
    Database(String),
}

/// Data recorded when a session is opened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSession {
    /// Owner of the session.
    pub user_id: UserId,
    /// How long the token stays valid.
    pub ttl: Duration,
    /// SHA-256 fingerprint of the client address, if known.
    pub ip_hash: Option<String>,
    /// SHA-256 fingerprint of the client user agent, if known.
    pub user_agent_hash: Option<String>,
}

impl NewSession {
    /// Expiry instant for a session created at `now`.
    #[must_use]
    pub fn expires_at(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let ttl = chrono::Duration::from_std(self.ttl).unwrap_or(chrono::Duration::MAX);
        now.checked_add_signed(ttl).unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}

/// Maps session tokens to users.
///
/// `resolve` is the only operation the session gate uses, and it must not
/// mutate anything.
pub trait SessionStore: Send + Sync + 'static {
    /// Opens a session and returns its freshly generated token.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the session cannot be recorded.
    fn create(
        &self,
        session: NewSession,
    ) -> impl Future<Output = Result<SessionToken, StoreError>> + Send;

    /// Looks up the user behind an active (not expired, not logged out)
    /// session.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] only when the lookup itself fails; an
    /// unknown token is `Ok(None)`.
    fn resolve(
        &self,
        token: &SessionToken,
    ) -> impl Future<Output = Result<Option<UserId>, StoreError>> + Send;

    /// Invalidates a session. Returns `false` if it was not active.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the update fails.
    fn expire(&self, token: &SessionToken) -> impl Future<Output = Result<bool, StoreError>> + Send;
}

/// Process-local session store.
///
/// Sessions are lost on restart; useful for tests and single-node demos.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    sessions: Mutex<HashMap<SessionToken, (UserId, DateTime<Utc>)>>,
}

impl MemorySessionStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a session with a caller-chosen token that never expires.
    pub fn insert(&self, token: SessionToken, user_id: UserId) {
        self.lock().insert(token, (user_id, DateTime::<Utc>::MAX_UTC));
    }

    /// Drops a session outright.
    pub fn remove(&self, token: &SessionToken) -> bool {
        self.lock().remove(token).is_some()
    }

    /// Number of stored sessions, expired ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns `true` if no sessions are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<SessionToken, (UserId, DateTime<Utc>)>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl SessionStore for MemorySessionStore {
    async fn create(&self, session: NewSession) -> Result<SessionToken, StoreError> {
        let token = SessionToken::generate();
        let expires_at = session.expires_at(Utc::now());
        self.lock()
            .insert(token.clone(), (session.user_id, expires_at));
        Ok(token)
    }

    async fn resolve(&self, token: &SessionToken) -> Result<Option<UserId>, StoreError> {
        let now = Utc::now();
        Ok(self
            .lock()
            .get(token)
            .filter(|(_, expires_at)| *expires_at > now)
            .map(|(user_id, _)| *user_id))
    }

    async fn expire(&self, token: &SessionToken) -> Result<bool, StoreError> {
        Ok(self.remove(token))
    }
}
