//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::auth::AuthService;
use crate::hub::SessionGate;
use crate::persistence::SqliteStore;
use crate::ws::ForumHub;

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Registration, login and logout.
    pub auth: AuthService,
    /// Session check performed before every WebSocket upgrade.
    pub gate: SessionGate<SqliteStore>,
    /// Live connection registry and fan-out.
    pub hub: Arc<ForumHub>,
    /// Name of the cookie carrying the session token.
    pub session_cookie: Arc<str>,
}

impl AppState {
    /// Wires the gate and auth service to the same store.
    #[must_use]
    pub fn new(
        store: Arc<SqliteStore>,
        hub: Arc<ForumHub>,
        hash_cost: u32,
        session_ttl: std::time::Duration,
        session_cookie: &str,
    ) -> Self {
        Self {
            auth: AuthService::new(Arc::clone(&store), hash_cost, session_ttl),
            gate: SessionGate::new(store),
            hub,
            session_cookie: Arc::from(session_cookie),
        }
    }
}
