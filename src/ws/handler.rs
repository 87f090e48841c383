//! Axum WebSocket upgrade handler.

use std::sync::Arc;

use axum::extract::ws::WebSocketUpgrade;
use axum::extract::ws::rejection::WebSocketUpgradeRejection;
use axum::extract::{Query, State};
use axum::response::{IntoResponse, Response};
use axum_extra::extract::CookieJar;
use serde::Deserialize;

use super::connection::serve_connection;
use crate::app_state::AppState;
use crate::error::ForumError;
use crate::hub::HubError;

/// Optional query parameters of `GET /ws`.
#[derive(Debug, Default, Deserialize)]
pub struct WsParams {
    /// Session token, for clients that cannot send cookies.
    pub token: Option<String>,
}

/// `GET /ws` — Upgrade HTTP connection to WebSocket.
///
/// The session token is taken from the session cookie, falling back to the
/// `token` query parameter when the cookie is absent or empty. It is
/// checked before the upgrade is accepted, so a rejected client never gets
/// a socket. Upgrade header problems are only reported once the session is
/// known to be valid.
///
/// # Errors
///
/// Returns [`ForumError::Unauthorized`] for a missing or invalid session and
/// [`ForumError::Unavailable`] if the session store is down or the hub is
/// shutting down.
pub async fn ws_handler(
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
    State(state): State<AppState>,
    jar: CookieJar,
    Query(params): Query<WsParams>,
) -> Result<Response, ForumError> {
    let token = jar
        .get(&state.session_cookie)
        .map(|cookie| cookie.value().trim().to_owned())
        .filter(|value| !value.is_empty())
        .or(params.token);

    let admission = state.gate.admit(token.as_deref()).await?;
    if !state.hub.is_open().await {
        return Err(HubError::ShuttingDown.into());
    }

    let ws = match ws {
        Ok(ws) => ws,
        Err(rejection) => return Ok(rejection.into_response()),
    };

    let hub = Arc::clone(&state.hub);
    Ok(ws.on_upgrade(move |socket| serve_connection(hub, admission, socket)))
}
