//! Authentication endpoints: register, login, logout.

use std::net::SocketAddr;

use axum::body::Bytes;
use axum::extract::{ConnectInfo, State};
use axum::http::header::USER_AGENT;
use axum::http::{Extensions, HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};
use axum_extra::extract::CookieJar;
use axum_extra::extract::cookie::{Cookie, SameSite};

use crate::api::dto::{
    LoginRequest, LoginResponse, LogoutRequest, LogoutResponse, RegisterRequest, RegisterResponse,
};
use crate::app_state::AppState;
use crate::auth::ClientInfo;
use crate::domain::SessionToken;
use crate::error::{ErrorResponse, ForumError};

/// `POST /register` — Create a user account.
///
/// # Errors
///
/// Returns [`ForumError::InvalidRequest`] on validation failure and
/// [`ForumError::Conflict`] if the nickname or e-mail is taken.
#[utoipa::path(
    post,
    path = "/register",
    tag = "Auth",
    summary = "Register a user",
    description = "Creates a user account. The password is stored as a bcrypt hash.",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User registered", body = RegisterResponse),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 409, description = "Nickname or e-mail already registered", body = ErrorResponse),
    )
)]
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ForumError> {
    let nickname = req.nickname.trim().to_string();
    let user_id = state.auth.register(req.into()).await?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            user_id: user_id.get(),
            nickname,
        }),
    ))
}

/// `POST /login` — Exchange credentials for a session token.
///
/// # Errors
///
/// Returns [`ForumError::InvalidCredentials`] for an unknown user or a
/// wrong password.
#[utoipa::path(
    post,
    path = "/login",
    tag = "Auth",
    summary = "Log in",
    description = "Verifies a nickname or e-mail and password, opens a session, and sets the session cookie.",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = LoginResponse),
        (status = 401, description = "Invalid credentials", body = ErrorResponse),
    )
)]
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    extensions: Extensions,
    headers: HeaderMap,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ForumError> {
    let client = ClientInfo {
        ip: extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string()),
        user_agent: headers
            .get(USER_AGENT)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned),
    };

    let outcome = state
        .auth
        .authenticate(&req.username, &req.password, client)
        .await?;

    let cookie = Cookie::build((
        state.session_cookie.to_string(),
        outcome.token.as_str().to_owned(),
    ))
    .path("/")
    .http_only(true)
    .same_site(SameSite::Lax);

    Ok((
        jar.add(cookie),
        Json(LoginResponse {
            user_id: outcome.user_id.get(),
            session_token: outcome.token.as_str().to_owned(),
        }),
    ))
}

/// `POST /logout` — Invalidate the current session.
///
/// The token is read from the session cookie, or from the JSON body when
/// no cookie is sent. The cookie is cleared either way.
///
/// # Errors
///
/// Returns [`ForumError::InvalidRequest`] if no token is supplied or the
/// body is not valid JSON.
#[utoipa::path(
    post,
    path = "/logout",
    tag = "Auth",
    summary = "Log out",
    description = "Invalidates the session token. WebSocket connections opened with it stay connected.",
    request_body = LogoutRequest,
    responses(
        (status = 200, description = "Session closed", body = LogoutResponse),
        (status = 400, description = "No session token supplied", body = ErrorResponse),
    )
)]
pub async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
    body: Bytes,
) -> Result<impl IntoResponse, ForumError> {
    let from_body = if body.is_empty() {
        None
    } else {
        serde_json::from_slice::<LogoutRequest>(&body)
            .map_err(|e| ForumError::InvalidRequest(e.to_string()))?
            .session_token
    };

    let raw = jar
        .get(&state.session_cookie)
        .map(|cookie| cookie.value().trim().to_owned())
        .filter(|value| !value.is_empty())
        .or(from_body);
    let Some(token) = raw.as_deref().and_then(SessionToken::parse) else {
        return Err(ForumError::InvalidRequest(
            "missing session token".to_string(),
        ));
    };

    let logged_out = state.auth.logout(&token).await?;
    let jar = jar.remove(Cookie::build(state.session_cookie.to_string()).path("/"));

    Ok((jar, Json(LogoutResponse { logged_out })))
}

/// Authentication routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
}
