//! Service error types with HTTP status code mapping.
//!
//! [`ForumError`] is the error type returned by every HTTP handler. Each
//! variant maps to a specific HTTP status code and structured JSON error
//! response.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

use crate::auth::{AuthError, StoreError};
use crate::hub::{GateError, HubError};

/// Structured JSON error response body.
///
/// All error responses follow this shape:
/// ```json
/// {
///   "error": {
///     "code": 2001,
///     "message": "unauthorized: missing session token",
///     "details": null
///   }
/// }
/// ```
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Structured error payload.
    pub error: ErrorBody,
}

/// Inner error body with numeric code and human-readable message.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Numeric error code (see code ranges on [`ForumError`]).
    pub code: u32,
    /// Human-readable error message.
    pub message: String,
    /// Optional additional details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Server-side error enum with HTTP status code mapping.
///
/// # Error Code Ranges
///
/// | Range     | Category        | HTTP Status                    |
/// |-----------|-----------------|--------------------------------|
/// | 1000–1999 | Validation      | 400 Bad Request                |
/// | 2000–2999 | Auth / Conflict | 401 Unauthorized / 409 Conflict |
/// | 3000–3999 | Server          | 500 / 503                      |
#[derive(Debug, thiserror::Error)]
pub enum ForumError {
    /// Request validation failed.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Login failed.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// A connection or request lacked a valid session.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Nickname or e-mail already registered.
    #[error("conflict: {0}")]
    Conflict(String),

    /// A dependency (database, hub) cannot serve the request right now.
    #[error("service unavailable: {0}")]
    Unavailable(String),

    /// Persistence layer failure.
    #[error("persistence error: {0}")]
    PersistenceError(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ForumError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::InvalidRequest(_) => 1001,
            Self::InvalidCredentials => 2001,
            Self::Unauthorized(_) => 2002,
            Self::Conflict(_) => 2003,
            Self::Internal(_) => 3000,
            Self::PersistenceError(_) => 3001,
            Self::Unavailable(_) => 3002,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::InvalidCredentials | Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::PersistenceError(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<AuthError> for ForumError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::InvalidRequest(msg) => Self::InvalidRequest(msg),
            AuthError::InvalidCredentials => Self::InvalidCredentials,
            AuthError::AlreadyRegistered(msg) => Self::Conflict(msg),
            AuthError::Store(store) => store.into(),
            AuthError::Credential(inner) => Self::Internal(inner.to_string()),
        }
    }
}

impl From<StoreError> for ForumError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Duplicate(msg) => Self::Conflict(msg),
            StoreError::Database(msg) => Self::PersistenceError(msg),
        }
    }
}

impl From<GateError> for ForumError {
    fn from(e: GateError) -> Self {
        match e {
            GateError::MissingToken | GateError::InvalidSession => {
                Self::Unauthorized(e.to_string())
            }
            GateError::StoreUnavailable(_) => Self::Unavailable(e.to_string()),
        }
    }
}

impl From<HubError> for ForumError {
    fn from(e: HubError) -> Self {
        match e {
            HubError::ShuttingDown => Self::Unavailable(e.to_string()),
            HubError::DuplicateConnection(_) => Self::Internal(e.to_string()),
        }
    }
}

impl IntoResponse for ForumError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.error_code(),
                message: self.to_string(),
                details: None,
            },
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        response
    }
}
