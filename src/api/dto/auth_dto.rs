//! Register, login and logout DTOs.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::Registration;

/// Request body for `POST /register`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct RegisterRequest {
    /// Unique display name.
    pub nickname: String,
    /// Age in years.
    pub age: u32,
    /// Free-form gender string.
    #[serde(default)]
    pub gender: String,
    /// Given name.
    #[serde(default)]
    pub first_name: String,
    /// Family name.
    #[serde(default)]
    pub last_name: String,
    /// Unique e-mail address.
    pub email: String,
    /// Plain-text password.
    pub password: String,
}

impl From<RegisterRequest> for Registration {
    fn from(req: RegisterRequest) -> Self {
        Self {
            nickname: req.nickname,
            age: req.age,
            gender: req.gender,
            first_name: req.first_name,
            last_name: req.last_name,
            email: req.email,
            password: req.password,
        }
    }
}

/// Response body for `POST /register`.
#[derive(Debug, Serialize, ToSchema)]
pub struct RegisterResponse {
    /// Id of the new user.
    pub user_id: i64,
    /// Registered nickname.
    pub nickname: String,
}

/// Request body for `POST /login`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    /// Nickname or e-mail address.
    pub username: String,
    /// Plain-text password.
    pub password: String,
}

/// Response body for `POST /login`. The token is also set as a cookie.
#[derive(Debug, Serialize, ToSchema)]
pub struct LoginResponse {
    /// Authenticated user.
    pub user_id: i64,
    /// Session token to present when opening `/ws`.
    pub session_token: String,
}

/// Optional request body for `POST /logout`, used when no cookie is sent.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct LogoutRequest {
    /// Session token to invalidate.
    #[serde(default)]
    pub session_token: Option<String>,
}

/// Response body for `POST /logout`.
#[derive(Debug, Serialize, ToSchema)]
pub struct LogoutResponse {
    /// `false` if the session was unknown or already closed.
    pub logged_out: bool,
}
