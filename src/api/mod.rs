//! REST API layer: route handlers, DTOs, router composition, and the
//! OpenAPI document.

pub mod dto;
pub mod handlers;

use axum::Router;
use utoipa::OpenApi;

use crate::app_state::AppState;

/// OpenAPI description of the REST endpoints.
#[derive(Debug, OpenApi)]
#[openapi(
    paths(
        handlers::auth::register,
        handlers::auth::login,
        handlers::auth::logout,
        handlers::system::health_handler,
    ),
    components(schemas(
        dto::RegisterRequest,
        dto::RegisterResponse,
        dto::LoginRequest,
        dto::LoginResponse,
        dto::LogoutRequest,
        dto::LogoutResponse,
        handlers::system::HealthResponse,
        crate::error::ErrorResponse,
        crate::error::ErrorBody,
    )),
    tags(
        (name = "Auth", description = "Registration and sessions"),
        (name = "System", description = "Service status"),
    )
)]
pub struct ApiDoc;

/// Builds the complete API router with all REST endpoints.
pub fn build_router() -> Router<AppState> {
    handlers::routes()
}
