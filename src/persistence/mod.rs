//! Persistence layer: SQLite storage for users and sessions.
//!
//! The concrete implementation uses `sqlx::SqlitePool` with migrations
//! embedded from `migrations/` at compile time.

pub mod models;
pub mod sqlite;

pub use models::{NewUser, SessionRecord, StoredCredentials};
pub use sqlite::{DatabaseSettings, SqliteStore};
