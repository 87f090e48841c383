//! Service configuration loaded from environment variables.
//!
//! All settings come from environment variables (or a `.env` file via
//! `dotenvy`), each with a default suitable for local development.

use std::net::SocketAddr;
use std::time::Duration;

use crate::hub::BroadcastPolicy;
use crate::persistence::DatabaseSettings;

/// Output format of the tracing subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable lines.
    Pretty,
    /// One JSON object per line.
    Json,
}

/// Top-level service configuration.
///
/// Loaded once at startup via [`ForumConfig::from_env`].
#[derive(Debug, Clone)]
pub struct ForumConfig {
    /// Socket address to bind the HTTP server to (e.g. `0.0.0.0:8080`).
    pub listen_addr: SocketAddr,

    /// SQLite connection string.
    pub database_url: String,

    /// Maximum number of database connections in the pool.
    pub database_max_connections: u32,

    /// Timeout in seconds for acquiring a database connection.
    pub database_connect_timeout_secs: u64,

    /// Lifetime of a session token in seconds.
    pub session_ttl_secs: u64,

    /// Seconds between sweeps of expired and logged-out sessions (0 = never).
    pub session_prune_interval_secs: u64,

    /// How long an ended session row is kept after logout or expiry.
    pub session_retention_secs: u64,

    /// Name of the cookie carrying the session token.
    pub session_cookie_name: String,

    /// bcrypt cost factor for new password hashes.
    pub password_hash_cost: u32,

    /// Upper bound in milliseconds for one write to one hub recipient.
    pub hub_write_timeout_ms: u64,

    /// Whether the author of a message receives its own broadcast.
    pub hub_echo_to_sender: bool,

    /// Log output format.
    pub log_format: LogFormat,
}

impl Default for ForumConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            database_url: "sqlite://forum.db".to_string(),
            database_max_connections: 5,
            database_connect_timeout_secs: 5,
            session_ttl_secs: 24 * 60 * 60,
            session_prune_interval_secs: 60 * 60,
            session_retention_secs: 30 * 24 * 60 * 60,
            session_cookie_name: "session_id".to_string(),
            password_hash_cost: bcrypt::DEFAULT_COST,
            hub_write_timeout_ms: 5_000,
            hub_echo_to_sender: true,
            log_format: LogFormat::Pretty,
        }
    }
}

impl ForumConfig {
    /// Loads configuration from environment variables.
    ///
    /// Falls back to [`ForumConfig::default`] values when a variable is not
    /// set. Calls `dotenvy::dotenv().ok()` to optionally load a `.env` file.
    ///
    /// # Errors
    ///
    /// Returns an error if `LISTEN_ADDR` is set but cannot be parsed as
    /// a [`SocketAddr`].
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        dotenvy::dotenv().ok();
        let defaults = Self::default();

        let listen_addr = match std::env::var("LISTEN_ADDR") {
            Ok(raw) => raw.parse()?,
            Err(_) => defaults.listen_addr,
        };

        let log_format = match std::env::var("LOG_FORMAT").ok().as_deref() {
            Some("json") | Some("JSON") => LogFormat::Json,
            _ => LogFormat::Pretty,
        };

        Ok(Self {
            listen_addr,
            database_url: std::env::var("DATABASE_URL").unwrap_or(defaults.database_url),
            database_max_connections: parse_env(
                "DATABASE_MAX_CONNECTIONS",
                defaults.database_max_connections,
            ),
            database_connect_timeout_secs: parse_env(
                "DATABASE_CONNECT_TIMEOUT_SECS",
                defaults.database_connect_timeout_secs,
            ),
            session_ttl_secs: parse_env("SESSION_TTL_SECS", defaults.session_ttl_secs),
            session_prune_interval_secs: parse_env(
                "SESSION_PRUNE_INTERVAL_SECS",
                defaults.session_prune_interval_secs,
            ),
            session_retention_secs: parse_env(
                "SESSION_RETENTION_SECS",
                defaults.session_retention_secs,
            ),
            session_cookie_name: std::env::var("SESSION_COOKIE_NAME")
                .ok()
                .filter(|name| !name.trim().is_empty())
                .unwrap_or(defaults.session_cookie_name),
            password_hash_cost: parse_env("PASSWORD_HASH_COST", defaults.password_hash_cost),
            hub_write_timeout_ms: parse_env("HUB_WRITE_TIMEOUT_MS", defaults.hub_write_timeout_ms),
            hub_echo_to_sender: parse_env_bool("HUB_ECHO_TO_SENDER", defaults.hub_echo_to_sender),
            log_format,
        })
    }

    /// Database settings derived from this configuration.
    #[must_use]
    pub fn database(&self) -> DatabaseSettings {
        DatabaseSettings {
            url: self.database_url.clone(),
            max_connections: self.database_max_connections,
            connect_timeout: Duration::from_secs(self.database_connect_timeout_secs),
        }
    }

    /// Session lifetime as a [`Duration`].
    #[must_use]
    pub const fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }

    /// How long ended sessions are kept before pruning.
    #[must_use]
    pub const fn session_retention(&self) -> Duration {
        Duration::from_secs(self.session_retention_secs)
    }

    /// Per-recipient write bound as a [`Duration`].
    #[must_use]
    pub const fn hub_write_timeout(&self) -> Duration {
        Duration::from_millis(self.hub_write_timeout_ms)
    }

    /// Fan-out policy derived from `hub_echo_to_sender`.
    #[must_use]
    pub const fn broadcast_policy(&self) -> BroadcastPolicy {
        BroadcastPolicy::from_echo(self.hub_echo_to_sender)
    }
}

/// Parses an environment variable as `T`, returning `default` on missing
/// or invalid values.
fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Parses an environment variable as a boolean. Accepts `"true"`, `"1"`,
/// `"false"`, `"0"` (case-insensitive). Returns `default` otherwise.
fn parse_env_bool(key: &str, default: bool) -> bool {
    match std::env::var(key).ok().map(|v| v.to_ascii_lowercase()).as_deref() {
        Some("true") | Some("1") => true,
        Some("false") | Some("0") => false,
        _ => default,
    }
}
