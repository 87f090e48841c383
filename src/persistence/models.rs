//! Row types for the `users` and `sessions` tables.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::UserId;

/// Profile fields for a user about to be inserted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    /// Unique display name; may be used to log in.
    pub nickname: String,
    /// Age in years.
    pub age: u32,
    /// Free-form gender string.
    pub gender: String,
    /// Given name.
    pub first_name: String,
    /// Family name.
    pub last_name: String,
    /// Unique e-mail address; may be used to log in.
    pub email: String,
    /// bcrypt hash of the password.
    pub password_hash: String,
}

/// Login credentials looked up by nickname or e-mail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredCredentials {
    /// Owner of the credentials.
    pub user_id: UserId,
    /// bcrypt hash to verify against.
    pub password_hash: String,
}

/// One row of the `sessions` table, i.e. the user's online status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionRecord {
    /// Owner of the session.
    pub user_id: UserId,
    /// SHA-256 digest of the client address.
    pub ip_hash: Option<String>,
    /// SHA-256 digest of the client user agent.
    pub user_agent_hash: Option<String>,
    /// When the session was opened.
    pub login_time: DateTime<Utc>,
    /// Last recorded activity.
    pub last_active: DateTime<Utc>,
    /// When the token stops resolving.
    pub expires_at: DateTime<Utc>,
    /// Set once the user logged out.
    pub logout_time: Option<DateTime<Utc>>,
}

impl SessionRecord {
    /// Returns `true` if the session still grants access at `now`.
    #[must_use]
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.logout_time.is_none() && self.expires_at > now
    }
}

/// Converts a stored unix timestamp back into a UTC instant.
#[must_use]
pub fn from_unix(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).unwrap_or(DateTime::<Utc>::MIN_UTC)
}
