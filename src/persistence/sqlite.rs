//! SQLite implementation of the user and session stores.

use std::str::FromStr;
use std::time::Duration;

use chrono::Utc;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

use super::models::{NewUser, SessionRecord, StoredCredentials, from_unix};
use crate::auth::{NewSession, SessionStore, StoreError};
use crate::domain::{SessionToken, UserId};

/// Connection settings for [`SqliteStore::connect`].
#[derive(Debug, Clone)]
pub struct DatabaseSettings {
    /// `sqlite://` URL; `sqlite::memory:` for a throwaway database.
    pub url: String,
    /// Maximum pooled connections.
    pub max_connections: u32,
    /// Timeout for acquiring a pooled connection.
    pub connect_timeout: Duration,
}

/// `sqlx::SqlitePool`-backed store for users and sessions.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Opens (creating if missing) the database and applies migrations.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the URL is invalid, the database
    /// cannot be opened, or a migration fails.
    pub async fn connect(settings: &DatabaseSettings) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(&settings.url)
            .map_err(db_error)?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(settings.max_connections.max(1))
            .acquire_timeout(settings.connect_timeout)
            .connect_with(options)
            .await
            .map_err(db_error)?;

        Self::from_pool(pool).await
    }

    /// Opens a private in-memory database.
    ///
    /// Uses a single connection that is never recycled, since every SQLite
    /// memory connection is its own database.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the database cannot be opened or
    /// migrated.
    pub async fn in_memory() -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(db_error)?
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(db_error)?;

        Self::from_pool(pool).await
    }

    async fn from_pool(pool: SqlitePool) -> Result<Self, StoreError> {
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;
        tracing::info!("database initialized");
        Ok(Self { pool })
    }

    /// Closes every pooled connection.
    pub async fn close(&self) {
        self.pool.close().await;
        tracing::info!("database connection closed");
    }

    /// Inserts a user.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Duplicate`] if the nickname or e-mail is taken,
    /// [`StoreError::Database`] on any other failure.
    pub async fn insert_user(&self, user: &NewUser) -> Result<UserId, StoreError> {
        let id = sqlx::query_scalar::<_, i64>(
            "INSERT INTO users (nickname, age, gender, first_name, last_name, email, password_hash, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?) RETURNING id",
        )
        .bind(&user.nickname)
        .bind(i64::from(user.age))
        .bind(&user.gender)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(Utc::now().timestamp())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db) = &e
                && db.is_unique_violation()
            {
                return StoreError::Duplicate("nickname or email already registered".to_string());
            }
            db_error(e)
        })?;

        Ok(UserId::new(id))
    }

    /// Finds login credentials by nickname or e-mail.
    ///
    /// An identifier containing `@` is matched against e-mails only, any
    /// other identifier against nicknames only.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] on query failure.
    pub async fn find_credentials(
        &self,
        identifier: &str,
    ) -> Result<Option<StoredCredentials>, StoreError> {
        let sql = if identifier.contains('@') {
            "SELECT id, password_hash FROM users WHERE email = ?"
        } else {
            "SELECT id, password_hash FROM users WHERE nickname = ?"
        };
        let row = sqlx::query_as::<_, (i64, String)>(sql)
            .bind(identifier)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?;

        Ok(row.map(|(id, password_hash)| StoredCredentials {
            user_id: UserId::new(id),
            password_hash,
        }))
    }

    /// Loads the online-status row for a token, active or not.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] on query failure.
    pub async fn session(&self, token: &SessionToken) -> Result<Option<SessionRecord>, StoreError> {
        let row = sqlx::query_as::<
            _,
            (i64, Option<String>, Option<String>, i64, i64, i64, Option<i64>),
        >(
            "SELECT user_id, ip_hash, user_agent_hash, login_time, last_active, expires_at, logout_time \
             FROM sessions WHERE token = ?",
        )
        .bind(token.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(row.map(
            |(user_id, ip_hash, user_agent_hash, login_time, last_active, expires_at, logout_time)| {
                SessionRecord {
                    user_id: UserId::new(user_id),
                    ip_hash,
                    user_agent_hash,
                    login_time: from_unix(login_time),
                    last_active: from_unix(last_active),
                    expires_at: from_unix(expires_at),
                    logout_time: logout_time.map(from_unix),
                }
            },
        ))
    }

    /// Deletes sessions that ended (logout or expiry) more than
    /// `retention` ago. Active sessions are never touched.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] on failure.
    pub async fn prune_sessions(&self, retention: Duration) -> Result<u64, StoreError> {
        let retention = i64::try_from(retention.as_secs()).unwrap_or(i64::MAX);
        let cutoff = Utc::now().timestamp().saturating_sub(retention);
        let result = sqlx::query(
            "DELETE FROM sessions WHERE COALESCE(logout_time, expires_at) <= ?",
        )
        .bind(cutoff)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(result.rows_affected())
    }
}

impl SessionStore for SqliteStore {
    async fn create(&self, session: NewSession) -> Result<SessionToken, StoreError> {
        let token = SessionToken::generate();
        let now = Utc::now();
        let expires_at = session.expires_at(now);

        sqlx::query(
            "INSERT INTO sessions (token, user_id, ip_hash, user_agent_hash, login_time, last_active, expires_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(token.as_str())
        .bind(session.user_id.get())
        .bind(&session.ip_hash)
        .bind(&session.user_agent_hash)
        .bind(now.timestamp())
        .bind(now.timestamp())
        .bind(expires_at.timestamp())
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(token)
    }

    async fn resolve(&self, token: &SessionToken) -> Result<Option<UserId>, StoreError> {
        let user_id = sqlx::query_scalar::<_, i64>(
            "SELECT user_id FROM sessions \
             WHERE token = ? AND logout_time IS NULL AND expires_at > ?",
        )
        .bind(token.as_str())
        .bind(Utc::now().timestamp())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(user_id.map(UserId::new))
    }

    async fn expire(&self, token: &SessionToken) -> Result<bool, StoreError> {
        let now = Utc::now().timestamp();
        let result = sqlx::query(
            "UPDATE sessions SET logout_time = ?, last_active = ? \
             WHERE token = ? AND logout_time IS NULL",
        )
        .bind(now)
        .bind(now)
        .bind(token.as_str())
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(result.rows_affected() > 0)
    }
}

fn db_error(e: sqlx::Error) -> StoreError {
    StoreError::Database(e.to_string())
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    async fn store() -> SqliteStore {
        let Ok(store) = SqliteStore::in_memory().await else {
            panic!("in-memory database");
        };
        store
    }

    fn user(nickname: &str, email: &str) -> NewUser {
        NewUser {
            nickname: nickname.to_string(),
            age: 30,
            gender: "other".to_string(),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            email: email.to_string(),
            password_hash: "$2b$04$placeholder".to_string(),
        }
    }

    fn session_for(user_id: UserId, ttl: Duration) -> NewSession {
        NewSession {
            user_id,
            ttl,
            ip_hash: Some("ip".to_string()),
            user_agent_hash: None,
        }
    }

    #[tokio::test]
    async fn insert_user_and_find_by_nickname_or_email() {
        let store = store().await;
        let Ok(id) = store.insert_user(&user("ada", "ada@example.com")).await else {
            panic!("insert failed");
        };

        let by_nick = store.find_credentials("ada").await;
        let by_mail = store.find_credentials("ada@example.com").await;
        assert_eq!(by_nick.clone().ok().flatten().map(|c| c.user_id), Some(id));
        assert_eq!(by_nick, by_mail);
        assert_eq!(store.find_credentials("nobody").await, Ok(None));
    }

    #[tokio::test]
    async fn email_lookup_ignores_nicknames() {
        let store = store().await;
        let Ok(squatter) = store.insert_user(&user("bob@x.io", "mallory@x.io")).await else {
            panic!("insert failed");
        };
        let Ok(bob) = store.insert_user(&user("bob", "bob@x.io")).await else {
            panic!("insert failed");
        };
        assert_ne!(squatter, bob);

        let found = store.find_credentials("bob@x.io").await;
        assert_eq!(found.ok().flatten().map(|c| c.user_id), Some(bob));
        let found = store.find_credentials("BOB@x.io").await;
        assert_eq!(found.ok().flatten().map(|c| c.user_id), Some(bob));
    }

    #[tokio::test]
    async fn duplicate_nickname_or_email_is_rejected() {
        let store = store().await;
        assert!(store.insert_user(&user("ada", "ada@example.com")).await.is_ok());
        assert!(matches!(
            store.insert_user(&user("ada", "other@example.com")).await,
            Err(StoreError::Duplicate(_))
        ));
        assert!(matches!(
            store.insert_user(&user("ada2", "ADA@example.com")).await,
            Err(StoreError::Duplicate(_))
        ));
    }

    #[tokio::test]
    async fn session_lifecycle() {
        let store = store().await;
        let Ok(id) = store.insert_user(&user("ada", "ada@example.com")).await else {
            panic!("insert failed");
        };
        let Ok(token) = store.create(session_for(id, Duration::from_secs(3600))).await else {
            panic!("create failed");
        };

        assert_eq!(store.resolve(&token).await, Ok(Some(id)));
        let Ok(Some(record)) = store.session(&token).await else {
            panic!("session row missing");
        };
        assert!(record.is_active(Utc::now()));
        assert_eq!(record.ip_hash.as_deref(), Some("ip"));

        assert_eq!(store.expire(&token).await, Ok(true));
        assert_eq!(store.resolve(&token).await, Ok(None));
        assert_eq!(store.expire(&token).await, Ok(false));

        let Ok(Some(record)) = store.session(&token).await else {
            panic!("session row missing");
        };
        assert!(record.logout_time.is_some());

        // Logged-out rows stay on record until the retention window passes.
        assert_eq!(store.prune_sessions(Duration::from_secs(3600)).await, Ok(0));
        assert!(matches!(store.session(&token).await, Ok(Some(_))));
        assert_eq!(store.prune_sessions(Duration::ZERO).await, Ok(1));
        assert_eq!(store.session(&token).await, Ok(None));
    }

    #[tokio::test]
    async fn expired_session_does_not_resolve() {
        let store = store().await;
        let Ok(id) = store.insert_user(&user("ada", "ada@example.com")).await else {
            panic!("insert failed");
        };
        let Ok(token) = store.create(session_for(id, Duration::ZERO)).await else {
            panic!("create failed");
        };
        assert_eq!(store.resolve(&token).await, Ok(None));
    }

    #[tokio::test]
    async fn unknown_token_resolves_to_none() {
        let store = store().await;
        assert_eq!(store.resolve(&SessionToken::generate()).await, Ok(None));
    }

    #[tokio::test]
    async fn pruning_keeps_active_sessions() {
        let store = store().await;
        let Ok(id) = store.insert_user(&user("ada", "ada@example.com")).await else {
            panic!("insert failed");
        };
        let Ok(active) = store.create(session_for(id, Duration::from_secs(3600))).await else {
            panic!("create failed");
        };
        let Ok(lapsed) = store.create(session_for(id, Duration::ZERO)).await else {
            panic!("create failed");
        };

        assert_eq!(store.prune_sessions(Duration::ZERO).await, Ok(1));
        assert_eq!(store.resolve(&active).await, Ok(Some(id)));
        assert_eq!(store.session(&lapsed).await, Ok(None));
    }
}
