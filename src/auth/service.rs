//! Authentication service: registration, login, logout.

use std::sync::Arc;
use std::time::Duration;

use super::credentials::{self, CredentialError};
use super::store::{NewSession, SessionStore, StoreError};
use crate::domain::{SessionToken, UserId};
use crate::persistence::{NewUser, SqliteStore};

/// Shortest password accepted at registration.
pub const MIN_PASSWORD_LEN: usize = 8;

/// Errors returned by [`AuthService`].
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// A required field is missing or malformed.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Unknown identifier or wrong password. Deliberately indistinguishable.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Nickname or e-mail already in use.
    #[error("{0}")]
    AlreadyRegistered(String),

    /// The user or session store failed.
    #[error(transparent)]
    Store(StoreError),

    /// Password hashing failed.
    #[error(transparent)]
    Credential(#[from] CredentialError),
}

impl From<StoreError> for AuthError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Duplicate(msg) => Self::AlreadyRegistered(msg),
            other => Self::Store(other),
        }
    }
}

/// Profile submitted at registration.
#[derive(Debug, Clone)]
pub struct Registration {
    /// Unique display name.
    pub nickname: String,
    /// Age in years.
    pub age: u32,
    /// Free-form gender string.
    pub gender: String,
    /// Given name.
    pub first_name: String,
    /// Family name.
    pub last_name: String,
    /// Unique e-mail address.
    pub email: String,
    /// Plain-text password; hashed before storage.
    pub password: String,
}

/// Client metadata captured at login.
#[derive(Debug, Clone, Default)]
pub struct ClientInfo {
    /// Remote address, if known.
    pub ip: Option<String>,
    /// `User-Agent` header, if sent.
    pub user_agent: Option<String>,
}

/// A successful login.
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    /// Authenticated user.
    pub user_id: UserId,
    /// Newly issued session token.
    pub token: SessionToken,
}

/// Issues and revokes session tokens on top of [`SqliteStore`].
#[derive(Debug, Clone)]
pub struct AuthService {
    store: Arc<SqliteStore>,
    hash_cost: u32,
    session_ttl: Duration,
}

impl AuthService {
    /// Creates the service.
    #[must_use]
    pub fn new(store: Arc<SqliteStore>, hash_cost: u32, session_ttl: Duration) -> Self {
        Self {
            store,
            hash_cost,
            session_ttl,
        }
    }

    /// Returns the backing store.
    #[must_use]
    pub fn store(&self) -> &Arc<SqliteStore> {
        &self.store
    }

    /// Validates and stores a new user.
    ///
    /// # Errors
    ///
    /// - [`AuthError::InvalidRequest`] for missing or malformed fields.
    /// - [`AuthError::AlreadyRegistered`] if the nickname or e-mail is taken.
    /// - [`AuthError::Store`] / [`AuthError::Credential`] on internal failure.
    pub async fn register(&self, registration: Registration) -> Result<UserId, AuthError> {
        let nickname = registration.nickname.trim();
        let email = registration.email.trim();
        if nickname.is_empty() {
            return Err(AuthError::InvalidRequest("nickname is required".to_string()));
        }
        if nickname.contains('@') {
            return Err(AuthError::InvalidRequest(
                "nickname must not contain '@'".to_string(),
            ));
        }
        if !email.contains('@') {
            return Err(AuthError::InvalidRequest("a valid email is required".to_string()));
        }
        if registration.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AuthError::InvalidRequest(format!(
                "password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }

        let password_hash = credentials::hash_password(&registration.password, self.hash_cost).await?;
        let user = NewUser {
            nickname: nickname.to_string(),
            age: registration.age,
            gender: registration.gender.trim().to_string(),
            first_name: registration.first_name.trim().to_string(),
            last_name: registration.last_name.trim().to_string(),
            email: email.to_string(),
            password_hash,
        };
        let user_id = self.store.insert_user(&user).await?;

        tracing::info!(%user_id, nickname, "user registered");
        Ok(user_id)
    }

    /// Verifies credentials and opens a session.
    ///
    /// `identifier` may be either the nickname or the e-mail address.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidCredentials`] for an unknown identifier or
    /// a wrong password, and a store or hashing error on internal failure.
    pub async fn authenticate(
        &self,
        identifier: &str,
        secret: &str,
        client: ClientInfo,
    ) -> Result<LoginOutcome, AuthError> {
        let identifier = identifier.trim();
        if identifier.is_empty() || secret.is_empty() {
            return Err(AuthError::InvalidCredentials);
        }

        let Some(stored) = self.store.find_credentials(identifier).await? else {
            tracing::debug!("authentication failed: user not found");
            return Err(AuthError::InvalidCredentials);
        };
        if !credentials::verify_password(secret, &stored.password_hash).await? {
            tracing::debug!(user_id = %stored.user_id, "authentication failed: wrong password");
            return Err(AuthError::InvalidCredentials);
        }

        let token = self
            .store
            .create(NewSession {
                user_id: stored.user_id,
                ttl: self.session_ttl,
                ip_hash: client.ip.as_deref().map(credentials::fingerprint),
                user_agent_hash: client.user_agent.as_deref().map(credentials::fingerprint),
            })
            .await?;

        tracing::info!(user_id = %stored.user_id, "user logged in");
        Ok(LoginOutcome {
            user_id: stored.user_id,
            token,
        })
    }

    /// Resolves a raw session token to its user.
    ///
    /// Returns `None` for malformed, unknown, expired or logged-out tokens.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Store`] if the lookup fails.
    pub async fn validate(&self, raw_token: &str) -> Result<Option<UserId>, AuthError> {
        let Some(token) = SessionToken::parse(raw_token) else {
            return Ok(None);
        };
        Ok(self.store.resolve(&token).await?)
    }

    /// Invalidates a session token.
    ///
    /// Returns `false` if the token was unknown or already logged out.
    /// Connections already admitted with the token stay open.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Store`] if the update fails.
    pub async fn logout(&self, token: &SessionToken) -> Result<bool, AuthError> {
        let expired = self.store.expire(token).await?;
        if expired {
            tracing::info!("user logged out");
        }
        Ok(expired)
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::auth::credentials::MIN_HASH_COST;

    async fn service() -> AuthService {
        let Ok(store) = SqliteStore::in_memory().await else {
            panic!("in-memory database");
        };
        AuthService::new(Arc::new(store), MIN_HASH_COST, Duration::from_secs(3600))
    }

    fn registration(nickname: &str, email: &str, password: &str) -> Registration {
        Registration {
            nickname: nickname.to_string(),
            age: 28,
            gender: "female".to_string(),
            first_name: "Grace".to_string(),
            last_name: "Hopper".to_string(),
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    #[tokio::test]
    async fn register_login_logout() {
        let auth = service().await;
        let Ok(user_id) = auth
            .register(registration("grace", "grace@example.com", "cobol-rules"))
            .await
        else {
            panic!("register failed");
        };

        let client = ClientInfo {
            ip: Some("10.0.0.1".to_string()),
            user_agent: Some("test-agent".to_string()),
        };
        let Ok(outcome) = auth.authenticate("grace", "cobol-rules", client).await else {
            panic!("login failed");
        };
        assert_eq!(outcome.user_id, user_id);
        assert!(matches!(
            auth.validate(outcome.token.as_str()).await,
            Ok(Some(id)) if id == user_id
        ));

        let Ok(Some(record)) = auth.store().session(&outcome.token).await else {
            panic!("session missing");
        };
        assert_eq!(
            record.user_agent_hash,
            Some(credentials::fingerprint("test-agent"))
        );

        assert!(matches!(auth.logout(&outcome.token).await, Ok(true)));
        assert!(matches!(auth.validate(outcome.token.as_str()).await, Ok(None)));
        assert!(matches!(auth.validate("").await, Ok(None)));
        assert!(matches!(auth.logout(&outcome.token).await, Ok(false)));
    }

    #[tokio::test]
    async fn login_by_email() {
        let auth = service().await;
        assert!(
            auth.register(registration("grace", "grace@example.com", "cobol-rules"))
                .await
                .is_ok()
        );
        assert!(
            auth.authenticate("grace@example.com", "cobol-rules", ClientInfo::default())
                .await
                .is_ok()
        );
    }

    #[tokio::test]
    async fn email_login_reaches_the_email_owner() {
        let auth = service().await;
        assert!(
            auth.register(registration("mallory", "mallory@x.io", "mallory-password"))
                .await
                .is_ok()
        );
        let Ok(bob) = auth
            .register(registration("bob", "bob@x.io", "bob-password"))
            .await
        else {
            panic!("register failed");
        };

        let Ok(outcome) = auth
            .authenticate("bob@x.io", "bob-password", ClientInfo::default())
            .await
        else {
            panic!("bob could not log in by email");
        };
        assert_eq!(outcome.user_id, bob);
        assert!(matches!(
            auth.authenticate("bob@x.io", "mallory-password", ClientInfo::default())
                .await,
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn wrong_password_and_unknown_user_look_the_same() {
        let auth = service().await;
        assert!(
            auth.register(registration("grace", "grace@example.com", "cobol-rules"))
                .await
                .is_ok()
        );

        let wrong = auth
            .authenticate("grace", "fortran", ClientInfo::default())
            .await;
        let unknown = auth
            .authenticate("nobody", "cobol-rules", ClientInfo::default())
            .await;
        assert!(matches!(wrong, Err(AuthError::InvalidCredentials)));
        assert!(matches!(unknown, Err(AuthError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn registration_validation() {
        let auth = service().await;
        assert!(matches!(
            auth.register(registration(" ", "a@b.c", "long-enough")).await,
            Err(AuthError::InvalidRequest(_))
        ));
        assert!(matches!(
            auth.register(registration("x", "not-an-email", "long-enough")).await,
            Err(AuthError::InvalidRequest(_))
        ));
        assert!(matches!(
            auth.register(registration("x", "a@b.c", "short")).await,
            Err(AuthError::InvalidRequest(_))
        ));
        assert!(matches!(
            auth.register(registration("bob@x.io", "mallory@x.io", "long-enough"))
                .await,
            Err(AuthError::InvalidRequest(_))
        ));
    }

    #[tokio::test]
    async fn duplicate_registration_is_reported() {
        let auth = service().await;
        assert!(
            auth.register(registration("grace", "grace@example.com", "cobol-rules"))
                .await
                .is_ok()
        );
        assert!(matches!(
            auth.register(registration("grace", "other@example.com", "cobol-rules"))
                .await,
            Err(AuthError::AlreadyRegistered(_))
        ));
    }
}
