//! Password hashing and client fingerprinting.
//!
//! Passwords use bcrypt. Client metadata (IP address, user agent) is only
//! recorded as an unsalted SHA-256 digest, which is enough to compare two
//! logins without keeping the raw values.

use sha2::{Digest, Sha256};

/// Lowest cost bcrypt accepts.
pub const MIN_HASH_COST: u32 = 4;

/// Highest cost bcrypt accepts.
pub const MAX_HASH_COST: u32 = 31;

/// Errors from the password hasher.
#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    /// bcrypt rejected the input or cost.
    #[error("password hashing failed: {0}")]
    Hash(#[from] bcrypt::BcryptError),

    /// The blocking hashing task did not complete.
    #[error("password hashing task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Hashes `password` with bcrypt on the blocking thread pool.
///
/// # Errors
///
/// Returns [`CredentialError`] if bcrypt fails (e.g. cost out of range) or
/// the blocking task is cancelled.
pub async fn hash_password(password: &str, cost: u32) -> Result<String, CredentialError> {
    let password = password.to_owned();
    let cost = cost.clamp(MIN_HASH_COST, MAX_HASH_COST);
    let hashed = tokio::task::spawn_blocking(move || bcrypt::hash(password, cost)).await??;
    Ok(hashed)
}

/// Checks `password` against a stored bcrypt hash.
///
/// A malformed stored hash counts as a mismatch.
///
/// # Errors
///
/// Returns [`CredentialError::Task`] if the blocking task is cancelled.
pub async fn verify_password(password: &str, hashed: &str) -> Result<bool, CredentialError> {
    let password = password.to_owned();
    let hashed = hashed.to_owned();
    let ok = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hashed).unwrap_or(false))
        .await?;
    Ok(ok)
}

/// Hex-encoded SHA-256 digest of a client attribute.
#[must_use]
pub fn fingerprint(value: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(value.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn hash_then_verify() {
        let Ok(hashed) = hash_password("s3cret", MIN_HASH_COST).await else {
            panic!("hashing failed");
        };
        assert_ne!(hashed, "s3cret");
        assert!(matches!(verify_password("s3cret", &hashed).await, Ok(true)));
        assert!(matches!(verify_password("wrong", &hashed).await, Ok(false)));
    }

    #[tokio::test]
    async fn malformed_hash_does_not_verify() {
        assert!(matches!(
            verify_password("anything", "not-a-bcrypt-hash").await,
            Ok(false)
        ));
    }

    #[test]
    fn fingerprint_is_stable_sha256_hex() {
        assert_eq!(
            fingerprint("hello"),
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
        assert_ne!(fingerprint("127.0.0.1"), fingerprint("127.0.0.2"));
    }
}
