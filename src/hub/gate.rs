//! Session gate: authorizes a connection before it may join the hub.
//!
//! The gate only reads from the [`SessionStore`]. It never touches the
//! registry; registering an [`Admission`] is a separate step performed by
//! [`super::Hub::register`] once the transport exists.

use std::sync::Arc;

use super::error::GateError;
use crate::auth::SessionStore;
use crate::domain::{ConnectionId, SessionToken, UserId};

/// A connection that passed the gate but is not yet registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Admission {
    /// Identity the connection will be registered under.
    pub connection_id: ConnectionId,
    /// User resolved from the presented session token.
    pub user_id: UserId,
}

/// Validates session tokens against a [`SessionStore`].
#[derive(Debug)]
pub struct SessionGate<St> {
    store: Arc<St>,
}

impl<St> Clone for SessionGate<St> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<St: SessionStore> SessionGate<St> {
    /// Creates a gate backed by `store`.
    #[must_use]
    pub fn new(store: Arc<St>) -> Self {
        Self { store }
    }

    /// Checks a candidate token and, on success, mints an [`Admission`]
    /// bound to the resolved user.
    ///
    /// # Errors
    ///
    /// - [`GateError::MissingToken`] when no token, an empty token, or a
    ///   malformed token is presented. The store is not consulted.
    /// - [`GateError::InvalidSession`] when the store does not resolve it.
    /// - [`GateError::StoreUnavailable`] when the lookup itself fails.
    pub async fn admit(&self, candidate: Option<&str>) -> Result<Admission, GateError> {
        let Some(token) = candidate.and_then(SessionToken::parse) else {
            tracing::debug!("admission rejected: no usable session token");
            return Err(GateError::MissingToken);
        };

        match self.store.resolve(&token).await {
            Ok(Some(user_id)) => {
                let admission = Admission {
                    connection_id: ConnectionId::new(),
                    user_id,
                };
                tracing::debug!(
                    connection_id = %admission.connection_id,
                    %user_id,
                    "admission granted"
                );
                Ok(admission)
            }
            Ok(None) => {
                tracing::debug!("admission rejected: unknown or expired session");
                Err(GateError::InvalidSession)
            }
            Err(e) => {
                tracing::warn!(error = %e, "admission rejected: session store failure");
                Err(GateError::StoreUnavailable(e.to_string()))
            }
        }
    }
}
