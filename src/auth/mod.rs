//! Authentication collaborators: session store, credentials, auth service.
//!
//! The hub depends only on [`SessionStore::resolve`]; everything else here
//! backs the `/register`, `/login` and `/logout` endpoints.

pub mod credentials;
pub mod service;
pub mod store;

pub use service::{AuthError, AuthService, ClientInfo, LoginOutcome, Registration};
pub use store::{MemorySessionStore, NewSession, SessionStore, StoreError};
