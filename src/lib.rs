//! # forum-hub
//!
//! Forum backend whose stateful core is a real-time broadcast hub reachable
//! over WebSocket and gated by a session credential issued at login.
//!
//! Every text or binary frame a client sends on `/ws` is relayed to every
//! connected client. A connection is only admitted if it presents a valid
//! session token, and it is removed from the hub on the first read or write
//! failure.
//!
//! ## Architecture
//!
//! ```text
//! Clients (HTTP, WebSocket)
//!     │
//!     ├── REST Handlers (api/)      register / login / logout / health
//!     ├── WS Handler (ws/)          upgrade + per-connection read loop
//!     │
//!     ├── SessionGate (hub/)        token → user, before upgrade
//!     ├── Hub + Registry (hub/)     join / leave / fan-out
//!     │
//!     ├── AuthService (auth/)
//!     │
//!     └── SQLite Persistence        users, sessions
//! ```

pub mod api;
pub mod app_state;
pub mod auth;
pub mod config;
pub mod domain;
pub mod error;
pub mod hub;
pub mod persistence;
pub mod server;
pub mod ws;
