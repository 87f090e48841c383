//! WebSocket layer: upgrade handling and per-connection read loops.
//!
//! The endpoint at `/ws` relays every text or binary frame a client sends
//! to all connected clients.

pub mod connection;
pub mod handler;
pub mod messages;

pub use connection::{
    ForumHub, LeaveReason, WsSink, run_read_loop, serve_connection, supervise_read_loop,
};
