//! Domain layer: identities, credentials, and the broadcast event type.

pub mod broadcast_event;
pub mod connection_id;
pub mod identity;

pub use broadcast_event::{BroadcastEvent, FrameKind};
pub use connection_id::ConnectionId;
pub use identity::{SessionToken, UserId};
