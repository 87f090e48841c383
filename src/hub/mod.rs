//! Real-time broadcast hub: session gate, connection registry, fan-out.
//!
//! Control flow for one client:
//!
//! ```text
//! upgrade request ── SessionGate::admit ──> Admission
//!                                              │
//!                          Hub::register ──> Membership (Active)
//!                                              │
//!              read loop ── frame ──> Hub::broadcast ──> every FrameSink
//!                                              │
//!          read error / close / eviction ──> Hub::deregister (Leaving)
//! ```

pub mod broadcast_hub;
pub mod error;
pub mod gate;
pub mod registry;
pub mod transport;

pub use broadcast_hub::{BroadcastPolicy, BroadcastReport, Hub, Membership};
pub use error::{GateError, HubError, TransportError};
pub use gate::{Admission, SessionGate};
pub use registry::{Peer, PeerInfo, Registry};
pub use transport::FrameSink;
