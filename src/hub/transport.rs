//! Outbound transport seam.
//!
//! The hub writes through [`FrameSink`] so that the registry and fan-out
//! logic do not depend on axum's socket type. The WebSocket implementation
//! lives in [`crate::ws::connection`]; an in-process channel implementation
//! lives here.

use std::future::Future;

use tokio::sync::mpsc;

use super::error::TransportError;
use crate::domain::BroadcastEvent;

/// The write half of a connection, exclusively owned by the hub once the
/// connection is registered.
pub trait FrameSink: Send + 'static {
    /// Writes one event to the peer.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] when the peer can no longer accept
    /// frames. The hub treats any error as connection death.
    fn send_event(
        &mut self,
        event: BroadcastEvent,
    ) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Releases the transport. Must be safe to call on an already broken
    /// channel.
    fn close(&mut self) -> impl Future<Output = ()> + Send;
}

/// Channel-backed sink for in-process subscribers.
///
/// Never waits: a full buffer counts as a failed write.
impl FrameSink for mpsc::Sender<BroadcastEvent> {
    async fn send_event(&mut self, event: BroadcastEvent) -> Result<(), TransportError> {
        self.try_send(event).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => TransportError::Backpressure,
            mpsc::error::TrySendError::Closed(_) => TransportError::Closed,
        })
    }

    async fn close(&mut self) {}
}
