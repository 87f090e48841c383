//! Per-connection lifecycle: registration, read loop, teardown.

use std::fmt::Display;
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, Stream, StreamExt};

use super::messages::Inbound;
use crate::domain::BroadcastEvent;
use crate::hub::{Admission, FrameSink, Hub, Membership, TransportError};

/// Write half of an upgraded WebSocket, owned by the hub.
pub type WsSink = SplitSink<WebSocket, Message>;

/// The hub type used by the HTTP server.
pub type ForumHub = Hub<WsSink>;

impl FrameSink for WsSink {
    async fn send_event(&mut self, event: BroadcastEvent) -> Result<(), TransportError> {
        self.send(Message::from(event))
            .await
            .map_err(|e| TransportError::Io(e.to_string()))
    }

    async fn close(&mut self) {
        if let Err(e) = SinkExt::close(self).await {
            tracing::trace!(error = %e, "websocket close failed");
        }
    }
}

/// Why a read loop ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LeaveReason {
    /// The peer sent a close frame.
    ClosedByPeer,
    /// The underlying stream ended without a close frame.
    StreamEnded,
    /// Reading the next frame failed.
    ReadError(String),
    /// The hub removed the connection (failed write or shutdown).
    Evicted,
    /// The read loop task panicked or was cancelled.
    Aborted(String),
}

/// Reads frames from one connection and hands each data frame to
/// [`Hub::broadcast`] until the connection leaves.
///
/// Blocks only while waiting for the next frame or for the hub.
pub async fn run_read_loop<S, R, E>(
    hub: &Hub<S>,
    mut membership: Membership,
    mut reader: R,
) -> LeaveReason
where
    S: FrameSink,
    R: Stream<Item = Result<Message, E>> + Unpin,
    E: Display,
{
    let id = membership.connection_id;
    loop {
        tokio::select! {
            _ = &mut membership.evicted => return LeaveReason::Evicted,
            frame = reader.next() => match frame {
                Some(Ok(message)) => match Inbound::from(message) {
                    Inbound::Event(event) => {
                        let report = hub.broadcast(id, &event).await;
                        if !report.sender_active {
                            return LeaveReason::Evicted;
                        }
                    }
                    Inbound::Control => {}
                    Inbound::Close => return LeaveReason::ClosedByPeer,
                },
                Some(Err(e)) => return LeaveReason::ReadError(e.to_string()),
                None => return LeaveReason::StreamEnded,
            },
        }
    }
}

/// Runs an upgraded socket from registration to teardown.
pub async fn serve_connection(hub: Arc<ForumHub>, admission: Admission, socket: WebSocket) {
    let (sink, reader) = socket.split();
    let membership = match hub.register(admission, sink).await {
        Ok(membership) => membership,
        Err(e) => {
            tracing::warn!(connection_id = %admission.connection_id, error = %e, "registration refused");
            return;
        }
    };
    supervise_read_loop(hub, membership, reader).await;
}

/// Runs [`run_read_loop`] in its own task and deregisters the connection
/// once the task ends, whether it returned or panicked.
pub async fn supervise_read_loop<S, R, E>(
    hub: Arc<Hub<S>>,
    membership: Membership,
    reader: R,
) -> LeaveReason
where
    S: FrameSink,
    R: Stream<Item = Result<Message, E>> + Unpin + Send + 'static,
    E: Display + Send + 'static,
{
    let id = membership.connection_id;
    let loop_hub = Arc::clone(&hub);
    let outcome =
        tokio::spawn(async move { run_read_loop(&loop_hub, membership, reader).await }).await;
    let reason = match outcome {
        Ok(reason) => {
            tracing::debug!(connection_id = %id, ?reason, "read loop finished");
            reason
        }
        Err(e) => {
            tracing::error!(connection_id = %id, error = %e, "read loop aborted");
            LeaveReason::Aborted(e.to_string())
        }
    };

    hub.deregister(id).await;
    reason
}
