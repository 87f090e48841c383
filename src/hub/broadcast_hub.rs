//! The broadcast hub: connection lifecycle and fan-out.
//!
//! # Concurrency
//!
//! All registry access goes through one [`tokio::sync::Mutex`]. A fan-out
//! pass holds the lock for its whole duration, which gives three properties:
//!
//! - a connection is never written to while it is being removed,
//! - two broadcasts never interleave their writes to the same recipient, so
//!   every recipient observes events in `broadcast` call order,
//! - a slow recipient delays the pass for everyone, bounded by the
//!   configured write timeout, after which it is evicted.

use std::fmt;
use std::time::Duration;

use tokio::sync::{Mutex, oneshot};

use super::error::{HubError, TransportError};
use super::gate::Admission;
use super::registry::{Peer, PeerInfo, Registry};
use super::transport::FrameSink;
use crate::domain::{BroadcastEvent, ConnectionId, UserId};

/// Whether the author of an event receives its own copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BroadcastPolicy {
    /// Every registered connection, sender included, receives the event.
    #[default]
    IncludeSender,
    /// The sender is skipped.
    ExcludeSender,
}

impl BroadcastPolicy {
    /// Maps an "echo to sender" flag onto a policy.
    #[must_use]
    pub const fn from_echo(echo_to_sender: bool) -> Self {
        if echo_to_sender {
            Self::IncludeSender
        } else {
            Self::ExcludeSender
        }
    }
}

/// Outcome of one fan-out pass.
///
/// Recipient failures are reported here rather than as an error: the
/// sender's broadcast succeeds as long as the sender itself is registered.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    /// `false` if the sender had already left and the event was dropped.
    pub sender_active: bool,
    /// Number of recipients that accepted the event.
    pub delivered: usize,
    /// Recipients whose write failed and that were removed.
    pub evicted: Vec<ConnectionId>,
}

/// A registered connection as seen by its read loop.
///
/// `evicted` resolves when the hub drops the registry entry, whether
/// because a write failed, the connection was deregistered, or the hub
/// shut down.
#[derive(Debug)]
pub struct Membership {
    /// Registry key of this connection.
    pub connection_id: ConnectionId,
    /// User resolved at admission.
    pub user_id: UserId,
    /// Fires when the registry entry is gone.
    pub evicted: oneshot::Receiver<()>,
}

struct HubState<S> {
    registry: Registry<S>,
    open: bool,
}

/// Owns the registry of live connections and relays events between them.
///
/// One `Hub` is created at startup and shared by reference (`Arc`) with
/// every read loop; there is no process-wide instance.
pub struct Hub<S> {
    state: Mutex<HubState<S>>,
    policy: BroadcastPolicy,
    write_timeout: Duration,
}

impl<S> fmt::Debug for Hub<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hub")
            .field("policy", &self.policy)
            .field("write_timeout", &self.write_timeout)
            .finish_non_exhaustive()
    }
}

impl<S: FrameSink> Hub<S> {
    /// Creates an empty, open hub.
    #[must_use]
    pub fn new(policy: BroadcastPolicy, write_timeout: Duration) -> Self {
        Self {
            state: Mutex::new(HubState {
                registry: Registry::new(),
                open: true,
            }),
            policy,
            write_timeout,
        }
    }

    /// Returns the configured fan-out policy.
    #[must_use]
    pub const fn policy(&self) -> BroadcastPolicy {
        self.policy
    }

    /// Adds an admitted connection to the registry. Joining → Active.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::ShuttingDown`] after [`Hub::shutdown`], and
    /// [`HubError::DuplicateConnection`] if the admission was already
    /// registered. In both cases the sink is closed before returning.
    pub async fn register(&self, admission: Admission, sink: S) -> Result<Membership, HubError> {
        let Admission {
            connection_id,
            user_id,
        } = admission;
        let (peer, evicted) = Peer::new(user_id, sink);

        let mut state = self.state.lock().await;
        if !state.open {
            drop(state);
            self.release(connection_id, peer).await;
            return Err(HubError::ShuttingDown);
        }
        if let Err((err, peer)) = state.registry.insert(connection_id, peer) {
            drop(state);
            self.release(connection_id, peer).await;
            return Err(err);
        }
        let active = state.registry.len();
        drop(state);

        tracing::info!(%connection_id, %user_id, active, "connection joined hub");
        Ok(Membership {
            connection_id,
            user_id,
            evicted,
        })
    }

    /// Delivers `event` to every registered connection.
    ///
    /// Writes happen one recipient at a time under the registry lock. A
    /// failed or timed-out write evicts that recipient and the pass
    /// continues with the rest. An event from a sender that is no longer
    /// registered is dropped.
    pub async fn broadcast(&self, sender: ConnectionId, event: &BroadcastEvent) -> BroadcastReport {
        let mut state = self.state.lock().await;
        if !state.registry.contains(sender) {
            tracing::debug!(%sender, "dropping event from departed connection");
            return BroadcastReport::default();
        }

        let mut report = BroadcastReport {
            sender_active: true,
            ..BroadcastReport::default()
        };
        for (id, peer) in state.registry.iter_mut() {
            if *id == sender && self.policy == BroadcastPolicy::ExcludeSender {
                continue;
            }
            match self.write(peer, event).await {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    tracing::warn!(connection_id = %id, error = %e, "write failed, evicting");
                    report.evicted.push(*id);
                }
            }
        }

        for id in &report.evicted {
            if let Some(peer) = state.registry.remove(*id) {
                self.release(*id, peer).await;
            }
        }
        let active = state.registry.len();
        drop(state);

        tracing::debug!(
            %sender,
            kind = ?event.kind(),
            bytes = event.len(),
            delivered = report.delivered,
            evicted = report.evicted.len(),
            active,
            "broadcast complete"
        );
        report
    }

    /// Removes a connection and releases its transport. Active → Leaving.
    ///
    /// Returns `false` if the connection was already gone.
    pub async fn deregister(&self, id: ConnectionId) -> bool {
        let mut state = self.state.lock().await;
        let Some(peer) = state.registry.remove(id) else {
            return false;
        };
        self.release(id, peer).await;
        let active = state.registry.len();
        drop(state);

        tracing::info!(connection_id = %id, active, "connection left hub");
        true
    }

    /// Closes every connection and refuses further registrations.
    ///
    /// Returns the number of connections that were closed.
    pub async fn shutdown(&self) -> usize {
        let mut state = self.state.lock().await;
        state.open = false;
        let peers = state.registry.drain();
        let closed = peers.len();
        for (id, peer) in peers {
            self.release(id, peer).await;
        }
        drop(state);

        tracing::info!(closed, "hub shut down");
        closed
    }

    /// Returns `true` until [`Hub::shutdown`] has run.
    pub async fn is_open(&self) -> bool {
        self.state.lock().await.open
    }

    /// Returns `true` if `id` is registered.
    pub async fn contains(&self, id: ConnectionId) -> bool {
        self.state.lock().await.registry.contains(id)
    }

    /// Number of active connections.
    pub async fn len(&self) -> usize {
        self.state.lock().await.registry.len()
    }

    /// Returns `true` when no connection is active.
    pub async fn is_empty(&self) -> bool {
        self.state.lock().await.registry.is_empty()
    }

    /// Snapshot of the active connections.
    pub async fn connections(&self) -> Vec<PeerInfo> {
        self.state.lock().await.registry.infos()
    }

    /// Distinct users with at least one active connection, sorted.
    pub async fn connected_users(&self) -> Vec<UserId> {
        let mut users: Vec<UserId> = self
            .connections()
            .await
            .into_iter()
            .map(|info| info.user_id)
            .collect();
        users.sort_unstable();
        users.dedup();
        users
    }

    async fn write(&self, peer: &mut Peer<S>, event: &BroadcastEvent) -> Result<(), TransportError> {
        match tokio::time::timeout(self.write_timeout, peer.sink.send_event(event.clone())).await {
            Ok(result) => result,
            Err(_) => Err(TransportError::Timeout(self.write_timeout_ms())),
        }
    }

    /// Closes the transport and drops the peer, which fires its eviction
    /// signal.
    async fn release(&self, id: ConnectionId, mut peer: Peer<S>) {
        if tokio::time::timeout(self.write_timeout, peer.sink.close())
            .await
            .is_err()
        {
            tracing::debug!(connection_id = %id, "close timed out");
        }
    }

    fn write_timeout_ms(&self) -> u64 {
        u64::try_from(self.write_timeout.as_millis()).unwrap_or(u64::MAX)
    }
}
