//! The set of admitted, live connections.
//!
//! [`Registry`] is a plain map with no locking of its own. The [`super::Hub`]
//! keeps it behind a single mutex, so every join, leave, and fan-out pass
//! sees a consistent view and no write can race a removal.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tokio::sync::oneshot;

use super::error::HubError;
use crate::domain::{ConnectionId, UserId};

/// A registered connection: its identity plus the write half of its
/// transport.
///
/// Dropping a `Peer` fires the eviction signal held by the connection's
/// read loop.
#[derive(Debug)]
pub struct Peer<S> {
    /// User resolved by the session gate at admission.
    pub user_id: UserId,
    /// When the connection entered the registry.
    pub admitted_at: DateTime<Utc>,
    /// Outbound transport, owned by the hub.
    pub sink: S,
    /// Never sent on; dropping it resolves the read loop's receiver.
    _evict: oneshot::Sender<()>,
}

impl<S> Peer<S> {
    /// Creates a peer together with the receiver that resolves once the
    /// peer is dropped.
    #[must_use]
    pub fn new(user_id: UserId, sink: S) -> (Self, oneshot::Receiver<()>) {
        let (evict, evicted) = oneshot::channel();
        let peer = Self {
            user_id,
            admitted_at: Utc::now(),
            sink,
            _evict: evict,
        };
        (peer, evicted)
    }
}

/// Read-only view of a registered connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeerInfo {
    /// Registry key.
    pub connection_id: ConnectionId,
    /// User resolved at admission.
    pub user_id: UserId,
    /// Admission timestamp.
    pub admitted_at: DateTime<Utc>,
}

/// Mapping from [`ConnectionId`] to [`Peer`]. Keys are unique.
#[derive(Debug)]
pub struct Registry<S> {
    peers: HashMap<ConnectionId, Peer<S>>,
}

impl<S> Registry<S> {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            peers: HashMap::new(),
        }
    }

    /// Inserts a peer under `id`.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::DuplicateConnection`] if `id` is already present;
    /// the existing entry is left untouched and the new peer is handed back.
    pub fn insert(&mut self, id: ConnectionId, peer: Peer<S>) -> Result<(), (HubError, Peer<S>)> {
        if self.peers.contains_key(&id) {
            return Err((HubError::DuplicateConnection(id), peer));
        }
        self.peers.insert(id, peer);
        Ok(())
    }

    /// Removes and returns the peer registered under `id`.
    pub fn remove(&mut self, id: ConnectionId) -> Option<Peer<S>> {
        self.peers.remove(&id)
    }

    /// Returns `true` if `id` is registered.
    #[must_use]
    pub fn contains(&self, id: ConnectionId) -> bool {
        self.peers.contains_key(&id)
    }

    /// Mutable iteration over all peers, used by the fan-out pass.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&ConnectionId, &mut Peer<S>)> {
        self.peers.iter_mut()
    }

    /// Removes every peer, used at shutdown.
    pub fn drain(&mut self) -> Vec<(ConnectionId, Peer<S>)> {
        self.peers.drain().collect()
    }

    /// Snapshot of every registered connection.
    #[must_use]
    pub fn infos(&self) -> Vec<PeerInfo> {
        self.peers
            .iter()
            .map(|(id, peer)| PeerInfo {
                connection_id: *id,
                user_id: peer.user_id,
                admitted_at: peer.admitted_at,
            })
            .collect()
    }

    /// Number of registered connections.
    #[must_use]
    pub fn len(&self) -> usize {
        self.peers.len()
    }

    /// Returns `true` if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }
}

impl<S> Default for Registry<S> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    fn peer(user: i64) -> (Peer<()>, oneshot::Receiver<()>) {
        Peer::new(UserId::new(user), ())
    }

    #[test]
    fn insert_and_remove() {
        let mut registry = Registry::new();
        let id = ConnectionId::new();
        let (p, _rx) = peer(1);

        assert!(registry.insert(id, p).is_ok());
        assert!(registry.contains(id));
        assert_eq!(registry.len(), 1);

        let removed = registry.remove(id);
        assert!(removed.is_some());
        assert!(registry.is_empty());
    }

    #[test]
    fn duplicate_insert_is_rejected() {
        let mut registry = Registry::new();
        let id = ConnectionId::new();
        let (first, _rx1) = peer(1);
        let (second, _rx2) = peer(2);

        assert!(registry.insert(id, first).is_ok());
        let Err((err, returned)) = registry.insert(id, second) else {
            panic!("expected duplicate rejection");
        };
        assert_eq!(err, HubError::DuplicateConnection(id));
        assert_eq!(returned.user_id, UserId::new(2));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn remove_missing_returns_none() {
        let mut registry: Registry<()> = Registry::new();
        assert!(registry.remove(ConnectionId::new()).is_none());
    }

    #[tokio::test]
    async fn dropping_peer_fires_eviction() {
        let mut registry = Registry::new();
        let id = ConnectionId::new();
        let (p, evicted) = peer(7);
        assert!(registry.insert(id, p).is_ok());

        drop(registry.remove(id));
        assert!(evicted.await.is_err());
    }

    #[test]
    fn drain_empties_registry() {
        let mut registry = Registry::new();
        let mut receivers = Vec::new();
        for user in 0..3 {
            let (p, rx) = peer(user);
            receivers.push(rx);
            assert!(registry.insert(ConnectionId::new(), p).is_ok());
        }
        assert_eq!(registry.infos().len(), 3);
        assert_eq!(registry.drain().len(), 3);
        assert!(registry.is_empty());
    }
}
