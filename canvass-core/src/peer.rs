//! Peer identity and the live peer set.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque mesh participant identifier, assigned once per process lifetime.
/// Equality is the only relation callers may rely on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PeerId(Uuid);

impl PeerId {
    /// Generate a fresh random id.
    pub fn random() -> Self {
        PeerId(Uuid::new_v4())
    }

    pub fn as_bytes(&self) -> &[u8; 16] {
        self.0.as_bytes()
    }
}

impl std::fmt::Display for PeerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Live peer set, derived purely from join/leave events. Single owner: the
/// session mutates it from one consumer task, so no lock is needed here.
#[derive(Debug, Default)]
pub struct PeerRegistry {
    peers: HashSet<PeerId>,
}

impl PeerRegistry {
    pub fn new() -> Self {
        Self {
            peers: HashSet::new(),
        }
    }

    /// Add a peer. No-op if already present; returns true if newly added.
    pub fn on_peer_joined(&mut self, id: PeerId) -> bool {
        self.peers.insert(id)
    }

    /// Remove a peer. No-op if absent; returns true if it was present.
    pub fn on_peer_left(&mut self, id: PeerId) -> bool {
        self.peers.remove(&id)
    }

    /// Copy of the current peer set. Order is not meaningful.
    pub fn snapshot(&self) -> Vec<PeerId> {
        self.peers.iter().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_is_idempotent() {
        let mut reg = PeerRegistry::new();
        let peer = PeerId::random();
        assert!(reg.on_peer_joined(peer));
        assert!(!reg.on_peer_joined(peer));
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn leave_of_unknown_peer_is_noop() {
        let mut reg = PeerRegistry::new();
        let peer = PeerId::random();
        assert!(!reg.on_peer_left(peer));
        assert!(reg.is_empty());
    }

    #[test]
    fn size_tracks_joins_minus_matching_leaves() {
        let mut reg = PeerRegistry::new();
        let a = PeerId::random();
        let b = PeerId::random();
        let c = PeerId::random();

        reg.on_peer_joined(a);
        reg.on_peer_joined(b);
        reg.on_peer_joined(b); // duplicate join never counts twice
        reg.on_peer_joined(c);
        assert_eq!(reg.len(), 3);

        reg.on_peer_left(b);
        reg.on_peer_left(b); // second leave has nothing to remove
        assert_eq!(reg.len(), 2);

        reg.on_peer_left(a);
        reg.on_peer_left(c);
        assert!(reg.is_empty());
        reg.on_peer_left(a);
        assert_eq!(reg.len(), 0);
    }

    #[test]
    fn snapshot_is_a_copy() {
        let mut reg = PeerRegistry::new();
        let a = PeerId::random();
        reg.on_peer_joined(a);
        let snap = reg.snapshot();
        reg.on_peer_left(a);
        assert_eq!(snap, vec![a]);
        assert!(reg.is_empty());
    }
}
