//! Typed accessor over peer records in the cluster state store

use crate::common::{Error, Result};
use crate::peer::Peer;
use crate::store::{ClusterStore, PEER_PREFIX};
use std::sync::Arc;
use uuid::Uuid;

pub struct PeerRegistry {
    store: Arc<dyn ClusterStore>,
}

impl PeerRegistry {
    pub fn new(store: Arc<dyn ClusterStore>) -> Self {
        Self { store }
    }

    fn key(id: Uuid) -> String {
        format!("{}{}", PEER_PREFIX, id)
    }

    /// Fetch one peer record. The store keeps no tombstones, so a
    /// previously deleted peer is indistinguishable from one that
    /// never existed.
    pub fn get(&self, id: Uuid) -> Result<Peer> {
        match self.store.get(&Self::key(id))? {
            Some(raw) => Ok(serde_json::from_slice(&raw)?),
            None => Err(Error::PeerNotFound(id)),
        }
    }

    /// Full enumeration, order not significant
    pub fn list_all(&self) -> Result<Vec<Peer>> {
        let mut peers = Vec::new();
        for raw in self.store.list_prefix(PEER_PREFIX)? {
            peers.push(serde_json::from_slice(&raw)?);
        }
        Ok(peers)
    }

    /// Write a peer record. Used by self-registration at startup; the
    /// join protocol proper goes through its own path.
    pub fn put(&self, peer: &Peer) -> Result<()> {
        self.store.put(&Self::key(peer.id), serde_json::to_vec(peer)?)
    }

    /// Remove a peer record. Delete-if-present: with concurrent
    /// removals of the same id, exactly one caller succeeds and the
    /// rest observe `PeerNotFound`.
    pub fn delete(&self, id: Uuid) -> Result<()> {
        if self.store.delete(&Self::key(id))? {
            Ok(())
        } else {
            Err(Error::PeerNotFound(id))
        }
    }
}
