//! Cluster state store
//!
//! The authoritative membership and volume records live in a
//! strongly-consistent key-value store shared by every peer's
//! control-plane process. This module models that store as an
//! injected trait so the rest of the daemon never depends on a
//! concrete backend, and tests can substitute an in-memory fake.
//!
//! Key layout:
//! - `peers/<uuid>` → serialized peer record
//! - `volumes/<uuid>` → serialized volume record
//! - `config/node-id` → this node's own identity
//! - `config/store-endpoints` → addresses store clients should dial

pub mod memory;
pub mod sled;

pub use self::sled::SledStore;
pub use memory::MemStore;

use crate::common::Result;
use crate::peer::Peer;

pub const PEER_PREFIX: &str = "peers/";
pub const VOLUME_PREFIX: &str = "volumes/";
pub const NODE_ID_KEY: &str = "config/node-id";
pub const ENDPOINTS_KEY: &str = "config/store-endpoints";

/// Trait for cluster-state backends
pub trait ClusterStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    fn put(&self, key: &str, value: Vec<u8>) -> Result<()>;

    /// Delete-if-present. Returns whether the key existed; under
    /// concurrent deleters of the same key, exactly one sees `true`.
    fn delete(&self, key: &str) -> Result<bool>;

    /// All values stored under `prefix`, order not significant
    fn list_prefix(&self, prefix: &str) -> Result<Vec<Vec<u8>>>;

    /// Recompute the endpoint list from current membership and persist
    /// it, so store clients reconnect only to live members. Idempotent;
    /// safe to run redundantly from concurrent removals.
    fn update_endpoints(&self) -> Result<Vec<String>> {
        let mut endpoints = Vec::new();
        for raw in self.list_prefix(PEER_PREFIX)? {
            let peer: Peer = serde_json::from_slice(&raw)?;
            if let Some(addr) = peer.primary_address() {
                endpoints.push(addr.to_string());
            }
        }
        endpoints.sort();
        self.put(ENDPOINTS_KEY, serde_json::to_vec(&endpoints)?)?;
        Ok(endpoints)
    }
}

/// Endpoint list as last persisted by [`ClusterStore::update_endpoints`]
pub fn stored_endpoints(store: &dyn ClusterStore) -> Result<Vec<String>> {
    match store.get(ENDPOINTS_KEY)? {
        Some(raw) => Ok(serde_json::from_slice(&raw)?),
        None => Ok(Vec::new()),
    }
}
