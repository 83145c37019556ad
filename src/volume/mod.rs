//! Volume and brick records
//!
//! Volumes are managed elsewhere; membership only needs the read-only
//! question "does any volume still place a brick on this peer". The
//! catalog answers it with a linear scan over all bricks, which is
//! fine for a rare administrative operation on a slowly changing
//! topology.

use crate::common::Result;
use crate::store::{ClusterStore, VOLUME_PREFIX};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// A storage unit placed on one peer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Brick {
    pub path: String,
    /// Owning peer's id
    pub node_id: Uuid,
}

/// A logical volume composed of bricks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Volume {
    pub id: Uuid,
    pub name: String,
    pub bricks: Vec<Brick>,
}

/// Read-only query surface over volume records
pub struct VolumeCatalog {
    store: Arc<dyn ClusterStore>,
}

impl VolumeCatalog {
    pub fn new(store: Arc<dyn ClusterStore>) -> Self {
        Self { store }
    }

    pub fn list_volumes(&self) -> Result<Vec<Volume>> {
        let mut volumes = Vec::new();
        for raw in self.store.list_prefix(VOLUME_PREFIX)? {
            volumes.push(serde_json::from_slice(&raw)?);
        }
        Ok(volumes)
    }

    /// True on the first brick whose owner is `peer_id`. Enumeration
    /// failure propagates as an error, which blocks removal: on
    /// uncertainty the peer is treated as still referenced.
    pub fn has_bricks_on_peer(&self, peer_id: Uuid) -> Result<bool> {
        for volume in self.list_volumes()? {
            if volume.bricks.iter().any(|b| b.node_id == peer_id) {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Seed a volume record (local daemon and tests)
    pub fn put_volume(&self, volume: &Volume) -> Result<()> {
        self.store.put(
            &format!("{}{}", VOLUME_PREFIX, volume.id),
            serde_json::to_vec(volume)?,
        )
    }
}
