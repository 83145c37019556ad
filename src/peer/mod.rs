//! Peer types and the membership registry
//!
//! A peer is one node of the storage cluster's control plane. Records
//! are owned by the cluster state store; everything here is a thin,
//! stateless accessor over them.

pub mod client;
pub mod registry;

pub use registry::PeerRegistry;

use crate::common::{Error, Result};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A cluster member
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Peer {
    /// Unique identity, assigned at join time and never reused
    pub id: Uuid,
    /// Display name
    pub name: String,
    /// Network endpoints; the first entry is the primary contact
    /// address for protocol calls
    pub addresses: Vec<String>,
    /// Identity of this peer's entry in the underlying consensus
    /// group (separate namespace from `id`)
    #[serde(rename = "memberID")]
    pub member_id: String,
}

impl Peer {
    pub fn new(name: String, addresses: Vec<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            addresses,
            member_id: Uuid::new_v4().to_string(),
        }
    }

    /// Address used for the leave exchange and endpoint refresh
    pub fn primary_address(&self) -> Option<&str> {
        self.addresses.first().map(String::as_str)
    }
}

/// Join request payload. Join processing happens elsewhere; the type
/// is part of the cluster API surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeerAddRequest {
    pub addresses: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl PeerAddRequest {
    pub fn validate(&self) -> Result<()> {
        if self.addresses.is_empty() {
            return Err(Error::InvalidConfig(
                "peer add request must carry at least one address".to_string(),
            ));
        }
        Ok(())
    }
}
