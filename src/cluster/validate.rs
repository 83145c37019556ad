//! Removal precondition pipeline
//!
//! Checks run strictly in declaration order (cheapest and most common
//! failure first) and the pipeline stops at the first one that fails;
//! failures are never aggregated. The ordering is part of the
//! contract, which is why the checks live in a table instead of
//! nested branches.

use crate::common::{Error, Result};
use crate::peer::{Peer, PeerRegistry};
use crate::volume::VolumeCatalog;
use uuid::Uuid;

/// Read-only context shared by all checks. The resolved peer record
/// is cached by the existence check for the later stages and for the
/// caller, which needs its primary address.
pub struct RemovalContext<'a> {
    pub peer_id: Uuid,
    pub local_id: Uuid,
    pub registry: &'a PeerRegistry,
    pub volumes: &'a VolumeCatalog,
    peer: Option<Peer>,
}

impl<'a> RemovalContext<'a> {
    pub fn new(
        peer_id: Uuid,
        local_id: Uuid,
        registry: &'a PeerRegistry,
        volumes: &'a VolumeCatalog,
    ) -> Self {
        Self {
            peer_id,
            local_id,
            registry,
            volumes,
            peer: None,
        }
    }
}

type Check = fn(&mut RemovalContext<'_>) -> Result<()>;

const REMOVAL_CHECKS: &[(&str, Check)] = &[
    ("existence", check_exists),
    ("self-guard", check_not_self),
    ("bricks", check_no_bricks),
];

/// Run all removal preconditions; on success hand back the resolved
/// peer record.
pub fn validate_removal(mut ctx: RemovalContext<'_>) -> Result<Peer> {
    for (name, check) in REMOVAL_CHECKS {
        if let Err(err) = check(&mut ctx) {
            tracing::debug!(peer = %ctx.peer_id, check = name, %err, "removal precondition failed");
            return Err(err);
        }
    }
    ctx.peer
        .ok_or_else(|| Error::Internal("validation passed without resolving the peer".to_string()))
}

fn check_exists(ctx: &mut RemovalContext<'_>) -> Result<()> {
    let peer = ctx.registry.get(ctx.peer_id)?;
    ctx.peer = Some(peer);
    Ok(())
}

fn check_not_self(ctx: &mut RemovalContext<'_>) -> Result<()> {
    if ctx.peer_id == ctx.local_id {
        return Err(Error::SelfRemoval);
    }
    Ok(())
}

fn check_no_bricks(ctx: &mut RemovalContext<'_>) -> Result<()> {
    if ctx.volumes.has_bricks_on_peer(ctx.peer_id)? {
        return Err(Error::PeerHasBricks(ctx.peer_id));
    }
    Ok(())
}
