//! Cluster leave coordination
//!
//! Removing a peer runs as a small state machine:
//!
//! ```text
//! Validating -> LocalDeleting -> RemoteLeaving -> Syncing -> Done
//! ```
//!
//! Validation happens before any mutation, so a doomed request never
//! touches the store. The registry record is deleted *before* the
//! remote leave exchange: the authoritative membership view must
//! update even when the departing node is unreachable (it may have
//! crashed already). The cost is a known inconsistency window — if
//! the exchange then fails, the store says the peer is gone while the
//! peer still believes it belongs to the cluster and may keep issuing
//! cluster operations. A retry of the removal at that point reports
//! `PeerNotFound`.
//!
//! TODO: reconcile peers stranded in that window, e.g. an orphan
//! detection pass that re-sends the leave request.

use crate::cluster::validate::{validate_removal, RemovalContext};
use crate::common::{Error, Result};
use crate::peer::client::{LeaveClient, LeaveCode};
use crate::peer::PeerRegistry;
use crate::store::ClusterStore;
use crate::volume::VolumeCatalog;
use std::sync::Arc;
use uuid::Uuid;

/// Steps of one removal, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaveStep {
    Validating,
    LocalDeleting,
    RemoteLeaving,
    Syncing,
    Done,
}

pub struct LeaveCoordinator {
    local_id: Uuid,
    registry: Arc<PeerRegistry>,
    volumes: Arc<VolumeCatalog>,
    store: Arc<dyn ClusterStore>,
    client: Arc<dyn LeaveClient>,
}

impl LeaveCoordinator {
    pub fn new(
        local_id: Uuid,
        registry: Arc<PeerRegistry>,
        volumes: Arc<VolumeCatalog>,
        store: Arc<dyn ClusterStore>,
        client: Arc<dyn LeaveClient>,
    ) -> Self {
        Self {
            local_id,
            registry,
            volumes,
            store,
            client,
        }
    }

    /// Drive one removal to its terminal state. Steps run strictly in
    /// order and are never retried across a transition; concurrent
    /// removals of the same id are serialized only by the store's
    /// delete-if-present semantics.
    pub async fn remove_peer(&self, id: Uuid) -> Result<()> {
        let mut step = LeaveStep::Validating;
        tracing::debug!(peer = %id, ?step, "received remove peer request");

        let ctx = RemovalContext::new(id, self.local_id, &self.registry, &self.volumes);
        let peer = validate_removal(ctx).inspect_err(|err| {
            tracing::error!(peer = %id, ?step, %err, "could not validate removal");
        })?;

        step = LeaveStep::LocalDeleting;
        self.registry.delete(id).inspect_err(|err| {
            tracing::error!(peer = %id, ?step, %err, "failed to remove peer from the store");
        })?;

        step = LeaveStep::RemoteLeaving;
        let addr = peer
            .primary_address()
            .ok_or_else(|| Error::Internal(format!("peer {} has no addresses", id)))?;
        let response = self
            .client
            .leave_cluster(addr)
            .await
            .inspect_err(|err| {
                // The registry record is already gone; the departing
                // peer never heard about it. See the module docs.
                tracing::error!(peer = %id, ?step, %err, "sending leave request failed");
            })?;
        match response.code() {
            LeaveCode::None => {}
            code => {
                tracing::error!(peer = %id, ?step, %code, "leave request refused");
                return Err(Error::RemoteRefusal(code));
            }
        }
        tracing::debug!(peer = %id, "peer left cluster");

        // Best-effort, off the request path: the refresh must not
        // hold up the success response, and a failed refresh never
        // downgrades it.
        step = LeaveStep::Syncing;
        tracing::debug!(peer = %id, ?step, "refreshing store endpoints");
        let store = self.store.clone();
        tokio::task::spawn_blocking(move || {
            if let Err(err) = store.update_endpoints() {
                tracing::warn!(peer = %id, %err, "failed to refresh store endpoints");
            }
        });

        step = LeaveStep::Done;
        tracing::info!(peer = %id, ?step, "peer removed from cluster");
        Ok(())
    }
}
