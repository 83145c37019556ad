//! Control-plane daemon

use crate::cluster::http::{create_router, ClusterState};
use crate::cluster::leave::LeaveCoordinator;
use crate::common::{Config, Result};
use crate::peer::client::HttpLeaveClient;
use crate::peer::{Peer, PeerRegistry};
use crate::store::{ClusterStore, MemStore, SledStore, NODE_ID_KEY};
use crate::volume::VolumeCatalog;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use uuid::Uuid;

pub struct ControlPlane {
    config: Config,
}

impl ControlPlane {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub async fn serve(self) -> Result<()> {
        tracing::info!("Starting brickd control plane");
        tracing::info!("  HTTP API: {}", self.config.bind_addr);

        let store: Arc<dyn ClusterStore> = match &self.config.db_path {
            Some(path) => {
                tracing::info!("  DB path: {}", path.display());
                Arc::new(SledStore::open(path)?)
            }
            None => {
                tracing::warn!("no db path configured, cluster state will not survive a restart");
                Arc::new(MemStore::new())
            }
        };

        let local_id = load_or_create_node_id(store.as_ref())?;
        let registry = Arc::new(PeerRegistry::new(store.clone()));
        let volumes = Arc::new(VolumeCatalog::new(store.clone()));
        register_self(&registry, &self.config, local_id)?;

        let client = Arc::new(HttpLeaveClient::new(self.config.leave_timeout()));
        let coordinator = Arc::new(LeaveCoordinator::new(
            local_id,
            registry.clone(),
            volumes,
            store.clone(),
            client,
        ));

        let state = ClusterState {
            coordinator,
            registry,
            local_id,
            member: Arc::new(AtomicBool::new(true)),
        };
        let router = create_router(state);

        let listener = tokio::net::TcpListener::bind(self.config.bind_addr).await?;
        tracing::info!(node = %local_id, "brickd ready");

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        Ok(())
    }
}

/// The node identity survives restarts through the store; it is only
/// generated once, on first start.
fn load_or_create_node_id(store: &dyn ClusterStore) -> Result<Uuid> {
    if let Some(raw) = store.get(NODE_ID_KEY)? {
        let id: Uuid = serde_json::from_slice(&raw)?;
        return Ok(id);
    }
    let id = Uuid::new_v4();
    store.put(NODE_ID_KEY, serde_json::to_vec(&id)?)?;
    tracing::info!(node = %id, "generated node identity");
    Ok(id)
}

/// The local node's own record must always be present in the registry.
fn register_self(registry: &PeerRegistry, config: &Config, local_id: Uuid) -> Result<()> {
    let addr = config.advertise_addr();
    let name = config.node_name.clone().unwrap_or_else(|| addr.clone());

    let peer = match registry.get(local_id) {
        Ok(mut existing) => {
            existing.name = name;
            if !existing.addresses.contains(&addr) {
                existing.addresses.insert(0, addr);
            }
            existing
        }
        Err(_) => {
            let mut peer = Peer::new(name, vec![addr]);
            peer.id = local_id;
            peer
        }
    };
    registry.put(&peer)
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(%err, "failed to install shutdown handler");
    }
    tracing::info!("shutting down");
}
