//! HTTP control API
//!
//! Serves both the administrative surface (peer listing and removal)
//! and the receiving side of the leave protocol. Failures answer with
//! a structured `{code, message}` body; the status comes from the
//! error category.

use crate::cluster::leave::LeaveCoordinator;
use crate::common::Error;
use crate::peer::client::{LeaveCode, LeaveResponse};
use crate::peer::PeerRegistry;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json, Router,
};
use serde_json::json;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

/// Shared state for HTTP handlers
#[derive(Clone)]
pub struct ClusterState {
    pub coordinator: Arc<LeaveCoordinator>,
    pub registry: Arc<PeerRegistry>,
    pub local_id: Uuid,
    /// Whether this node still considers itself a cluster member;
    /// cleared when it is asked to leave.
    pub member: Arc<AtomicBool>,
}

pub fn create_router(state: ClusterState) -> Router {
    Router::new()
        // Peer membership
        .route("/v1/peers", axum::routing::get(list_peers))
        .route("/v1/peers/:peerid", axum::routing::get(get_peer))
        .route("/v1/peers/:peerid", axum::routing::delete(remove_peer))
        // Leave protocol (receiving side)
        .route("/v1/cluster/leave", axum::routing::post(leave_cluster))
        // Liveness
        .route("/health", axum::routing::get(health))
        .route("/status", axum::routing::get(status))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn error_response(err: &Error) -> Response {
    (
        err.to_http_status(),
        Json(json!({ "code": err.code(), "message": err.to_string() })),
    )
        .into_response()
}

/// Removal entry point. The identifier is checked for shape before
/// anything else runs, so a malformed request never reaches the store.
async fn remove_peer(State(state): State<ClusterState>, Path(peerid): Path<String>) -> Response {
    let id = match Uuid::parse_str(&peerid) {
        Ok(id) => id,
        Err(_) => return error_response(&Error::InvalidPeerId(peerid)),
    };

    match state.coordinator.remove_peer(id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => error_response(&err),
    }
}

async fn get_peer(State(state): State<ClusterState>, Path(peerid): Path<String>) -> Response {
    let id = match Uuid::parse_str(&peerid) {
        Ok(id) => id,
        Err(_) => return error_response(&Error::InvalidPeerId(peerid)),
    };

    match state.registry.get(id) {
        Ok(peer) => Json(peer).into_response(),
        Err(err) => error_response(&err),
    }
}

async fn list_peers(State(state): State<ClusterState>) -> Response {
    match state.registry.list_all() {
        Ok(peers) => Json(peers).into_response(),
        Err(err) => error_response(&err),
    }
}

/// Receiving side of the leave protocol: stop treating this node as a
/// cluster member and acknowledge with a wire code.
async fn leave_cluster(State(state): State<ClusterState>) -> Response {
    let was_member = state.member.swap(false, Ordering::SeqCst);
    if was_member {
        tracing::info!(node = %state.local_id, "leaving cluster on remote request");
        Json(LeaveResponse::ok()).into_response()
    } else {
        tracing::warn!(node = %state.local_id, "leave requested but this node is not a member");
        Json(LeaveResponse::refused(LeaveCode::NotMember)).into_response()
    }
}

async fn health() -> Response {
    Json(json!({ "status": "ok" })).into_response()
}

async fn status(State(state): State<ClusterState>) -> Response {
    // A broken registry is reported, not papered over with a zero
    // peer count.
    match state.registry.list_all() {
        Ok(peers) => Json(json!({
            "node_id": state.local_id,
            "member": state.member.load(Ordering::SeqCst),
            "nb_peers": peers.len(),
            "version": crate::VERSION,
        }))
        .into_response(),
        Err(err) => error_response(&err),
    }
}
