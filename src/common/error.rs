//! Error types for brickd

use crate::peer::client::LeaveCode;
use thiserror::Error;
use uuid::Uuid;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    // === I/O Errors ===
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // === Request validation ===
    #[error("Invalid peer id: {0}")]
    InvalidPeerId(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // === Membership preconditions ===
    #[error("Peer not found in cluster: {0}")]
    PeerNotFound(Uuid),

    #[error("Removing self from the cluster is disallowed")]
    SelfRemoval,

    #[error("Peer {0} has bricks and cannot be removed")]
    PeerHasBricks(Uuid),

    // === Cluster state store ===
    #[error("Store error: {0}")]
    Store(String),

    #[error("Sled error: {0}")]
    Sled(#[from] sled::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    // === Leave protocol ===
    #[error("RPC error: {0}")]
    Rpc(String),

    #[error("Peer refused leave request: {0}")]
    RemoteRefusal(LeaveCode),

    // === Generic ===
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Is this a retryable error?
    ///
    /// Store and transport failures may clear on a retry of the whole
    /// operation; precondition failures never do. A retry after `Rpc`
    /// observes `PeerNotFound` instead, since the registry record was
    /// already deleted before the remote exchange.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::Store(_) | Error::Sled(_) | Error::Rpc(_) | Error::Io(_)
        )
    }

    /// Stable machine-readable code for HTTP error bodies
    pub fn code(&self) -> &'static str {
        match self {
            Error::InvalidPeerId(_) => "invalid_peer_id",
            Error::InvalidConfig(_) => "invalid_config",
            Error::PeerNotFound(_) => "peer_not_found",
            Error::SelfRemoval => "self_removal",
            Error::PeerHasBricks(_) => "peer_has_bricks",
            Error::Store(_) | Error::Sled(_) | Error::Serde(_) => "store_error",
            Error::Rpc(_) => "rpc_error",
            Error::RemoteRefusal(_) => "remote_refusal",
            Error::Io(_) | Error::Internal(_) => "internal_error",
        }
    }

    /// Convert to HTTP status code
    pub fn to_http_status(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            Error::InvalidPeerId(_) | Error::InvalidConfig(_) => StatusCode::BAD_REQUEST,
            Error::PeerNotFound(_) => StatusCode::NOT_FOUND,
            Error::SelfRemoval | Error::PeerHasBricks(_) => StatusCode::FORBIDDEN,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Internal(s)
    }
}
