//! # brickd
//!
//! Control-plane daemon for a distributed storage cluster. Peers hold
//! bricks, bricks make up volumes, and the authoritative membership
//! and volume records live in a shared cluster state store.
//!
//! ```text
//! DELETE /v1/peers/:id
//!        │
//!        ▼
//!  ┌───────────────────┐   validate    ┌──────────────────┐
//!  │ LeaveCoordinator  ├──────────────▶│ registry + bricks │
//!  └────────┬──────────┘               └──────────────────┘
//!           │ delete record, then
//!           ▼
//!  ┌───────────────────┐   POST /v1/cluster/leave
//!  │ departing peer    │◀─────────────────────────
//!  └───────────────────┘
//! ```
//!
//! The hard part is the removal protocol and its failure semantics:
//! see [`cluster::leave`].

pub mod cluster;
pub mod common;
pub mod peer;
pub mod store;
pub mod volume;

// Re-export commonly used types
pub use cluster::ControlPlane;
pub use common::{Config, Error, Result};

/// Current version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
