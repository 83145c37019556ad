//! Cluster membership coordination
//!
//! The leave coordinator owns the removal protocol: precondition
//! validation, the registry mutation, the leave exchange with the
//! departing peer, and the endpoint refresh on the state store.

pub mod http;
pub mod leave;
pub mod server;
pub mod validate;

pub use leave::{LeaveCoordinator, LeaveStep};
pub use server::ControlPlane;
