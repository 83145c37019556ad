//! Client side of the leave protocol
//!
//! One request/response exchange instructing a peer to drop out of the
//! cluster. The response carries a single error code from a closed
//! set; anything other than [`LeaveCode::None`] is a remote-side
//! refusal, while transport problems (including timeout) surface as
//! RPC errors.

use crate::common::{Error, Result};
use axum::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Closed set of error codes a peer can answer a leave request with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaveCode {
    /// Success
    None,
    /// The peer no longer considers itself a cluster member
    NotMember,
    /// Unspecified remote-side failure (also covers codes from a
    /// newer peer this build does not know)
    Unknown,
}

impl LeaveCode {
    pub fn from_wire(code: i32) -> Self {
        match code {
            0 => LeaveCode::None,
            1 => LeaveCode::NotMember,
            _ => LeaveCode::Unknown,
        }
    }

    pub fn to_wire(self) -> i32 {
        match self {
            LeaveCode::None => 0,
            LeaveCode::NotMember => 1,
            LeaveCode::Unknown => 2,
        }
    }
}

impl fmt::Display for LeaveCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LeaveCode::None => write!(f, "no error"),
            LeaveCode::NotMember => write!(f, "peer is not a cluster member"),
            LeaveCode::Unknown => write!(f, "unknown error on the remote peer"),
        }
    }
}

/// Wire body of the leave response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaveResponse {
    pub err_code: i32,
}

impl LeaveResponse {
    pub fn ok() -> Self {
        Self {
            err_code: LeaveCode::None.to_wire(),
        }
    }

    pub fn refused(code: LeaveCode) -> Self {
        Self {
            err_code: code.to_wire(),
        }
    }

    pub fn code(&self) -> LeaveCode {
        LeaveCode::from_wire(self.err_code)
    }
}

/// One leave exchange with the peer reachable at `addr`
#[async_trait]
pub trait LeaveClient: Send + Sync {
    async fn leave_cluster(&self, addr: &str) -> Result<LeaveResponse>;
}

/// Leave client over the peers' HTTP control API
pub struct HttpLeaveClient {
    timeout: Duration,
}

impl HttpLeaveClient {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl LeaveClient for HttpLeaveClient {
    async fn leave_cluster(&self, addr: &str) -> Result<LeaveResponse> {
        // The connection is scoped to this one exchange: the client is
        // built here and dropped on every exit path.
        let http = reqwest::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| Error::Rpc(e.to_string()))?;

        let url = format!("http://{}/v1/cluster/leave", addr);
        let response = http.post(&url).send().await.map_err(map_transport)?;

        if !response.status().is_success() {
            return Err(Error::Rpc(format!(
                "leave request to {} answered with status {}",
                addr,
                response.status()
            )));
        }

        response.json::<LeaveResponse>().await.map_err(map_transport)
    }
}

fn map_transport(err: reqwest::Error) -> Error {
    if err.is_timeout() {
        Error::Rpc(format!("leave request timed out: {}", err))
    } else {
        Error::Rpc(err.to_string())
    }
}
