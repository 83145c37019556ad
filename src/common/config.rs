//! Configuration for the brickd daemon

use crate::common::{Error, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Daemon configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Display name for this node (defaults to the bind address)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_name: Option<String>,

    /// Bind address for the HTTP control API
    #[serde(default = "default_bind_addr")]
    pub bind_addr: SocketAddr,

    /// Address other peers should use to reach this node.
    /// Falls back to the bind address when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub advertise_addr: Option<String>,

    /// Cluster-state database directory. Unset means an in-memory
    /// store, which does not survive a restart.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub db_path: Option<PathBuf>,

    /// Timeout for the leave exchange with a departing peer
    #[serde(default = "default_leave_timeout_ms")]
    pub leave_timeout_ms: u64,

    /// Logging level
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_bind_addr() -> SocketAddr {
    "0.0.0.0:24007".parse().unwrap()
}

fn default_leave_timeout_ms() -> u64 {
    5_000
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            node_name: None,
            bind_addr: default_bind_addr(),
            advertise_addr: None,
            db_path: None,
            leave_timeout_ms: default_leave_timeout_ms(),
            log_level: default_log_level(),
        }
    }
}

impl Config {
    /// Load configuration from an optional TOML file, with `BRICKD_*`
    /// environment variables layered on top.
    pub fn load(path: Option<&str>) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path));
        } else {
            builder = builder.add_source(config::File::with_name("brickd").required(false));
        }
        builder = builder.add_source(config::Environment::with_prefix("BRICKD"));

        let raw = builder
            .build()
            .map_err(|e| Error::InvalidConfig(e.to_string()))?;
        raw.try_deserialize()
            .map_err(|e| Error::InvalidConfig(e.to_string()))
    }

    /// Address to publish in this node's own peer record
    pub fn advertise_addr(&self) -> String {
        self.advertise_addr
            .clone()
            .unwrap_or_else(|| self.bind_addr.to_string())
    }

    pub fn leave_timeout(&self) -> Duration {
        Duration::from_millis(self.leave_timeout_ms)
    }
}
