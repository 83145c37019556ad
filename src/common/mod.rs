//! Common utilities and types shared across brickd

pub mod config;
pub mod error;

pub use config::Config;
pub use error::{Error, Result};
