//! Node infrastructure shared by the builder and the binary.
//!
//! - [`args`] - CLI argument groups
//! - [`config`] - the TOML configuration file
//! - [`constants`] - defaults
//! - [`logging`] - logging initialization

pub mod args;
pub mod config;
pub mod constants;
pub mod logging;

pub use config::{ConfigError, NodeConfig};
