//! Application core module
//!
//! Configuration shared by the CLI and the mining engine.

mod config;

pub use config::{Config, HttpConfig};
