//! # Configuration Module
//!
//! Typed service configuration and the loader that assembles it from TOML
//! files and environment variables.

pub mod config;
pub mod loader;

pub use config::{AppConfig, ScanConfig, ServerConfig};
pub use loader::{ConfigSources, load, load_with_env};
