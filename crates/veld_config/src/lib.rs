//! `veld.toml` project configuration.
//!
//! Provides typed access to project metadata and per-stage settings,
//! including the `[specialize]` table consumed by the module-specialization
//! pass.

#![warn(missing_docs)]

pub mod error;
pub mod loader;
pub mod types;

pub use error::ConfigError;
pub use loader::{load_config, load_config_from_str};
pub use types::{ProjectConfig, ProjectMeta, SpecializeConfig};
