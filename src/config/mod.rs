// src/config/mod.rs

//! Kernel configuration.
//!
//! - [`model`] maps the TOML file to serde types.
//! - [`loader`] reads and validates a config file from disk.
//! - [`validate`] holds the semantic checks shared by the loader and the
//!   kernel builder.

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_and_validate, load_from_path};
pub use model::{ConfigFile, ExecutorConfig, ExecutorKind, GlobalsSection};
pub use validate::validate_config;
