// src/config/mod.rs

//! Configuration loading and validation for rendermill.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Apply command-line overrides (`overrides.rs`).
//! - Validate settings and compile file patterns (`validate.rs`).

pub mod loader;
pub mod model;
pub mod overrides;
pub mod validate;

pub use loader::{load_and_validate, load_from_path, ConfigSource};
pub use model::{ConfigFile, DistributionSection, RawConfigFile, RenderSection};
pub use overrides::ConfigOverrides;
