// src/errors.rs

//! Errors that end a run. Per-file render failures live in
//! [`EngineError`] and only surface here once a pass is summarised.

use std::any::Any;
use std::fmt::Display;
use std::path::Path;

use thiserror::Error;

use crate::engine::EngineError;
use crate::render::PassFailure;

#[derive(Error, Debug)]
pub enum RendermillError {
    #[error("invalid configuration: {0}")]
    ConfigError(String),

    #[error("cannot read configuration: {0}")]
    IoError(#[from] std::io::Error),

    #[error("malformed configuration file: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("engine installation unavailable: {0}")]
    DistributionError(String),

    #[error("engine setup failed: {0}")]
    EngineError(#[from] EngineError),

    #[error(transparent)]
    PassFailed(#[from] PassFailure),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl RendermillError {
    /// Configuration error naming the offending path.
    pub fn config_path(what: &str, path: &Path, detail: impl Display) -> Self {
        RendermillError::ConfigError(format!("{what} {}: {detail}", path.display()))
    }
}

pub type Result<T> = std::result::Result<T, RendermillError>;

/// Text of a caught panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
