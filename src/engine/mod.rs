// src/engine/mod.rs

//! Render engine abstraction.
//!
//! The orchestrator only needs two capabilities from an engine:
//! - being configured once (format, mode, properties, log sink) when it is
//!   created by an [`EngineFactory`];
//! - rendering one input file into one output directory
//!   ([`RenderEngine::render`]).
//!
//! - [`pool`] recycles configured engines between jobs.
//! - [`command`] is the adapter driving the DITA-OT `dita` launcher.
//! - [`log_bridge`] routes engine output into `tracing`.

use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;

use thiserror::Error;

use crate::render::RenderConfiguration;

pub mod command;
pub mod log_bridge;
pub mod pool;

pub use command::{CommandEngine, DitaCommandFactory};
pub use log_bridge::{EngineLogLevel, LogBridge, OutputStream};
pub use pool::{EngineHandle, EnginePool, PooledEngine};

/// Failure raised by an engine, either while being configured or while
/// rendering a single file.
#[derive(Error, Debug)]
pub enum EngineError {
    /// The engine refused its configuration (mode, properties, installation).
    #[error("engine configuration rejected: {0}")]
    Configuration(String),

    #[error("failed to start engine {launcher:?}: {source}")]
    Spawn {
        launcher: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The render ran and reported failure.
    #[error("{message}")]
    Failed { code: Option<i32>, message: String },

    #[error("cannot prepare output directory {path:?}: {message}")]
    OutputDir { path: PathBuf, message: String },

    /// The job ended without producing an outcome (e.g. it panicked).
    #[error("render job aborted: {0}")]
    Aborted(String),

    #[error("engine I/O failure: {0}")]
    Io(#[from] io::Error),
}

pub type RenderFuture<'a> =
    Pin<Box<dyn Future<Output = std::result::Result<(), EngineError>> + Send + 'a>>;

/// One configured engine instance.
///
/// An engine is only ever used by one job at a time; the pool hands out
/// exclusive access, so implementations need `Send` but not `Sync`.
pub trait RenderEngine: Send {
    /// Transform `input` into `output_dir`.
    fn render<'a>(&'a mut self, input: &'a Path, output_dir: &'a Path) -> RenderFuture<'a>;
}

/// Produces configured engines for the pool.
///
/// `new_engine` runs inline on a pool miss; an error fails that borrow only.
pub trait EngineFactory: Send + Sync {
    fn new_engine(
        &self,
        id: usize,
        config: &Arc<RenderConfiguration>,
        log: LogBridge,
    ) -> std::result::Result<Box<dyn RenderEngine>, EngineError>;
}
