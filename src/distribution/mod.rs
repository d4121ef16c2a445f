// src/distribution/mod.rs

//! Acquisition of the render engine installation.
//!
//! The rest of the crate only needs an installation directory. The
//! [`LocalDistributionProvider`] produces one from, in order: an explicit
//! installation, a previously extracted copy, a local or cached archive, or a
//! download.
//!
//! - [`archive`] extracts distribution archives (`zip`).
//! - [`download`] fetches archives over HTTP (`reqwest`).
//! - [`local`] implements the lookup order and the cache.

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;

use crate::errors::Result;
use crate::types::CachePolicy;

pub mod archive;
pub mod download;
pub mod local;

pub use local::LocalDistributionProvider;

/// Name of the extracted installation inside the temp directory.
pub const EXTRACTED_DIR_NAME: &str = "dita_distribution";

/// Supplies a ready-to-use engine installation directory.
pub trait DistributionProvider: Send + Sync {
    fn acquire<'a>(
        &'a self,
        version: &'a str,
        policy: CachePolicy,
    ) -> Pin<Box<dyn Future<Output = Result<PathBuf>> + Send + 'a>>;
}
