// src/fs/mod.rs

//! Directory access used to find render roots and create their output
//! directories. Rendering itself goes through the engine, which works on the
//! real filesystem.

use std::fmt::Debug;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

pub mod mock;

pub trait FileSystem: Send + Sync + Debug {
    fn is_dir(&self, path: &Path) -> bool;

    /// Full paths of the immediate children of `dir`, sorted.
    fn list_children(&self, dir: &Path) -> Result<Vec<PathBuf>>;

    /// Create `dir` and any missing parents. Existing directories are fine.
    fn ensure_dir(&self, dir: &Path) -> Result<()>;
}

/// The host filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct RealFileSystem;

impl FileSystem for RealFileSystem {
    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn list_children(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        let mut children = fs::read_dir(dir)
            .and_then(|entries| {
                entries
                    .map(|entry| entry.map(|e| e.path()))
                    .collect::<std::io::Result<Vec<_>>>()
            })
            .with_context(|| format!("listing {}", dir.display()))?;
        children.sort();
        Ok(children)
    }

    fn ensure_dir(&self, dir: &Path) -> Result<()> {
        fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))
    }
}
