// src/fs/mock.rs

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::{bail, Result};

use super::FileSystem;

#[derive(Debug, Clone)]
enum Node {
    File(Vec<u8>),
    Dir,
}

/// In-memory tree for tests. Paths are stored as given; parents are created
/// implicitly. Clones share the same tree.
#[derive(Debug, Clone, Default)]
pub struct MockFileSystem {
    nodes: Arc<Mutex<BTreeMap<PathBuf, Node>>>,
}

impl MockFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_file(&self, path: impl AsRef<Path>, content: impl Into<Vec<u8>>) {
        let path = path.as_ref();
        let mut nodes = self.nodes();
        insert_parents(&mut nodes, path);
        nodes.insert(path.to_path_buf(), Node::File(content.into()));
    }

    pub fn add_dir(&self, path: impl AsRef<Path>) {
        let path = path.as_ref();
        let mut nodes = self.nodes();
        insert_parents(&mut nodes, path);
        nodes.entry(path.to_path_buf()).or_insert(Node::Dir);
    }

    /// Contents of a file added with [`add_file`](Self::add_file).
    pub fn contents(&self, path: impl AsRef<Path>) -> Option<Vec<u8>> {
        match self.nodes().get(path.as_ref()) {
            Some(Node::File(bytes)) => Some(bytes.clone()),
            _ => None,
        }
    }

    fn nodes(&self) -> MutexGuard<'_, BTreeMap<PathBuf, Node>> {
        self.nodes.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn insert_parents(nodes: &mut BTreeMap<PathBuf, Node>, path: &Path) {
    for parent in path.ancestors().skip(1) {
        if parent.as_os_str().is_empty() {
            break;
        }
        nodes.entry(parent.to_path_buf()).or_insert(Node::Dir);
    }
}

impl FileSystem for MockFileSystem {
    fn is_dir(&self, path: &Path) -> bool {
        matches!(self.nodes().get(path), Some(Node::Dir))
    }

    fn list_children(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        let nodes = self.nodes();
        if !matches!(nodes.get(dir), Some(Node::Dir)) {
            bail!("not a directory: {}", dir.display());
        }
        // BTreeMap order keeps siblings sorted.
        Ok(nodes
            .keys()
            .filter(|p| p.parent() == Some(dir))
            .cloned()
            .collect())
    }

    fn ensure_dir(&self, dir: &Path) -> Result<()> {
        let mut nodes = self.nodes();
        if let Some(file) = dir
            .ancestors()
            .find(|p| matches!(nodes.get(*p), Some(Node::File(_))))
        {
            bail!("cannot create {}: {} is a file", dir.display(), file.display());
        }
        insert_parents(&mut nodes, dir);
        nodes.insert(dir.to_path_buf(), Node::Dir);
        Ok(())
    }
}
