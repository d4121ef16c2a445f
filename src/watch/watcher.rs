// src/watch/watcher.rs

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tracing::{debug, info, warn};

use crate::watch::gate::GateHandle;

/// Live source-tree watch. Watching stops when this is dropped.
pub struct SourceWatcher {
    root: PathBuf,
    _watcher: RecommendedWatcher,
}

impl SourceWatcher {
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl std::fmt::Debug for SourceWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceWatcher")
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}

/// Whether a change to `path` should trigger a reload.
///
/// Paths under any of the `ignored` directories (typically the output and
/// temp directories, which the render itself writes to) never do; neither do
/// pure access events.
pub fn is_relevant_change(kind: &EventKind, path: &Path, ignored: &[PathBuf]) -> bool {
    let mutating = matches!(
        kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_) | EventKind::Any
    );
    mutating && !ignored.iter().any(|dir| path.starts_with(dir))
}

/// Watch `root` recursively and raise a reload signal on `gate` for every
/// relevant change. The gate coalesces bursts into a single follow-up pass,
/// so signalling straight from the notify thread is enough.
pub fn spawn_source_watcher(
    root: impl Into<PathBuf>,
    ignored: Vec<PathBuf>,
    gate: GateHandle,
) -> Result<SourceWatcher> {
    let root = stable_path(root.into());
    // notify reports resolved paths; ignored dirs must be resolved the same way.
    let ignored: Vec<PathBuf> = ignored.into_iter().map(stable_path).collect();

    let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
        let event = match res {
            Ok(event) => event,
            Err(err) => {
                warn!(error = %err, "source watch error");
                return;
            }
        };
        if let Some(path) = event
            .paths
            .iter()
            .find(|path| is_relevant_change(&event.kind, path, &ignored))
        {
            let phase = gate.signal();
            debug!(path = %path.display(), ?phase, "source change triggered reload");
        }
    })
    .context("creating source watcher")?;

    watcher
        .watch(&root, RecursiveMode::Recursive)
        .with_context(|| format!("watching {}", root.display()))?;
    info!(root = %root.display(), "watching source tree");

    Ok(SourceWatcher {
        root,
        _watcher: watcher,
    })
}

fn stable_path(path: PathBuf) -> PathBuf {
    path.canonicalize().unwrap_or(path)
}
