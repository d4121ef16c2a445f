// src/jobs/descriptor.rs

use std::path::{Path, PathBuf};

/// One unit of render work: an input file and where its output goes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JobDescriptor {
    pub input: PathBuf,
    pub output_dir: PathBuf,
}

impl JobDescriptor {
    /// Build a descriptor for `input`, mapping its location under
    /// `source_root` onto `output_root`.
    pub fn new(source_root: &Path, output_root: &Path, input: PathBuf) -> Self {
        let output_dir = output_dir_for(source_root, output_root, &input);
        Self { input, output_dir }
    }

    /// File name of the input, for log lines.
    pub fn name(&self) -> String {
        self.input
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.input.display().to_string())
    }
}

/// Output directory for `input`: the input's parent directory relative to
/// `source_root`, resolved against `output_root`.
///
/// Inputs outside `source_root` (or without a parent) land directly in
/// `output_root`.
pub fn output_dir_for(source_root: &Path, output_root: &Path, input: &Path) -> PathBuf {
    let parent = match input.parent() {
        Some(p) => p,
        None => return output_root.to_path_buf(),
    };

    match parent.strip_prefix(source_root) {
        Ok(rel) if rel.as_os_str().is_empty() => output_root.to_path_buf(),
        Ok(rel) => output_root.join(rel),
        Err(_) => output_root.to_path_buf(),
    }
}
