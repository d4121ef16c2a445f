#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

pub use rendermill_test_utils::builders::ConfigFileBuilder;
pub use rendermill_test_utils::fake_engine::{EngineStats, FakeEngineFactory};
pub use rendermill_test_utils::{init_tracing, with_timeout};

/// Create `root/src` and one empty file per name inside it.
pub fn source_tree(root: &Path, names: &[&str]) -> PathBuf {
    let src = root.join("src");
    fs::create_dir_all(&src).unwrap();
    for name in names {
        fs::write(src.join(name), b"<map/>").unwrap();
    }
    src
}
