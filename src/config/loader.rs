// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::config::overrides::ConfigOverrides;
use crate::errors::Result;

/// Parse `path` as TOML. Missing keys take their defaults; nothing is
/// validated yet.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let text = fs::read_to_string(path.as_ref())?;
    Ok(toml::from_str(&text)?)
}

/// [`load_from_path`] followed by validation, with no overrides applied.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    ConfigFile::try_from(load_from_path(path)?)
}

/// Looked up in the working directory when no `--config` is given.
pub const DEFAULT_CONFIG_FILE: &str = "Rendermill.toml";

/// Where the effective configuration comes from: an optional file plus
/// command-line overrides.
///
/// Kept around in watch mode so the configuration can be re-read before each
/// pass.
#[derive(Debug, Clone)]
pub struct ConfigSource {
    path: Option<PathBuf>,
    overrides: ConfigOverrides,
}

impl ConfigSource {
    pub fn new(path: Option<PathBuf>, overrides: ConfigOverrides) -> Self {
        Self { path, overrides }
    }

    /// Resolve the config file to use.
    ///
    /// An explicit path must exist; it is read on every [`load`](Self::load).
    /// Without one, `Rendermill.toml` is used when present and built-in
    /// defaults otherwise.
    pub fn discover(explicit: Option<PathBuf>, overrides: ConfigOverrides) -> Self {
        let path = explicit.or_else(|| {
            let default = PathBuf::from(DEFAULT_CONFIG_FILE);
            default.is_file().then_some(default)
        });
        Self::new(path, overrides)
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn load(&self) -> Result<ConfigFile> {
        let mut raw = match &self.path {
            Some(path) => {
                debug!(path = %path.display(), "loading configuration");
                load_from_path(path)?
            }
            None => {
                debug!("no configuration file; using defaults");
                RawConfigFile::default()
            }
        };

        self.overrides.apply(&mut raw)?;
        ConfigFile::try_from(raw)
    }
}
