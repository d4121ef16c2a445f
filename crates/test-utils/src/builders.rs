#![allow(dead_code)]

use std::path::Path;

use rendermill::config::{ConfigFile, RawConfigFile};
use rendermill::errors::Result;
use rendermill::render::RenderConfiguration;
use rendermill::types::ProcessingMode;

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile::default(),
        }
    }

    /// Point source, output and temp directories into `root`
    /// (`root/src`, `root/out`, `root/tmp`).
    pub fn rooted_at(mut self, root: &Path) -> Self {
        self.config.render.source_dir = root.join("src");
        self.config.render.output_dir = root.join("out");
        self.config.render.temp_dir = root.join("tmp");
        self
    }

    pub fn source_dir(mut self, dir: &Path) -> Self {
        self.config.render.source_dir = dir.to_path_buf();
        self
    }

    pub fn output_dir(mut self, dir: &Path) -> Self {
        self.config.render.output_dir = dir.to_path_buf();
        self
    }

    pub fn format(mut self, format: &str) -> Self {
        self.config.render.format = format.to_string();
        self
    }

    pub fn mode(mut self, mode: ProcessingMode) -> Self {
        self.config.render.mode = mode;
        self
    }

    pub fn parallelism(mut self, level: i64) -> Self {
        self.config.render.parallelism = level;
        self
    }

    pub fn pattern(mut self, pattern: &str) -> Self {
        self.config.render.patterns.push(pattern.to_string());
        self
    }

    pub fn no_patterns(mut self) -> Self {
        self.config.render.patterns.clear();
        self
    }

    pub fn include(mut self, name: &str) -> Self {
        self.config
            .render
            .includes
            .get_or_insert_with(Vec::new)
            .push(name.to_string());
        self
    }

    pub fn property(mut self, key: &str, value: &str) -> Self {
        self.config
            .render
            .properties
            .insert(key.to_string(), value.to_string());
        self
    }

    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn try_build(self) -> Result<ConfigFile> {
        ConfigFile::try_from(self.config)
    }

    pub fn build(self) -> ConfigFile {
        self.try_build()
            .expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Default engine configuration with `format` swapped in.
pub fn render_configuration(format: &str) -> RenderConfiguration {
    RenderConfiguration {
        format: format.to_string(),
        ..RenderConfiguration::default()
    }
}
