// src/config/overrides.rs

//! Command-line overrides applied on top of the file configuration.

use std::path::PathBuf;

use crate::config::model::RawConfigFile;
use crate::errors::{Result, RendermillError};
use crate::types::ProcessingMode;

/// Values given on the command line. `None` / empty means "keep the file
/// value".
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub source_dir: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub temp_dir: Option<PathBuf>,
    pub format: Option<String>,
    pub mode: Option<String>,
    pub parallelism: Option<i64>,
    pub includes: Vec<String>,
    pub patterns: Vec<String>,
    /// `KEY=VALUE` pairs, merged into `[render.properties]`.
    pub properties: Vec<String>,
    pub dita_home: Option<PathBuf>,
    pub dita_version: Option<String>,
}

impl ConfigOverrides {
    pub fn apply(&self, raw: &mut RawConfigFile) -> Result<()> {
        let render = &mut raw.render;

        if let Some(dir) = &self.source_dir {
            render.source_dir = dir.clone();
        }
        if let Some(dir) = &self.output_dir {
            render.output_dir = dir.clone();
        }
        if let Some(dir) = &self.temp_dir {
            render.temp_dir = dir.clone();
        }
        if let Some(format) = &self.format {
            render.format = format.clone();
        }
        if let Some(mode) = &self.mode {
            render.mode = mode
                .parse::<ProcessingMode>()
                .map_err(RendermillError::ConfigError)?;
        }
        if let Some(parallelism) = self.parallelism {
            render.parallelism = parallelism;
        }
        if !self.includes.is_empty() {
            render.includes = Some(self.includes.clone());
        }
        if !self.patterns.is_empty() {
            render.patterns = self.patterns.clone();
        }
        for pair in &self.properties {
            let (key, value) = parse_property(pair)?;
            render.properties.insert(key, value);
        }

        if let Some(home) = &self.dita_home {
            raw.distribution.home = Some(home.clone());
        }
        if let Some(version) = &self.dita_version {
            raw.distribution.version = version.clone();
        }

        Ok(())
    }
}

/// Split a `KEY=VALUE` argument.
pub fn parse_property(pair: &str) -> Result<(String, String)> {
    match pair.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(RendermillError::ConfigError(format!(
            "invalid property {pair:?} (expected KEY=VALUE)"
        ))),
    }
}
