// src/config/validate.rs

use std::path::{Path, PathBuf};

use crate::config::model::{ConfigFile, RawConfigFile, RenderSection};
use crate::engine::command::check_configuration;
use crate::errors::{Result, RendermillError};
use crate::jobs::SelectionRule;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::RendermillError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        let RawConfigFile {
            mut render,
            distribution,
        } = raw;

        validate_render_section(&render)?;

        if distribution.version.trim().is_empty() {
            return Err(RendermillError::ConfigError(
                "[distribution].version must not be empty".to_string(),
            ));
        }

        let selection = SelectionRule::from_parts(render.includes.as_deref(), &render.patterns)
            .map_err(|e| RendermillError::ConfigError(format!("[render].patterns: {e:#}")))?;

        render.source_dir = absolute(&render.source_dir)?;
        render.output_dir = absolute(&render.output_dir)?;
        render.temp_dir = absolute(&render.temp_dir)?;

        if render.source_dir == render.output_dir {
            return Err(RendermillError::ConfigError(format!(
                "[render].output_dir must differ from source_dir ({})",
                render.source_dir.display()
            )));
        }

        Ok(ConfigFile::new_unchecked(render, distribution, selection))
    }
}

fn validate_render_section(render: &RenderSection) -> Result<()> {
    let probe = crate::render::RenderConfiguration {
        format: render.format.clone(),
        mode: render.mode,
        properties: render.properties.clone(),
        clean_on_failure: render.clean_on_failure,
        debug_log: render.debug_log,
    };

    check_configuration(&probe)
        .map_err(|e| RendermillError::ConfigError(format!("[render]: {e}")))?;

    Ok(())
}

fn absolute(path: &Path) -> Result<PathBuf> {
    std::path::absolute(path).map_err(|e| RendermillError::config_path("cannot resolve", path, e))
}
