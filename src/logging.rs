// src/logging.rs

//! `tracing` setup for the binary.
//!
//! The filter comes from, in order: `--log-level`, the `RENDERMILL_LOG`
//! environment variable (full `EnvFilter` syntax, e.g.
//! `info,rendermill::engine=warn` to quieten engine output), then `info`.
//!
//! Everything is written to stderr; `--dry-run` listings go to stdout.

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

use crate::cli::LogLevel;

/// Environment variable holding filter directives.
pub const LOG_ENV: &str = "RENDERMILL_LOG";

/// Install the global subscriber. Call once at startup.
pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    let env = std::env::var(LOG_ENV).ok();
    let filter = build_filter(cli_level, env.as_deref())?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to install log subscriber: {e}"))
}

/// Filter for a CLI level and a `RENDERMILL_LOG` value. The CLI level wins;
/// an empty variable counts as unset.
pub fn build_filter(cli_level: Option<LogLevel>, env: Option<&str>) -> Result<EnvFilter> {
    match (cli_level, env.map(str::trim).filter(|s| !s.is_empty())) {
        (Some(level), _) => Ok(EnvFilter::new(level.directive())),
        (None, Some(directives)) => EnvFilter::try_new(directives)
            .with_context(|| format!("invalid {LOG_ENV} value {directives:?}")),
        (None, None) => Ok(EnvFilter::new("info")),
    }
}
