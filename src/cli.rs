// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::config::ConfigOverrides;

/// Command-line arguments for `rendermill`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "rendermill",
    version,
    about = "Render DITA maps in parallel with a pool of reusable engines.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Default: `Rendermill.toml` in the current working directory, if present.
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `RENDERMILL_LOG` directives or `info` are used.
    #[arg(long, global = true, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Load configuration, list the selected jobs, but don't render anything.
    #[arg(long, global = true)]
    pub dry_run: bool,

    #[command(flatten)]
    pub render: RenderArgs,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Render every selected file once (default).
    Render,
    /// Render, then re-render on `reload` commands until `quit`.
    Watch(WatchArgs),
}

#[derive(Debug, Clone, Args)]
pub struct WatchArgs {
    /// Also re-render when files under the source directory change.
    #[arg(long)]
    pub watch_files: bool,

    /// Seconds to wait for the running pass when shutting down.
    #[arg(long, value_name = "SECS", default_value_t = 60)]
    pub shutdown_timeout: u64,
}

/// Per-invocation overrides of the `[render]` / `[distribution]` settings.
#[derive(Debug, Clone, Default, Args)]
pub struct RenderArgs {
    /// Directory containing the maps to render.
    #[arg(long, global = true, value_name = "DIR")]
    pub source_dir: Option<PathBuf>,

    #[arg(long, global = true, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    #[arg(long, global = true, value_name = "DIR")]
    pub temp_dir: Option<PathBuf>,

    /// Output format (transtype), e.g. `html5` or `pdf`.
    #[arg(long, global = true, value_name = "FORMAT")]
    pub format: Option<String>,

    /// Processing mode: strict, skip or lax.
    #[arg(long, global = true, value_name = "MODE")]
    pub mode: Option<String>,

    /// 0 renders inline, a negative value uses all cores, N > 0 uses N workers.
    #[arg(long, global = true, value_name = "N", allow_negative_numbers = true)]
    pub parallelism: Option<i64>,

    /// Render exactly this file name (repeatable). Overrides patterns.
    #[arg(long = "include", global = true, value_name = "NAME")]
    pub includes: Vec<String>,

    /// Regex matched against full file names (repeatable).
    #[arg(long = "pattern", global = true, value_name = "REGEX")]
    pub patterns: Vec<String>,

    /// Engine property (repeatable).
    #[arg(long = "property", short = 'D', global = true, value_name = "KEY=VALUE")]
    pub properties: Vec<String>,

    /// Use an existing engine installation.
    #[arg(long, global = true, value_name = "DIR")]
    pub dita_home: Option<PathBuf>,

    #[arg(long, global = true, value_name = "VERSION")]
    pub dita_version: Option<String>,
}

impl RenderArgs {
    pub fn to_overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            source_dir: self.source_dir.clone(),
            output_dir: self.output_dir.clone(),
            temp_dir: self.temp_dir.clone(),
            format: self.format.clone(),
            mode: self.mode.clone(),
            parallelism: self.parallelism,
            includes: self.includes.clone(),
            patterns: self.patterns.clone(),
            properties: self.properties.clone(),
            dita_home: self.dita_home.clone(),
            dita_version: self.dita_version.clone(),
        }
    }
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// `EnvFilter` directive for this level.
    pub fn directive(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
