// src/engine/command.rs

//! Engine adapter for the DITA-OT command-line launcher.
//!
//! Each render spawns `bin/dita` from the installation directory with the
//! engine's configuration translated into launcher arguments:
//!
//! ```text
//! dita --input=<file> --format=<format> --output=<dir> --temp=<engine temp>
//!      --processing-mode=<mode> -D<key>=<value>... [--debug]
//! ```
//!
//! stdout/stderr are streamed line by line through the engine's
//! [`LogBridge`].

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::{Arc, Mutex};

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::engine::{
    EngineError, EngineFactory, EngineLogLevel, LogBridge, OutputStream, RenderEngine,
    RenderFuture,
};
use crate::render::RenderConfiguration;

/// Relative path of the launcher inside an installation.
#[cfg(windows)]
pub const LAUNCHER: &str = "bin/dita.bat";
#[cfg(not(windows))]
pub const LAUNCHER: &str = "bin/dita";

/// Factory bound to one engine installation.
#[derive(Debug, Clone)]
pub struct DitaCommandFactory {
    launcher: PathBuf,
    temp_root: PathBuf,
}

impl DitaCommandFactory {
    /// Bind to the installation at `installation_dir`. Each engine created by
    /// this factory keeps its temporary files under `temp_dir/engine-<id>`.
    pub fn new(
        installation_dir: impl AsRef<Path>,
        temp_dir: impl Into<PathBuf>,
    ) -> Result<Self, EngineError> {
        let launcher = installation_dir.as_ref().join(LAUNCHER);
        if !launcher.is_file() {
            return Err(EngineError::Configuration(format!(
                "no launcher found at {}",
                launcher.display()
            )));
        }

        Ok(Self {
            launcher,
            temp_root: temp_dir.into(),
        })
    }

    pub fn launcher(&self) -> &Path {
        &self.launcher
    }
}

/// Reject configurations the launcher cannot express.
pub fn check_configuration(config: &RenderConfiguration) -> Result<(), EngineError> {
    if config.format.trim().is_empty() {
        return Err(EngineError::Configuration(
            "output format must not be empty".to_string(),
        ));
    }

    for key in config.properties.keys() {
        if key.is_empty() || key.contains('=') || key.chars().any(char::is_whitespace) {
            return Err(EngineError::Configuration(format!(
                "invalid property name {key:?}"
            )));
        }
    }

    Ok(())
}

impl EngineFactory for DitaCommandFactory {
    fn new_engine(
        &self,
        id: usize,
        config: &Arc<RenderConfiguration>,
        log: LogBridge,
    ) -> Result<Box<dyn RenderEngine>, EngineError> {
        check_configuration(config)?;

        Ok(Box::new(CommandEngine {
            launcher: self.launcher.clone(),
            temp_dir: self.temp_root.join(format!("engine-{id}")),
            config: Arc::clone(config),
            log,
        }))
    }
}

/// One configured launcher invocation template.
#[derive(Debug)]
pub struct CommandEngine {
    launcher: PathBuf,
    temp_dir: PathBuf,
    config: Arc<RenderConfiguration>,
    log: LogBridge,
}

impl CommandEngine {
    /// Launcher arguments for one render.
    pub fn arguments(&self, input: &Path, output_dir: &Path) -> Vec<String> {
        let mut args = vec![
            format!("--input={}", input.display()),
            format!("--format={}", self.config.format),
            format!("--output={}", output_dir.display()),
            format!("--temp={}", self.temp_dir.display()),
            format!("--processing-mode={}", self.config.mode),
        ];

        args.extend(
            self.config
                .properties
                .iter()
                .map(|(key, value)| format!("-D{key}={value}")),
        );

        if self.config.debug_log {
            args.push("--debug".to_string());
        }

        args
    }

    async fn run(&self, input: &Path, output_dir: &Path) -> Result<(), EngineError> {
        tokio::fs::create_dir_all(&self.temp_dir).await?;

        let mut cmd = Command::new(&self.launcher);
        cmd.args(self.arguments(input, output_dir))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        debug!(
            engine_id = self.log.engine_id(),
            launcher = %self.launcher.display(),
            input = %input.display(),
            "starting engine process"
        );

        let mut child = cmd.spawn().map_err(|source| EngineError::Spawn {
            launcher: self.launcher.clone(),
            source,
        })?;

        // Last error-level line, reported as the failure message.
        let last_error: Arc<Mutex<Option<String>>> = Arc::new(Mutex::new(None));

        let stdout = child
            .stdout
            .take()
            .map(|out| forward_output(out, OutputStream::Stdout, self.log.clone(), last_error.clone()));
        let stderr = child
            .stderr
            .take()
            .map(|err| forward_output(err, OutputStream::Stderr, self.log.clone(), last_error.clone()));

        let status = child.wait().await?;

        // Drain the readers so every line is logged before we report.
        for reader in [stdout, stderr].into_iter().flatten() {
            if let Err(e) = reader.await {
                warn!(engine_id = self.log.engine_id(), error = %e, "engine output reader failed");
            }
        }

        if status.success() {
            return Ok(());
        }

        let detail = last_error
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        let message = match (status.code(), detail) {
            (Some(code), Some(line)) => format!("engine exited with code {code}: {line}"),
            (Some(code), None) => format!("engine exited with code {code}"),
            (None, Some(line)) => format!("engine terminated by signal: {line}"),
            (None, None) => "engine terminated by signal".to_string(),
        };

        Err(EngineError::Failed {
            code: status.code(),
            message,
        })
    }

    async fn clean_temp(&self) {
        match tokio::fs::remove_dir_all(&self.temp_dir).await {
            Ok(()) => info!(
                engine_id = self.log.engine_id(),
                temp = %self.temp_dir.display(),
                "removed temporary files after failed render"
            ),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(
                engine_id = self.log.engine_id(),
                temp = %self.temp_dir.display(),
                error = %e,
                "failed to clean temporary files"
            ),
        }
    }
}

impl RenderEngine for CommandEngine {
    fn render<'a>(&'a mut self, input: &'a Path, output_dir: &'a Path) -> RenderFuture<'a> {
        Box::pin(async move {
            let result = self.run(input, output_dir).await;
            if result.is_err() && self.config.clean_on_failure {
                self.clean_temp().await;
            }
            result
        })
    }
}

fn forward_output<R>(
    reader: R,
    stream: OutputStream,
    log: LogBridge,
    last_error: Arc<Mutex<Option<String>>>,
) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(reader).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if line.trim().is_empty() {
                continue;
            }
            if log.forward_line(stream, &line) == EngineLogLevel::Error {
                *last_error
                    .lock()
                    .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(line);
            }
        }
    })
}
