// src/engine/log_bridge.rs

//! Routes engine log output into `tracing`.
//!
//! Every engine gets a [`LogBridge`] when it is configured. Engine messages are
//! emitted under the `rendermill::engine` target with the engine id attached,
//! so they can be filtered independently of orchestrator messages. Engine
//! `trace` output is folded into `debug`.

use std::error::Error as StdError;
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, error, info, warn};

/// Severity of one engine message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum EngineLogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

/// Which stream of the engine process a line came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputStream {
    Stdout,
    Stderr,
}

impl OutputStream {
    fn default_level(self) -> EngineLogLevel {
        match self {
            OutputStream::Stdout => EngineLogLevel::Info,
            OutputStream::Stderr => EngineLogLevel::Warn,
        }
    }
}

// `[DOTX023W][WARN]: ...`, `[ERROR] ...`
static BRACKETED_LEVEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\[(trace|debug|info|warn|warning|error|fatal)\]")
        .expect("static regex")
});

// `Error: ...`, `Warning: ...`
static PREFIXED_LEVEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(error|fatal|warning|warn)\s*:").expect("static regex")
});

fn level_from_token(token: &str) -> Option<EngineLogLevel> {
    match token.to_lowercase().as_str() {
        "trace" => Some(EngineLogLevel::Trace),
        "debug" => Some(EngineLogLevel::Debug),
        "info" => Some(EngineLogLevel::Info),
        "warn" | "warning" => Some(EngineLogLevel::Warn),
        "error" | "fatal" => Some(EngineLogLevel::Error),
        _ => None,
    }
}

/// Guess the severity of a raw output line, falling back to the stream's
/// default (`info` for stdout, `warn` for stderr).
pub fn classify_line(stream: OutputStream, line: &str) -> EngineLogLevel {
    let token = BRACKETED_LEVEL
        .captures(line)
        .or_else(|| PREFIXED_LEVEL.captures(line))
        .and_then(|caps| caps.get(1))
        .and_then(|m| level_from_token(m.as_str()));

    token.unwrap_or_else(|| stream.default_level())
}

/// Leveled log sink handed to one engine instance.
#[derive(Debug, Clone)]
pub struct LogBridge {
    engine_id: usize,
}

impl LogBridge {
    pub fn new(engine_id: usize) -> Self {
        Self { engine_id }
    }

    pub fn engine_id(&self) -> usize {
        self.engine_id
    }

    /// Emit one message, optionally paired with its cause.
    pub fn log(
        &self,
        level: EngineLogLevel,
        message: &str,
        cause: Option<&(dyn StdError + 'static)>,
    ) {
        let engine_id = self.engine_id;
        match (level, cause) {
            (EngineLogLevel::Trace | EngineLogLevel::Debug, None) => {
                debug!(target: "rendermill::engine", engine_id, "{message}")
            }
            (EngineLogLevel::Trace | EngineLogLevel::Debug, Some(cause)) => {
                debug!(target: "rendermill::engine", engine_id, error = %cause, "{message}")
            }
            (EngineLogLevel::Info, None) => {
                info!(target: "rendermill::engine", engine_id, "{message}")
            }
            (EngineLogLevel::Info, Some(cause)) => {
                info!(target: "rendermill::engine", engine_id, error = %cause, "{message}")
            }
            (EngineLogLevel::Warn, None) => {
                warn!(target: "rendermill::engine", engine_id, "{message}")
            }
            (EngineLogLevel::Warn, Some(cause)) => {
                warn!(target: "rendermill::engine", engine_id, error = %cause, "{message}")
            }
            (EngineLogLevel::Error, None) => {
                error!(target: "rendermill::engine", engine_id, "{message}")
            }
            (EngineLogLevel::Error, Some(cause)) => {
                error!(target: "rendermill::engine", engine_id, error = %cause, "{message}")
            }
        }
    }

    /// Classify and emit one raw line of engine output. Returns the level used.
    pub fn forward_line(&self, stream: OutputStream, line: &str) -> EngineLogLevel {
        let level = classify_line(stream, line);
        self.log(level, line, None);
        level
    }
}
