// src/watch/trigger.rs

//! Textual trigger commands read from an input stream (stdin in practice).
//!
//! Input is split on whitespace; each token is matched case-insensitively:
//! `reload` / `r` raise a reload signal, `quit` / `exit` stop reading. Any
//! other token is ignored.

use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{debug, info};

use crate::errors::Result;
use crate::watch::gate::GateHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerCommand {
    Reload,
    Quit,
}

impl TriggerCommand {
    pub fn parse(token: &str) -> Option<Self> {
        match token.trim().to_lowercase().as_str() {
            "reload" | "r" => Some(TriggerCommand::Reload),
            "quit" | "exit" => Some(TriggerCommand::Quit),
            _ => None,
        }
    }
}

/// Why [`read_commands`] stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEnd {
    /// A `quit` / `exit` command was read.
    Quit,
    /// The input stream was closed.
    Eof,
}

/// Read commands from `reader`, raising a gate signal for each reload, until
/// a quit command or end of input.
pub async fn read_commands<R>(reader: R, gate: &GateHandle) -> Result<InputEnd>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();

    while let Some(line) = lines.next_line().await? {
        for token in line.split_whitespace() {
            match TriggerCommand::parse(token) {
                Some(TriggerCommand::Reload) => {
                    let phase = gate.signal();
                    info!(?phase, "reload requested");
                }
                Some(TriggerCommand::Quit) => {
                    info!("quit requested");
                    return Ok(InputEnd::Quit);
                }
                None => debug!(token, "ignoring unknown command"),
            }
        }
    }

    debug!("command input closed");
    Ok(InputEnd::Eof)
}
