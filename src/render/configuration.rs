// src/render/configuration.rs

use std::collections::BTreeMap;

use crate::types::ProcessingMode;

/// Engine settings shared read-only by every job of a pass.
///
/// Two configurations compare equal when an engine configured with one can
/// serve jobs for the other; the orchestrator uses this to decide whether its
/// engine pool survives a configuration reload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderConfiguration {
    /// Output format identifier (e.g. `html5`, `pdf`).
    pub format: String,
    pub mode: ProcessingMode,
    /// Free-form engine properties, passed through verbatim.
    pub properties: BTreeMap<String, String>,
    /// Remove the engine's temporary files when a render fails.
    pub clean_on_failure: bool,
    /// Ask the engine for its debug log.
    pub debug_log: bool,
}

impl Default for RenderConfiguration {
    fn default() -> Self {
        Self {
            format: "html5".to_string(),
            mode: ProcessingMode::default(),
            properties: BTreeMap::new(),
            clean_on_failure: true,
            debug_log: false,
        }
    }
}
