// src/watch/pass.rs

use std::future::Future;
use std::pin::Pin;

use tracing::{error, info, warn};

use crate::config::{ConfigFile, ConfigSource};
use crate::errors::Result;
use crate::render::{PassResult, RenderOrchestrator};
use crate::watch::gate::PassRunner;

/// Pass runner used by `watch`.
///
/// Re-reads the configuration before every pass so edits to the config file
/// are picked up without a restart. A changed engine configuration rebuilds
/// the engine pool; an unreadable or invalid file keeps the previous
/// configuration.
///
/// Settings captured when `watch` starts (see [`startup_only_changes`]) keep
/// their startup values; a reload that edits them only logs a warning.
#[derive(Debug)]
pub struct WatchPass {
    source: ConfigSource,
    startup: ConfigFile,
    config: ConfigFile,
    orchestrator: RenderOrchestrator,
    warned: Vec<&'static str>,
}

impl WatchPass {
    pub fn new(source: ConfigSource, config: ConfigFile, orchestrator: RenderOrchestrator) -> Self {
        Self {
            source,
            startup: config.clone(),
            config,
            orchestrator,
            warned: Vec::new(),
        }
    }

    fn refresh_config(&mut self) {
        if self.source.path().is_none() {
            return;
        }

        match self.source.load() {
            Ok(config) => {
                let ignored = startup_only_changes(&self.startup, &config);
                if !ignored.is_empty() && ignored != self.warned {
                    warn!(
                        settings = ?ignored,
                        "configuration changes need a restart of `watch` to take effect"
                    );
                }
                self.warned = ignored;
                if self.orchestrator.reconfigure(config.render_configuration()) {
                    info!("engine configuration reloaded");
                }
                self.config = config;
            }
            Err(e) => {
                error!(error = %e, "failed to reload configuration; keeping previous settings");
            }
        }
    }
}

impl PassRunner for WatchPass {
    fn run_pass(&mut self) -> Pin<Box<dyn Future<Output = Result<PassResult>> + Send + '_>> {
        Box::pin(async move {
            self.refresh_config();
            let mut plan = self.config.render_plan();
            plan.source_root = self.startup.render().source_dir.clone();
            plan.output_root = self.startup.render().output_dir.clone();
            self.orchestrator.render(&plan).await
        })
    }
}

/// Settings that differ between `startup` and `reloaded` but are fixed for
/// the life of a `watch` process: the watched source tree, the directories
/// the watcher ignores, and what the engine factory was built from.
pub fn startup_only_changes(startup: &ConfigFile, reloaded: &ConfigFile) -> Vec<&'static str> {
    let (a, b) = (startup.render(), reloaded.render());
    let (da, db) = (startup.distribution(), reloaded.distribution());

    [
        ("render.source_dir", a.source_dir != b.source_dir),
        ("render.output_dir", a.output_dir != b.output_dir),
        ("render.temp_dir", a.temp_dir != b.temp_dir),
        ("distribution.version", da.version != db.version),
        ("distribution.home", da.home != db.home),
        ("distribution.archive", da.archive != db.archive),
    ]
    .into_iter()
    .filter_map(|(name, changed)| changed.then_some(name))
    .collect()
}
