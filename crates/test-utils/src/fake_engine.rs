use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use rendermill::engine::{
    EngineError, EngineFactory, EngineLogLevel, LogBridge, RenderEngine, RenderFuture,
};
use rendermill::render::RenderConfiguration;

/// One render performed by a fake engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderRecord {
    pub engine_id: usize,
    pub input: PathBuf,
    pub output_dir: PathBuf,
    pub format: String,
}

/// Observations shared by every engine of a [`FakeEngineFactory`].
#[derive(Debug, Default)]
pub struct EngineStats {
    configure_attempts: AtomicUsize,
    created: AtomicUsize,
    inner: Mutex<StatsInner>,
}

#[derive(Debug, Default)]
struct StatsInner {
    in_use: HashSet<usize>,
    active: usize,
    max_active: usize,
    overlapping_use: usize,
    renders: Vec<RenderRecord>,
}

impl EngineStats {
    fn inner(&self) -> MutexGuard<'_, StatsInner> {
        self.inner.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Calls to `new_engine`, including scripted failures.
    pub fn configure_attempts(&self) -> usize {
        self.configure_attempts.load(Ordering::SeqCst)
    }

    /// Engines successfully configured.
    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    /// Highest number of renders observed running at the same time.
    pub fn max_concurrent(&self) -> usize {
        self.inner().max_active
    }

    /// Times an engine started a render while already rendering.
    pub fn overlapping_use(&self) -> usize {
        self.inner().overlapping_use
    }

    pub fn renders(&self) -> Vec<RenderRecord> {
        self.inner().renders.clone()
    }

    pub fn rendered_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .inner()
            .renders
            .iter()
            .filter_map(|r| r.input.file_name().map(|n| n.to_string_lossy().into_owned()))
            .collect();
        names.sort();
        names
    }

    pub fn engines_used(&self) -> HashSet<usize> {
        self.inner().renders.iter().map(|r| r.engine_id).collect()
    }

    fn begin(self: &Arc<Self>, engine_id: usize) -> ActiveRender {
        let mut inner = self.inner();
        if !inner.in_use.insert(engine_id) {
            inner.overlapping_use += 1;
        }
        inner.active += 1;
        inner.max_active = inner.max_active.max(inner.active);
        ActiveRender {
            stats: Arc::clone(self),
            engine_id,
        }
    }
}

/// Marks an engine busy until dropped, including on panic.
struct ActiveRender {
    stats: Arc<EngineStats>,
    engine_id: usize,
}

impl Drop for ActiveRender {
    fn drop(&mut self) {
        let mut inner = self.stats.inner();
        inner.in_use.remove(&self.engine_id);
        inner.active -= 1;
    }
}

#[derive(Debug, Default)]
struct Script {
    failing: HashSet<String>,
    panicking: HashSet<String>,
    delay: Duration,
    write_outputs: bool,
    configure_failures: AtomicUsize,
}

/// Engine factory whose engines render instantly (or after a delay) and fail
/// on scripted file names.
#[derive(Debug, Clone)]
pub struct FakeEngineFactory {
    script: Arc<Script>,
    stats: Arc<EngineStats>,
}

impl FakeEngineFactory {
    pub fn new() -> Self {
        Self {
            script: Arc::new(Script::default()),
            stats: Arc::new(EngineStats::default()),
        }
    }

    fn script_mut(&mut self) -> &mut Script {
        Arc::get_mut(&mut self.script).expect("configure the fake before sharing it")
    }

    /// Renders of a file with this name fail.
    pub fn failing_on(mut self, name: &str) -> Self {
        self.script_mut().failing.insert(name.to_string());
        self
    }

    /// Renders of a file with this name panic.
    pub fn panicking_on(mut self, name: &str) -> Self {
        self.script_mut().panicking.insert(name.to_string());
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.script_mut().delay = delay;
        self
    }

    /// Write `<stem>.<format>` into the output directory on success.
    pub fn writing_outputs(mut self) -> Self {
        self.script_mut().write_outputs = true;
        self
    }

    /// The next `n` engine creations fail.
    pub fn failing_configures(self, n: usize) -> Self {
        self.script.configure_failures.store(n, Ordering::SeqCst);
        self
    }

    pub fn stats(&self) -> Arc<EngineStats> {
        Arc::clone(&self.stats)
    }

    pub fn shared(self) -> (Arc<dyn EngineFactory>, Arc<EngineStats>) {
        let stats = self.stats();
        (Arc::new(self), stats)
    }
}

impl Default for FakeEngineFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineFactory for FakeEngineFactory {
    fn new_engine(
        &self,
        id: usize,
        config: &Arc<RenderConfiguration>,
        log: LogBridge,
    ) -> Result<Box<dyn RenderEngine>, EngineError> {
        self.stats.configure_attempts.fetch_add(1, Ordering::SeqCst);

        let scripted_failure = self
            .script
            .configure_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if scripted_failure {
            return Err(EngineError::Configuration(format!(
                "scripted configuration failure for engine {id}"
            )));
        }

        self.stats.created.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeEngine {
            id,
            config: Arc::clone(config),
            log,
            script: Arc::clone(&self.script),
            stats: Arc::clone(&self.stats),
        }))
    }
}

struct FakeEngine {
    id: usize,
    config: Arc<RenderConfiguration>,
    log: LogBridge,
    script: Arc<Script>,
    stats: Arc<EngineStats>,
}

impl RenderEngine for FakeEngine {
    fn render<'a>(&'a mut self, input: &'a Path, output_dir: &'a Path) -> RenderFuture<'a> {
        Box::pin(async move {
            let _active = self.stats.begin(self.id);

            if !self.script.delay.is_zero() {
                tokio::time::sleep(self.script.delay).await;
            }

            let name = input
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();

            self.stats.inner().renders.push(RenderRecord {
                engine_id: self.id,
                input: input.to_path_buf(),
                output_dir: output_dir.to_path_buf(),
                format: self.config.format.clone(),
            });

            if self.script.panicking.contains(&name) {
                panic!("fake engine crashed on {name}");
            }

            if self.script.failing.contains(&name) {
                let message = format!("cannot render {name}");
                self.log.log(EngineLogLevel::Error, &message, None);
                return Err(EngineError::Failed {
                    code: Some(1),
                    message,
                });
            }

            if self.script.write_outputs {
                let stem = input
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_default();
                let out = output_dir.join(format!("{stem}.{}", self.config.format));
                tokio::fs::write(&out, b"rendered").await?;
            }

            Ok(())
        })
    }
}
