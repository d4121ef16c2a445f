// src/render/orchestrator.rs

use std::collections::HashMap;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::sync::Arc;

use futures::FutureExt;
use tokio::task::JoinSet;
use tracing::{debug, error, info};

use crate::engine::{EngineError, EngineFactory, EnginePool};
use crate::errors::{panic_message, Result};
use crate::fs::{FileSystem, RealFileSystem};
use crate::jobs::{select_jobs, JobDescriptor, SelectionRule};
use crate::render::result::PassCollector;
use crate::render::{PassResult, RenderConfiguration};
use crate::types::Concurrency;

/// Everything needed to run one pass besides the engine configuration.
#[derive(Debug, Clone)]
pub struct RenderPlan {
    pub source_root: PathBuf,
    pub output_root: PathBuf,
    pub rule: SelectionRule,
    pub concurrency: Concurrency,
}

/// Runs render passes: selects jobs, fans them out over at most N concurrent
/// workers, lends each job a pooled engine and waits for every job before
/// reporting.
pub struct RenderOrchestrator {
    factory: Arc<dyn EngineFactory>,
    fs: Arc<dyn FileSystem>,
    pool: Arc<EnginePool>,
}

impl fmt::Debug for RenderOrchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderOrchestrator")
            .field("pool", &self.pool)
            .finish_non_exhaustive()
    }
}

impl RenderOrchestrator {
    pub fn new(factory: Arc<dyn EngineFactory>, config: RenderConfiguration) -> Self {
        let pool = Arc::new(EnginePool::new(Arc::clone(&factory), Arc::new(config)));
        Self {
            factory,
            fs: Arc::new(RealFileSystem),
            pool,
        }
    }

    /// Use a different filesystem for job selection and output directories.
    pub fn with_file_system(mut self, fs: Arc<dyn FileSystem>) -> Self {
        self.fs = fs;
        self
    }

    pub fn configuration(&self) -> &RenderConfiguration {
        self.pool.configuration()
    }

    pub fn pool(&self) -> &Arc<EnginePool> {
        &self.pool
    }

    /// Switch to `config` for subsequent passes.
    ///
    /// Engines are configured once, so a changed configuration discards the
    /// pool. Returns `true` when the pool was rebuilt.
    pub fn reconfigure(&mut self, config: RenderConfiguration) -> bool {
        if self.pool.is_configured_for(&config) {
            return false;
        }

        info!(
            previous_engines = self.pool.created(),
            "render configuration changed; rebuilding engine pool"
        );
        self.pool = Arc::new(EnginePool::new(
            Arc::clone(&self.factory),
            Arc::new(config),
        ));
        true
    }

    /// Select the jobs described by `plan` and run them as one pass.
    ///
    /// Errors only for configuration problems detected before any job starts;
    /// job failures are reported inside the returned [`PassResult`].
    pub async fn render(&self, plan: &RenderPlan) -> Result<PassResult> {
        let jobs = select_jobs(
            self.fs.as_ref(),
            &plan.source_root,
            &plan.output_root,
            &plan.rule,
        )?;
        Ok(self.run_pass(jobs, plan.concurrency).await)
    }

    /// Run `jobs` and wait for all of them.
    ///
    /// With [`Concurrency::Inline`] the jobs run one after another on the
    /// calling task. Otherwise at most `concurrency.worker_count()` jobs are in
    /// flight at once; the pass returns only after every spawned job has been
    /// joined.
    pub async fn run_pass(&self, jobs: Vec<JobDescriptor>, concurrency: Concurrency) -> PassResult {
        let total = jobs.len();
        info!(jobs = total, ?concurrency, "starting render pass");

        let result = match concurrency {
            Concurrency::Inline => self.run_inline(jobs).await,
            _ => self.run_parallel(jobs, concurrency.worker_count()).await,
        };

        info!(
            attempted = result.attempted(),
            failures = result.failures().len(),
            engines = self.pool.created(),
            "Rendered {} files",
            result.attempted()
        );
        result
    }

    async fn run_inline(&self, jobs: Vec<JobDescriptor>) -> PassResult {
        let mut collector = PassCollector::default();
        for (index, job) in jobs.into_iter().enumerate() {
            let source = job.input.clone();
            // A panicking job must not take its siblings down with it.
            let outcome = match AssertUnwindSafe(run_job(&self.pool, self.fs.as_ref(), &job))
                .catch_unwind()
                .await
            {
                Ok(outcome) => outcome,
                Err(payload) => {
                    let message = panic_message(payload.as_ref());
                    error!(
                        file = %source.display(),
                        error = %message,
                        "render job did not complete"
                    );
                    Err(EngineError::Aborted(format!("job panicked: {message}")))
                }
            };
            collector.record(index, source, outcome);
        }
        collector.finish()
    }

    async fn run_parallel(&self, jobs: Vec<JobDescriptor>, workers: usize) -> PassResult {
        let mut collector = PassCollector::default();
        let mut set: JoinSet<(usize, std::result::Result<(), EngineError>)> = JoinSet::new();
        // Task id -> (dispatch index, source) so a panicked job is still
        // attributed to its file.
        let mut in_flight: HashMap<tokio::task::Id, (usize, PathBuf)> = HashMap::new();

        debug!(workers, "dispatching jobs");

        for (index, job) in jobs.into_iter().enumerate() {
            while set.len() >= workers {
                reap_one(&mut set, &mut in_flight, &mut collector).await;
            }

            let pool = Arc::clone(&self.pool);
            let fs = Arc::clone(&self.fs);
            let source = job.input.clone();
            let handle = set.spawn(async move {
                let outcome = run_job(&pool, fs.as_ref(), &job).await;
                (index, outcome)
            });
            in_flight.insert(handle.id(), (index, source));
        }

        while !set.is_empty() {
            reap_one(&mut set, &mut in_flight, &mut collector).await;
        }

        collector.finish()
    }
}

/// Wait for the next job in `set` and record its outcome.
async fn reap_one(
    set: &mut JoinSet<(usize, std::result::Result<(), EngineError>)>,
    in_flight: &mut HashMap<tokio::task::Id, (usize, PathBuf)>,
    collector: &mut PassCollector,
) {
    let Some(joined) = set.join_next_with_id().await else {
        return;
    };

    match joined {
        Ok((id, (index, outcome))) => {
            let source = in_flight
                .remove(&id)
                .map(|(_, source)| source)
                .unwrap_or_default();
            collector.record(index, source, outcome);
        }
        Err(join_error) => {
            let (index, source) = in_flight.remove(&join_error.id()).unwrap_or_default();
            error!(
                file = %source.display(),
                error = %join_error,
                "render job did not complete"
            );
            collector.record(
                index,
                source,
                Err(EngineError::Aborted(join_error.to_string())),
            );
        }
    }
}

/// Render one job with a pooled engine. The engine goes back to the pool when
/// the lease drops, on success and failure alike.
async fn run_job(
    pool: &Arc<EnginePool>,
    fs: &dyn FileSystem,
    job: &JobDescriptor,
) -> std::result::Result<(), EngineError> {
    info!(file = %job.input.display(), "Processing {}", job.name());

    let outcome = render_with_pool(pool, fs, job).await;

    match &outcome {
        Ok(()) => info!(file = %job.input.display(), "Finished processing {}", job.name()),
        Err(e) => error!(
            file = %job.input.display(),
            error = %e,
            "Failed processing {}",
            job.name()
        ),
    }
    outcome
}

async fn render_with_pool(
    pool: &Arc<EnginePool>,
    fs: &dyn FileSystem,
    job: &JobDescriptor,
) -> std::result::Result<(), EngineError> {
    fs.ensure_dir(&job.output_dir)
        .map_err(|e| EngineError::OutputDir {
            path: job.output_dir.clone(),
            message: format!("{e:#}"),
        })?;

    let mut engine = pool.borrow()?;
    debug!(
        engine_id = engine.id(),
        file = %job.input.display(),
        output = %job.output_dir.display(),
        "rendering"
    );
    engine.render(&job.input, &job.output_dir).await
}
