// src/render/result.rs

use std::fmt;
use std::path::PathBuf;

use crate::engine::EngineError;

/// One job that did not render.
#[derive(Debug)]
pub struct JobFailure {
    pub source: PathBuf,
    pub cause: EngineError,
}

/// Outcome of one render pass.
///
/// `attempted` counts every dispatched job; each one either succeeded or left
/// exactly one entry in `failures`. Failures are kept in dispatch order.
#[derive(Debug, Default)]
pub struct PassResult {
    attempted: usize,
    failures: Vec<JobFailure>,
}

impl PassResult {
    pub fn new(attempted: usize, failures: Vec<JobFailure>) -> Self {
        Self {
            attempted,
            failures,
        }
    }

    pub fn attempted(&self) -> usize {
        self.attempted
    }

    pub fn successes(&self) -> usize {
        self.attempted - self.failures.len()
    }

    pub fn failures(&self) -> &[JobFailure] {
        &self.failures
    }

    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// `Ok(attempted)` when every job succeeded, otherwise the aggregated
    /// failure.
    pub fn into_result(self) -> Result<usize, PassFailure> {
        if self.failures.is_empty() {
            Ok(self.attempted)
        } else {
            Err(PassFailure {
                attempted: self.attempted,
                failures: self.failures,
            })
        }
    }
}

/// A pass with at least one failed job. Carries every failure, not only the
/// first.
#[derive(Debug)]
pub struct PassFailure {
    pub attempted: usize,
    pub failures: Vec<JobFailure>,
}

impl fmt::Display for PassFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Some errors occurred ({} of {} files failed):",
            self.failures.len(),
            self.attempted
        )?;
        for failure in &self.failures {
            write!(f, "\n  - {}: {}", failure.source.display(), failure.cause)?;
        }
        Ok(())
    }
}

impl std::error::Error for PassFailure {}

/// Accumulates job outcomes while a pass is in flight.
#[derive(Debug, Default)]
pub(crate) struct PassCollector {
    attempted: usize,
    failures: Vec<(usize, JobFailure)>,
}

impl PassCollector {
    pub(crate) fn record(
        &mut self,
        index: usize,
        source: PathBuf,
        outcome: Result<(), EngineError>,
    ) {
        self.attempted += 1;
        if let Err(cause) = outcome {
            self.failures.push((index, JobFailure { source, cause }));
        }
    }

    pub(crate) fn finish(mut self) -> PassResult {
        self.failures.sort_by_key(|(index, _)| *index);
        PassResult::new(
            self.attempted,
            self.failures.into_iter().map(|(_, f)| f).collect(),
        )
    }
}
