// src/watch/gate.rs

//! Serialises render passes in watch mode.
//!
//! A single background worker owns the [`PassRunner`] and is the only caller
//! of it. Trigger sources raise signals through a [`GateHandle`]:
//!
//! | phase                | signal               | pass completes         |
//! |----------------------|----------------------|------------------------|
//! | `Idle`               | → `Running`          | –                      |
//! | `Running`            | → `RunningWithPending` | → `Idle`             |
//! | `RunningWithPending` | unchanged            | → `Running` (next pass) |
//!
//! Any number of signals raised during a pass therefore produce exactly one
//! follow-up pass. Shutdown lets the in-flight pass finish and starts no
//! further pass, pending or not. The phase and the shutdown flag live under
//! the same lock. A pass that errors or panics is logged and counts as
//! completed.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use futures::FutureExt;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::errors::{panic_message, Result};
use crate::render::PassResult;

/// Default ceiling on waiting for the worker at shutdown.
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(60);

/// Runs one complete render pass when the gate asks for it.
pub trait PassRunner: Send + 'static {
    fn run_pass(&mut self) -> Pin<Box<dyn Future<Output = Result<PassResult>> + Send + '_>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatePhase {
    Idle,
    Running,
    RunningWithPending,
}

#[derive(Debug)]
struct GateState {
    phase: GatePhase,
    shutdown: bool,
}

#[derive(Debug)]
struct Shared {
    state: Mutex<GateState>,
    wake: Notify,
    completed: AtomicU64,
}

impl Shared {
    fn state(&self) -> MutexGuard<'_, GateState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Cloneable handle used by trigger sources.
#[derive(Debug, Clone)]
pub struct GateHandle {
    shared: Arc<Shared>,
}

impl GateHandle {
    /// Request a pass. Returns the phase after the signal was applied.
    pub fn signal(&self) -> GatePhase {
        let mut state = self.shared.state();
        if state.shutdown {
            debug!("reload signal ignored; gate is shutting down");
            return state.phase;
        }

        state.phase = match state.phase {
            GatePhase::Idle => {
                self.shared.wake.notify_one();
                GatePhase::Running
            }
            GatePhase::Running | GatePhase::RunningWithPending => GatePhase::RunningWithPending,
        };
        debug!(phase = ?state.phase, "reload signal recorded");
        state.phase
    }

    /// Ask the worker to stop after the in-flight pass (if any).
    pub fn request_shutdown(&self) {
        let mut state = self.shared.state();
        if !state.shutdown {
            info!(phase = ?state.phase, "render worker shutdown requested");
            state.shutdown = true;
        }
        self.shared.wake.notify_one();
    }

    pub fn phase(&self) -> GatePhase {
        self.shared.state().phase
    }

    /// Number of passes the worker has finished (successfully or not).
    pub fn completed_passes(&self) -> u64 {
        self.shared.completed.load(Ordering::SeqCst)
    }
}

/// The pass-serialising worker plus its handle.
#[derive(Debug)]
pub struct ReloadGate {
    handle: GateHandle,
    worker: JoinHandle<()>,
}

impl ReloadGate {
    /// Spawn the worker. It waits for the first signal before running a pass.
    pub fn spawn<R: PassRunner>(runner: R) -> Self {
        let shared = Arc::new(Shared {
            state: Mutex::new(GateState {
                phase: GatePhase::Idle,
                shutdown: false,
            }),
            wake: Notify::new(),
            completed: AtomicU64::new(0),
        });

        let worker = tokio::spawn(worker_loop(Arc::clone(&shared), runner));

        Self {
            handle: GateHandle { shared },
            worker,
        }
    }

    pub fn handle(&self) -> GateHandle {
        self.handle.clone()
    }

    pub fn signal(&self) -> GatePhase {
        self.handle.signal()
    }

    pub fn phase(&self) -> GatePhase {
        self.handle.phase()
    }

    pub fn completed_passes(&self) -> u64 {
        self.handle.completed_passes()
    }

    /// Stop the worker and wait up to `timeout` for it to finish its current
    /// pass. Returns `false` if the worker was abandoned.
    pub async fn shutdown(self, timeout: Duration) -> bool {
        self.handle.request_shutdown();

        match tokio::time::timeout(timeout, self.worker).await {
            Ok(Ok(())) => {
                info!("render worker stopped");
                true
            }
            Ok(Err(e)) => {
                error!(error = %e, "render worker ended abnormally");
                true
            }
            Err(_) => {
                warn!(
                    timeout_secs = timeout.as_secs(),
                    "render worker did not stop in time; abandoning it"
                );
                false
            }
        }
    }
}

async fn worker_loop<R: PassRunner>(shared: Arc<Shared>, mut runner: R) {
    debug!("render worker started");

    loop {
        // Wait until a pass is requested or shutdown is set.
        loop {
            {
                let mut state = shared.state();
                if state.shutdown {
                    // A pending pass is dropped.
                    state.phase = GatePhase::Idle;
                    debug!("render worker exiting");
                    return;
                }
                if state.phase != GatePhase::Idle {
                    break;
                }
            }
            shared.wake.notified().await;
        }

        let pass = shared.completed.load(Ordering::SeqCst) + 1;
        info!(pass, "render pass starting");

        match AssertUnwindSafe(runner.run_pass()).catch_unwind().await {
            Ok(Ok(result)) => report(pass, &result),
            Ok(Err(e)) => error!(pass, error = %e, "render pass could not run"),
            Err(payload) => error!(
                pass,
                error = %panic_message(payload.as_ref()),
                "render pass panicked"
            ),
        }

        let mut state = shared.state();
        shared.completed.fetch_add(1, Ordering::SeqCst);
        state.phase = match state.phase {
            GatePhase::RunningWithPending => {
                debug!(pass, "reload requested during pass; running again");
                GatePhase::Running
            }
            GatePhase::Running | GatePhase::Idle => GatePhase::Idle,
        };
    }
}

fn report(pass: u64, result: &PassResult) {
    if result.is_success() {
        info!(pass, attempted = result.attempted(), "render pass succeeded");
        return;
    }

    for failure in result.failures() {
        error!(
            pass,
            file = %failure.source.display(),
            error = %failure.cause,
            "render failed"
        );
    }
    error!(
        pass,
        attempted = result.attempted(),
        failures = result.failures().len(),
        "render pass finished with errors"
    );
}
