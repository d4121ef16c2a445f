// tests/reload_gate.rs

mod common;
use crate::common::{init_tracing, with_timeout};

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use rendermill::errors::{RendermillError, Result};
use rendermill::render::PassResult;
use rendermill::watch::{GateHandle, GatePhase, PassRunner, ReloadGate};

/// Shared view of what the runner did.
#[derive(Debug, Clone, Default)]
struct Recorder {
    passes: Arc<AtomicUsize>,
    active: Arc<AtomicUsize>,
    overlapped: Arc<AtomicBool>,
}

impl Recorder {
    fn passes(&self) -> usize {
        self.passes.load(Ordering::SeqCst)
    }
}

/// Pass runner that sleeps for `delay` and optionally fails.
struct ScriptedRunner {
    rec: Recorder,
    delay: Duration,
    fail: bool,
    started: mpsc::UnboundedSender<usize>,
}

impl PassRunner for ScriptedRunner {
    fn run_pass(&mut self) -> Pin<Box<dyn Future<Output = Result<PassResult>> + Send + '_>> {
        Box::pin(async move {
            if self.rec.active.fetch_add(1, Ordering::SeqCst) > 0 {
                self.rec.overlapped.store(true, Ordering::SeqCst);
            }
            let pass = self.rec.passes.fetch_add(1, Ordering::SeqCst) + 1;
            let _ = self.started.send(pass);

            tokio::time::sleep(self.delay).await;
            self.rec.active.fetch_sub(1, Ordering::SeqCst);

            if self.fail {
                return Err(RendermillError::ConfigError(
                    "source directory vanished".to_string(),
                ));
            }
            Ok(PassResult::new(1, Vec::new()))
        })
    }
}

/// Pass runner whose first pass panics.
struct CrashOnceRunner {
    calls: Arc<AtomicUsize>,
}

impl PassRunner for CrashOnceRunner {
    fn run_pass(&mut self) -> Pin<Box<dyn Future<Output = Result<PassResult>> + Send + '_>> {
        Box::pin(async move {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                panic!("render pass crashed");
            }
            Ok(PassResult::new(1, Vec::new()))
        })
    }
}

fn spawn_gate(
    delay: Duration,
    fail: bool,
) -> (ReloadGate, Recorder, mpsc::UnboundedReceiver<usize>) {
    let rec = Recorder::default();
    let (started, started_rx) = mpsc::unbounded_channel();
    let gate = ReloadGate::spawn(ScriptedRunner {
        rec: rec.clone(),
        delay,
        fail,
        started,
    });
    (gate, rec, started_rx)
}

/// Wait until `passes` passes have completed and the gate is idle again.
async fn settle(handle: &GateHandle, passes: u64) {
    with_timeout(async {
        loop {
            if handle.completed_passes() >= passes && handle.phase() == GatePhase::Idle {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
}

#[tokio::test]
async fn idle_gate_runs_nothing() {
    init_tracing();

    let (gate, rec, _started) = spawn_gate(Duration::ZERO, false);
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(gate.phase(), GatePhase::Idle);
    assert_eq!(gate.completed_passes(), 0);
    assert_eq!(rec.passes(), 0);
    assert!(gate.shutdown(Duration::from_secs(1)).await);
}

#[tokio::test]
async fn one_signal_runs_one_pass() {
    let (gate, rec, _started) = spawn_gate(Duration::ZERO, false);

    assert_eq!(gate.signal(), GatePhase::Running);
    settle(&gate.handle(), 1).await;

    assert_eq!(rec.passes(), 1);
    assert!(gate.shutdown(Duration::from_secs(1)).await);
}

#[tokio::test]
async fn burst_of_signals_during_a_pass_runs_exactly_one_more() {
    let (gate, rec, mut started) = spawn_gate(Duration::from_millis(100), false);
    let handle = gate.handle();

    handle.signal();
    assert_eq!(with_timeout(started.recv()).await, Some(1));

    for _ in 0..5 {
        assert_eq!(handle.signal(), GatePhase::RunningWithPending);
    }

    settle(&handle, 2).await;
    // Nothing else is queued behind the follow-up pass.
    tokio::time::sleep(Duration::from_millis(150)).await;

    assert_eq!(rec.passes(), 2);
    assert_eq!(handle.completed_passes(), 2);
    assert!(!rec.overlapped.load(Ordering::SeqCst));
    assert!(gate.shutdown(Duration::from_secs(1)).await);
}

#[tokio::test]
async fn signal_after_completion_starts_a_new_pass() {
    let (gate, rec, _started) = spawn_gate(Duration::from_millis(10), false);
    let handle = gate.handle();

    handle.signal();
    settle(&handle, 1).await;
    assert_eq!(handle.signal(), GatePhase::Running);
    settle(&handle, 2).await;

    assert_eq!(rec.passes(), 2);
    assert!(gate.shutdown(Duration::from_secs(1)).await);
}

#[tokio::test]
async fn failing_pass_keeps_the_worker_alive() {
    let (gate, rec, _started) = spawn_gate(Duration::ZERO, true);
    let handle = gate.handle();

    handle.signal();
    settle(&handle, 1).await;
    handle.signal();
    settle(&handle, 2).await;

    assert_eq!(rec.passes(), 2);
    assert!(gate.shutdown(Duration::from_secs(1)).await);
}

#[tokio::test]
async fn shutdown_waits_for_the_running_pass_and_drops_the_pending_one() {
    let (gate, rec, mut started) = spawn_gate(Duration::from_millis(100), false);
    let handle = gate.handle();

    handle.signal();
    with_timeout(started.recv()).await;
    assert_eq!(handle.signal(), GatePhase::RunningWithPending);

    assert!(gate.shutdown(Duration::from_secs(5)).await);

    assert_eq!(rec.passes(), 1);
    assert_eq!(handle.completed_passes(), 1);
    assert_eq!(handle.phase(), GatePhase::Idle);

    // Signals after shutdown are ignored.
    assert_eq!(handle.signal(), GatePhase::Idle);
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(rec.passes(), 1);
}

#[tokio::test]
async fn shutdown_gives_up_after_the_timeout() {
    let (gate, _rec, mut started) = spawn_gate(Duration::from_secs(3), false);

    gate.signal();
    with_timeout(started.recv()).await;

    assert!(!gate.shutdown(Duration::from_millis(50)).await);
}

#[tokio::test]
async fn panicking_pass_keeps_the_worker_alive() {
    init_tracing();

    let calls = Arc::new(AtomicUsize::new(0));
    let gate = ReloadGate::spawn(CrashOnceRunner {
        calls: Arc::clone(&calls),
    });
    let handle = gate.handle();

    handle.signal();
    settle(&handle, 1).await;
    assert_eq!(handle.signal(), GatePhase::Running);
    settle(&handle, 2).await;

    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert!(gate.shutdown(Duration::from_secs(1)).await);
}
