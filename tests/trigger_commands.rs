// tests/trigger_commands.rs

mod common;
use crate::common::with_timeout;

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::io::BufReader;

use rendermill::errors::Result;
use rendermill::render::PassResult;
use rendermill::watch::{read_commands, GatePhase, InputEnd, PassRunner, ReloadGate, TriggerCommand};

struct SlowRunner {
    passes: Arc<AtomicUsize>,
}

impl PassRunner for SlowRunner {
    fn run_pass(&mut self) -> Pin<Box<dyn Future<Output = Result<PassResult>> + Send + '_>> {
        Box::pin(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            self.passes.fetch_add(1, Ordering::SeqCst);
            Ok(PassResult::default())
        })
    }
}

fn gate() -> (ReloadGate, Arc<AtomicUsize>) {
    let passes = Arc::new(AtomicUsize::new(0));
    let gate = ReloadGate::spawn(SlowRunner {
        passes: Arc::clone(&passes),
    });
    (gate, passes)
}

#[test]
fn commands_are_case_insensitive() {
    assert_eq!(TriggerCommand::parse("reload"), Some(TriggerCommand::Reload));
    assert_eq!(TriggerCommand::parse("RELOAD"), Some(TriggerCommand::Reload));
    assert_eq!(TriggerCommand::parse("r"), Some(TriggerCommand::Reload));
    assert_eq!(TriggerCommand::parse("Quit"), Some(TriggerCommand::Quit));
    assert_eq!(TriggerCommand::parse("exit"), Some(TriggerCommand::Quit));
    assert_eq!(TriggerCommand::parse("rebuild"), None);
    assert_eq!(TriggerCommand::parse(""), None);
}

#[tokio::test]
async fn repeated_reloads_coalesce_into_one_follow_up_pass() {
    let (gate, passes) = gate();
    let handle = gate.handle();

    let input = BufReader::new(&b"reload\nr RELOAD\n  reload  \n"[..]);
    let end = read_commands(input, &handle).await.unwrap();

    assert_eq!(end, InputEnd::Eof);
    assert_eq!(handle.phase(), GatePhase::RunningWithPending);

    with_timeout(async {
        while handle.completed_passes() < 2 || handle.phase() != GatePhase::Idle {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await;
    assert_eq!(passes.load(Ordering::SeqCst), 2);
    assert!(gate.shutdown(Duration::from_secs(1)).await);
}

#[tokio::test]
async fn quit_stops_reading() {
    let (gate, _passes) = gate();
    let handle = gate.handle();

    let input = BufReader::new(&b"reload\nquit\nreload\n"[..]);
    let end = read_commands(input, &handle).await.unwrap();

    assert_eq!(end, InputEnd::Quit);
    // Only the reload before `quit` was applied.
    assert_eq!(handle.phase(), GatePhase::Running);
    assert!(gate.shutdown(Duration::from_secs(1)).await);
}

#[tokio::test]
async fn unknown_input_is_ignored() {
    let (gate, passes) = gate();
    let handle = gate.handle();

    let input = BufReader::new(&b"hello there\n\n"[..]);
    let end = read_commands(input, &handle).await.unwrap();

    assert_eq!(end, InputEnd::Eof);
    assert_eq!(handle.phase(), GatePhase::Idle);
    assert!(gate.shutdown(Duration::from_secs(1)).await);
    assert_eq!(passes.load(Ordering::SeqCst), 0);
}
