// src/lib.rs

pub mod cli;
pub mod config;
pub mod distribution;
pub mod engine;
pub mod errors;
pub mod fs;
pub mod jobs;
pub mod logging;
pub mod render;
pub mod types;
pub mod watch;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::io::BufReader;
use tracing::{debug, info, warn};

use crate::cli::{CliArgs, Command, WatchArgs};
use crate::config::{ConfigFile, ConfigSource};
use crate::distribution::{DistributionProvider, LocalDistributionProvider};
use crate::engine::{DitaCommandFactory, EngineFactory};
use crate::fs::{FileSystem, RealFileSystem};
use crate::jobs::select_jobs;
use crate::render::RenderOrchestrator;
use crate::watch::{InputEnd, ReloadGate, WatchPass};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading and command-line overrides
/// - engine installation lookup
/// - the render orchestrator
/// - (watch mode) the reload gate, stdin commands, file watcher and Ctrl-C
pub async fn run(args: CliArgs) -> Result<()> {
    let source = ConfigSource::discover(args.config.clone(), args.render.to_overrides());
    let cfg = source.load()?;

    if args.dry_run {
        print_dry_run(&source, &cfg)?;
        return Ok(());
    }

    match args.command.clone().unwrap_or(Command::Render) {
        Command::Render => render_once(&cfg).await,
        Command::Watch(watch_args) => watch(source, cfg, &watch_args).await,
    }
}

/// Locate (or download and extract) the engine installation and bind an
/// engine factory to it.
async fn engine_factory(cfg: &ConfigFile) -> Result<Arc<dyn EngineFactory>> {
    let dist = cfg.distribution();
    let provider = LocalDistributionProvider::from_config(cfg);
    let home = provider
        .acquire(&dist.version, dist.cache_policy())
        .await?;
    info!(home = %home.display(), version = %dist.version, "engine installation ready");

    let factory = DitaCommandFactory::new(&home, cfg.render().temp_dir.clone())?;
    Ok(Arc::new(factory))
}

async fn render_once(cfg: &ConfigFile) -> Result<()> {
    let factory = engine_factory(cfg).await?;
    let orchestrator = RenderOrchestrator::new(factory, cfg.render_configuration());

    let result = orchestrator.render(&cfg.render_plan()).await?;
    let rendered = result
        .into_result()
        .map_err(crate::errors::RendermillError::from)?;

    info!(rendered, "render complete");
    Ok(())
}

async fn watch(source: ConfigSource, cfg: ConfigFile, args: &WatchArgs) -> Result<()> {
    let render = cfg.render();
    RealFileSystem.ensure_dir(&render.output_dir)?;

    let factory = engine_factory(&cfg).await?;
    let orchestrator = RenderOrchestrator::new(factory, cfg.render_configuration());

    let source_dir = render.source_dir.clone();
    let ignored: Vec<PathBuf> = vec![render.output_dir.clone(), render.temp_dir.clone()];

    let gate = ReloadGate::spawn(WatchPass::new(source, cfg, orchestrator));
    let handle = gate.handle();

    // Initial pass.
    handle.signal();

    let _watcher = if args.watch_files {
        Some(crate::watch::spawn_source_watcher(
            source_dir,
            ignored,
            handle.clone(),
        )?)
    } else {
        None
    };

    info!("watching; type `reload` to render again, `quit` to stop");

    let commands = {
        let handle = handle.clone();
        let keep_running_on_eof = args.watch_files;
        async move {
            let stdin = BufReader::new(tokio::io::stdin());
            match crate::watch::read_commands(stdin, &handle).await {
                Ok(InputEnd::Eof) if keep_running_on_eof => {
                    debug!("stdin closed; waiting for Ctrl-C");
                    std::future::pending::<()>().await
                }
                Ok(_) => {}
                Err(e) => warn!(error = %e, "failed to read commands"),
            }
        }
    };

    tokio::select! {
        _ = commands => {}
        res = tokio::signal::ctrl_c() => {
            if let Err(e) = res {
                warn!(error = %e, "failed to listen for Ctrl+C");
            }
            info!("interrupted");
        }
    }

    if !gate.shutdown(Duration::from_secs(args.shutdown_timeout)).await {
        warn!("exiting while a render pass is still running");
    }
    info!(passes = handle.completed_passes(), "watch stopped");
    Ok(())
}

/// Dry-run output: effective configuration and the jobs a pass would run.
fn print_dry_run(source: &ConfigSource, cfg: &ConfigFile) -> Result<()> {
    let render = cfg.render();
    let dist = cfg.distribution();

    println!("rendermill dry-run");
    match source.path() {
        Some(path) => println!("  config file = {}", path.display()),
        None => println!("  config file = (none, using defaults)"),
    }
    println!("  source_dir = {}", render.source_dir.display());
    println!("  output_dir = {}", render.output_dir.display());
    println!("  temp_dir = {}", render.temp_dir.display());
    println!("  format = {}", render.format);
    println!("  mode = {}", render.mode);
    println!("  concurrency = {:?}", cfg.concurrency());
    println!("  selection = {:?}", cfg.selection_rule());
    for (key, value) in &render.properties {
        println!("  property {key} = {value}");
    }
    match &dist.home {
        Some(home) => println!("  engine home = {}", home.display()),
        None => println!(
            "  engine version = {} ({})",
            dist.version,
            dist.resolved_download_url()
        ),
    }
    println!();

    let plan = cfg.render_plan();
    let jobs = select_jobs(&RealFileSystem, &plan.source_root, &plan.output_root, &plan.rule)?;

    println!("jobs ({}):", jobs.len());
    for job in &jobs {
        println!("  - {}", job.input.display());
        println!("      output: {}", job.output_dir.display());
    }

    debug!("dry-run complete (no rendering)");
    Ok(())
}
