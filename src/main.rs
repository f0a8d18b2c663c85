//! Airdrum CLI
//!
//! Runs one hit pipeline per configured sensor log.

use airdrum::{
    config::Config,
    dispatch::{player_from_config, Dispatcher, Player},
    pipeline::DevicePipeline,
    scheduler::Scheduler,
    source::{CsvLogSource, ReplaySource},
    stats::create_shared_stats,
    VERSION,
};
use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "airdrum")]
#[command(version = VERSION)]
#[command(about = "Turns wearable IMU logs into percussion hits", long_about = None)]
struct Cli {
    /// Configuration file (defaults to the per-user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Follow every configured device log until Ctrl+C
    Run {
        /// Detect and log hits without playing samples
        #[arg(long)]
        no_playback: bool,
    },

    /// Run a recorded log through one pipeline and print its hits
    Replay {
        /// Recorded CSV log
        log: PathBuf,

        /// Records revealed per cycle
        #[arg(long, default_value = "10")]
        batch: usize,

        /// The log has no header line
        #[arg(long)]
        no_header: bool,

        /// Play samples for the hits as well
        #[arg(long)]
        play: bool,

        /// Device name reported in the hits
        #[arg(long, default_value = "replay")]
        device: String,
    },

    /// Show configuration
    Config,

    /// Write a default configuration file
    InitConfig {
        /// Use the single-sensor preset
        #[arg(long)]
        single: bool,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let config_path = cli.config.unwrap_or_else(Config::config_path);

    match cli.command {
        Commands::Run { no_playback } => cmd_run(&config_path, no_playback),
        Commands::Replay {
            log,
            batch,
            no_header,
            play,
            device,
        } => cmd_replay(&config_path, &log, batch, !no_header, play, &device),
        Commands::Config => cmd_config(&config_path),
        Commands::InitConfig { single, force } => cmd_init_config(&config_path, single, force),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Load, validate and report on the configuration.
fn load_config(path: &Path) -> Result<Config> {
    let config = Config::load_from(path)
        .with_context(|| format!("failed to load configuration from {}", path.display()))?;
    config.validate().context("configuration rejected")?;
    for warning in config.warnings() {
        tracing::warn!("{warning}");
    }
    Ok(config)
}

fn build_player(config: &Config, enabled: bool) -> Result<Arc<dyn Player>> {
    if !enabled {
        return Ok(Arc::new(airdrum::dispatch::NullPlayer));
    }
    let player = player_from_config(&config.playback).context("failed to set up playback")?;
    Ok(Arc::from(player))
}

fn cmd_run(config_path: &Path, no_playback: bool) -> Result<()> {
    println!("Airdrum v{VERSION}");
    println!();

    let config = load_config(config_path)?;
    let run_id = Uuid::new_v4();

    let player = build_player(&config, !no_playback)?;
    let dispatcher = Dispatcher::new(
        Arc::clone(&player),
        config.playback.asset_layout(),
        config.playback.queue_capacity,
        config.playback.workers,
    )
    .context("failed to start playback workers")?;

    println!("Run ID: {run_id}");
    println!("Player: {}", player.name());
    println!("Assets: {}", config.playback.asset_root.display());
    println!("Poll interval: {}ms", config.poll_interval.as_millis());

    let settings = config.pipeline_settings();
    let mut scheduler = Scheduler::new(config.poll_interval);
    let mut all_stats = Vec::new();
    for device in &config.devices {
        println!("  {} <- {}", device.name, device.log_path.display());
        let source = CsvLogSource::new(&device.log_path).with_header(device.has_header);
        let stats = create_shared_stats(device.name.clone());
        all_stats.push(Arc::clone(&stats));
        scheduler.add(
            DevicePipeline::new(device.name.clone(), Box::new(source), settings.clone())
                .with_dispatcher(dispatcher.handle())
                .with_stats(stats),
        );
    }

    println!();
    println!("Press Ctrl+C to stop");
    println!();

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })
    .context("failed to set Ctrl+C handler")?;

    tracing::info!(run_id = %run_id, devices = scheduler.len(), "starting pipelines");
    let handle = scheduler
        .spawn(Arc::clone(&running))
        .context("failed to start pipeline threads")?;

    while running.load(Ordering::SeqCst) {
        thread::sleep(Duration::from_millis(100));
    }

    println!();
    println!("Stopping...");
    // Pipelines hold dispatch handles; drop them before draining playback.
    drop(handle.join());
    dispatcher.shutdown();

    println!();
    println!("Run {run_id} summary");
    println!("==================");
    for stats in &all_stats {
        println!("{}", stats.summary());
    }

    Ok(())
}

fn cmd_replay(
    config_path: &Path,
    log: &Path,
    batch: usize,
    has_header: bool,
    play: bool,
    device: &str,
) -> Result<()> {
    let config = load_config(config_path)?;
    if batch == 0 {
        bail!("--batch must be at least 1");
    }

    let source = ReplaySource::from_path(log, has_header, batch)
        .with_context(|| format!("failed to read {}", log.display()))?;
    let cycles = (source.len() + batch - 1) / batch;

    let dispatcher = if play {
        let player = build_player(&config, true)?;
        Some(
            Dispatcher::new(
                player,
                config.playback.asset_layout(),
                config.playback.queue_capacity,
                config.playback.workers,
            )
            .context("failed to start playback workers")?,
        )
    } else {
        None
    };

    let mut pipeline = DevicePipeline::new(device, Box::new(source), config.pipeline_settings());
    if let Some(dispatcher) = &dispatcher {
        pipeline = pipeline.with_dispatcher(dispatcher.handle());
    }

    for _ in 0..cycles {
        let report = pipeline.cycle();
        for hit in &report.hits {
            println!("{}", serde_json::to_string(hit)?);
        }
        if play && !report.outcomes.is_empty() {
            // Pace playback roughly like a live run.
            thread::sleep(config.poll_interval);
        }
    }

    let stats = Arc::clone(pipeline.stats());
    drop(pipeline);
    if let Some(dispatcher) = dispatcher {
        dispatcher.shutdown();
    }

    eprintln!();
    eprintln!("{}", stats.summary());
    Ok(())
}

fn cmd_config(config_path: &Path) -> Result<()> {
    let config = Config::load_from(config_path)
        .with_context(|| format!("failed to load configuration from {}", config_path.display()))?;

    println!("Configuration");
    println!("=============");
    println!();
    println!("Config file: {:?}", config_path);
    if !config_path.exists() {
        println!("(file not found, showing defaults)");
    }
    println!();
    println!("{}", serde_json::to_string_pretty(&config)?);

    if let Err(e) = config.validate() {
        println!();
        println!("Warning: {e}");
    }
    for warning in config.warnings() {
        println!("Warning: {warning}");
    }
    Ok(())
}

fn cmd_init_config(config_path: &Path, single: bool, force: bool) -> Result<()> {
    if config_path.exists() && !force {
        bail!(
            "{} already exists (use --force to overwrite)",
            config_path.display()
        );
    }

    let config = if single {
        Config::single_device()
    } else {
        Config::default()
    };
    config
        .save_to(config_path)
        .with_context(|| format!("failed to write {}", config_path.display()))?;

    println!("Wrote {}", config_path.display());
    Ok(())
}
