use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use duplex::{Orchestrator, Pipeline, StateStore};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::prelude::*;

mod config;

use crate::config::{DEFAULT_CONFIG_FILE, FileConfig, Mode};

#[derive(Parser)]
#[command(name = "duplexd")]
#[command(about = "Recognize incoming scans and collate double-sided pairs")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Config file (defaults to ./duplex.toml; a missing file is fine)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Watch the input directory (the default)
    Run(RunArgs),

    /// Show the last processed files
    Status(StatusArgs),

    /// Collate consecutive pairs of already-recognized files
    MergeSweep(SweepArgs),
}

#[derive(Parser, Default)]
struct RunArgs {
    /// Directory new scans land in
    #[arg(long)]
    watch_dir: Option<PathBuf>,

    /// Root for output directories and the state file
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Seconds between rescans (0 = live notifications)
    #[arg(long)]
    poll_interval: Option<u64>,

    #[arg(long, value_enum)]
    mode: Option<Mode>,
}

#[derive(Parser)]
struct StatusArgs {
    /// Output root holding the state file
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Print raw JSON
    #[arg(long)]
    json: bool,
}

#[derive(Parser)]
struct SweepArgs {
    #[arg(long)]
    input_dir: Option<PathBuf>,

    #[arg(long)]
    output_dir: Option<PathBuf>,

    #[arg(long)]
    archive_dir: Option<PathBuf>,

    /// Repeat every N seconds (0 = sweep once)
    #[arg(long)]
    interval: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    let config_path = cli
        .config
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
    let mut file_config: FileConfig = config::load_config(&config_path)
        .extract()
        .with_context(|| format!("Invalid configuration in {}", config_path.display()))?;

    match cli.command.unwrap_or(Commands::Run(RunArgs::default())) {
        Commands::Run(args) => {
            apply_run_overrides(&mut file_config, args);
            run_command(file_config).await
        }
        Commands::Status(args) => {
            if let Some(dir) = args.output_dir {
                file_config.output_dir = dir;
            }
            status_command(&file_config, args.json).await
        }
        Commands::MergeSweep(args) => {
            apply_sweep_overrides(&mut file_config, args);
            sweep_command(file_config).await
        }
    }
}

fn init_tracing(debug: bool) {
    let default_directive = if debug {
        "duplex=debug,duplexd=debug,info"
    } else {
        "duplex=info,duplexd=info,warn"
    };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_directive));
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(env_filter)
        .init();
}

fn apply_run_overrides(fc: &mut FileConfig, args: RunArgs) {
    if let Some(dir) = args.watch_dir {
        fc.watch_dir = dir;
    }
    if let Some(dir) = args.output_dir {
        fc.output_dir = dir;
    }
    if let Some(secs) = args.poll_interval {
        fc.poll_interval_secs = secs;
    }
    if args.mode.is_some() {
        fc.mode = args.mode;
    }
}

fn apply_sweep_overrides(fc: &mut FileConfig, args: SweepArgs) {
    if args.input_dir.is_some() {
        fc.sweep.input_dir = args.input_dir;
    }
    if args.output_dir.is_some() {
        fc.sweep.output_dir = args.output_dir;
    }
    if args.archive_dir.is_some() {
        fc.sweep.archive_dir = args.archive_dir;
    }
    if let Some(secs) = args.interval {
        fc.sweep.interval_secs = secs;
    }
}

async fn run_command(fc: FileConfig) -> Result<()> {
    let mode = fc.delivery_mode()?;
    let pipeline_config = fc.pipeline_config();

    tokio::fs::create_dir_all(&pipeline_config.output_dir)
        .await
        .with_context(|| {
            format!(
                "Failed to create output directory: {}",
                pipeline_config.output_dir.display()
            )
        })?;

    info!(
        watch_dir = %pipeline_config.watch_dir.display(),
        output_dir = %pipeline_config.output_dir.display(),
        ?mode,
        "starting duplexd"
    );

    let pipeline = Pipeline::new(pipeline_config, fc.recognizer(), fc.merger());
    let orchestrator = Orchestrator::new(pipeline, mode);

    tokio::select! {
        result = orchestrator.run() => result.context("Processing stopped"),
        () = shutdown_signal() => {
            info!("Received shutdown signal, stopping");
            Ok(())
        }
    }
}

async fn status_command(fc: &FileConfig, json: bool) -> Result<()> {
    let store = StateStore::in_dir(&fc.output_dir);
    let window = store.load().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&window)?);
        return Ok(());
    }

    let Some(window) = window else {
        println!("No files processed yet ({} not found)", store.path().display());
        return Ok(());
    };
    for (slot, record) in [("latest", &window.current), ("previous", &window.previous)] {
        let Some(record) = record else {
            continue;
        };
        println!("{slot}:");
        println!("  source:  {}", record.source_path.display());
        println!("  arrival: {}", record.arrival.to_rfc3339());
        if let Some(dir) = &record.output_dir {
            println!("  output:  {}", dir.display());
        }
        println!("  pairing: {:?}", record.pairing);
    }
    Ok(())
}

async fn sweep_command(fc: FileConfig) -> Result<()> {
    let sweep_config = fc.sweep_config()?;
    let merger = fc.merger();
    let interval = Duration::from_secs(fc.sweep.interval_secs);

    loop {
        let stats = duplex::sweep::sweep(&merger, &sweep_config)
            .await
            .context("Sweep failed")?;
        info!(
            merged = stats.merged,
            failed = stats.failed,
            leftover = stats.leftover,
            "sweep finished"
        );

        if interval.is_zero() {
            return Ok(());
        }
        tokio::select! {
            () = tokio::time::sleep(interval) => {}
            () = shutdown_signal() => {
                info!("Received shutdown signal, stopping");
                return Ok(());
            }
        }
    }
}

/// Resolves on Ctrl-C or, on unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}
