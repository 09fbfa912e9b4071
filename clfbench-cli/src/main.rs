//! clfbench CLI: benchmark a roster of classifiers on one reproducible split.

mod commands;

use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// clfbench: fit every registered classifier on one train/test split and log the scores
#[derive(Parser, Debug)]
#[command(name = "clfbench", version, about, long_about = None)]
struct Cli {
    /// Workspace directory (searched for clfbench.toml)
    #[arg(short, long, default_value = ".", global = true)]
    workspace: PathBuf,

    /// Configuration file path (replaces the workspace clfbench.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(flatten)]
    run: RunArgs,

    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Subcommand (runs the benchmark if omitted)
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Per-run overrides of the loaded configuration.
#[derive(clap::Args, Debug, Default, Clone)]
struct RunArgs {
    /// Input CSV file
    #[arg(long, global = true)]
    data: Option<PathBuf>,

    /// Label column
    #[arg(long, global = true)]
    label: Option<String>,

    /// Fraction of rows to sample, in (0, 1]
    #[arg(long, global = true)]
    sample_fraction: Option<f64>,

    /// Fraction of the sample held out for testing, in (0, 1)
    #[arg(long, global = true)]
    test_fraction: Option<f64>,

    /// Seed for sampling, partitioning and randomized models
    #[arg(long, global = true)]
    seed: Option<u64>,

    /// Root directory for run_<timestamp> tracking directories
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    /// Fit the scaler on the training rows only
    #[arg(long, global = true)]
    scale_train_only: bool,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Run the benchmark
    Run,
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(clap::Subcommand, Debug)]
enum ConfigAction {
    /// Write the default configuration to clfbench.toml in the workspace
    Init,
    /// Show the resolved configuration
    Show,
}

fn init_tracing(verbose: u8, quiet: bool) -> tracing_appender::non_blocking::WorkerGuard {
    let filter = match verbose {
        0 if quiet => "error",
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    // Human-readable layer for stderr; RUST_LOG wins when set
    let stderr_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(stderr_filter);

    // JSON file layer for structured logging
    let log_dir = directories::ProjectDirs::from("dev", "clfbench", "clfbench")
        .map(|d| d.data_dir().join("logs"))
        .unwrap_or_else(|| PathBuf::from("logs"));
    let _ = std::fs::create_dir_all(&log_dir);
    let file_appender = tracing_appender::rolling::daily(&log_dir, "clfbench.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    let json_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(non_blocking)
        .with_filter(EnvFilter::new("debug"));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();
    guard
}

fn main() -> ExitCode {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let _guard = init_tracing(cli.verbose, cli.quiet);

    let workspace = cli
        .workspace
        .canonicalize()
        .unwrap_or_else(|_| cli.workspace.clone());

    let result = match cli.command {
        Some(Commands::Config { action }) => {
            commands::handle_config(action, &workspace, cli.config.as_deref(), &cli.run)
        }
        Some(Commands::Run) | None => {
            commands::run_benchmark(&workspace, cli.config.as_deref(), &cli.run)
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}
