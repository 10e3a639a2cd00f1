//! # Container Runner Main Entry Point
//!
//! File: cli/src/main.rs
//!
//! ## Overview
//!
//! Entry point for the `container-runner` CLI, the driver that keeps one
//! managed application container (plus an auto-update watchdog container)
//! reconciled against the configured desired state. It handles:
//! - Command-line argument parsing using Clap
//! - Setting up the logging system based on verbosity flags
//! - Loading configuration once and routing to the command handlers
//!
//! ## Architecture
//!
//! - `core`: configuration loading and the error types
//! - `engine`: the container engine interface and its CLI-backed adapter
//! - `reconciler`: the observe-then-act state machine over the engine
//! - `environment`: assembly of the managed container's environment
//! - `commands`: one handler per lifecycle trigger
//!
//! Reconciliation is strictly sequential, so the runtime is single-threaded.
//!
//! ## Examples
//!
//! ```bash
//! container-runner --config ./container-runner.toml install
//! container-runner -v start --host-port 8080
//! container-runner configure
//! container-runner status
//! ```
//!
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::{fmt, EnvFilter};

mod commands; // One handler per subcommand
mod core; // Config and errors
mod engine; // Engine trait and docker CLI adapter
mod environment; // .env, secret, and database variable assembly
mod reconciler; // Desired-state reconciliation

#[derive(Parser, Debug)]
#[command(
    name = "container-runner",
    about = "Keep a managed application container reconciled with its desired state",
    long_about = "Installs a container engine, runs one managed application container next to \
                  an auto-update watchdog, and re-creates the container whenever its \
                  configuration or database credentials change.",
    propagate_version = true,
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    /// Path to the configuration file.
    #[arg(long, global = true, env = "CONTAINER_RUNNER_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Parser, Debug)]
enum Commands {
    Install(commands::install::InstallArgs),
    Start(commands::start::StartArgs),
    Configure(commands::configure::ConfigureArgs),
    Status(commands::status::StatusArgs),
}

async fn dispatch(cli: Cli) -> anyhow::Result<()> {
    let config = crate::core::config::load_config(cli.config.as_deref())?;
    match cli.command {
        Commands::Install(args) => commands::install::handle_install(args, &config).await,
        Commands::Start(args) => commands::start::handle_start(args, &config).await,
        Commands::Configure(args) => {
            commands::configure::handle_configure(args, &config).await
        }
        Commands::Status(args) => commands::status::handle_status(args, &config).await,
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    fmt::Subscriber::builder()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();

    tracing::debug!("Parsed CLI arguments: {:?}", cli);

    if let Err(e) = dispatch(cli).await {
        tracing::error!("Command execution failed: {:?}", e);
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}
