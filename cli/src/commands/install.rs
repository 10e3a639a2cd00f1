//! # Install Handler
//!
//! File: cli/src/commands/install.rs
//!
//! ## Overview
//!
//! Implements `container-runner install`, the one-time provisioning step:
//!
//! 1. Write the engine daemon's proxy configuration, if a proxy is configured.
//! 2. Install the engine package and wait for the engine to answer.
//! 3. Start the watchdog container (an existing one is accepted).
//! 4. Pull the managed image.
//!
//! Any failure aborts the sequence. Every step is safe to repeat, so a failed
//! install is retried by running the command again.
//!
use super::build_runner;
use crate::core::{config::Config, error::Result};
use crate::engine::daemon;
use anyhow::Context;
use clap::Parser;
use std::path::Path;
use tracing::info;

#[derive(Parser, Debug)]
#[command(about = "Install the container engine, start the watchdog, and pull the managed image")]
pub struct InstallArgs {}

pub async fn handle_install(_args: InstallArgs, config: &Config) -> Result<()> {
    if let Some(proxy) = config.engine.proxy() {
        let path = Path::new(&config.engine.daemon_config_path);
        daemon::write_proxy_config(path, &proxy)
            .with_context(|| format!("Failed to configure engine proxy in {}", path.display()))?;
    }

    let runner = build_runner(config);
    println!("Installing container runner...");
    runner
        .install()
        .await
        .context("Failed to install container runner")?;

    info!("Install complete for image {}", runner.image());
    println!("Installation complete, waiting for database.");
    Ok(())
}
