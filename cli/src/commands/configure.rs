//! # Configure Handler
//!
//! File: cli/src/commands/configure.rs
//!
//! Implements `container-runner configure`, run whenever the configuration or
//! the database relation changes. The managed container is replaced so it
//! runs with the freshly assembled environment and the current image and
//! ports.
//!
use super::{build_runner, DesiredStateArgs};
use crate::core::{config::Config, error::Result};
use crate::environment;
use anyhow::Context;
use clap::Parser;
use tracing::info;

#[derive(Parser, Debug)]
#[command(about = "Re-create the managed container with the current environment")]
pub struct ConfigureArgs {
    #[command(flatten)]
    pub desired: DesiredStateArgs,
}

pub async fn handle_configure(args: ConfigureArgs, config: &Config) -> Result<()> {
    if environment::waiting_for_database(&config.database) {
        info!("Database credentials incomplete, skipping configure.");
        println!("Waiting for database relation");
        return Ok(());
    }

    let mut runner = build_runner(config);
    args.desired.apply(&mut runner);

    let env = environment::assemble(config);
    runner
        .configure(env)
        .await
        .context("Failed to configure managed container")?;

    let applied = runner.environment().values().filter(|v| v.is_some()).count();
    info!("Managed container configured with {} variable(s).", applied);
    println!("Managed container re-created with updated environment.");
    Ok(())
}
