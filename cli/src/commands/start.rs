//! # Start Handler
//!
//! File: cli/src/commands/start.rs
//!
//! Implements `container-runner start`: bring the managed container up with
//! `run`, then apply the assembled environment with `configure`. If the
//! deployment expects a database that has not supplied credentials yet, the
//! command reports that it is waiting and does nothing.
//!
use super::{build_runner, DesiredStateArgs};
use crate::core::{config::Config, error::Result};
use crate::environment;
use anyhow::Context;
use clap::Parser;
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    about = "Start the managed container and apply its environment",
    long_about = "Runs the managed container (starting an exited one, replacing one in any \
                  other state), then re-creates it with the environment assembled from the \
                  configured .env file, secret file, and database credentials."
)]
pub struct StartArgs {
    #[command(flatten)]
    pub desired: DesiredStateArgs,
}

pub async fn handle_start(args: StartArgs, config: &Config) -> Result<()> {
    if environment::waiting_for_database(&config.database) {
        info!("Database credentials incomplete, not starting the managed container.");
        println!("Waiting for database relation");
        return Ok(());
    }

    let mut runner = build_runner(config);
    args.desired.apply(&mut runner);

    runner
        .run()
        .await
        .with_context(|| format!("Failed to run managed container from {}", runner.image()))?;

    let env = environment::assemble(config);
    runner
        .configure(env)
        .await
        .context("Failed to configure managed container")?;

    println!(
        "Managed container running {} on port {}.",
        runner.image(),
        runner.ports()
    );
    Ok(())
}
