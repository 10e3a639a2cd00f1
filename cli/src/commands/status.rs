//! # Status Handler
//!
//! File: cli/src/commands/status.rs
//!
//! Implements `container-runner status`. Every check is a boolean query that
//! treats engine failures as "no", so this command reports rather than fails
//! when the engine is missing or misbehaving.
//!
use super::build_runner;
use crate::core::{config::Config, error::Result};
use clap::Parser;

#[derive(Parser, Debug)]
#[command(about = "Report whether the images are present and the containers are running")]
pub struct StatusArgs {}

pub async fn handle_status(_args: StatusArgs, config: &Config) -> Result<()> {
    let runner = build_runner(config);

    let installed = runner.installed().await;
    let managed = runner.managed_running().await;
    let watchdog = runner.watchdog_running().await;
    let running = runner.running().await;

    println!("Image:     {}", runner.image());
    println!("Installed: {}", yes_no(installed));
    println!("Managed:   {}", running_label(managed));
    println!("Watchdog:  {}", running_label(watchdog));
    println!("Running:   {}", yes_no(running));
    println!("Status:    {}", verdict(installed, running));
    Ok(())
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}

fn running_label(value: bool) -> &'static str {
    if value {
        "running"
    } else {
        "not running"
    }
}

fn verdict(installed: bool, running: bool) -> &'static str {
    match (installed, running) {
        (_, true) => "active",
        (true, false) => "blocked: containers not running",
        (false, false) => "blocked: not installed",
    }
}
