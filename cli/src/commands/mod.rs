//! # Container Runner Command Handlers
//!
//! File: cli/src/commands/mod.rs
//!
//! ## Overview
//!
//! The command layer is the lifecycle driver for the reconciler. Each
//! subcommand corresponds to one trigger of the hosting operator framework:
//!
//! - **`install`**: provisioning (engine package, readiness wait, watchdog, image pull)
//! - **`start`**: workload start (`run`, then `configure` with the assembled environment)
//! - **`configure`**: configuration or relation change (`configure` only)
//! - **`status`**: read-only status report
//!
//! Handlers load configuration, build a `ContainerRunner` over the `DockerCli`
//! adapter, apply any desired-state overrides from the command line, and call
//! one reconciler operation. Errors are returned with context for `main` to
//! report.
//!
use crate::core::config::Config;
use crate::engine::DockerCli;
use crate::reconciler::{ContainerRunner, ReadinessPolicy};
use clap::Args;
use tracing::debug;

/// Implements the `container-runner configure` command.
pub mod configure;
/// Implements the `container-runner install` command.
pub mod install;
/// Implements the `container-runner start` command.
pub mod start;
/// Implements the `container-runner status` command.
pub mod status;

/// Desired-state overrides accepted by `start` and `configure`.
///
/// Values given here take precedence over the `[container]` table of the
/// configuration file for this invocation.
#[derive(Args, Debug, Default, Clone)]
pub struct DesiredStateArgs {
    /// OCI image reference to run for the managed container.
    #[arg(long)]
    pub image: Option<String>,

    /// Host port to publish.
    #[arg(long, value_parser = clap::value_parser!(u16).range(1..))]
    pub host_port: Option<u16>,

    /// Container port to publish the host port to.
    #[arg(long, value_parser = clap::value_parser!(u16).range(1..))]
    pub container_port: Option<u16>,
}

impl DesiredStateArgs {
    /// Writes the overrides into the runner's desired state.
    pub fn apply(&self, runner: &mut ContainerRunner<DockerCli>) {
        if let Some(image) = &self.image {
            runner.set_image(image.clone());
        }
        if self.host_port.is_some() || self.container_port.is_some() {
            let current = runner.ports();
            runner.set_ports(
                self.host_port.unwrap_or(current.host),
                self.container_port.unwrap_or(current.container),
            );
        }
    }
}

/// Builds the production runner from configuration.
pub fn build_runner(config: &Config) -> ContainerRunner<DockerCli> {
    let engine = DockerCli::new(config.engine.binary.clone())
        .with_proxy(config.engine.proxy())
        .with_install_package(Some(config.engine.install_package.clone()));
    debug!(
        "Using engine binary '{}' for image {}",
        config.engine.binary, config.container.image
    );
    ContainerRunner::new(
        engine,
        config.container.image.clone(),
        config.container.host_port,
        config.container.container_port,
    )
    .with_readiness(ReadinessPolicy {
        retries: config.engine.readiness_retries,
        delay: config.engine.readiness_delay(),
    })
}
