//! # Container Engine Interface
//!
//! File: cli/src/engine/mod.rs
//!
//! ## Overview
//!
//! This module defines the seam between the reconciler and the host's container
//! engine. The `ContainerEngine` trait is a stateless request/response surface:
//! every method takes everything it needs as arguments and reports the engine's
//! raw outcome. Nothing is cached; the reconciler re-observes before acting.
//!
//! ## Architecture
//!
//! - **`docker`**: `DockerCli`, the production adapter that shells out to the
//!   engine's command-line interface (`pull`, `run`, `start`, `stop`, `wait`,
//!   `rm`, `inspect`, `info`).
//! - **`daemon`**: Writes the engine daemon's proxy configuration file.
//! - **`fake`** (tests only): An in-memory engine that records every call.
//!
//! Failures are returned as `RunnerError::EngineCommandFailed` carrying the exit
//! code, stdout, and stderr. The two stderr classifications the reconciler relies
//! on live here as named predicates, `is_not_found_error` and
//! `is_name_conflict_error`, so the string matching stays in one place.
//!
use crate::core::error::EngineResult;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::fmt;

pub mod daemon;
pub mod docker;
#[cfg(test)]
pub mod fake;

pub use docker::DockerCli;

/// Name of the workload container driven by desired state.
pub const MANAGED_CONTAINER: &str = "managed_container";
/// Name of the auxiliary container that auto-updates the managed image.
pub const WATCHDOG_CONTAINER: &str = "watchtower";
/// Image the watchdog container always runs.
pub const WATCHDOG_IMAGE: &str = "containrrr/watchtower";
/// Engine control socket mounted into the watchdog.
pub const ENGINE_SOCKET: &str = "/var/run/docker.sock";

/// Inspect template selecting a container's lifecycle status.
pub const STATUS_TEMPLATE: &str = "{{.State.Status}}";
/// Inspect template selecting a container's running flag.
pub const RUNNING_TEMPLATE: &str = "{{.State.Running}}";

/// A `host:container` port publication.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortMapping {
    pub host: u16,
    pub container: u16,
}

impl fmt::Display for PortMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.container)
    }
}

/// Parameters for starting a detached, named container.
#[derive(Debug, Clone, Copy)]
pub struct RunOptions<'a> {
    pub image: &'a str,
    pub name: &'a str,
    pub ports: Option<PortMapping>,
    /// Each entry becomes one `-e KEY=VALUE` override.
    pub env: Option<&'a BTreeMap<String, String>>,
}

/// Observed lifecycle state of a named container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContainerState {
    /// The engine has no object with this name.
    Absent,
    Running,
    Exited,
    /// Exists in some other state (`created`, `paused`, `restarting`, ...).
    Other(String),
}

impl ContainerState {
    /// Maps the output of a `{{.State.Status}}` inspection.
    pub fn from_status(status: &str) -> Self {
        match status.trim() {
            "running" => ContainerState::Running,
            "exited" => ContainerState::Exited,
            other => ContainerState::Other(other.to_string()),
        }
    }
}

impl fmt::Display for ContainerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContainerState::Absent => write!(f, "absent"),
            ContainerState::Running => write!(f, "running"),
            ContainerState::Exited => write!(f, "exited"),
            ContainerState::Other(status) => write!(f, "{}", status),
        }
    }
}

/// Individual container-engine operations.
///
/// Implementations own no reconciliation state. Every method is a fallible
/// request against the host engine and must never swallow a failure.
#[async_trait]
pub trait ContainerEngine: Send + Sync {
    /// Installs the engine on the host if the adapter knows how to.
    async fn provision(&self) -> EngineResult<()>;

    /// Trivial liveness call used by the readiness wait.
    async fn info(&self) -> EngineResult<String>;

    async fn pull(&self, image: &str) -> EngineResult<String>;

    /// Starts a detached container. Fails on a name collision.
    async fn run(&self, options: &RunOptions<'_>) -> EngineResult<String>;

    /// Starts the watchdog container with the engine socket mounted and an
    /// `unless-stopped` restart policy. A second call fails with a name
    /// collision (see `is_name_conflict_error`).
    async fn run_watchdog(&self) -> EngineResult<String>;

    /// Inspects a container or image. With a `format`, returns that single
    /// templated field; without one, the full inspection document.
    async fn inspect(&self, target: &str, format: Option<&str>) -> EngineResult<String>;

    async fn start(&self, name: &str) -> EngineResult<String>;

    async fn stop(&self, name: &str) -> EngineResult<String>;

    /// Blocks until the engine reports the container has exited. Only
    /// meaningful after a successful `stop`.
    async fn wait(&self, name: &str) -> EngineResult<String>;

    /// Deletes a stopped container. Fails if it is still running.
    async fn remove(&self, name: &str) -> EngineResult<String>;
}

/// True when engine stderr says the inspected object does not exist.
pub fn is_not_found_error(stderr: &str) -> bool {
    stderr.contains("No such object") || stderr.contains("No such container")
}

/// True when engine stderr says a container name is already taken.
pub fn is_name_conflict_error(stderr: &str) -> bool {
    stderr.contains("is already in use")
}
