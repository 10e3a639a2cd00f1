//! # Container Reconciler
//!
//! File: cli/src/reconciler/mod.rs
//!
//! ## Overview
//!
//! `ContainerRunner` owns the desired state of the managed container (image,
//! port mapping, environment) and drives a `ContainerEngine` to make the host
//! match it. Two containers are involved: the managed workload and the watchdog
//! that auto-updates it. Only the managed container follows desired state; the
//! watchdog just has to exist.
//!
//! ## Architecture
//!
//! Every operation observes first, then acts. Observation is never cached, so a
//! caller can safely repeat any operation after a partial failure.
//!
//! Per-container state machine used by `run`:
//!
//! ```text
//! absent        --run-->            running
//! running       --(no-op)-->        running
//! exited        --start-->          running
//! other         --rm--> absent --run--> running
//! ```
//!
//! `configure` replaces the managed container outright (stop, wait, rm, run):
//! the engine cannot change a running container's environment in place.
//!
//! Mutating operations (`install`, `run`, `configure`) log and propagate every
//! failure. The query accessors (`installed`, `managed_running`,
//! `watchdog_running`, `running`) turn failures into `false` and never raise.
//!
//! The runner does no locking. Callers serialize invocations.
//!
//! ## Usage
//!
//! ```rust
//! let mut runner = ContainerRunner::new(DockerCli::new("docker"), "app:v1", 8080, 80);
//! runner.install().await?;
//! runner.configure(Environment::from([("A".into(), Some("1".into()))])).await?;
//! ```
//!
use crate::core::error::{EngineResult, RunnerError};
use crate::engine::{
    is_name_conflict_error, is_not_found_error, ContainerEngine, ContainerState, PortMapping,
    RunOptions, MANAGED_CONTAINER, RUNNING_TEMPLATE, STATUS_TEMPLATE, WATCHDOG_CONTAINER,
    WATCHDOG_IMAGE,
};
use std::collections::BTreeMap;
use tracing::{debug, error, info, instrument};

pub mod readiness;

pub use readiness::{wait_for_engine, ReadinessPolicy};

/// Desired environment of the managed container. `None` values are dropped
/// before reaching the engine.
pub type Environment = BTreeMap<String, Option<String>>;

/// Reconciles the managed and watchdog containers against desired state.
pub struct ContainerRunner<E> {
    engine: E,
    image: String,
    host_port: u16,
    container_port: u16,
    environment: Environment,
    readiness: ReadinessPolicy,
}

impl<E: ContainerEngine> ContainerRunner<E> {
    /// Creates a runner with an empty environment and the default readiness
    /// policy.
    ///
    /// ## Arguments
    ///
    /// * `engine` - The engine every operation is issued through.
    /// * `image` - OCI image reference for the managed container.
    /// * `host_port` / `container_port` - The published port mapping.
    pub fn new(engine: E, image: impl Into<String>, host_port: u16, container_port: u16) -> Self {
        Self {
            engine,
            image: image.into(),
            host_port,
            container_port,
            environment: Environment::new(),
            readiness: ReadinessPolicy::default(),
        }
    }

    pub fn with_readiness(mut self, readiness: ReadinessPolicy) -> Self {
        self.readiness = readiness;
        self
    }

    /// Changes the image used by the next `run` or `configure`.
    pub fn set_image(&mut self, image: impl Into<String>) {
        self.image = image.into();
        info!("Container image updated to: {}", self.image);
    }

    pub fn set_ports(&mut self, host_port: u16, container_port: u16) {
        self.host_port = host_port;
        self.container_port = container_port;
        debug!("Port mapping updated to {}:{}", host_port, container_port);
    }

    pub fn image(&self) -> &str {
        &self.image
    }

    pub fn ports(&self) -> PortMapping {
        PortMapping {
            host: self.host_port,
            container: self.container_port,
        }
    }

    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    #[cfg(test)]
    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// One-time provisioning: install the engine and wait for it, start the
    /// watchdog, pull the managed image. Any failure aborts the sequence.
    ///
    /// ## Returns
    ///
    /// * `EngineResult<()>` - `Ok` when the engine answers, the watchdog
    ///   exists (newly started or already present) and the image is pulled.
    ///
    /// ## Errors
    ///
    /// * `RunnerError::EngineUnavailable` - The engine never answered within
    ///   the readiness policy.
    /// * `RunnerError::EngineCommandFailed` / `EngineSpawn` - Package install,
    ///   watchdog start (other than a name conflict) or pull failed.
    #[instrument(skip(self), fields(image = %self.image))]
    pub async fn install(&self) -> EngineResult<()> {
        self.engine.provision().await.map_err(|e| {
            error!("Could not install the container engine: {}", e);
            e
        })?;
        wait_for_engine(&self.engine, self.readiness)
            .await
            .map_err(|e| {
                error!("{}", e);
                e
            })?;
        info!("Container engine installed and ready.");

        match self.engine.run_watchdog().await {
            Ok(_) => info!("Successfully started watchdog to monitor: {}", MANAGED_CONTAINER),
            Err(e) if e.stderr().is_some_and(is_name_conflict_error) => {
                info!("Watchdog container '{}' already exists.", WATCHDOG_CONTAINER)
            }
            Err(e) => {
                error!("Failed to start watchdog: {}", e);
                return Err(e);
            }
        }

        self.engine.pull(&self.image).await.map_err(|e| {
            error!("Failed to pull image: {}", e);
            e
        })?;
        info!("Successfully pulled image: {}", self.image);
        Ok(())
    }

    /// Starts the managed container with the current desired state unless it
    /// is already running. The watchdog is not touched.
    ///
    /// | Observed state | Action |
    /// |---|---|
    /// | running | nothing |
    /// | absent | `run` |
    /// | exited | `start` |
    /// | anything else | `rm`, then `run` |
    ///
    /// ## Errors
    ///
    /// Any failed observation or engine call is logged and returned; later
    /// steps are skipped.
    #[instrument(skip(self), fields(image = %self.image))]
    pub async fn run(&self) -> EngineResult<()> {
        let state = self.observe(MANAGED_CONTAINER).await?;
        match state {
            ContainerState::Running => {
                info!("Managed container already running, skipping run command.");
                return Ok(());
            }
            ContainerState::Exited => {
                debug!("Container {} has exited, restarting now.", MANAGED_CONTAINER);
                self.engine.start(MANAGED_CONTAINER).await.map_err(|e| {
                    error!("Failed to restart managed container: {}", e);
                    e
                })?;
            }
            ContainerState::Other(status) => {
                debug!(
                    "Container {} exists in state {}. Removing it.",
                    MANAGED_CONTAINER, status
                );
                self.engine.remove(MANAGED_CONTAINER).await.map_err(|e| {
                    error!("Failed to remove managed container: {}", e);
                    e
                })?;
                self.start_managed().await?;
            }
            ContainerState::Absent => self.start_managed().await?,
        }
        info!("Successfully started managed container: {}", MANAGED_CONTAINER);
        Ok(())
    }

    /// Replaces the managed container so it runs with `environment` and the
    /// current image and ports.
    ///
    /// A running container is stopped, waited on, and removed first; one that
    /// exists in any other state is removed. A failure at any step aborts and
    /// leaves the container wherever that step left it; calling `configure`
    /// again resumes from a fresh observation.
    ///
    /// ## Arguments
    ///
    /// * `environment` - The new desired environment. It is kept and used by
    ///   later `run` calls too. Entries with no value are not passed on.
    ///
    /// ## Errors
    ///
    /// * `RunnerError::EngineCommandFailed` / `EngineSpawn` - From the
    ///   observation, `stop`, `wait`, `rm` or the final `run`.
    #[instrument(skip(self, environment), fields(image = %self.image))]
    pub async fn configure(&mut self, environment: Environment) -> EngineResult<()> {
        self.environment = environment;

        match self.observe(MANAGED_CONTAINER).await? {
            ContainerState::Running => {
                self.stop_managed().await?;
                self.remove_managed().await?;
            }
            ContainerState::Absent => {}
            state => {
                debug!(
                    "Managed container is {}, removing it before re-creating.",
                    state
                );
                self.remove_managed().await?;
            }
        }

        self.start_managed().await.map_err(|e| {
            error!("Failed to re-run container: {}", e);
            e
        })?;
        info!(
            "Successfully re-ran container: {} with env vars: {:?}",
            MANAGED_CONTAINER,
            self.environment.keys().collect::<Vec<_>>()
        );
        Ok(())
    }

    /// True only if both the managed image and the watchdog image are present
    /// locally.
    pub async fn installed(&self) -> bool {
        for image in [self.image.as_str(), WATCHDOG_IMAGE] {
            match self.engine.inspect(image, None).await {
                Ok(out) if !out.trim().is_empty() => {}
                Ok(_) => return false,
                Err(e) => {
                    info!("Failed to inspect image '{}' locally: {}", image, e);
                    return false;
                }
            }
        }
        true
    }

    pub async fn managed_running(&self) -> bool {
        self.container_running(MANAGED_CONTAINER).await
    }

    pub async fn watchdog_running(&self) -> bool {
        self.container_running(WATCHDOG_CONTAINER).await
    }

    /// True only if both containers report running. The managed container is
    /// checked first; either failure yields `false`.
    pub async fn running(&self) -> bool {
        self.managed_running().await && self.watchdog_running().await
    }

    /// Current lifecycle state of `name`, freshly inspected.
    ///
    /// A "no such object" inspection failure means `Absent`; every other
    /// failure is propagated.
    pub async fn observe(&self, name: &str) -> EngineResult<ContainerState> {
        match self.engine.inspect(name, Some(STATUS_TEMPLATE)).await {
            Ok(status) => Ok(ContainerState::from_status(&status)),
            Err(e) => match classify_inspect_error(name, e) {
                RunnerError::ContainerNotFound { .. } => {
                    debug!("Container {} does not exist.", name);
                    Ok(ContainerState::Absent)
                }
                other => {
                    error!("Unknown error returned from inspect call: {}", other);
                    Err(other)
                }
            },
        }
    }

    async fn container_running(&self, name: &str) -> bool {
        match self.engine.inspect(name, Some(RUNNING_TEMPLATE)).await {
            Ok(out) => out.trim() == "true",
            Err(e) => {
                info!("Failed to inspect running state of '{}': {}", name, e);
                false
            }
        }
    }

    async fn start_managed(&self) -> EngineResult<()> {
        let env = resolved_environment(&self.environment);
        let options = RunOptions {
            image: &self.image,
            name: MANAGED_CONTAINER,
            ports: Some(self.ports()),
            env: Some(&env),
        };
        self.engine.run(&options).await?;
        Ok(())
    }

    async fn stop_managed(&self) -> EngineResult<()> {
        // `wait` only means something after a successful `stop`.
        let stopped = match self.engine.stop(MANAGED_CONTAINER).await {
            Ok(_) => self.engine.wait(MANAGED_CONTAINER).await,
            Err(e) => Err(e),
        };
        match stopped {
            Ok(_) => {
                info!("Successfully stopped container: {}", MANAGED_CONTAINER);
                Ok(())
            }
            Err(e) => {
                error!("Failed to stop container: {}", e);
                Err(e)
            }
        }
    }

    async fn remove_managed(&self) -> EngineResult<()> {
        match self.engine.remove(MANAGED_CONTAINER).await {
            Ok(_) => {
                info!("Successfully removed container: {}", MANAGED_CONTAINER);
                Ok(())
            }
            Err(e) => {
                error!("Failed to remove container: {}", e);
                Err(e)
            }
        }
    }
}

/// Turns an inspect failure whose stderr says the object does not exist into
/// `ContainerNotFound`; any other error is returned unchanged.
pub fn classify_inspect_error(name: &str, err: RunnerError) -> RunnerError {
    if err.stderr().is_some_and(is_not_found_error) {
        RunnerError::ContainerNotFound {
            name: name.to_string(),
        }
    } else {
        err
    }
}

/// Drops variables without a value. They are omitted, never sent empty.
pub fn resolved_environment(environment: &Environment) -> BTreeMap<String, String> {
    environment
        .iter()
        .filter_map(|(key, value)| value.as_ref().map(|v| (key.clone(), v.clone())))
        .collect()
}
