//! # In-Memory Fake Engine (tests only)
//!
//! File: cli/src/engine/fake.rs
//!
//! A `ContainerEngine` that simulates named containers and local images in
//! memory and records every call, so reconciler tests can assert on the exact
//! sequence of engine operations. Any operation can be made to fail with a
//! given stderr through `fail_on`.
//!
use crate::core::error::{EngineResult, RunnerError};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Mutex;

use super::{
    ContainerEngine, PortMapping, RunOptions, RUNNING_TEMPLATE, STATUS_TEMPLATE,
    WATCHDOG_CONTAINER, WATCHDOG_IMAGE,
};

/// One recorded engine call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Provision,
    Info,
    Pull(String),
    Run {
        image: String,
        name: String,
        ports: Option<PortMapping>,
        env: Option<BTreeMap<String, String>>,
    },
    RunWatchdog,
    Inspect {
        target: String,
        format: Option<String>,
    },
    Start(String),
    Stop(String),
    Wait(String),
    Remove(String),
}

/// Operation kinds that can be scripted to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Provision,
    Pull,
    Run,
    RunWatchdog,
    Inspect,
    Start,
    Stop,
    Wait,
    Remove,
}

#[derive(Default)]
struct FakeState {
    calls: Vec<Call>,
    /// Container name -> lifecycle status.
    containers: HashMap<String, String>,
    images: HashSet<String>,
    failures: HashMap<Op, String>,
    info_failures_remaining: u32,
}

#[derive(Default)]
pub struct FakeEngine {
    state: Mutex<FakeState>,
}

impl FakeEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a container with the given lifecycle status.
    pub fn with_container(self, name: &str, status: &str) -> Self {
        self.lock()
            .containers
            .insert(name.to_string(), status.to_string());
        self
    }

    pub fn with_image(self, image: &str) -> Self {
        self.lock().images.insert(image.to_string());
        self
    }

    /// Makes every call of `op` fail with exit code 1 and `stderr`.
    pub fn fail_on(self, op: Op, stderr: &str) -> Self {
        self.lock().failures.insert(op, stderr.to_string());
        self
    }

    /// Makes the first `count` liveness probes fail.
    pub fn with_info_failures(self, count: u32) -> Self {
        self.lock().info_failures_remaining = count;
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    /// Calls other than inspections, i.e. the ones that can change state.
    pub fn mutating_calls(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| !matches!(c, Call::Inspect { .. }))
            .collect()
    }

    pub fn status_of(&self, name: &str) -> Option<String> {
        self.lock().containers.get(name).cloned()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FakeState> {
        self.state.lock().unwrap()
    }

    /// Records `call` and returns the scripted failure for `op`, if any.
    fn record(&self, op: Op, call: Call) -> EngineResult<()> {
        let mut state = self.lock();
        state.calls.push(call);
        match state.failures.get(&op) {
            Some(stderr) => Err(failed(format!("{:?}", op), stderr)),
            None => Ok(()),
        }
    }

    fn create(&self, name: &str, image: &str) -> EngineResult<String> {
        let mut state = self.lock();
        if state.containers.contains_key(name) {
            return Err(failed(
                "run".to_string(),
                &format!(
                    "docker: Error response from daemon: Conflict. The container name \"/{}\" is already in use.",
                    name
                ),
            ));
        }
        state.images.insert(image.to_string());
        state
            .containers
            .insert(name.to_string(), "running".to_string());
        Ok(format!("{}-id\n", name))
    }
}

fn failed(command: String, stderr: &str) -> RunnerError {
    RunnerError::EngineCommandFailed {
        command,
        exit_code: Some(1),
        stdout: String::new(),
        stderr: stderr.to_string(),
    }
}

fn no_such_object(target: &str) -> RunnerError {
    failed(
        "inspect".to_string(),
        &format!("Error: No such object: {}\n", target),
    )
}

#[async_trait]
impl ContainerEngine for FakeEngine {
    async fn provision(&self) -> EngineResult<()> {
        self.record(Op::Provision, Call::Provision)
    }

    async fn info(&self) -> EngineResult<String> {
        let mut state = self.lock();
        state.calls.push(Call::Info);
        if state.info_failures_remaining > 0 {
            state.info_failures_remaining -= 1;
            return Err(failed(
                "info".to_string(),
                "Cannot connect to the Docker daemon at unix:///var/run/docker.sock.",
            ));
        }
        Ok("Server Version: fake\n".to_string())
    }

    async fn pull(&self, image: &str) -> EngineResult<String> {
        self.record(Op::Pull, Call::Pull(image.to_string()))?;
        self.lock().images.insert(image.to_string());
        Ok(format!("Status: Downloaded newer image for {}\n", image))
    }

    async fn run(&self, options: &RunOptions<'_>) -> EngineResult<String> {
        self.record(
            Op::Run,
            Call::Run {
                image: options.image.to_string(),
                name: options.name.to_string(),
                ports: options.ports,
                env: options.env.cloned(),
            },
        )?;
        self.create(options.name, options.image)
    }

    async fn run_watchdog(&self) -> EngineResult<String> {
        self.record(Op::RunWatchdog, Call::RunWatchdog)?;
        self.create(WATCHDOG_CONTAINER, WATCHDOG_IMAGE)
    }

    async fn inspect(&self, target: &str, format: Option<&str>) -> EngineResult<String> {
        self.record(
            Op::Inspect,
            Call::Inspect {
                target: target.to_string(),
                format: format.map(str::to_string),
            },
        )?;
        let state = self.lock();
        match (format, state.containers.get(target)) {
            (Some(STATUS_TEMPLATE), Some(status)) => Ok(format!("{}\n", status)),
            (Some(RUNNING_TEMPLATE), Some(status)) => Ok(format!("{}\n", status == "running")),
            (None, Some(_)) => Ok("[{\"Type\": \"container\"}]\n".to_string()),
            (None, None) if state.images.contains(target) => {
                Ok("[{\"Type\": \"image\"}]\n".to_string())
            }
            _ => Err(no_such_object(target)),
        }
    }

    async fn start(&self, name: &str) -> EngineResult<String> {
        self.record(Op::Start, Call::Start(name.to_string()))?;
        let mut state = self.lock();
        match state.containers.get_mut(name) {
            Some(status) => {
                *status = "running".to_string();
                Ok(format!("{}\n", name))
            }
            None => Err(failed(
                "start".to_string(),
                &format!("Error response from daemon: No such container: {}", name),
            )),
        }
    }

    async fn stop(&self, name: &str) -> EngineResult<String> {
        self.record(Op::Stop, Call::Stop(name.to_string()))?;
        if let Some(status) = self.lock().containers.get_mut(name) {
            *status = "exited".to_string();
        }
        Ok(format!("{}\n", name))
    }

    async fn wait(&self, name: &str) -> EngineResult<String> {
        self.record(Op::Wait, Call::Wait(name.to_string()))?;
        Ok("0\n".to_string())
    }

    async fn remove(&self, name: &str) -> EngineResult<String> {
        self.record(Op::Remove, Call::Remove(name.to_string()))?;
        let mut state = self.lock();
        if state.containers.get(name).map(String::as_str) == Some("running") {
            return Err(failed(
                "rm".to_string(),
                &format!(
                    "Error response from daemon: cannot remove container \"/{}\": container is running",
                    name
                ),
            ));
        }
        state.containers.remove(name);
        Ok(format!("{}\n", name))
    }
}
