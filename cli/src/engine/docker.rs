//! # Docker CLI Engine Adapter
//!
//! File: cli/src/engine/docker.rs
//!
//! ## Overview
//!
//! `DockerCli` implements `ContainerEngine` by spawning the engine's command-line
//! client for each operation and capturing its output. It holds only invocation
//! context (which binary to call, which proxy to hand to child processes, which
//! package provides the engine); it never remembers container state.
//!
//! ## Architecture
//!
//! - Argument vectors are built by small pure functions (`run_args`,
//!   `watchdog_args`, `inspect_args`) so the wire shape can be tested without
//!   an engine.
//! - `run_command` executes one invocation through `tokio::process::Command`.
//!   A non-zero exit becomes `RunnerError::EngineCommandFailed` with the raw exit
//!   code, stdout, and stderr; the failure is logged before it is returned.
//! - Proxy settings are set on each child's own environment. The runner's
//!   process environment is never modified.
//! - Environment values passed with `-e` are redacted in logs and in error
//!   messages, since they routinely carry credentials.
//!
//! ## Usage
//!
//! ```rust
//! let engine = DockerCli::new("docker").with_install_package(Some("docker.io".into()));
//! engine.pull("nginx:latest").await?;
//! ```
//!
use crate::core::config::ProxyConfig;
use crate::core::error::{EngineResult, RunnerError};
use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info, instrument, warn};

use super::{ContainerEngine, RunOptions, ENGINE_SOCKET, WATCHDOG_CONTAINER, WATCHDOG_IMAGE};

const PACKAGE_MANAGER: &str = "apt-get";

/// Engine adapter backed by the engine's command-line client.
#[derive(Debug, Clone)]
pub struct DockerCli {
    binary: String,
    proxy: Option<ProxyConfig>,
    install_package: Option<String>,
}

impl DockerCli {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            proxy: None,
            install_package: None,
        }
    }

    /// Proxy handed to every spawned child as `HTTP(S)_PROXY`.
    pub fn with_proxy(mut self, proxy: Option<ProxyConfig>) -> Self {
        self.proxy = proxy;
        self
    }

    /// Package `provision` installs through apt. `None` makes it a no-op.
    pub fn with_install_package(mut self, package: Option<String>) -> Self {
        self.install_package = package.filter(|p| !p.trim().is_empty());
        self
    }

    async fn engine(&self, args: Vec<String>) -> EngineResult<String> {
        self.run_command(&self.binary, &args, &[]).await
    }

    /// Runs one external command and returns its stdout.
    async fn run_command(
        &self,
        program: &str,
        args: &[String],
        extra_env: &[(&str, &str)],
    ) -> EngineResult<String> {
        let command_line = display_command(program, args);
        let mut cmd = Command::new(program);
        cmd.args(args);
        if let Some(proxy) = &self.proxy {
            cmd.envs(proxy_env(proxy));
        }
        cmd.envs(extra_env.iter().copied());

        let output = cmd.output().await.map_err(|source| {
            warn!("Could not execute `{}`: {}", command_line, source);
            RunnerError::EngineSpawn {
                command: command_line.clone(),
                source,
            }
        })?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        if output.status.success() {
            debug!("Engine command succeeded: {}", command_line);
            Ok(stdout)
        } else {
            debug!("Engine command failed: {}", command_line);
            warn!("Return code: {:?}", output.status.code());
            warn!("Output: {}", stdout.trim());
            warn!("Error output: {}", stderr.trim());
            Err(RunnerError::EngineCommandFailed {
                command: command_line,
                exit_code: output.status.code(),
                stdout,
                stderr,
            })
        }
    }
}

#[async_trait]
impl ContainerEngine for DockerCli {
    #[instrument(skip(self))]
    async fn provision(&self) -> EngineResult<()> {
        let Some(package) = &self.install_package else {
            debug!("No engine package configured, skipping installation.");
            return Ok(());
        };
        info!("Installing engine package '{}'...", package);
        // Without this, needrestart blocks on an interactive prompt.
        let env = [("NEEDRESTART_MODE", "a"), ("DEBIAN_FRONTEND", "noninteractive")];
        self.run_command(PACKAGE_MANAGER, &["update".to_string()], &env)
            .await?;
        self.run_command(
            PACKAGE_MANAGER,
            &["install".to_string(), "-y".to_string(), package.clone()],
            &env,
        )
        .await?;
        info!("Engine package '{}' installed.", package);
        Ok(())
    }

    async fn info(&self) -> EngineResult<String> {
        self.engine(vec!["info".to_string()]).await
    }

    #[instrument(skip(self))]
    async fn pull(&self, image: &str) -> EngineResult<String> {
        self.engine(vec!["pull".to_string(), image.to_string()]).await
    }

    #[instrument(skip(self, options), fields(container = %options.name, image = %options.image))]
    async fn run(&self, options: &RunOptions<'_>) -> EngineResult<String> {
        self.engine(run_args(options)).await
    }

    #[instrument(skip(self))]
    async fn run_watchdog(&self) -> EngineResult<String> {
        self.engine(watchdog_args()).await
    }

    async fn inspect(&self, target: &str, format: Option<&str>) -> EngineResult<String> {
        self.engine(inspect_args(target, format)).await
    }

    #[instrument(skip(self))]
    async fn start(&self, name: &str) -> EngineResult<String> {
        self.engine(vec!["start".to_string(), name.to_string()]).await
    }

    #[instrument(skip(self))]
    async fn stop(&self, name: &str) -> EngineResult<String> {
        self.engine(vec!["stop".to_string(), name.to_string()]).await
    }

    #[instrument(skip(self))]
    async fn wait(&self, name: &str) -> EngineResult<String> {
        self.engine(vec!["wait".to_string(), name.to_string()]).await
    }

    #[instrument(skip(self))]
    async fn remove(&self, name: &str) -> EngineResult<String> {
        self.engine(vec!["rm".to_string(), name.to_string()]).await
    }
}

/// `run -d --name <name> [-p host:container] [-e KEY=VALUE]... <image>`
pub fn run_args(options: &RunOptions<'_>) -> Vec<String> {
    let mut args = vec![
        "run".to_string(),
        "-d".to_string(),
        "--name".to_string(),
        options.name.to_string(),
    ];
    if let Some(ports) = options.ports {
        args.push("-p".to_string());
        args.push(ports.to_string());
    }
    for (key, value) in options.env.into_iter().flatten() {
        args.push("-e".to_string());
        args.push(format!("{}={}", key, value));
    }
    args.push(options.image.to_string());
    args
}

pub fn watchdog_args() -> Vec<String> {
    vec![
        "run".to_string(),
        "-d".to_string(),
        "--name".to_string(),
        WATCHDOG_CONTAINER.to_string(),
        "--restart".to_string(),
        "unless-stopped".to_string(),
        "-v".to_string(),
        format!("{}:{}", ENGINE_SOCKET, ENGINE_SOCKET),
        WATCHDOG_IMAGE.to_string(),
    ]
}

pub fn inspect_args(target: &str, format: Option<&str>) -> Vec<String> {
    let mut args = vec!["inspect".to_string()];
    if let Some(format) = format {
        args.push("-f".to_string());
        args.push(format.to_string());
    }
    args.push(target.to_string());
    args
}

fn proxy_env(proxy: &ProxyConfig) -> [(&'static str, &str); 4] {
    [
        ("HTTP_PROXY", proxy.http_proxy.as_str()),
        ("http_proxy", proxy.http_proxy.as_str()),
        ("HTTPS_PROXY", proxy.https_proxy.as_str()),
        ("https_proxy", proxy.https_proxy.as_str()),
    ]
}

/// Renders a command line for logs, hiding the value of every `-e KEY=VALUE`.
fn display_command(program: &str, args: &[String]) -> String {
    let mut parts = vec![program.to_string()];
    let mut redact_next = false;
    for arg in args {
        if redact_next {
            let key = arg.split_once('=').map_or(arg.as_str(), |(k, _)| k);
            parts.push(format!("{}=<redacted>", key));
            redact_next = false;
        } else {
            redact_next = arg == "-e";
            parts.push(arg.clone());
        }
    }
    parts.join(" ")
}
