//! # Container Runner Configuration System
//!
//! File: cli/src/core/config.rs
//!
//! ## Overview
//!
//! This module loads the operator's configuration from a TOML file, expands
//! paths, and validates the result before any command acts on it. The
//! configuration describes the desired state of the managed container
//! (image and ports), where its environment comes from (a `.env` resource, a
//! secret, a database relation), and how to reach the container engine.
//!
//! ## Architecture
//!
//! Configuration sources (first match wins):
//! 1. An explicit path from `--config` or `CONTAINER_RUNNER_CONFIG`
//! 2. `container-runner.toml` in the current directory
//! 3. `config.toml` in the user configuration directory
//!
//! After parsing, `~` in file paths is expanded and the whole structure is
//! validated. A missing image, a zero port, a proxy with only one half set, or
//! a readiness retry count of zero are all rejected with `RunnerError::Config`.
//!
//! ## Examples
//!
//! ```toml
//! [container]
//! image = "ghcr.io/example/ratings:latest"
//! host_port = 8080
//! container_port = 80
//!
//! [environment]
//! env_file = "~/ratings.env"
//!
//! [database]
//! expected = true
//! username = "ratings"
//! password = "secret"
//! endpoints = "10.0.0.5:5432"
//! ```
//!
use crate::core::error::{Result, RunnerError};
use anyhow::{anyhow, Context};
use directories::ProjectDirs;
use serde::Deserialize;
use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};
use tracing::{debug, info};

/// Represents the main configuration structure, loaded from TOML files.
#[derive(Deserialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub container: ContainerConfig,
    #[serde(default)]
    pub environment: EnvironmentConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub engine: EngineConfig,
}

/// Desired state of the managed container.
#[derive(Deserialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct ContainerConfig {
    /// OCI image reference to run.
    pub image: String,
    /// Port published on the host.
    #[serde(default = "default_port")]
    pub host_port: u16,
    /// Port the workload listens on inside the container.
    #[serde(default = "default_port")]
    pub container_port: u16,
}

/// Sources for the managed container's environment variables.
#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields)]
pub struct EnvironmentConfig {
    /// `.env` file shipped as a resource (can use ~).
    pub env_file: Option<String>,
    /// `.env`-formatted secret; its keys override those of `env_file` (can use ~).
    pub secret_file: Option<String>,
}

/// Database relation data used to derive a connection string.
#[derive(Deserialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct DatabaseConfig {
    /// Hold off starting the workload until credentials are present.
    #[serde(default)]
    pub expected: bool,
    pub username: Option<String>,
    pub password: Option<String>,
    /// `host:port` of the database server.
    pub endpoints: Option<String>,
    #[serde(default = "default_database_name")]
    pub name: String,
    /// Variable the connection string is injected under.
    #[serde(default = "default_uri_variable")]
    pub uri_variable: String,
}

/// How to reach, install, and wait for the container engine.
#[derive(Deserialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    #[serde(default = "default_engine_binary")]
    pub binary: String,
    /// Package installed through apt during `install`. Empty disables it.
    #[serde(default = "default_install_package")]
    pub install_package: String,
    #[serde(default = "default_readiness_retries")]
    pub readiness_retries: u32,
    #[serde(default = "default_readiness_delay_secs")]
    pub readiness_delay_secs: u64,
    pub http_proxy: Option<String>,
    pub https_proxy: Option<String>,
    #[serde(default = "default_daemon_config_path")]
    pub daemon_config_path: String,
}

/// A complete HTTP(S) proxy setting for the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyConfig {
    pub http_proxy: String,
    pub https_proxy: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            expected: false,
            username: None,
            password: None,
            endpoints: None,
            name: default_database_name(),
            uri_variable: default_uri_variable(),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            binary: default_engine_binary(),
            install_package: default_install_package(),
            readiness_retries: default_readiness_retries(),
            readiness_delay_secs: default_readiness_delay_secs(),
            http_proxy: None,
            https_proxy: None,
            daemon_config_path: default_daemon_config_path(),
        }
    }
}

impl EngineConfig {
    /// The proxy setting, if both halves are configured.
    pub fn proxy(&self) -> Option<ProxyConfig> {
        match (&self.http_proxy, &self.https_proxy) {
            (Some(http), Some(https)) => Some(ProxyConfig {
                http_proxy: http.clone(),
                https_proxy: https.clone(),
            }),
            _ => None,
        }
    }

    pub fn readiness_delay(&self) -> Duration {
        Duration::from_secs(self.readiness_delay_secs)
    }
}

fn default_port() -> u16 {
    80
}
fn default_database_name() -> String {
    "ratings".to_string()
}
fn default_uri_variable() -> String {
    "APP_POSTGRES_URI".to_string()
}
fn default_engine_binary() -> String {
    "docker".to_string()
}
fn default_install_package() -> String {
    "docker.io".to_string()
}
fn default_readiness_retries() -> u32 {
    10
}
fn default_readiness_delay_secs() -> u64 {
    3
}
fn default_daemon_config_path() -> String {
    "/etc/docker/daemon.json".to_string()
}

const LOCAL_CONFIG_FILENAME: &str = "container-runner.toml";

/// Loads, expands, and validates the configuration.
///
/// `explicit` is the path given on the command line (or through the
/// environment); when absent the default locations are searched.
pub fn load_config(explicit: Option<&Path>) -> Result<Config> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => find_config_path().ok_or_else(|| {
            anyhow!(RunnerError::Config(format!(
                "No configuration file found. Pass --config or create ./{}",
                LOCAL_CONFIG_FILENAME
            )))
        })?,
    };
    info!("Loading configuration from: {}", path.display());
    let mut config = load_config_from_path(&path)?;
    expand_config_paths(&mut config);
    validate_config(&config).context("Configuration validation failed")?;
    debug!(
        "Loaded configuration: image={}, ports={}:{}, engine={}, database expected={}",
        config.container.image,
        config.container.host_port,
        config.container.container_port,
        config.engine.binary,
        config.database.expected
    );
    Ok(config)
}

fn find_config_path() -> Option<PathBuf> {
    let local = PathBuf::from(LOCAL_CONFIG_FILENAME);
    if local.is_file() {
        return Some(local);
    }
    let proj_dirs = ProjectDirs::from("io", "ContainerRunner", "container-runner")?;
    let user_config = proj_dirs.config_dir().join("config.toml");
    if user_config.is_file() {
        Some(user_config)
    } else {
        debug!(
            "User configuration file not found at {}",
            user_config.display()
        );
        None
    }
}

fn load_config_from_path(path: &Path) -> Result<Config> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read configuration file: {}", path.display()))?;
    toml::from_str(&content)
        .with_context(|| format!("Failed to parse TOML from file: {}", path.display()))
}

fn expand_config_paths(config: &mut Config) {
    debug!("Expanding paths in configuration...");
    for path in [
        &mut config.environment.env_file,
        &mut config.environment.secret_file,
    ]
    .into_iter()
    .flatten()
    {
        *path = shellexpand::tilde(path.as_str()).into_owned();
    }
    config.engine.daemon_config_path =
        shellexpand::tilde(&config.engine.daemon_config_path).into_owned();
}

fn validate_config(config: &Config) -> Result<()> {
    let invalid = |msg: String| -> Result<()> { Err(anyhow!(RunnerError::Config(msg))) };

    if config.container.image.trim().is_empty() {
        return invalid("container.image cannot be empty.".to_string());
    }
    if config.container.host_port == 0 || config.container.container_port == 0 {
        return invalid(format!(
            "Invalid port mapping {}:{}. Ports must be between 1 and 65535.",
            config.container.host_port, config.container.container_port
        ));
    }
    if config.engine.binary.trim().is_empty() {
        return invalid("engine.binary cannot be empty.".to_string());
    }
    if config.engine.readiness_retries == 0 {
        return invalid("engine.readiness_retries must be at least 1.".to_string());
    }
    match (&config.engine.http_proxy, &config.engine.https_proxy) {
        (Some(_), None) | (None, Some(_)) => {
            return invalid(
                "engine.http_proxy and engine.https_proxy must be set together.".to_string(),
            )
        }
        (Some(http), Some(https)) if http.is_empty() || https.is_empty() => {
            return invalid("Engine proxy settings cannot be empty strings.".to_string())
        }
        _ => {}
    }
    if config.database.uri_variable.trim().is_empty() {
        return invalid("database.uri_variable cannot be empty.".to_string());
    }
    Ok(())
}
