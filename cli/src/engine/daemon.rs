//! # Engine Daemon Configuration
//!
//! File: cli/src/engine/daemon.rs
//!
//! Writes the proxy section of the engine daemon's JSON configuration so that
//! image pulls performed by the daemon go through the configured proxy. Other
//! keys already present in the file are preserved.
//!
use crate::core::config::ProxyConfig;
use crate::core::error::{EngineResult, RunnerError};
use serde_json::{json, Map, Value};
use std::fs;
use std::path::Path;
use tracing::{info, warn};

/// Sets `proxies.http-proxy` / `proxies.https-proxy` in the daemon config at `path`.
///
/// Parent directories are created as needed. The daemon must be restarted by
/// the host for the change to take effect.
///
/// ## Arguments
///
/// * `path` - Location of the daemon's `daemon.json`. It need not exist yet.
/// * `proxy` - The HTTP and HTTPS proxy URLs to write.
///
/// ## Returns
///
/// * `EngineResult<()>` - `Ok` once the merged file has been written.
///
/// ## Errors
///
/// * `RunnerError::Config` - Either proxy URL is an empty string.
/// * `RunnerError::FileSystem` - The directory or file cannot be written.
pub fn write_proxy_config(path: &Path, proxy: &ProxyConfig) -> EngineResult<()> {
    if proxy.http_proxy.is_empty() {
        return Err(RunnerError::Config("http_proxy cannot be \"\"".to_string()));
    }
    if proxy.https_proxy.is_empty() {
        return Err(RunnerError::Config("https_proxy cannot be \"\"".to_string()));
    }

    let mut document = read_existing(path);
    document.insert(
        "proxies".to_string(),
        json!({
            "http-proxy": proxy.http_proxy,
            "https-proxy": proxy.https_proxy,
        }),
    );

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| {
            RunnerError::FileSystem(format!(
                "Failed to create directory {}: {}",
                parent.display(),
                e
            ))
        })?;
    }
    let rendered = serde_json::to_string_pretty(&Value::Object(document)).map_err(|e| {
        RunnerError::FileSystem(format!("Failed to render daemon configuration: {}", e))
    })?;
    fs::write(path, rendered).map_err(|e| {
        RunnerError::FileSystem(format!("Failed to write {}: {}", path.display(), e))
    })?;
    info!("Engine proxy configuration written to {}", path.display());
    Ok(())
}

fn read_existing(path: &Path) -> Map<String, Value> {
    let Ok(content) = fs::read_to_string(path) else {
        return Map::new();
    };
    match serde_json::from_str::<Value>(&content) {
        Ok(Value::Object(map)) => map,
        _ => {
            warn!(
                "Existing daemon configuration at {} is not a JSON object, replacing it.",
                path.display()
            );
            Map::new()
        }
    }
}
