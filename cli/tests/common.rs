//! # Container Runner Integration Test Common Helpers
//!
//! File: cli/tests/common.rs
//!
//! ## Overview
//!
//! Shared fixtures for the integration tests: a handle on the compiled
//! `container-runner` binary and a sandbox holding a configuration file plus a
//! shell script that stands in for the engine CLI. The script appends its
//! argv to a log file and answers `inspect` from per-container state files,
//! failing with "No such object" for anything it does not know about.
//!

// Different test files use different helpers.
#![allow(dead_code)]

pub use assert_cmd::Command;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// `assert_cmd::Command` for the compiled `container-runner` binary.
pub fn runner_cmd() -> Command {
    Command::cargo_bin("container-runner").expect("Failed to find container-runner binary")
}

/// A temporary directory with a stand-in engine and a configuration file.
pub struct Sandbox {
    pub dir: TempDir,
}

impl Sandbox {
    pub fn new() -> Self {
        let sandbox = Self {
            dir: tempfile::tempdir().expect("Failed to create sandbox"),
        };
        fs::create_dir_all(sandbox.state_dir()).expect("Failed to create state dir");
        sandbox.write_engine_script();
        sandbox
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn engine_path(&self) -> PathBuf {
        self.path().join("fake-docker")
    }

    pub fn log_path(&self) -> PathBuf {
        self.path().join("engine.log")
    }

    pub fn config_path(&self) -> PathBuf {
        self.path().join("container-runner.toml")
    }

    fn state_dir(&self) -> PathBuf {
        self.path().join("state")
    }

    /// Makes `inspect` report `status` for the named container or image.
    pub fn set_container_state(&self, name: &str, status: &str) {
        let path = self.state_dir().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("Failed to create state dir");
        }
        fs::write(path, status).expect("Failed to write container state");
    }

    /// Writes the configuration file. `extra` is appended verbatim after the
    /// `[container]` and `[engine]` tables.
    pub fn write_config(&self, extra: &str) {
        let config = format!(
            r#"[container]
image = "app:v1"
host_port = 8080
container_port = 80

[engine]
binary = "{}"
install_package = ""
readiness_retries = 2
readiness_delay_secs = 0
daemon_config_path = "{}"

{}
"#,
            self.engine_path().display(),
            self.path().join("daemon.json").display(),
            extra
        );
        fs::write(self.config_path(), config).expect("Failed to write config");
    }

    /// Every engine invocation so far, one argv line each.
    pub fn engine_calls(&self) -> Vec<String> {
        match fs::read_to_string(self.log_path()) {
            Ok(content) => content.lines().map(str::to_string).collect(),
            Err(_) => Vec::new(),
        }
    }

    pub fn cmd(&self) -> Command {
        let mut cmd = runner_cmd();
        cmd.arg("--config")
            .arg(self.config_path())
            .env_remove("CONTAINER_RUNNER_CONFIG")
            .env_remove("RUST_LOG");
        cmd
    }

    fn write_engine_script(&self) {
        let script = format!(
            r#"#!/bin/sh
echo "$*" >> '{log}'
case "$1" in
  inspect)
    for target; do :; done
    state='{state}'/"$target"
    if [ ! -f "$state" ]; then
      echo "Error: No such object: $target" >&2
      exit 1
    fi
    case "$3" in
      *Running*) if [ "$(cat "$state")" = running ]; then echo true; else echo false; fi ;;
      *) cat "$state"; echo ;;
    esac
    ;;
esac
exit 0
"#,
            log = self.log_path().display(),
            state = self.state_dir().display()
        );
        let path = self.engine_path();
        fs::write(&path, script).expect("Failed to write engine script");
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&path, fs::Permissions::from_mode(0o755))
                .expect("Failed to make engine script executable");
        }
    }
}
