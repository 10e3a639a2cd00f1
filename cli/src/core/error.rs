//! # Container Runner Error Types
//!
//! File: cli/src/core/error.rs
//!
//! ## Overview
//!
//! This module defines the error types used throughout the operator. Two layers
//! consume them differently:
//!
//! - The engine adapter and the reconciler return `EngineResult<T>`, whose error
//!   is the typed `RunnerError`. Callers branch on the variant (for example, a
//!   `ContainerNotFound` during observation means "absent", not "failed").
//! - Helpers outside the engine path (such as `.env` parsing) return
//!   `RunnerResult<T>`, the same typed error without the engine connotation.
//! - The command layer uses `Result<T>` (an alias for `anyhow::Result<T>`) so it
//!   can attach context while still letting `main` print a single message.
//!
//! ## Examples
//!
//! ```rust
//! match engine.inspect(name, Some(STATUS_TEMPLATE)).await {
//!     Ok(status) => println!("status: {}", status.trim()),
//!     Err(e) if e.stderr().is_some_and(is_not_found_error) => println!("absent"),
//!     Err(e) => return Err(e),
//! }
//! ```
//!
use thiserror::Error;

/// Custom error type for the container runner.
#[derive(Error, Debug)]
pub enum RunnerError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Filesystem error: {0}")]
    FileSystem(String),

    #[error("Environment error: {0}")]
    Environment(String),

    /// The engine never answered its liveness probe inside the retry window.
    #[error("Container engine did not become ready in time (after {attempts} attempts)")]
    EngineUnavailable { attempts: u32 },

    /// An engine invocation ran but exited non-zero. The raw output is kept so
    /// callers can classify the failure (see `engine::is_not_found_error`).
    #[error("Engine command `{command}` failed (exit code {}): {}", display_exit_code(.exit_code), trimmed(.stderr))]
    EngineCommandFailed {
        command: String,
        exit_code: Option<i32>,
        stdout: String,
        stderr: String,
    },

    /// The engine binary could not be executed at all.
    #[error("Failed to execute `{command}`: {source}")]
    EngineSpawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Container '{name}' not found.")]
    ContainerNotFound { name: String },
}

impl RunnerError {
    /// Raw stderr of a failed engine command, if this error carries one.
    pub fn stderr(&self) -> Option<&str> {
        match self {
            RunnerError::EngineCommandFailed { stderr, .. } => Some(stderr),
            _ => None,
        }
    }
}

fn display_exit_code(code: &Option<i32>) -> String {
    code.map_or_else(|| "none".to_string(), |c| c.to_string())
}

fn trimmed(text: &str) -> &str {
    text.trim()
}

/// Result type returned by the engine adapter and the reconciler.
pub type EngineResult<T> = std::result::Result<T, RunnerError>;

/// Result type for typed failures that do not involve the engine.
pub type RunnerResult<T> = std::result::Result<T, RunnerError>;

/// Type alias for Result using anyhow::Error, used by the command layer.
pub type Result<T> = anyhow::Result<T>;
