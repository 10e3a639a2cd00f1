//! # Container Runner Core Infrastructure
//!
//! File: cli/src/core/mod.rs
//!
//! ## Overview
//!
//! Foundational pieces shared by the engine adapter, the reconciler, and the
//! command handlers:
//! - `config`: Configuration loading, path expansion, and validation
//! - `error`: The typed `RunnerError` and the `Result` aliases
//!
pub mod config;
pub mod error;
