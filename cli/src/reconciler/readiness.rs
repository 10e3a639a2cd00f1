//! # Engine Readiness Wait
//!
//! File: cli/src/reconciler/readiness.rs
//!
//! Bounded poll of the engine's liveness call, used once during `install`
//! right after the engine package has been put in place. This is the only
//! timed retry in the reconciler.
//!
use crate::core::error::{EngineResult, RunnerError};
use crate::engine::ContainerEngine;
use std::time::Duration;
use tracing::{info, instrument, warn};

/// How many liveness probes to make and how long to sleep between them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadinessPolicy {
    pub retries: u32,
    pub delay: Duration,
}

impl Default for ReadinessPolicy {
    fn default() -> Self {
        Self {
            retries: 10,
            delay: Duration::from_secs(3),
        }
    }
}

/// Polls `engine.info()` until it succeeds or `policy.retries` attempts fail.
///
/// Sleeps `policy.delay` between attempts (never after the last one).
///
/// ## Arguments
///
/// * `engine` - The engine to probe.
/// * `policy` - Attempt count and delay between attempts.
///
/// ## Errors
///
/// * `RunnerError::EngineUnavailable` - Every one of `policy.retries`
///   attempts failed.
#[instrument(skip(engine))]
pub async fn wait_for_engine<E: ContainerEngine + ?Sized>(
    engine: &E,
    policy: ReadinessPolicy,
) -> EngineResult<()> {
    for attempt in 1..=policy.retries {
        match engine.info().await {
            Ok(_) => {
                info!("Container engine is ready (attempt {}).", attempt);
                return Ok(());
            }
            Err(e) => {
                warn!(
                    "Container engine is not ready (attempt {}/{}): {}",
                    attempt, policy.retries, e
                );
                if attempt < policy.retries {
                    tokio::time::sleep(policy.delay).await;
                }
            }
        }
    }
    Err(RunnerError::EngineUnavailable {
        attempts: policy.retries,
    })
}
