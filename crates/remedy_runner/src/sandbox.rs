//! Sandbox trait and execution result.

use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Result of one sandboxed execution.
///
/// `success` is derived strictly from the process exit code. Infrastructure
/// problems (no runtime, image unavailable, transfer failure) surface as a
/// failed result with a descriptive message in `output`, never as an error:
/// the healing loop treats them exactly like a failing test run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SandboxResult {
    /// Process exit code was exactly zero.
    pub success: bool,
    /// Combined stdout and stderr, interleaved. Ordering between the two
    /// streams is not guaranteed, total capture is.
    pub output: String,
    /// The per-command timeout expired before the process exited.
    pub timed_out: bool,
    /// Wall-clock duration in milliseconds.
    pub duration_ms: u64,
}

impl SandboxResult {
    pub fn from_exit(exit_code: i64, output: String, duration_ms: u64) -> Self {
        Self {
            success: exit_code == 0,
            output,
            timed_out: false,
            duration_ms,
        }
    }

    pub fn infrastructure_failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            output: message.into(),
            timed_out: false,
            duration_ms: 0,
        }
    }

    pub fn timeout(timeout_secs: u64, output: String, duration_ms: u64) -> Self {
        Self {
            success: false,
            output: format!(
                "{}\n[remedy] execution timed out after {}s",
                output, timeout_secs
            ),
            timed_out: true,
            duration_ms,
        }
    }
}

/// An isolated, disposable execution environment.
///
/// Implementations must tear the environment down on every exit path of
/// `execute`, with cleanup errors logged but never propagated.
#[async_trait]
pub trait Sandbox: Send + Sync {
    /// Check whether the backing runtime is reachable.
    async fn is_available(&self) -> bool;

    /// Transfer `tree` into a fresh environment built from `image`, run
    /// `command` as a single shell invocation, and capture the outcome.
    async fn execute(&self, tree: &Path, command: &str, image: &str) -> SandboxResult;
}
