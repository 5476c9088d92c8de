//! Mock sandbox for testing.
//!
//! Captures all calls and returns scripted results, so the healing loop can
//! be exercised without a container runtime.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::sandbox::{Sandbox, SandboxResult};

/// Captured call information for verification.
#[derive(Debug, Clone)]
pub struct CapturedExecution {
    pub tree: PathBuf,
    pub command: String,
    pub image: String,
}

/// Scripted sandbox: each `execute` call consumes the next result; when the
/// script runs out, the last result repeats.
#[derive(Clone)]
pub struct MockSandbox {
    available: Arc<RwLock<bool>>,
    results: Arc<RwLock<Vec<SandboxResult>>>,
    next_index: Arc<AtomicUsize>,
    captured: Arc<RwLock<Vec<CapturedExecution>>>,
}

impl Default for MockSandbox {
    fn default() -> Self {
        Self::new()
    }
}

impl MockSandbox {
    pub fn new() -> Self {
        Self {
            available: Arc::new(RwLock::new(true)),
            results: Arc::new(RwLock::new(Vec::new())),
            next_index: Arc::new(AtomicUsize::new(0)),
            captured: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub fn set_available(self, available: bool) -> Self {
        *self.available.write() = available;
        self
    }

    /// Append a scripted result.
    pub fn push_result(self, result: SandboxResult) -> Self {
        self.results.write().push(result);
        self
    }

    pub fn with_results(self, results: Vec<SandboxResult>) -> Self {
        *self.results.write() = results;
        self
    }

    pub fn executions(&self) -> Vec<CapturedExecution> {
        self.captured.read().clone()
    }

    pub fn execution_count(&self) -> usize {
        self.captured.read().len()
    }

    fn next_result(&self) -> SandboxResult {
        let results = self.results.read();
        if results.is_empty() {
            return SandboxResult::from_exit(0, String::new(), 1);
        }
        let index = self.next_index.fetch_add(1, Ordering::SeqCst);
        results
            .get(index.min(results.len() - 1))
            .cloned()
            .unwrap_or_else(|| SandboxResult::from_exit(0, String::new(), 1))
    }
}

#[async_trait]
impl Sandbox for MockSandbox {
    async fn is_available(&self) -> bool {
        *self.available.read()
    }

    async fn execute(&self, tree: &Path, command: &str, image: &str) -> SandboxResult {
        self.captured.write().push(CapturedExecution {
            tree: tree.to_path_buf(),
            command: command.to_string(),
            image: image.to_string(),
        });
        self.next_result()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_sandbox_scripted_results() {
        let sandbox = MockSandbox::new().with_results(vec![
            SandboxResult::from_exit(1, "red".to_string(), 5),
            SandboxResult::from_exit(0, "green".to_string(), 5),
        ]);

        let first = sandbox
            .execute(Path::new("/tmp/tree"), "npm run test", "node:20-slim")
            .await;
        assert!(!first.success);

        let second = sandbox
            .execute(Path::new("/tmp/tree"), "npm run test", "node:20-slim")
            .await;
        assert!(second.success);

        // Script exhausted: last result repeats.
        let third = sandbox
            .execute(Path::new("/tmp/tree"), "npm run test", "node:20-slim")
            .await;
        assert!(third.success);
    }

    #[tokio::test]
    async fn test_mock_sandbox_captures_calls() {
        let sandbox = MockSandbox::new();

        let _ = sandbox
            .execute(Path::new("/work"), "python -m pytest -v", "python:3.12-slim")
            .await;

        let calls = sandbox.executions();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].command, "python -m pytest -v");
        assert_eq!(calls[0].image, "python:3.12-slim");
    }
}
