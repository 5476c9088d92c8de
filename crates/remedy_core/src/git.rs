//! Version control collaborator.
//!
//! The healing loop only needs four operations: clone, branch creation,
//! staged commit, and push. They are modeled as a narrow trait so the
//! controller can be exercised against a mock; the real implementation
//! shells out to the `git` CLI.

use std::path::{Path, PathBuf};
use std::process::Command;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::error::{CoreError, CoreResult};

/// Narrow VCS interface used by the healing loop.
#[async_trait]
pub trait Vcs: Send + Sync {
    /// Clone `url` into `dest`.
    async fn clone_repo(&self, url: &str, dest: &Path) -> CoreResult<()>;

    /// Create and check out a new branch in `dir`.
    async fn create_branch(&self, dir: &Path, name: &str) -> CoreResult<()>;

    /// Stage one file and commit it. Returns `false` (not an error) when
    /// there is nothing to commit.
    async fn stage_and_commit(&self, dir: &Path, file: &str, message: &str) -> CoreResult<bool>;

    /// Push `branch` to the default remote.
    async fn push(&self, dir: &Path, branch: &str, force: bool, set_upstream: bool)
        -> CoreResult<()>;
}

/// `git` CLI implementation of [`Vcs`].
#[derive(Debug, Default, Clone)]
pub struct GitCli;

impl GitCli {
    pub fn new() -> Self {
        Self
    }

    /// Check if git is available on the system.
    pub fn is_git_available() -> bool {
        Command::new("git")
            .arg("--version")
            .output()
            .map(|output| output.status.success())
            .unwrap_or(false)
    }

    fn run(dir: Option<&Path>, args: &[&str]) -> CoreResult<std::process::Output> {
        let mut cmd = Command::new("git");
        cmd.args(args);
        if let Some(dir) = dir {
            cmd.current_dir(dir);
        }
        cmd.output()
            .map_err(|e| CoreError::GitError(format!("Failed to run git {:?}: {}", args, e)))
    }
}

#[async_trait]
impl Vcs for GitCli {
    async fn clone_repo(&self, url: &str, dest: &Path) -> CoreResult<()> {
        info!("Cloning {} into {}", url, dest.display());

        let dest_str = dest.to_string_lossy();
        let output = Self::run(None, &["clone", url, &dest_str])?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(CoreError::GitError(format!("git clone failed: {}", stderr)));
        }
        Ok(())
    }

    async fn create_branch(&self, dir: &Path, name: &str) -> CoreResult<()> {
        debug!("Creating branch {} in {}", name, dir.display());

        let output = Self::run(Some(dir), &["checkout", "-b", name])?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(CoreError::GitError(format!(
                "git checkout -b failed: {}",
                stderr
            )));
        }
        Ok(())
    }

    async fn stage_and_commit(&self, dir: &Path, file: &str, message: &str) -> CoreResult<bool> {
        let output = Self::run(Some(dir), &["add", file])?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(CoreError::GitError(format!("git add failed: {}", stderr)));
        }

        let output = Self::run(Some(dir), &["commit", "-m", message])?;
        if !output.status.success() {
            let stdout = String::from_utf8_lossy(&output.stdout);
            let stderr = String::from_utf8_lossy(&output.stderr);
            if stdout.contains("nothing to commit") || stderr.contains("nothing to commit") {
                debug!(file, "nothing to commit, skipping");
                return Ok(false);
            }
            return Err(CoreError::GitError(format!(
                "git commit failed: {}",
                stderr
            )));
        }

        Ok(true)
    }

    async fn push(
        &self,
        dir: &Path,
        branch: &str,
        force: bool,
        set_upstream: bool,
    ) -> CoreResult<()> {
        let mut args = vec!["push"];
        if force {
            args.push("--force");
        }
        if set_upstream {
            args.push("--set-upstream");
        }
        args.push("origin");
        args.push(branch);

        info!("Pushing branch {}", branch);

        let output = Self::run(Some(dir), &args)?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(CoreError::GitError(format!("git push failed: {}", stderr)));
        }
        Ok(())
    }
}

/// Recorded VCS call for mock verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VcsCall {
    Clone { url: String, dest: PathBuf },
    CreateBranch { name: String },
    Commit { file: String, message: String },
    Push { branch: String, force: bool },
}

/// Mock [`Vcs`] implementation for controller tests: captures all calls
/// and can be told to fail specific operations.
#[derive(Debug, Default)]
pub struct MockVcs {
    calls: std::sync::Mutex<Vec<VcsCall>>,
    fail_clone: bool,
    fail_branch: bool,
    fail_push: bool,
}

impl MockVcs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_clone(mut self) -> Self {
        self.fail_clone = true;
        self
    }

    pub fn failing_branch(mut self) -> Self {
        self.fail_branch = true;
        self
    }

    pub fn failing_push(mut self) -> Self {
        self.fail_push = true;
        self
    }

    pub fn calls(&self) -> Vec<VcsCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn commit_count(&self) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| matches!(c, VcsCall::Commit { .. }))
            .count()
    }

    fn record(&self, call: VcsCall) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl Vcs for MockVcs {
    async fn clone_repo(&self, url: &str, dest: &Path) -> CoreResult<()> {
        self.record(VcsCall::Clone {
            url: url.to_string(),
            dest: dest.to_path_buf(),
        });
        if self.fail_clone {
            return Err(CoreError::GitError("mock clone failure".to_string()));
        }
        Ok(())
    }

    async fn create_branch(&self, _dir: &Path, name: &str) -> CoreResult<()> {
        self.record(VcsCall::CreateBranch {
            name: name.to_string(),
        });
        if self.fail_branch {
            return Err(CoreError::GitError("mock branch failure".to_string()));
        }
        Ok(())
    }

    async fn stage_and_commit(&self, _dir: &Path, file: &str, message: &str) -> CoreResult<bool> {
        self.record(VcsCall::Commit {
            file: file.to_string(),
            message: message.to_string(),
        });
        Ok(true)
    }

    async fn push(
        &self,
        _dir: &Path,
        branch: &str,
        force: bool,
        _set_upstream: bool,
    ) -> CoreResult<()> {
        self.record(VcsCall::Push {
            branch: branch.to_string(),
            force,
        });
        if self.fail_push {
            return Err(CoreError::GitError("mock push failure".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_git_available() {
        // This will fail if git is not installed, which is expected
        let available = GitCli::is_git_available();
        println!("Git available: {}", available);
    }

    #[tokio::test]
    async fn test_create_branch_and_commit() {
        if !GitCli::is_git_available() {
            println!("Git not available, skipping test");
            return;
        }

        let temp = TempDir::new().unwrap();
        let dir = temp.path();

        let init = Command::new("git").args(["init"]).current_dir(dir).output().unwrap();
        assert!(init.status.success());
        Command::new("git")
            .args(["config", "user.email", "test@example.com"])
            .current_dir(dir)
            .output()
            .unwrap();
        Command::new("git")
            .args(["config", "user.name", "Test"])
            .current_dir(dir)
            .output()
            .unwrap();

        std::fs::write(dir.join("a.txt"), "hello\n").unwrap();

        let git = GitCli::new();
        let committed = git
            .stage_and_commit(dir, "a.txt", "add a.txt")
            .await
            .unwrap();
        assert!(committed);

        git.create_branch(dir, "remedy/test").await.unwrap();

        // Second commit of an unchanged file is a no-op, not an error.
        let committed = git
            .stage_and_commit(dir, "a.txt", "no changes")
            .await
            .unwrap();
        assert!(!committed);
    }

    #[tokio::test]
    async fn test_mock_vcs_records_calls() {
        let vcs = MockVcs::new();
        vcs.create_branch(Path::new("/tmp"), "remedy/x").await.unwrap();
        vcs.stage_and_commit(Path::new("/tmp"), "src/a.py", "fix: a")
            .await
            .unwrap();

        let calls = vcs.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(vcs.commit_count(), 1);
    }
}
