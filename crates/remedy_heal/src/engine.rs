//! The healing loop controller.
//!
//! Drives the iterate-test-diagnose-repair-recheck cycle over one run
//! session: sandbox the project's own check command, ask the diagnostic
//! oracle to localize the failure, merge findings into the ledger, ask the
//! repair oracle to rewrite each open issue's file, and re-test, bounded by
//! a fixed iteration ceiling. Every ledger mutation is persisted before the
//! loop moves on, so a crash mid-run leaves a consistent record.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, error, info, warn};
use uuid::Uuid;
use walkdir::WalkDir;

use remedy_core::{
    HealState, Issue, IssueStatus, Ledger, Resolution, RunRecord, RunReport, RunSession,
    RunStatus, RunStore, Vcs,
};
use remedy_oracle::{bounded_window, DiagnosticOracle, RepairOracle, DEPENDENCY_DIRS};
use remedy_runner::{detect, RuntimeProfile, Sandbox};

use crate::config::HealConfig;
use crate::error::{HealError, HealResult};

/// What to heal: a remote repository or an existing working tree.
#[derive(Debug, Clone)]
pub enum HealTarget {
    Remote { url: String },
    Local { path: PathBuf },
}

/// Source-file extensions worth naming to the diagnostic oracle.
const SOURCE_EXTENSIONS: &[&str] = &["py", "js", "jsx", "ts", "tsx", "mjs", "cjs"];

/// The healing loop controller.
///
/// Single logical thread of control per run: sandbox executions, oracle
/// calls and VCS operations are awaited sequentially, one file repaired at
/// a time, so a regression introduced by fix N is attributable to issue N.
pub struct HealingEngine {
    sandbox: Arc<dyn Sandbox>,
    diagnostic: Arc<dyn DiagnosticOracle>,
    repairer: Arc<dyn RepairOracle>,
    vcs: Arc<dyn Vcs>,
    store: RunStore,
    config: HealConfig,
}

impl HealingEngine {
    pub fn new(
        sandbox: Arc<dyn Sandbox>,
        diagnostic: Arc<dyn DiagnosticOracle>,
        repairer: Arc<dyn RepairOracle>,
        vcs: Arc<dyn Vcs>,
        store: RunStore,
        config: HealConfig,
    ) -> Self {
        Self {
            sandbox,
            diagnostic,
            repairer,
            vcs,
            store,
            config,
        }
    }

    /// Run one healing session to a definite PASSED or FAILED verdict.
    ///
    /// Init-stage failures (clone, branch creation, no runtime profile) are
    /// fatal for the run: no iterations are consumed and the report comes
    /// back FAILED. Everything below the controller is a typed outcome, so
    /// this only errors when the run record itself cannot be persisted.
    pub async fn run(&self, target: HealTarget) -> HealResult<RunReport> {
        let run_id = Uuid::new_v4().to_string()[..8].to_string();
        let branch = format!("remedy/{}", run_id);
        let repo_url = match &target {
            HealTarget::Remote { url } => Some(url.clone()),
            HealTarget::Local { .. } => None,
        };

        info!(run_id, branch, "starting healing run");

        let (mut session, profile) = match self.init(&target, &run_id, &branch).await {
            Ok(ready) => ready,
            Err(e) => {
                error!(run_id, "init failed, run is fatal: {}", e);
                let session = RunSession::new(run_id, repo_url, PathBuf::new(), branch);
                return self.conclude_fatal(session);
            }
        };
        session.repo_url = repo_url;
        let mut ledger = Ledger::new();
        self.persist(&session, &ledger)?;

        info!(
            stack = profile.stack.as_str(),
            command = %profile.shell_command(),
            image = %profile.full_image(),
            "runtime profile detected"
        );

        loop {
            session.iteration += 1;
            if session.iteration > self.config.max_iterations {
                info!(
                    ceiling = self.config.max_iterations,
                    "iteration budget exhausted"
                );
                session.status = RunStatus::Failed;
                break;
            }

            // TESTING
            session.state = HealState::Testing;
            let result = self
                .sandbox
                .execute(
                    &session.work_dir,
                    &profile.shell_command(),
                    &profile.full_image(),
                )
                .await;

            let marker_hit = result.success && profile.output_indicates_failure(&result.output);
            if marker_hit {
                warn!("exit code was 0 but output carries a failure marker, treating as failed");
            }
            if result.success && !marker_hit {
                info!(iteration = session.iteration, "suite is green");
                session.status = RunStatus::Passed;
                break;
            }
            if result.timed_out {
                warn!(iteration = session.iteration, "sandboxed command timed out");
            }

            // DIAGNOSING
            session.state = HealState::Diagnosing;
            let window = bounded_window(&result.output, self.config.output_window_chars);
            let sources = self.source_listing(&session.work_dir);

            let findings = match self.diagnostic.analyze(window, &sources).await {
                Ok(findings) => findings,
                Err(e) => {
                    error!("diagnostic oracle failed: {}", e);
                    session.status = RunStatus::Failed;
                    break;
                }
            };

            let outcome = ledger.merge(findings, session.iteration);
            self.persist(&session, &ledger)?;

            if outcome.is_empty() {
                // The defect is not source-localizable; spinning on it would
                // only burn the remaining budget.
                info!(
                    iteration = session.iteration,
                    "suite failing but no new or reopened issues, abandoning"
                );
                session.status = RunStatus::Failed;
                break;
            }

            info!(
                iteration = session.iteration,
                new = outcome.new.len(),
                reopened = outcome.reopened.len(),
                "issues merged into ledger"
            );

            // REPAIRING
            session.state = HealState::Repairing;
            for issue in ledger.open_issues() {
                let resolution = self.repair_one(&session.work_dir, &issue, window).await;
                ledger.mark_resolved(&issue.key(), resolution)?;
                if resolution == Resolution::Fixed {
                    session.record_fix(
                        issue.file.clone(),
                        issue.kind,
                        truncate(&issue.description, 72),
                    );
                }
                self.persist(&session, &ledger)?;
            }
        }

        self.conclude(session, ledger).await
    }

    /// INIT: acquire the working tree, create the branch, detect the engine.
    async fn init(
        &self,
        target: &HealTarget,
        run_id: &str,
        branch: &str,
    ) -> HealResult<(RunSession, RuntimeProfile)> {
        let work_dir = match target {
            HealTarget::Remote { url } => {
                let dest = self.store.state_dir().join("work").join(run_id);
                if let Some(parent) = dest.parent() {
                    fs::create_dir_all(parent)?;
                }
                self.vcs.clone_repo(url, &dest).await?;
                dest
            }
            HealTarget::Local { path } => path.clone(),
        };

        self.vcs.create_branch(&work_dir, branch).await?;

        let profile = detect(&work_dir).ok_or(HealError::NoRuntimeProfile)?;

        let session = RunSession::new(
            run_id.to_string(),
            None,
            work_dir,
            branch.to_string(),
        );
        Ok((session, profile))
    }

    /// Repair a single open issue, returning its terminal resolution.
    /// Per-issue failures never abort the batch.
    async fn repair_one(&self, work_dir: &Path, issue: &Issue, window: &str) -> Resolution {
        let path = work_dir.join(&issue.file);
        if !path.exists() {
            warn!(file = %issue.file, "target file missing, skipping issue");
            return Resolution::FileNotFound;
        }

        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) => {
                warn!(file = %issue.file, "cannot read target file: {}", e);
                return Resolution::GenerationFailed;
            }
        };

        match self.repairer.repair(issue, &content, window).await {
            Ok(new_content) => match fs::write(&path, new_content) {
                Ok(()) => {
                    info!(file = %issue.file, kind = %issue.kind, "fix applied");
                    Resolution::Fixed
                }
                Err(e) => {
                    warn!(file = %issue.file, "cannot write repaired file: {}", e);
                    Resolution::GenerationFailed
                }
            },
            Err(e) => {
                warn!(file = %issue.file, "repair oracle failed: {}", e);
                Resolution::GenerationFailed
            }
        }
    }

    /// DONE: commit every fixed issue, push the branch, build the report.
    /// The verdict is already decided; commit and push problems are logged
    /// and never escalate.
    async fn conclude(&self, mut session: RunSession, ledger: Ledger) -> HealResult<RunReport> {
        session.state = HealState::Done;

        let mut committed = 0usize;
        for issue in ledger.all().iter().filter(|i| i.status == IssueStatus::Fixed) {
            let message = format!(
                "remedy fix [{}] {}: {}",
                issue.kind,
                issue.file,
                truncate(&issue.description, 72)
            );
            match self
                .vcs
                .stage_and_commit(&session.work_dir, &issue.file, &message)
                .await
            {
                Ok(true) => committed += 1,
                Ok(false) => debug!(file = %issue.file, "nothing to commit for fixed issue"),
                Err(e) => warn!(file = %issue.file, "commit failed: {}", e),
            }
        }

        if self.config.push && committed > 0 {
            if let Err(e) = self
                .vcs
                .push(&session.work_dir, &session.branch, self.config.force_push, true)
                .await
            {
                warn!("push failed, verdict unchanged: {}", e);
            }
        }

        self.persist(&session, &ledger)?;

        let report = RunReport {
            branch_name: session.branch.clone(),
            total_open_failures: ledger.open_count(),
            total_fixes_applied: session.applied_fixes.len(),
            status: session.status,
            issues: ledger.all().to_vec(),
        };

        info!(
            status = ?report.status,
            fixes = report.total_fixes_applied,
            open = report.total_open_failures,
            "healing run concluded"
        );
        Ok(report)
    }

    /// Terminal path for init-stage failures: FAILED, zero iterations.
    fn conclude_fatal(&self, mut session: RunSession) -> HealResult<RunReport> {
        session.status = RunStatus::Failed;
        session.state = HealState::Done;
        self.persist(&session, &Ledger::new())?;

        Ok(RunReport {
            branch_name: session.branch,
            total_open_failures: 0,
            total_fixes_applied: 0,
            status: RunStatus::Failed,
            issues: Vec::new(),
        })
    }

    /// Write the full run record. Called immediately after every merge and
    /// every per-issue resolution.
    fn persist(&self, session: &RunSession, ledger: &Ledger) -> HealResult<()> {
        let record = RunRecord {
            run_id: session.run_id.clone(),
            repo_url: session.repo_url.clone(),
            branch_name: session.branch.clone(),
            status: session.status,
            start_time: session.started_at,
            issues: ledger.all().to_vec(),
        };
        self.store.save(&record)?;
        Ok(())
    }

    /// Repository-relative source paths for the diagnostic oracle, skipping
    /// hidden and dependency directories.
    fn source_listing(&self, work_dir: &Path) -> Vec<String> {
        let mut files = Vec::new();
        let walker = WalkDir::new(work_dir).into_iter().filter_entry(|entry| {
            let name = entry.file_name().to_string_lossy();
            if entry.depth() == 0 {
                return true;
            }
            !name.starts_with('.') && !DEPENDENCY_DIRS.contains(&name.as_ref())
        });

        for entry in walker.filter_map(|e| e.ok()) {
            if !entry.file_type().is_file() {
                continue;
            }
            let is_source = entry
                .path()
                .extension()
                .and_then(|e| e.to_str())
                .map_or(false, |ext| SOURCE_EXTENSIONS.contains(&ext));
            if !is_source {
                continue;
            }
            if let Ok(relative) = entry.path().strip_prefix(work_dir) {
                files.push(relative.to_string_lossy().replace('\\', "/"));
            }
            if files.len() >= self.config.max_source_hints {
                break;
            }
        }

        files.sort();
        files
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    text.chars().take(max_chars).collect()
}
