//! Run session state and the terminal run report.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::issue::{Issue, IssueKind};

/// Terminal status of a healing run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStatus {
    Running,
    Passed,
    Failed,
}

/// Phase of the healing loop, tracked for logging and the run record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HealState {
    Init,
    Testing,
    Diagnosing,
    Repairing,
    Done,
}

/// One accepted fix, recorded when a repaired file is written back.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppliedFix {
    pub file: String,
    pub kind: IssueKind,
    pub iteration: u32,
    pub summary: String,
}

/// Ephemeral state for one healing run. Created at run start, mutated by
/// the controller each iteration, discarded after the report is produced.
#[derive(Debug, Clone)]
pub struct RunSession {
    pub run_id: String,
    pub repo_url: Option<String>,
    pub work_dir: PathBuf,
    pub branch: String,
    pub iteration: u32,
    pub applied_fixes: Vec<AppliedFix>,
    pub status: RunStatus,
    pub state: HealState,
    pub started_at: DateTime<Utc>,
}

impl RunSession {
    pub fn new(run_id: String, repo_url: Option<String>, work_dir: PathBuf, branch: String) -> Self {
        Self {
            run_id,
            repo_url,
            work_dir,
            branch,
            iteration: 0,
            applied_fixes: Vec::new(),
            status: RunStatus::Running,
            state: HealState::Init,
            started_at: Utc::now(),
        }
    }

    pub fn record_fix(&mut self, file: String, kind: IssueKind, summary: String) {
        self.applied_fixes.push(AppliedFix {
            file,
            kind,
            iteration: self.iteration,
            summary,
        });
    }
}

/// Terminal summary of a run, for any external reporting layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub branch_name: String,
    pub total_open_failures: usize,
    pub total_fixes_applied: usize,
    pub status: RunStatus,
    pub issues: Vec<Issue>,
}
