//! Durable run-record persistence.
//!
//! Each run is a single JSON document under `<state_dir>/runs/<run_id>.json`,
//! re-written in full after every ledger mutation. One run has exactly one
//! writer, so the whole-document rewrite is the read-modify-write
//! transaction; a crash mid-run leaves a consistent, auditable record.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{CoreError, CoreResult};
use crate::issue::Issue;
use crate::session::RunStatus;

/// The persisted shape of one healing run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunRecord {
    pub run_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repo_url: Option<String>,
    pub branch_name: String,
    pub status: RunStatus,
    pub start_time: DateTime<Utc>,
    pub issues: Vec<Issue>,
}

/// Filesystem store for run records.
#[derive(Debug, Clone)]
pub struct RunStore {
    state_dir: PathBuf,
}

impl RunStore {
    pub fn new(state_dir: impl AsRef<Path>) -> Self {
        Self {
            state_dir: state_dir.as_ref().to_path_buf(),
        }
    }

    pub fn state_dir(&self) -> &Path {
        &self.state_dir
    }

    fn runs_dir(&self) -> PathBuf {
        self.state_dir.join("runs")
    }

    fn record_path(&self, run_id: &str) -> PathBuf {
        self.runs_dir().join(format!("{}.json", run_id))
    }

    /// Persist the full record, creating the runs directory on first use.
    pub fn save(&self, record: &RunRecord) -> CoreResult<()> {
        let dir = self.runs_dir();
        fs::create_dir_all(&dir)?;

        let path = self.record_path(&record.run_id);
        let content = serde_json::to_string_pretty(record)?;
        fs::write(&path, content)?;

        debug!(run_id = %record.run_id, path = %path.display(), "run record persisted");
        Ok(())
    }

    pub fn load(&self, run_id: &str) -> CoreResult<RunRecord> {
        let path = self.record_path(run_id);
        if !path.exists() {
            return Err(CoreError::RunNotFound(run_id.to_string()));
        }

        let content = fs::read_to_string(&path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// All persisted runs, newest first. Unreadable files are skipped.
    pub fn list(&self) -> CoreResult<Vec<RunRecord>> {
        let dir = self.runs_dir();
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut records = Vec::new();
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().map_or(false, |e| e == "json") {
                let content = fs::read_to_string(&path)?;
                if let Ok(record) = serde_json::from_str::<RunRecord>(&content) {
                    records.push(record);
                }
            }
        }

        records.sort_by(|a, b| b.start_time.cmp(&a.start_time));
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::issue::{DiscoveredIssue, Issue, IssueKind};
    use tempfile::tempdir;

    fn record(run_id: &str) -> RunRecord {
        RunRecord {
            run_id: run_id.to_string(),
            repo_url: Some("https://example.com/repo.git".to_string()),
            branch_name: format!("remedy/{}", run_id),
            status: RunStatus::Running,
            start_time: Utc::now(),
            issues: vec![Issue::open(
                DiscoveredIssue {
                    file: "src/a.py".to_string(),
                    kind: IssueKind::Syntax,
                    line: 8,
                    description: "missing colon".to_string(),
                },
                1,
            )],
        }
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let temp = tempdir().unwrap();
        let store = RunStore::new(temp.path());

        let rec = record("run-a");
        store.save(&rec).unwrap();

        let loaded = store.load("run-a").unwrap();
        assert_eq!(loaded.run_id, "run-a");
        assert_eq!(loaded.issues.len(), 1);
        assert_eq!(loaded.issues[0].line, 8);
    }

    #[test]
    fn test_save_overwrites_previous_snapshot() {
        let temp = tempdir().unwrap();
        let store = RunStore::new(temp.path());

        let mut rec = record("run-b");
        store.save(&rec).unwrap();

        rec.status = RunStatus::Passed;
        store.save(&rec).unwrap();

        let loaded = store.load("run-b").unwrap();
        assert_eq!(loaded.status, RunStatus::Passed);
    }

    #[test]
    fn test_load_missing_run_errors() {
        let temp = tempdir().unwrap();
        let store = RunStore::new(temp.path());
        assert!(matches!(
            store.load("missing"),
            Err(CoreError::RunNotFound(_))
        ));
    }

    #[test]
    fn test_list_returns_all_records() {
        let temp = tempdir().unwrap();
        let store = RunStore::new(temp.path());

        store.save(&record("run-1")).unwrap();
        store.save(&record("run-2")).unwrap();

        let records = store.list().unwrap();
        assert_eq!(records.len(), 2);
    }
}
