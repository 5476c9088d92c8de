//! The issue ledger: a deduplicating, reopenable record of known defects.
//!
//! The ledger is owned exclusively by the healing loop for the lifetime of
//! one run; there is never concurrent access. Without the reopen rule a
//! defect whose "fix" still breaks the suite would be silently dropped on
//! the next iteration (its key already exists as FIXED) and the loop would
//! spin re-discovering nothing.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{CoreError, CoreResult};
use crate::issue::{DiscoveredIssue, Issue, IssueKey, IssueStatus, Resolution};

/// What a merge pass did with the oracle's findings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MergeOutcome {
    /// Keys appended as new open entries.
    pub new: Vec<String>,
    /// Keys transitioned FIXED -> OPEN.
    pub reopened: Vec<String>,
}

impl MergeOutcome {
    /// Nothing new and nothing reopened: the failure is not localizable.
    pub fn is_empty(&self) -> bool {
        self.new.is_empty() && self.reopened.is_empty()
    }
}

/// Ordered, deduplicated collection of issues for one run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Ledger {
    issues: Vec<Issue>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a ledger from a persisted snapshot.
    pub fn from_issues(issues: Vec<Issue>) -> Self {
        Self { issues }
    }

    /// Merge newly discovered issues for the given iteration.
    ///
    /// For each finding: an existing FIXED entry with a matching key (exact,
    /// or line-blind fallback) is reopened; an unknown key is appended as a
    /// new OPEN entry; an already-OPEN entry is skipped, so merge is
    /// idempotent. Terminal FAILED_* entries are retained untouched.
    pub fn merge(&mut self, discovered: Vec<DiscoveredIssue>, iteration: u32) -> MergeOutcome {
        let mut outcome = MergeOutcome::default();

        for finding in discovered {
            let key = finding.key();
            let position = self.position_of(&key);

            match position {
                Some(idx) => {
                    let issue = &mut self.issues[idx];
                    match issue.status {
                        IssueStatus::Fixed => {
                            debug!(key = %issue.key(), "reopening previously fixed issue");
                            issue.reopen();
                            outcome.reopened.push(issue.key().to_string());
                        }
                        IssueStatus::Open => {
                            debug!(key = %issue.key(), "issue already queued, skipping");
                        }
                        status if status.is_terminal_failure() => {
                            debug!(key = %issue.key(), ?status, "issue already failed terminally, retained");
                        }
                        _ => {}
                    }
                }
                None => {
                    let issue = Issue::open(finding, iteration);
                    outcome.new.push(issue.key().to_string());
                    self.issues.push(issue);
                }
            }
        }

        if !outcome.is_empty() {
            debug!(
                new = outcome.new.len(),
                reopened = outcome.reopened.len(),
                "ledger merge complete"
            );
        }
        outcome
    }

    /// All OPEN issues in discovery order.
    pub fn open_issues(&self) -> Vec<Issue> {
        self.issues
            .iter()
            .filter(|i| i.status == IssueStatus::Open)
            .cloned()
            .collect()
    }

    /// Record the outcome of a repair attempt for the entry with this key.
    pub fn mark_resolved(&mut self, key: &IssueKey, resolution: Resolution) -> CoreResult<()> {
        match self.issues.iter_mut().find(|i| &i.key() == key) {
            Some(issue) => {
                issue.resolve(resolution);
                Ok(())
            }
            None => {
                warn!(%key, "mark_resolved on unknown key");
                Err(CoreError::IssueNotFound(key.to_string()))
            }
        }
    }

    /// Full snapshot for reporting and persistence.
    pub fn all(&self) -> &[Issue] {
        &self.issues
    }

    pub fn open_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.status == IssueStatus::Open)
            .count()
    }

    pub fn fixed_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.status == IssueStatus::Fixed)
            .count()
    }

    /// Index of the entry matching `key`, trying the exact key first and
    /// falling back to the line-blind variant when the lines disagree.
    fn position_of(&self, key: &IssueKey) -> Option<usize> {
        if let Some(idx) = self.issues.iter().position(|i| &i.key() == key) {
            return Some(idx);
        }
        let blind = key.line_blind();
        self.issues.iter().position(|i| i.key() == blind)
    }
}
