//! # remedy_core
//!
//! Core data model for remedy: issue records, the deduplicating issue
//! ledger, run sessions and reports, durable run-record persistence, and
//! the version-control collaborator interface.
//!
//! The ledger is the structural heart of the healing loop: it guarantees
//! that a defect rediscovered across iterations maps to exactly one entry,
//! and that a "fixed" defect which resurfaces is reopened rather than
//! silently dropped.

pub mod error;
pub mod git;
pub mod issue;
pub mod ledger;
pub mod session;
pub mod store;

pub use error::{CoreError, CoreResult};
pub use git::{GitCli, MockVcs, Vcs, VcsCall};
pub use issue::{DiscoveredIssue, Issue, IssueKey, IssueKind, IssueStatus, Resolution};
pub use ledger::{Ledger, MergeOutcome};
pub use session::{AppliedFix, HealState, RunReport, RunSession, RunStatus};
pub use store::{RunRecord, RunStore};
