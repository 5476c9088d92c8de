//! Issue records and their identity semantics.
//!
//! An [`Issue`] is a single localized defect. Two issues with the same
//! `(file, kind, line)` key are the same defect across iterations; `line 0`
//! is the "unknown line" sentinel and serves as a fallback match for oracles
//! that cannot pinpoint a line number.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Classification of a defect, as reported by the diagnostic oracle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IssueKind {
    Linting,
    Syntax,
    Logic,
    TypeError,
    Import,
    Indentation,
    Runtime,
}

impl IssueKind {
    /// Parse an oracle-supplied kind string. Unknown kinds yield `None`
    /// rather than a coerced default so they never poison the dedup key.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "LINTING" => Some(Self::Linting),
            "SYNTAX" => Some(Self::Syntax),
            "LOGIC" => Some(Self::Logic),
            "TYPE_ERROR" => Some(Self::TypeError),
            "IMPORT" => Some(Self::Import),
            "INDENTATION" => Some(Self::Indentation),
            "RUNTIME" => Some(Self::Runtime),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Linting => "LINTING",
            Self::Syntax => "SYNTAX",
            Self::Logic => "LOGIC",
            Self::TypeError => "TYPE_ERROR",
            Self::Import => "IMPORT",
            Self::Indentation => "INDENTATION",
            Self::Runtime => "RUNTIME",
        }
    }
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle status of an issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IssueStatus {
    Open,
    Fixed,
    FailedFileNotFound,
    FailedGeneration,
}

impl IssueStatus {
    /// Terminal per-issue failure: kept for audit, never re-queued.
    pub fn is_terminal_failure(&self) -> bool {
        matches!(self, Self::FailedFileNotFound | Self::FailedGeneration)
    }
}

/// Identity key of an issue: `(file, kind, line)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IssueKey {
    pub file: String,
    pub kind: IssueKind,
    pub line: u32,
}

impl IssueKey {
    pub fn new(file: impl Into<String>, kind: IssueKind, line: u32) -> Self {
        Self {
            file: file.into(),
            kind,
            line,
        }
    }

    /// The same key with the line number erased, used for the fallback
    /// match against line-blind oracle reports.
    pub fn line_blind(&self) -> Self {
        Self {
            file: self.file.clone(),
            kind: self.kind,
            line: 0,
        }
    }
}

impl fmt::Display for IssueKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.kind, self.line)
    }
}

/// A defect as reported by the diagnostic oracle, before it enters the ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveredIssue {
    /// Repository-relative path, never absolute, never inside a dependency
    /// directory (the oracle layer enforces this before construction).
    pub file: String,
    pub kind: IssueKind,
    /// `0` means the oracle could not pinpoint a line.
    pub line: u32,
    pub description: String,
}

impl DiscoveredIssue {
    pub fn key(&self) -> IssueKey {
        IssueKey::new(self.file.clone(), self.kind, self.line)
    }
}

/// How a repair attempt for an issue concluded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Fixed,
    FileNotFound,
    GenerationFailed,
}

/// A single defect record tracked across healing iterations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    pub file: String,
    pub kind: IssueKind,
    pub line: u32,
    pub description: String,
    pub status: IssueStatus,
    /// Iteration number at which the issue was first discovered.
    pub discovered_at: u32,
    /// Set if and only if `status == Fixed`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fixed_at: Option<DateTime<Utc>>,
}

impl Issue {
    /// Create a freshly discovered, open issue.
    pub fn open(discovered: DiscoveredIssue, iteration: u32) -> Self {
        Self {
            file: discovered.file,
            kind: discovered.kind,
            line: discovered.line,
            description: discovered.description,
            status: IssueStatus::Open,
            discovered_at: iteration,
            fixed_at: None,
        }
    }

    pub fn key(&self) -> IssueKey {
        IssueKey::new(self.file.clone(), self.kind, self.line)
    }

    /// Apply a repair outcome, keeping the `fixed_at` invariant.
    pub fn resolve(&mut self, resolution: Resolution) {
        match resolution {
            Resolution::Fixed => {
                self.status = IssueStatus::Fixed;
                self.fixed_at = Some(Utc::now());
            }
            Resolution::FileNotFound => {
                self.status = IssueStatus::FailedFileNotFound;
                self.fixed_at = None;
            }
            Resolution::GenerationFailed => {
                self.status = IssueStatus::FailedGeneration;
                self.fixed_at = None;
            }
        }
    }

    /// Transition a fixed issue back to open after rediscovery.
    pub fn reopen(&mut self) {
        self.status = IssueStatus::Open;
        self.fixed_at = None;
        self.description
            .push_str(" [reopened: previous fix failed]");
    }
}
