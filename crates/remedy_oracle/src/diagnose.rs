//! Diagnostic oracle: localize failures to source files.
//!
//! The oracle receives the sandbox output (bounded to a fixed character
//! window) plus a listing of known source paths, and returns candidate
//! issues. Findings with absolute paths, path traversal, dependency-directory
//! paths, or kinds outside the closed set are dropped before they can reach
//! the ledger.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use remedy_core::{DiscoveredIssue, IssueKind};

use crate::error::{OracleError, OracleResult};
use crate::llm::LlmAdapter;

/// Maximum characters of sandbox output passed to the oracle.
pub const MAX_OUTPUT_CHARS: usize = 12_000;

/// Directories that hold third-party code; findings inside them are noise.
pub const DEPENDENCY_DIRS: &[&str] = &[
    "node_modules",
    "venv",
    ".venv",
    "site-packages",
    "__pycache__",
    "target",
    "dist",
    ".git",
];

/// A collaborator that localizes failures from raw test/build output.
#[async_trait]
pub trait DiagnosticOracle: Send + Sync {
    async fn analyze(
        &self,
        output: &str,
        source_files: &[String],
    ) -> OracleResult<Vec<DiscoveredIssue>>;
}

const SYSTEM_PROMPT: &str = "You are a build-failure analyst. Given test or build output \
and a list of project source files, identify the defects that caused the failure. \
Respond with a JSON array only, no prose, no code fences. Each element: \
{\"file\": \"<repository-relative path>\", \"kind\": \"<LINTING|SYNTAX|LOGIC|TYPE_ERROR|IMPORT|INDENTATION|RUNTIME>\", \
\"line\": <number, 0 if unknown>, \"description\": \"<one-sentence explanation>\"}. \
Only name files from the provided listing. Never name files inside dependency \
directories such as node_modules or site-packages.";

/// LLM-backed diagnostic oracle.
pub struct LlmDiagnosticOracle {
    adapter: LlmAdapter,
}

impl LlmDiagnosticOracle {
    pub fn new(adapter: LlmAdapter) -> Self {
        Self { adapter }
    }

    pub fn from_env() -> OracleResult<Self> {
        Ok(Self::new(LlmAdapter::from_env()?))
    }
}

#[async_trait]
impl DiagnosticOracle for LlmDiagnosticOracle {
    async fn analyze(
        &self,
        output: &str,
        source_files: &[String],
    ) -> OracleResult<Vec<DiscoveredIssue>> {
        let window = bounded_window(output, MAX_OUTPUT_CHARS);
        let user = format!(
            "Source files:\n{}\n\nTest/build output:\n{}",
            source_files.join("\n"),
            window
        );

        let response = self.adapter.complete(SYSTEM_PROMPT, &user).await?;
        let findings = parse_findings(&response)?;
        debug!(count = findings.len(), "diagnostic oracle returned findings");
        Ok(findings)
    }
}

#[derive(Debug, Deserialize)]
struct RawFinding {
    file: String,
    kind: String,
    #[serde(default)]
    line: i64,
    #[serde(default)]
    description: String,
}

/// Parse and validate the oracle's JSON response, dropping unusable entries.
pub fn parse_findings(response: &str) -> OracleResult<Vec<DiscoveredIssue>> {
    let body = strip_code_fences(response);
    let raw: Vec<RawFinding> = serde_json::from_str(body).map_err(|e| {
        OracleError::InvalidResponse(format!("expected a JSON array of findings: {}", e))
    })?;

    let mut findings = Vec::new();
    for entry in raw {
        if let Some(finding) = validate_finding(entry) {
            findings.push(finding);
        }
    }
    Ok(findings)
}

fn validate_finding(raw: RawFinding) -> Option<DiscoveredIssue> {
    let file = raw.file.trim().trim_start_matches("./").to_string();

    if file.is_empty() || file.starts_with('/') || file.contains(':') {
        warn!(file = %raw.file, "dropping finding with non-relative path");
        return None;
    }
    let components: Vec<&str> = file.split('/').collect();
    if components.iter().any(|c| *c == "..") {
        warn!(file = %raw.file, "dropping finding with path traversal");
        return None;
    }
    if components
        .iter()
        .any(|c| DEPENDENCY_DIRS.contains(c))
    {
        warn!(file = %raw.file, "dropping finding inside a dependency directory");
        return None;
    }

    let Some(kind) = IssueKind::parse(&raw.kind) else {
        warn!(kind = %raw.kind, "dropping finding with unknown kind");
        return None;
    };

    let line = if raw.line < 0 { 0 } else { raw.line as u32 };

    Some(DiscoveredIssue {
        file,
        kind,
        line,
        description: raw.description,
    })
}

/// Keep the tail of the output; the failure summary lives at the end.
pub fn bounded_window(output: &str, max_chars: usize) -> &str {
    let char_count = output.chars().count();
    if char_count <= max_chars {
        return output;
    }
    let skip = char_count - max_chars;
    let byte_offset = output
        .char_indices()
        .nth(skip)
        .map(|(i, _)| i)
        .unwrap_or(0);
    &output[byte_offset..]
}

/// Strip a leading/trailing markdown code fence, if present.
pub fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop an optional language tag on the fence line.
    let rest = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => rest,
    };
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_findings() {
        let response = r#"[
            {"file": "src/a.py", "kind": "SYNTAX", "line": 8, "description": "missing colon"},
            {"file": "src/b.py", "kind": "IMPORT", "line": 0, "description": "unused import"}
        ]"#;

        let findings = parse_findings(response).unwrap();
        assert_eq!(findings.len(), 2);
        assert_eq!(findings[0].file, "src/a.py");
        assert_eq!(findings[0].kind, IssueKind::Syntax);
        assert_eq!(findings[0].line, 8);
        assert_eq!(findings[1].line, 0);
    }

    #[test]
    fn test_parse_strips_code_fences() {
        let response = "```json\n[{\"file\": \"app.js\", \"kind\": \"LOGIC\", \"line\": 3, \"description\": \"off by one\"}]\n```";
        let findings = parse_findings(response).unwrap();
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].kind, IssueKind::Logic);
    }

    #[test]
    fn test_absolute_and_traversal_paths_dropped() {
        let response = r#"[
            {"file": "/etc/passwd", "kind": "RUNTIME", "line": 0, "description": "x"},
            {"file": "../outside.py", "kind": "RUNTIME", "line": 0, "description": "x"},
            {"file": "src/ok.py", "kind": "RUNTIME", "line": 0, "description": "x"}
        ]"#;

        let findings = parse_findings(response).unwrap();
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].file, "src/ok.py");
    }

    #[test]
    fn test_dependency_directory_paths_dropped() {
        let response = r#"[
            {"file": "node_modules/lodash/index.js", "kind": "SYNTAX", "line": 1, "description": "x"},
            {"file": "venv/lib/thing.py", "kind": "SYNTAX", "line": 1, "description": "x"}
        ]"#;

        let findings = parse_findings(response).unwrap();
        assert!(findings.is_empty());
    }

    #[test]
    fn test_unknown_kind_dropped_not_coerced() {
        let response = r#"[
            {"file": "src/a.py", "kind": "SECURITY", "line": 1, "description": "x"},
            {"file": "src/a.py", "kind": "LINTING", "line": 1, "description": "x"}
        ]"#;

        let findings = parse_findings(response).unwrap();
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].kind, IssueKind::Linting);
    }

    #[test]
    fn test_negative_line_becomes_unknown() {
        let response =
            r#"[{"file": "src/a.py", "kind": "LOGIC", "line": -4, "description": "x"}]"#;
        let findings = parse_findings(response).unwrap();
        assert_eq!(findings[0].line, 0);
    }

    #[test]
    fn test_non_array_response_is_invalid() {
        assert!(parse_findings("I found no issues.").is_err());
        assert!(parse_findings("{}").is_err());
    }

    #[test]
    fn test_bounded_window_keeps_tail() {
        let output = "a".repeat(50) + "TAIL";
        let window = bounded_window(&output, 10);
        assert_eq!(window.len(), 10);
        assert!(window.ends_with("TAIL"));

        let short = "short output";
        assert_eq!(bounded_window(short, 100), short);
    }

    #[test]
    fn test_strip_code_fences_variants() {
        assert_eq!(strip_code_fences("plain"), "plain");
        assert_eq!(strip_code_fences("```json\n[1]\n```"), "[1]");
        assert_eq!(strip_code_fences("```\n[1]\n```"), "[1]");
    }
}
