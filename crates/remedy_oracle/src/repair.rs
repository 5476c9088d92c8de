//! Repair oracle: rewrite a single file to address one issue.
//!
//! The contract is strict: the oracle must return the complete replacement
//! content for exactly the named file, and must not touch test files. The
//! caller re-runs the suite to judge the patch; no static analysis happens
//! here.

use async_trait::async_trait;
use tracing::debug;

use remedy_core::Issue;

use crate::diagnose::strip_code_fences;
use crate::error::{OracleError, OracleResult};
use crate::llm::LlmAdapter;

/// A collaborator that produces replacement file content for one issue.
#[async_trait]
pub trait RepairOracle: Send + Sync {
    async fn repair(
        &self,
        issue: &Issue,
        file_content: &str,
        test_output: &str,
    ) -> OracleResult<String>;
}

const SYSTEM_PROMPT: &str = "You are a software repair engineer. You receive one defect \
report, the current content of the affected file, and a snippet of the failing test \
output. Respond with the complete corrected content of that file and nothing else: \
no prose, no code fences, no diff markers. Change only what the defect requires. \
Never modify test files; if the named file is a test file, return it unchanged.";

/// LLM-backed repair oracle.
pub struct LlmRepairOracle {
    adapter: LlmAdapter,
}

impl LlmRepairOracle {
    pub fn new(adapter: LlmAdapter) -> Self {
        Self { adapter }
    }

    pub fn from_env() -> OracleResult<Self> {
        Ok(Self::new(LlmAdapter::from_env()?))
    }
}

#[async_trait]
impl RepairOracle for LlmRepairOracle {
    async fn repair(
        &self,
        issue: &Issue,
        file_content: &str,
        test_output: &str,
    ) -> OracleResult<String> {
        let user = format!(
            "Defect:\n  file: {}\n  kind: {}\n  line: {}\n  description: {}\n\n\
             Current file content:\n{}\n\nFailing output snippet:\n{}",
            issue.file, issue.kind, issue.line, issue.description, file_content, test_output
        );

        let response = self.adapter.complete(SYSTEM_PROMPT, &user).await?;
        let content = strip_code_fences(&response);

        if content.trim().is_empty() {
            return Err(OracleError::InvalidResponse(
                "repair oracle returned empty file content".to_string(),
            ));
        }

        debug!(file = %issue.file, chars = content.len(), "repair content generated");

        // Preserve a trailing newline; most tools expect one.
        let mut content = content.to_string();
        if !content.ends_with('\n') {
            content.push('\n');
        }
        Ok(content)
    }
}
