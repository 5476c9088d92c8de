//! # remedy_oracle
//!
//! The two generative collaborators of the healing loop, behind narrow
//! trait boundaries so any backend can be swapped in without touching the
//! controller or the ledger:
//!
//! - [`DiagnosticOracle`]: raw test/build output in, candidate issues out.
//! - [`RepairOracle`]: one issue plus file content in, replacement content out.
//!
//! Both ship an LLM-backed implementation (OpenAI or Anthropic, selected
//! from the environment).

pub mod diagnose;
pub mod error;
pub mod llm;
pub mod repair;

pub use diagnose::{
    bounded_window, parse_findings, strip_code_fences, DiagnosticOracle, LlmDiagnosticOracle,
    DEPENDENCY_DIRS, MAX_OUTPUT_CHARS,
};
pub use error::{OracleError, OracleResult};
pub use llm::{LlmAdapter, LlmProvider};
pub use repair::{LlmRepairOracle, RepairOracle};
