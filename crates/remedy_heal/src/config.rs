//! Healing run configuration.

use serde::{Deserialize, Serialize};

/// Tunables for one healing run, with the defaults the loop was designed
/// around.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealConfig {
    /// Hard ceiling on full test-diagnose-repair cycles.
    pub max_iterations: u32,
    /// Per-command timeout inside the sandbox (0 disables it).
    pub sandbox_timeout_secs: u64,
    /// Maximum characters of sandbox output handed to the diagnostic oracle.
    pub output_window_chars: usize,
    /// Cap on the source-file listing given to the diagnostic oracle.
    pub max_source_hints: usize,
    /// Push the healing branch when the run concludes.
    pub push: bool,
    /// Force-push the branch.
    pub force_push: bool,
}

impl Default for HealConfig {
    fn default() -> Self {
        Self {
            max_iterations: 6,
            sandbox_timeout_secs: 300,
            output_window_chars: remedy_oracle::MAX_OUTPUT_CHARS,
            max_source_hints: 200,
            push: true,
            force_push: false,
        }
    }
}

impl HealConfig {
    pub fn max_iterations(mut self, n: u32) -> Self {
        self.max_iterations = n;
        self
    }

    pub fn sandbox_timeout(mut self, secs: u64) -> Self {
        self.sandbox_timeout_secs = secs;
        self
    }

    pub fn no_push(mut self) -> Self {
        self.push = false;
        self
    }
}
