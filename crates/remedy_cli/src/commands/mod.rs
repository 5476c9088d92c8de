//! CLI command definitions.
//!
//! Each subcommand maps to one workflow: run a healing session, list past
//! runs, or inspect a single run record.

use clap::{Parser, Subcommand};

pub mod heal;
pub mod runs;
pub mod show;

/// remedy - automated test-suite healing
#[derive(Parser)]
#[command(name = "remedy")]
#[command(version, about = "remedy - automated test-suite healing")]
#[command(long_about = r#"
remedy clones (or opens) a project, runs its own test suite inside a
disposable Docker container, asks an LLM to localize and repair the
failures, and iterates until the suite passes or the iteration budget
runs out. Fixes are committed one per issue on a dedicated branch.

WORKFLOWS:
  heal   → Run a healing session against a repository
  runs   → List past healing runs
  show   → Show the full record of one run

EXIT CODES:
  0 - Success (suite healed or already green)
  1 - General error
  2 - Invalid arguments or missing prerequisites
  3 - Healing failed (suite still red after the run)
"#)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a healing session against a repository
    Heal(heal::HealArgs),

    /// List past healing runs
    Runs(runs::RunsArgs),

    /// Show the full record of one run
    Show(show::ShowArgs),
}
