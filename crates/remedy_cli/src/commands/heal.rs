//! Heal command - Run a healing session against a repository.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use remedy_core::{GitCli, IssueStatus, RunStatus, RunStore};
use remedy_heal::{HealConfig, HealTarget, HealingEngine};
use remedy_oracle::{LlmAdapter, LlmDiagnosticOracle, LlmRepairOracle};
use remedy_runner::DockerSandbox;

#[derive(Args)]
pub struct HealArgs {
    /// URL of the repository to clone and heal
    #[arg(conflicts_with = "path")]
    repo: Option<String>,

    /// Existing working tree to heal in place
    #[arg(short, long)]
    path: Option<PathBuf>,

    /// Directory for run records and cloned working trees
    #[arg(long, default_value = ".remedy")]
    state_dir: PathBuf,

    /// Maximum test-diagnose-repair iterations
    #[arg(long, default_value_t = 6)]
    max_iterations: u32,

    /// Per-command timeout inside the sandbox, in seconds (0 disables it)
    #[arg(long, default_value_t = 300)]
    timeout: u64,

    /// Do not push the healing branch when the run concludes
    #[arg(long)]
    no_push: bool,

    /// Force-push the healing branch
    #[arg(long)]
    force_push: bool,
}

pub async fn execute(args: HealArgs) -> Result<()> {
    let target = match (args.repo, args.path) {
        (Some(url), None) => HealTarget::Remote { url },
        (None, Some(path)) => {
            if !path.exists() {
                anyhow::bail!("Working tree not found: {}", path.display());
            }
            HealTarget::Local { path }
        }
        _ => anyhow::bail!("Exactly one of a repository URL or --path is required"),
    };

    if !GitCli::is_git_available() {
        anyhow::bail!("git is not available on this system");
    }

    let sandbox = DockerSandbox::new()
        .await
        .context("Docker daemon is not available")?
        .with_timeout(args.timeout);

    let adapter = LlmAdapter::from_env().context(
        "LLM backend is not configured (set OPENAI_API_KEY or ANTHROPIC_API_KEY)",
    )?;
    info!(model = adapter.model(), "LLM backend configured");
    let diagnostic = LlmDiagnosticOracle::new(adapter);
    let repairer = LlmRepairOracle::from_env()?;

    let mut config = HealConfig::default()
        .max_iterations(args.max_iterations)
        .sandbox_timeout(args.timeout);
    if args.no_push {
        config = config.no_push();
    }
    config.force_push = args.force_push;

    let engine = HealingEngine::new(
        Arc::new(sandbox),
        Arc::new(diagnostic),
        Arc::new(repairer),
        Arc::new(GitCli::new()),
        RunStore::new(&args.state_dir),
        config,
    );

    println!("🩺 Starting healing run...");
    let report = engine.run(target).await?;

    println!();
    println!("Branch:        {}", report.branch_name);
    println!("Fixes applied: {}", report.total_fixes_applied);
    println!("Open failures: {}", report.total_open_failures);
    for issue in &report.issues {
        let mark = match issue.status {
            IssueStatus::Fixed => "✅",
            IssueStatus::Open => "🔴",
            _ => "⚠️ ",
        };
        println!(
            "  {} [{}] {}:{} {}",
            mark, issue.kind, issue.file, issue.line, issue.description
        );
    }

    println!();
    match report.status {
        RunStatus::Passed => {
            println!("✅ Suite is green.");
            Ok(())
        }
        _ => anyhow::bail!("suite still failing after healing run"),
    }
}
