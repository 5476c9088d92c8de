//! Runs command - List past healing runs.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use remedy_core::RunStore;

#[derive(Args)]
pub struct RunsArgs {
    /// Directory holding run records
    #[arg(long, default_value = ".remedy")]
    state_dir: PathBuf,

    /// Emit machine-readable JSON instead of a table
    #[arg(long)]
    json: bool,
}

pub async fn execute(args: RunsArgs) -> Result<()> {
    let store = RunStore::new(&args.state_dir);
    let records = store.list()?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }

    if records.is_empty() {
        println!("No healing runs recorded under {}", args.state_dir.display());
        return Ok(());
    }

    println!(
        "{:<10} {:<22} {:<8} {:<7} BRANCH",
        "RUN", "STARTED", "STATUS", "ISSUES"
    );
    for record in records {
        println!(
            "{:<10} {:<22} {:<8} {:<7} {}",
            record.run_id,
            record.start_time.format("%Y-%m-%d %H:%M:%S"),
            format!("{:?}", record.status).to_uppercase(),
            record.issues.len(),
            record.branch_name
        );
    }

    Ok(())
}
