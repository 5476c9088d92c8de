//! Show command - Show the full record of one run.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use remedy_core::RunStore;

#[derive(Args)]
pub struct ShowArgs {
    /// Run identifier (as printed by `remedy runs`)
    run_id: String,

    /// Directory holding run records
    #[arg(long, default_value = ".remedy")]
    state_dir: PathBuf,
}

pub async fn execute(args: ShowArgs) -> Result<()> {
    let store = RunStore::new(&args.state_dir);
    let record = store.load(&args.run_id)?;

    println!("{}", serde_json::to_string_pretty(&record)?);
    Ok(())
}
