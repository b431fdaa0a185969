//! `quill resume` command: retry the titles the last run recorded as failed.

use anyhow::Result;

use crate::config::QuillConfig;
use crate::generate_cmd::{build_orchestrator, finish, load_plan, spawn_signal_handler};

/// Run the resume command.
pub async fn run_resume(config: &QuillConfig, plan_path: &str) -> Result<()> {
    let plan = load_plan(plan_path)?;

    println!("Resuming failed notes from {plan_path}");
    println!("  Vault: {}", config.vault_root.display());
    println!();

    let orchestrator = build_orchestrator(config, None)?;
    let cancel = spawn_signal_handler();
    let summary = orchestrator.resume(&plan, &cancel).await?;

    finish(&summary)
}
