//! `quill generate` command: run a plan through the pipeline.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;

use quill_core::llm::AnthropicClient;
use quill_core::orchestrator::{GenerationConfig, Orchestrator, RunSummary};
use quill_core::store::{ActivityLog, VaultStore};
use quill_core::{ParsedPlan, parse_plan};

use crate::config::{self, QuillConfig};

/// Read and parse the plan file.
pub fn load_plan(plan_path: &str) -> Result<ParsedPlan> {
    let text = std::fs::read_to_string(plan_path)
        .with_context(|| format!("failed to read plan file {plan_path}"))?;
    Ok(parse_plan(&text))
}

/// Wire up the orchestrator against the configured vault and provider.
pub fn build_orchestrator(config: &QuillConfig, max_retries: Option<u32>) -> Result<Orchestrator> {
    let api_key = config::api_key()?;
    let store = Arc::new(VaultStore::new(config.vault_root.clone()));
    let mut client =
        AnthropicClient::new(api_key, config.model.clone()).with_max_tokens(config.max_tokens);
    if let Some(base_url) = &config.base_url {
        client = client.with_base_url(base_url.clone());
    }
    let llm = Arc::new(client);
    let log = ActivityLog::new(store.clone(), config.activity_log.clone());

    let mut retry = config.retry.clone();
    if let Some(n) = max_retries {
        retry.max_retries = n;
    }

    Ok(Orchestrator::new(
        store,
        llm,
        log,
        GenerationConfig {
            notes_dir: config.notes_dir.clone(),
            templates_dir: config.templates_dir.clone(),
            retry,
        },
    ))
}

/// Set up graceful shutdown: first signal cancels, second force-exits.
pub fn spawn_signal_handler() -> CancellationToken {
    let cancel = CancellationToken::new();
    let cancel_clone = cancel.clone();
    let got_first_signal = Arc::new(AtomicBool::new(false));

    tokio::spawn(async move {
        loop {
            tokio::signal::ctrl_c().await.ok();
            if got_first_signal.swap(true, Ordering::SeqCst) {
                // Second signal: force exit.
                eprintln!("\nForce exit.");
                std::process::exit(130);
            }
            eprintln!("\nFinishing the current note, then stopping (Ctrl+C again to force)...");
            cancel_clone.cancel();
        }
    });

    cancel
}

/// Print the summary and map it to an exit status.
pub fn finish(summary: &RunSummary) -> Result<()> {
    print!("{}", summary.render_report());
    if summary.interrupted {
        std::process::exit(130);
    }
    if summary.failed_count() > 0 {
        println!("Re-run with `quill resume <plan>` to retry the failed notes.");
        std::process::exit(1);
    }
    Ok(())
}

/// Run the generate command.
pub async fn run_generate(
    config: &QuillConfig,
    plan_path: &str,
    max_retries: Option<u32>,
) -> Result<()> {
    let plan = load_plan(plan_path)?;
    if plan.proposals.is_empty() {
        println!("Plan {plan_path} contains no note proposals; nothing to do.");
        return Ok(());
    }

    println!("Generating {} notes from {plan_path}", plan.proposals.len());
    println!("  Vault: {}", config.vault_root.display());
    println!("  Model: {}", config.model);
    println!();

    let orchestrator = build_orchestrator(config, max_retries)?;
    let cancel = spawn_signal_handler();
    let summary = orchestrator.run(&plan, &cancel).await;

    finish(&summary)
}
