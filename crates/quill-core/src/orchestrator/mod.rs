//! Sequential generation orchestrator.
//!
//! Drives the pipeline for one plan: for each proposal in order, skip it
//! if the note already exists or its kind has no template, otherwise
//! prompt the model, repair and validate the answer, render the template
//! and write the note in a single operation. Proposals run strictly one
//! at a time; a cancellation token is checked between proposals so an
//! interrupt never abandons a half-written note.

pub mod prompt;
pub mod summary;

use std::sync::Arc;

use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::llm::{LlmClient, LlmError, RetryPolicy, call_with_retry};
use crate::note::sanitize_title;
use crate::plan::{ParsedPlan, Proposal};
use crate::repair::{self, RepairError};
use crate::schema::{self, SchemaError};
use crate::store::{ActivityLog, FileStore};
use crate::template;

pub use summary::{FailedProposal, GenerationResult, RunSummary, failed_titles_from_log};

/// Why one proposal's generation attempt failed.
///
/// Scoped to a single proposal: a failure here marks that note failed in
/// the run summary and the batch moves on to the next proposal.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error(transparent)]
    Llm(#[from] LlmError),

    /// The model's answer could not be coaxed into parseable JSON.
    #[error("malformed model answer: {0}")]
    Malformed(String),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error("failed to write note: {0}")]
    Store(#[source] anyhow::Error),
}

impl From<RepairError> for GenerationError {
    fn from(err: RepairError) -> Self {
        Self::Malformed(err.to_string())
    }
}

/// Paths and retry parameters for a run.
#[derive(Debug, Clone)]
pub struct GenerationConfig {
    /// Directory (relative to the store root) notes are written into.
    pub notes_dir: String,
    /// Directory holding one template per note kind.
    pub templates_dir: String,
    pub retry: RetryPolicy,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            notes_dir: "notes".to_string(),
            templates_dir: "templates".to_string(),
            retry: RetryPolicy::default(),
        }
    }
}

/// Runs the plan-to-notes pipeline over a store and an LLM client.
pub struct Orchestrator {
    store: Arc<dyn FileStore>,
    llm: Arc<dyn LlmClient>,
    log: ActivityLog,
    config: GenerationConfig,
}

impl Orchestrator {
    pub fn new(
        store: Arc<dyn FileStore>,
        llm: Arc<dyn LlmClient>,
        log: ActivityLog,
        config: GenerationConfig,
    ) -> Self {
        Self {
            store,
            llm,
            log,
            config,
        }
    }

    fn note_path(&self, link: &str) -> String {
        format!("{}/{link}.md", self.config.notes_dir)
    }

    fn template_path(&self, proposal: &Proposal) -> String {
        format!(
            "{}/{}.md",
            self.config.templates_dir,
            proposal.kind.template_name()
        )
    }

    /// Process every proposal in the plan, in plan order.
    ///
    /// The returned summary is also appended to the activity log. Never
    /// fails as a whole: per-proposal errors are recorded and the batch
    /// continues.
    pub async fn run(&self, plan: &ParsedPlan, cancel: &CancellationToken) -> RunSummary {
        self.run_filtered(plan, None, cancel).await
    }

    /// Re-attempt only the titles the activity log recorded as failed in
    /// its most recent run.
    pub async fn resume(
        &self,
        plan: &ParsedPlan,
        cancel: &CancellationToken,
    ) -> anyhow::Result<RunSummary> {
        let log_text = self.log.read_all().await;
        let titles = failed_titles_from_log(&log_text);
        if titles.is_empty() {
            anyhow::bail!(
                "nothing to resume: no failed titles in the activity log at {}",
                self.log.path()
            );
        }
        tracing::info!(count = titles.len(), "resuming failed proposals");
        Ok(self.run_filtered(plan, Some(&titles), cancel).await)
    }

    /// Shared driver. When `only` is set, proposals whose title is not in
    /// the list are passed over silently; sibling context still comes from
    /// the full plan.
    async fn run_filtered(
        &self,
        plan: &ParsedPlan,
        only: Option<&[String]>,
        cancel: &CancellationToken,
    ) -> RunSummary {
        let sibling_titles: Vec<String> =
            plan.proposals.iter().map(|p| p.title.clone()).collect();
        let mut summary = RunSummary::default();

        for proposal in &plan.proposals {
            if cancel.is_cancelled() {
                tracing::info!("cancellation requested, stopping before next proposal");
                summary.interrupted = true;
                break;
            }
            if let Some(titles) = only {
                if !titles.contains(&proposal.title) {
                    continue;
                }
            }

            let link = sanitize_title(&proposal.title);
            let note_path = self.note_path(&link);
            if self.store.exists(&note_path).await {
                tracing::info!(title = %proposal.title, path = %note_path, "note exists, skipping");
                summary.skipped_existing.push(proposal.title.clone());
                continue;
            }

            let template_path = self.template_path(proposal);
            let template = match self.store.read(&template_path).await {
                Ok(t) => t,
                Err(_) => {
                    tracing::warn!(
                        title = %proposal.title,
                        kind = %proposal.kind,
                        path = %template_path,
                        "no template for note kind, skipping"
                    );
                    summary.skipped_no_template.push(proposal.title.clone());
                    continue;
                }
            };

            tracing::info!(title = %proposal.title, kind = %proposal.kind, "generating note");
            match self
                .generate_one(proposal, plan, &sibling_titles, &template, &note_path)
                .await
            {
                Ok(()) => {
                    tracing::info!(title = %proposal.title, path = %note_path, "note written");
                    summary.results.push(GenerationResult {
                        title: proposal.title.clone(),
                        success: true,
                        link,
                        is_structural: proposal.kind.is_structural(),
                    });
                }
                Err(err) => {
                    tracing::error!(title = %proposal.title, error = %err, "generation failed");
                    summary.results.push(GenerationResult {
                        title: proposal.title.clone(),
                        success: false,
                        link,
                        is_structural: proposal.kind.is_structural(),
                    });
                    summary.failed.push(FailedProposal {
                        title: proposal.title.clone(),
                        kind: proposal.kind.clone(),
                        error: err.to_string(),
                    });
                }
            }
        }

        if let Err(err) = self.log.append(&summary.log_entry()).await {
            tracing::warn!(error = %err, "failed to record run in the activity log");
        }
        summary
    }

    /// One proposal end to end: prompt, call with retry, repair, parse,
    /// validate, render, write. The note is rendered fully in memory and
    /// written with a single store call.
    async fn generate_one(
        &self,
        proposal: &Proposal,
        plan: &ParsedPlan,
        sibling_titles: &[String],
        template: &str,
        note_path: &str,
    ) -> Result<(), GenerationError> {
        let placeholders = template::extract_placeholders(template);
        let prompt =
            prompt::build_note_prompt(proposal, &plan.metadata, sibling_titles, &placeholders);

        let raw = call_with_retry(&self.config.retry, || self.llm.generate(&prompt, &[])).await?;
        let repaired = repair::repair(&raw)?;
        let value: serde_json::Value = serde_json::from_str(&repaired)
            .map_err(|e| GenerationError::Malformed(format!("JSON parse failed: {e}")))?;

        let mut content = schema::validate(&proposal.kind, value)?;
        content.ensure_placeholder_paths(&placeholders);

        let rendered = template::populate(template, content.as_value());
        self.store
            .write(note_path, &rendered)
            .await
            .map_err(GenerationError::Store)?;
        Ok(())
    }
}
