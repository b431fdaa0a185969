//! Run summary: per-proposal outcomes, the activity-log entry, and the
//! failed-title parser that resume is built on.

use crate::note::NoteKind;

/// Outcome of one generated (or attempted) proposal.
#[derive(Debug, Clone)]
pub struct GenerationResult {
    pub title: String,
    pub success: bool,
    /// Sanitized filename stem, i.e. the wikilink target.
    pub link: String,
    /// Whether the note's kind is a structural one (comparison,
    /// relationship) rather than a standalone concept.
    pub is_structural: bool,
}

/// A proposal whose generation attempt failed.
#[derive(Debug, Clone)]
pub struct FailedProposal {
    pub title: String,
    pub kind: NoteKind,
    pub error: String,
}

/// Everything that happened in one orchestrator run.
#[derive(Debug, Default)]
pub struct RunSummary {
    /// Proposals that reached the generation stage, in plan order.
    pub results: Vec<GenerationResult>,
    /// Titles skipped because the note file already exists.
    pub skipped_existing: Vec<String>,
    /// Titles skipped because no template exists for their kind.
    pub skipped_no_template: Vec<String>,
    /// Failed proposals with their error text.
    pub failed: Vec<FailedProposal>,
    /// True when the run stopped early on cancellation.
    pub interrupted: bool,
}

impl RunSummary {
    pub fn generated_count(&self) -> usize {
        self.results.iter().filter(|r| r.success).count()
    }

    pub fn failed_count(&self) -> usize {
        self.failed.len()
    }

    pub fn skipped_count(&self) -> usize {
        self.skipped_existing.len() + self.skipped_no_template.len()
    }

    /// The multi-line activity-log entry for this run.
    ///
    /// Shape is load-bearing: [`failed_titles_from_log`] keys off the
    /// `generation run:` header and the `failed: ` line prefix.
    pub fn log_entry(&self) -> String {
        let mut entry = format!(
            "generation run: generated={} failed={} skipped={} interrupted={}",
            self.generated_count(),
            self.failed_count(),
            self.skipped_count(),
            self.interrupted,
        );
        for failure in &self.failed {
            entry.push_str(&format!("\nfailed: {}", failure.title));
        }
        entry
    }

    /// Human-readable report for the CLI.
    pub fn render_report(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("Generated: {}\n", self.generated_count()));
        for result in self.results.iter().filter(|r| r.success) {
            if result.is_structural {
                out.push_str(&format!("  - [[{}]] (structural)\n", result.link));
            } else {
                out.push_str(&format!("  - [[{}]]\n", result.link));
            }
        }
        if !self.skipped_existing.is_empty() {
            out.push_str(&format!(
                "Skipped, already exist: {}\n",
                self.skipped_existing.len()
            ));
            for title in &self.skipped_existing {
                out.push_str(&format!("  - {title}\n"));
            }
        }
        if !self.skipped_no_template.is_empty() {
            out.push_str(&format!(
                "Skipped, no template: {}\n",
                self.skipped_no_template.len()
            ));
            for title in &self.skipped_no_template {
                out.push_str(&format!("  - {title}\n"));
            }
        }
        if !self.failed.is_empty() {
            out.push_str(&format!("Failed: {}\n", self.failed.len()));
            for failure in &self.failed {
                out.push_str(&format!(
                    "  - {} ({}): {}\n",
                    failure.title, failure.kind, failure.error
                ));
            }
        }
        if self.interrupted {
            out.push_str("Run interrupted before completion.\n");
        }
        out
    }
}

/// Titles recorded as failed in the most recent run of the activity log.
///
/// Each run header resets the collection, so only failures from the last
/// completed run survive. Order is preserved.
pub fn failed_titles_from_log(log: &str) -> Vec<String> {
    let mut titles = Vec::new();
    for line in log.lines() {
        if line.contains("generation run:") {
            titles.clear();
        } else if let Some(title) = line.strip_prefix("failed: ") {
            titles.push(title.to_string());
        }
    }
    titles
}
