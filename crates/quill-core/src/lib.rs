//! Core library for quill: the plan-to-notes generation pipeline.
//!
//! A markdown plan file is parsed into note proposals ([`plan`]), each
//! proposal is sent to an LLM ([`llm`]), the near-JSON answer is repaired
//! ([`repair`]) and validated ([`schema`]), and the result is rendered
//! through a placeholder template ([`template`]) and written to the vault
//! ([`store`]). The [`orchestrator`] drives the whole batch sequentially.

pub mod llm;
pub mod note;
pub mod orchestrator;
pub mod plan;
pub mod repair;
pub mod schema;
pub mod store;
pub mod template;

pub use note::{NoteKind, sanitize_title};
pub use orchestrator::{GenerationConfig, Orchestrator, RunSummary};
pub use plan::{ParsedPlan, PlanMetadata, Proposal, parse_plan};
