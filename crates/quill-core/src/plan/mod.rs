//! Plan file parsing: proposals and frontmatter metadata.

pub mod parser;

pub use parser::{ParsedPlan, PlanMetadata, Proposal, parse_plan};
