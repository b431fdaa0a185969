//! Note kinds and note naming.
//!
//! A [`NoteKind`] is parsed once from the plan's `` `(<type>)` `` marker and
//! consumed everywhere downstream; no other module re-parses the type string.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The kind of note a proposal asks for.
///
/// The kind selects which template is loaded and which JSON contract the
/// model's answer is validated against. Unknown type strings are preserved
/// as [`NoteKind::Custom`] so a vault can ship its own templates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoteKind {
    Fundamental,
    Core,
    Comparison,
    Relationship,
    Process,
    Cheatsheet,
    ExampleWalkthrough,
    Custom(String),
}

impl NoteKind {
    /// Parse a plan type marker. Case-insensitive; spaces, hyphens and
    /// underscores are ignored so `Example Walkthrough`, `example-walkthrough`
    /// and `example_walkthrough` all name the same kind.
    pub fn parse(s: &str) -> Self {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| !matches!(c, ' ' | '-' | '_'))
            .collect::<String>()
            .to_lowercase();
        match normalized.as_str() {
            "fundamental" => Self::Fundamental,
            "core" => Self::Core,
            "comparison" => Self::Comparison,
            "relationship" => Self::Relationship,
            "process" => Self::Process,
            "cheatsheet" => Self::Cheatsheet,
            "examplewalkthrough" => Self::ExampleWalkthrough,
            _ => Self::Custom(s.trim().to_string()),
        }
    }

    /// File stem of the template that renders this kind.
    pub fn template_name(&self) -> String {
        match self {
            Self::Fundamental => "fundamental".to_string(),
            Self::Core => "core".to_string(),
            Self::Comparison => "comparison".to_string(),
            Self::Relationship => "relationship".to_string(),
            Self::Process => "process".to_string(),
            Self::Cheatsheet => "cheatsheet".to_string(),
            Self::ExampleWalkthrough => "example_walkthrough".to_string(),
            Self::Custom(s) => s
                .to_lowercase()
                .chars()
                .map(|c| if matches!(c, ' ' | '-') { '_' } else { c })
                .collect(),
        }
    }

    /// Whether the note describes how other notes relate rather than a
    /// standalone concept. Structural notes are flagged in the run summary.
    pub fn is_structural(&self) -> bool {
        matches!(self, Self::Comparison | Self::Relationship)
    }
}

impl fmt::Display for NoteKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Fundamental => "Fundamental",
            Self::Core => "Core",
            Self::Comparison => "Comparison",
            Self::Relationship => "Relationship",
            Self::Process => "Process",
            Self::Cheatsheet => "Cheatsheet",
            Self::ExampleWalkthrough => "Example Walkthrough",
            Self::Custom(s) => s,
        };
        f.write_str(s)
    }
}

/// Characters that cannot appear in a note filename: path separators,
/// shell/OS-reserved punctuation, and wikilink delimiters.
const HOSTILE: &[char] = &['/', '\\', ':', '*', '?', '"', '<', '>', '|', '#', '^', '[', ']'];

/// Derive a file-safe note name from a proposal title.
///
/// Strips path-hostile characters and trims whitespace. A title that
/// empties out entirely falls back to `"untitled"` so the target path is
/// always valid.
pub fn sanitize_title(title: &str) -> String {
    let cleaned: String = title.chars().filter(|c| !HOSTILE.contains(c)).collect();
    let trimmed = cleaned.trim();
    if trimmed.is_empty() {
        "untitled".to_string()
    } else {
        trimmed.to_string()
    }
}
