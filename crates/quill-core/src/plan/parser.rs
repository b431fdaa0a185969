//! Markdown plan parser.
//!
//! Recovers note proposals from a semi-formal plan document. A proposal is
//! exactly two consecutive lines:
//!
//! ```text
//! - **<title>** `(<type>)`
//! \t- *<description>*
//! ```
//!
//! Both lines must match or the block is skipped entirely; there are no
//! partial proposals. Blocks that do not match the grammar are silently
//! excluded, so an empty result means "nothing to do", not an error.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::note::NoteKind;

/// One planned note: title, kind, and the verbatim plan context that will
/// be handed to the model. Created fresh per parse, never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Proposal {
    pub title: String,
    pub kind: NoteKind,
    pub description: String,
}

/// Frontmatter-derived metadata, shared read-only across all proposals in
/// one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanMetadata {
    /// Lower-cased, hyphenated topic; `"general"` when the key is absent.
    pub main_topic: String,
    /// Source references; a scalar frontmatter value becomes a one-element
    /// list.
    pub source: Vec<String>,
}

impl Default for PlanMetadata {
    fn default() -> Self {
        Self {
            main_topic: "general".to_string(),
            source: Vec::new(),
        }
    }
}

/// Result of parsing one plan document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedPlan {
    /// Proposals in their order of appearance. Order is meaningful: it
    /// becomes the sibling context other notes in the batch are told about.
    pub proposals: Vec<Proposal>,
    pub metadata: PlanMetadata,
}

/// Title line: `- **<title>** `(<type>)``.
static TITLE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^-\s+\*\*(.+?)\*\*\s+`\((.+?)\)`\s*$").expect("title regex"));

/// Description line: tab (or >= 2 space) indent, `- *<description>*`.
static DESCRIPTION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:\t+| {2,})-\s+\*([^*].*)\*\s*$").expect("description regex"));

/// Parse a plan document into proposals and metadata.
///
/// Zero proposals is a valid outcome; an unreadable plan file is the
/// caller's fatal error, not this function's concern.
pub fn parse_plan(text: &str) -> ParsedPlan {
    let (frontmatter, body) = split_frontmatter(text);
    let metadata = parse_metadata(frontmatter);

    let lines: Vec<&str> = body.lines().collect();
    let mut proposals = Vec::new();

    for i in 0..lines.len() {
        let Some(title_caps) = TITLE_RE.captures(lines[i]) else {
            continue;
        };
        let Some(desc_caps) = lines.get(i + 1).and_then(|l| DESCRIPTION_RE.captures(l)) else {
            // Title line without a matching description line: skip the block.
            continue;
        };

        let title = title_caps[1].trim().to_string();
        if title.is_empty() {
            continue;
        }

        proposals.push(Proposal {
            title,
            kind: NoteKind::parse(&title_caps[2]),
            description: desc_caps[1].trim().to_string(),
        });
    }

    if proposals.is_empty() {
        tracing::debug!("plan contains no well-formed proposal blocks");
    }

    ParsedPlan {
        proposals,
        metadata,
    }
}

/// Split a document into its frontmatter block (between leading `---`
/// fences) and the remaining body. Returns an empty frontmatter when the
/// document has none.
fn split_frontmatter(text: &str) -> (&str, &str) {
    let Some(rest) = text.strip_prefix("---") else {
        return ("", text);
    };
    let Some(rest) = rest.strip_prefix('\n').or_else(|| rest.strip_prefix("\r\n")) else {
        return ("", text);
    };
    match rest.find("\n---") {
        Some(end) => {
            let frontmatter = &rest[..end];
            let body = rest[end + 4..].trim_start_matches(['\r', '\n']);
            (frontmatter, body)
        }
        None => ("", text),
    }
}

/// Parse the `main_topic:` and `source:` keys from a frontmatter block.
/// Everything else in the frontmatter is ignored.
fn parse_metadata(frontmatter: &str) -> PlanMetadata {
    let mut metadata = PlanMetadata::default();
    let lines: Vec<&str> = frontmatter.lines().collect();

    for (i, line) in lines.iter().enumerate() {
        if let Some(value) = line.strip_prefix("main_topic:") {
            let value = strip_scalar(value);
            if !value.is_empty() {
                metadata.main_topic = value.to_lowercase().replace(' ', "-");
            }
        } else if let Some(value) = line.strip_prefix("source:") {
            metadata.source = parse_source_value(value, &lines[i + 1..]);
        }
    }

    metadata
}

/// Parse a `source:` value: inline `[a, b]` list, scalar, or a block
/// sequence of `- item` lines following the key.
fn parse_source_value(inline: &str, following: &[&str]) -> Vec<String> {
    let inline = inline.trim();

    // Inline bracketed list.
    if inline.starts_with('[') {
        return inline
            .trim_start_matches('[')
            .trim_end_matches(']')
            .split(',')
            .map(strip_scalar)
            .filter(|s| !s.is_empty())
            .collect();
    }

    // Scalar value.
    if !inline.is_empty() {
        let value = strip_scalar(inline);
        return if value.is_empty() { Vec::new() } else { vec![value] };
    }

    // Block sequence on the following lines.
    let mut items = Vec::new();
    for line in following {
        let trimmed = line.trim_start();
        let Some(item) = trimmed.strip_prefix("- ") else {
            break;
        };
        let value = strip_scalar(item);
        if !value.is_empty() {
            items.push(value);
        }
    }
    items
}

/// Strip surrounding whitespace, quotes, and brackets from a scalar value.
fn strip_scalar(s: &str) -> String {
    s.trim()
        .trim_matches(|c| matches!(c, '"' | '\'' | '[' | ']'))
        .trim()
        .to_string()
}
