//! Prompt construction for one note proposal.
//!
//! Assembles plan context (topic, sources, sibling titles) and the JSON
//! answer contract for the proposal's kind. Pure string building, no I/O.

use crate::note::NoteKind;
use crate::plan::{PlanMetadata, Proposal};

/// JSON contract for concept-family notes.
const CONCEPT_CONTRACT: &str = r#"## Answer Contract

Reply with ONE JSON object and nothing else. Required fields:

- `tags_keywords`: array of lowercase keyword strings.
- `related_links_for_yaml`: array of related note titles (plain strings, no brackets).

Optional sections (include only what fits this note): `summary`, `details`,
`connections`, `comparison`, `relationship`, `fundamental` -- each a nested
object. Any field named `*_bullets` must be an array of nodes shaped
`{"content": "...", "children": [...]}` where `children` is optional and
recursive.
"#;

/// JSON contract for cheatsheet notes.
const CHEATSHEET_CONTRACT: &str = r#"## Answer Contract

Reply with ONE JSON object and nothing else. Required field:

- `cheatsheet_content`: a single markdown string with the full cheatsheet body.
"#;

/// Encoding rules appended to every prompt.
const ENCODING_RULES: &str = r#"## Encoding Rules

- Double-escape every backslash inside LaTeX (`\\theta`, not `\theta`);
  every bare backslash in your answer is read as a literal one.
- Write multi-line string values with real line breaks, not `\n` escape
  sequences.
- Standalone display formulas are their own `$$...$$` bullet node content.
"#;

/// Build the prompt for one proposal.
///
/// `sibling_titles` is every title in the plan, in plan order; the current
/// proposal is excluded from the sibling list it sees. `placeholders` are
/// the dotted paths the loaded template references, so the model knows
/// which fields the note will actually use.
pub fn build_note_prompt(
    proposal: &Proposal,
    metadata: &PlanMetadata,
    sibling_titles: &[String],
    placeholders: &[String],
) -> String {
    let mut prompt = String::with_capacity(2048);

    prompt.push_str("# Note Writer\n\n");
    prompt.push_str(
        "You are writing one note for a personal knowledge base. \
         Produce the structured JSON answer for the note described below.\n\n",
    );

    prompt.push_str("## Note\n\n");
    prompt.push_str(&format!("- **Title:** {}\n", proposal.title));
    prompt.push_str(&format!("- **Kind:** {}\n", proposal.kind));
    prompt.push_str(&format!("- **Main topic:** {}\n", metadata.main_topic));

    if !metadata.source.is_empty() {
        prompt.push_str(&format!("- **Sources:** {}\n", metadata.source.join("; ")));
    }

    let siblings: Vec<&str> = sibling_titles
        .iter()
        .map(String::as_str)
        .filter(|t| *t != proposal.title)
        .collect();
    if !siblings.is_empty() {
        prompt.push_str(&format!(
            "- **Sibling notes in this batch:** {}\n",
            siblings.join(", ")
        ));
        prompt.push_str(
            "  Reference siblings by exact title in `related_links_for_yaml` where relevant.\n",
        );
    }

    prompt.push_str("\n## Plan Context\n\n");
    prompt.push_str(&proposal.description);
    prompt.push_str("\n\n");

    prompt.push_str(match proposal.kind {
        NoteKind::Cheatsheet => CHEATSHEET_CONTRACT,
        _ => CONCEPT_CONTRACT,
    });
    prompt.push('\n');

    if !placeholders.is_empty() {
        prompt.push_str("## Fields Used by the Template\n\n");
        prompt.push_str(
            "The note template reads these paths; populate each one (an empty \
             string or array is acceptable when nothing fits):\n\n",
        );
        for path in placeholders {
            prompt.push_str(&format!("- `{path}`\n"));
        }
        prompt.push('\n');
    }

    prompt.push_str(ENCODING_RULES);

    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_proposal(kind: NoteKind) -> Proposal {
        Proposal {
            title: "Entropy".to_string(),
            kind,
            description: "Measure of average surprise.".to_string(),
        }
    }

    fn sample_metadata() -> PlanMetadata {
        PlanMetadata {
            main_topic: "information-theory".to_string(),
            source: vec!["Cover & Thomas".to_string()],
        }
    }

    #[test]
    fn prompt_includes_plan_context() {
        let siblings = vec!["Entropy".to_string(), "KL Divergence".to_string()];
        let prompt = build_note_prompt(
            &sample_proposal(NoteKind::Core),
            &sample_metadata(),
            &siblings,
            &["concept_name".to_string()],
        );

        assert!(prompt.contains("Title:** Entropy"));
        assert!(prompt.contains("Main topic:** information-theory"));
        assert!(prompt.contains("Cover & Thomas"));
        assert!(prompt.contains("Measure of average surprise."));
        assert!(prompt.contains("`concept_name`"));
    }

    #[test]
    fn siblings_exclude_the_note_itself() {
        let siblings = vec!["Entropy".to_string(), "KL Divergence".to_string()];
        let prompt = build_note_prompt(
            &sample_proposal(NoteKind::Core),
            &sample_metadata(),
            &siblings,
            &[],
        );
        assert!(prompt.contains("Sibling notes in this batch:** KL Divergence"));
    }

    #[test]
    fn contract_follows_kind_not_payload() {
        let concept = build_note_prompt(
            &sample_proposal(NoteKind::Core),
            &sample_metadata(),
            &[],
            &[],
        );
        assert!(concept.contains("tags_keywords"));
        assert!(!concept.contains("cheatsheet_content"));

        let cheatsheet = build_note_prompt(
            &sample_proposal(NoteKind::Cheatsheet),
            &sample_metadata(),
            &[],
            &[],
        );
        assert!(cheatsheet.contains("cheatsheet_content"));
        assert!(!cheatsheet.contains("tags_keywords"));
    }

    #[test]
    fn encoding_rules_always_present() {
        let prompt = build_note_prompt(
            &sample_proposal(NoteKind::Process),
            &sample_metadata(),
            &[],
            &[],
        );
        assert!(prompt.contains("Double-escape every backslash"));
    }
}
