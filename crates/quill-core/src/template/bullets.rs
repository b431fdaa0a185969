//! Nested bullet rendering for `*_bullets` fields.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::schema::BulletNode;

/// Lines that already carry their own numbering (`1. `, `42. `) keep it
/// instead of getting a `- ` marker.
static NUMBERED_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+\.\s").expect("numbered regex"));

/// Render a bullet forest as markdown list lines.
///
/// Indentation is four spaces per depth level. A node whose content is a
/// standalone `$$...$$` formula is not emitted as its own bullet; it is
/// appended, space-separated, to the previously emitted line so the
/// formula stays attached to the bullet that introduced it.
pub fn render_bullet_forest(nodes: &[BulletNode], depth: usize) -> String {
    render_lines(nodes, depth).join("\n")
}

fn render_lines(nodes: &[BulletNode], depth: usize) -> Vec<String> {
    let indent = "    ".repeat(depth);
    let mut lines: Vec<String> = Vec::new();

    for node in nodes {
        let content = node.content.trim();

        if is_standalone_formula(content) {
            match lines.last_mut() {
                Some(last) => {
                    last.push(' ');
                    last.push_str(content);
                }
                // A formula with nothing before it still has to appear.
                None => lines.push(format!("{indent}- {content}")),
            }
        } else if NUMBERED_RE.is_match(content) {
            lines.push(format!("{indent}{content}"));
        } else {
            lines.push(format!("{indent}- {content}"));
        }

        if let Some(children) = &node.children {
            lines.extend(render_lines(children, depth + 1));
        }
    }

    lines
}

/// A content string that is exactly one display-math block.
fn is_standalone_formula(s: &str) -> bool {
    s.len() >= 4 && s.starts_with("$$") && s.ends_with("$$")
}
