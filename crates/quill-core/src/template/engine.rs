//! Placeholder extraction and template population.
//!
//! Templates use `{{dotted.path}}` placeholders. How an array value is
//! rendered is decided by the placeholder's final path segment through an
//! explicit registration table ([`ArrayRenderKind`]); new list-shaped
//! placeholders must be registered there rather than silently falling
//! through to the default.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::schema::BulletNode;
use crate::template::bullets::render_bullet_forest;

/// Placeholder token: `{{path.to.field}}`.
static PLACEHOLDER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{([A-Za-z0-9_][A-Za-z0-9_.]*)\}\}").expect("placeholder regex"));

/// Any leftover `{{...}}` token after substitution, well-formed or not.
static STRAY_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{\{[^{}]*\}\}").expect("stray regex"));

/// How an array value is written into the note.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrayRenderKind {
    /// YAML sequence under a mapping key: newline, then `  - item` lines.
    YamlList,
    /// Quoted wikilinks: `  - "[[item]]"` lines; empty array renders empty.
    WikilinkList,
    /// Nested bullet forest of [`BulletNode`]s.
    BulletForest,
    /// `- item` lines, newline-joined, no leading newline.
    PlainList,
}

/// Registered list-shaped placeholders, keyed by final path segment.
const RENDER_TABLE: &[(&str, ArrayRenderKind)] = &[
    ("tags_yaml", ArrayRenderKind::YamlList),
    ("source", ArrayRenderKind::WikilinkList),
    ("related", ArrayRenderKind::WikilinkList),
];

impl ArrayRenderKind {
    /// Look up the render kind for a placeholder's final path segment.
    pub fn for_segment(segment: &str) -> Self {
        if let Some((_, kind)) = RENDER_TABLE.iter().find(|(name, _)| *name == segment) {
            return *kind;
        }
        if segment.ends_with("_bullets") {
            return Self::BulletForest;
        }
        Self::PlainList
    }
}

/// Extract the ordered set of placeholder paths from a template.
///
/// Duplicates collapse to one logical placeholder, first-seen order
/// preserved.
pub fn extract_placeholders(template: &str) -> Vec<String> {
    let mut paths: Vec<String> = Vec::new();
    for caps in PLACEHOLDER_RE.captures_iter(template) {
        let path = caps[1].to_string();
        if !paths.contains(&path) {
            paths.push(path);
        }
    }
    paths
}

/// Populate a template from a data object.
///
/// Pure: the same template and data always produce the same output. Every
/// textual occurrence of each placeholder is replaced; a path that does
/// not resolve renders as the empty string, and no `{{...}}` token ever
/// survives into the output.
pub fn populate(template: &str, data: &Value) -> String {
    let mut output = template.to_string();
    for path in extract_placeholders(template) {
        let rendered = render_path(data, &path);
        output = output.replace(&format!("{{{{{path}}}}}"), &rendered);
    }
    STRAY_RE.replace_all(&output, "").into_owned()
}

/// Resolve a dotted path and render the value it lands on.
fn render_path(data: &Value, path: &str) -> String {
    let mut current = data;
    for segment in path.split('.') {
        match current.get(segment) {
            Some(v) => current = v,
            None => return String::new(),
        }
    }

    let final_segment = path.rsplit('.').next().unwrap_or(path);
    render_value(current, final_segment)
}

fn render_value(value: &Value, final_segment: &str) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Array(items) => render_array(items, ArrayRenderKind::for_segment(final_segment)),
        // Bare objects have no textual form of their own.
        Value::Object(_) => String::new(),
    }
}

fn render_array(items: &[Value], kind: ArrayRenderKind) -> String {
    match kind {
        ArrayRenderKind::YamlList => {
            if items.is_empty() {
                return String::new();
            }
            let lines: Vec<String> = items
                .iter()
                .map(|item| format!("  - {}", scalar_text(item)))
                .collect();
            format!("\n{}", lines.join("\n"))
        }
        ArrayRenderKind::WikilinkList => {
            if items.is_empty() {
                return String::new();
            }
            let lines: Vec<String> = items
                .iter()
                .map(|item| {
                    let cleaned: String = scalar_text(item)
                        .chars()
                        .filter(|c| !matches!(c, '[' | ']' | '"'))
                        .collect();
                    format!("  - \"[[{cleaned}]]\"")
                })
                .collect();
            format!("\n{}", lines.join("\n"))
        }
        ArrayRenderKind::BulletForest => {
            match serde_json::from_value::<Vec<BulletNode>>(Value::Array(items.to_vec())) {
                Ok(nodes) => render_bullet_forest(&nodes, 0),
                // Shape surprises degrade to a plain list rather than erroring.
                Err(_) => render_array(items, ArrayRenderKind::PlainList),
            }
        }
        ArrayRenderKind::PlainList => {
            let lines: Vec<String> = items
                .iter()
                .map(|item| format!("- {}", scalar_text(item)))
                .collect();
            lines.join("\n")
        }
    }
}

/// Textual form of a scalar array element.
fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        other => serde_json::to_string(other).unwrap_or_default(),
    }
}
