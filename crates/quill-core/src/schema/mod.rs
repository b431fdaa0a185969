//! Structural validation of the repaired LLM answer.
//!
//! Validation is presence/type only; it never judges content (LaTeX
//! correctness, link targets, wording). Failures carry the dotted path of
//! the offending field so a batch summary can say exactly what was wrong.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::note::NoteKind;

/// One node of the nested-list structure used by every `*_bullets` field
/// in the model's answer. Forms a forest; depth is unbounded but in
/// practice shallow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulletNode {
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<BulletNode>>,
}

impl BulletNode {
    /// Leaf node with no children.
    pub fn leaf(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            children: None,
        }
    }
}

/// A validation failure, pointing at the field that broke the contract.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("expected a JSON object at the top level")]
    NotAnObject,

    #[error("missing required field {path:?}")]
    MissingField { path: String },

    #[error("field {path:?} has the wrong shape (expected {expected})")]
    WrongShape { path: String, expected: &'static str },
}

/// The model's validated answer for one note.
///
/// Wraps the raw JSON object after the structural contract has been
/// checked. Sub-objects for kinds other than the one in play are simply
/// absent; the template engine renders absent paths as empty strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteContent(Value);

impl NoteContent {
    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn into_value(self) -> Value {
        self.0
    }

    /// Insert an empty string at every referenced-but-absent dotted path so
    /// that each placeholder the loaded template mentions resolves to a
    /// present (possibly empty) field.
    pub fn ensure_placeholder_paths<S: AsRef<str>>(&mut self, paths: &[S]) {
        for path in paths {
            ensure_path(&mut self.0, path.as_ref());
        }
    }
}

fn ensure_path(value: &mut Value, path: &str) {
    let mut current = value;
    let segments: Vec<&str> = path.split('.').collect();
    for (i, segment) in segments.iter().enumerate() {
        let Some(map) = current.as_object_mut() else {
            // A non-object in the middle of the path; leave it alone.
            return;
        };
        let is_terminal = i == segments.len() - 1;
        let entry = map.entry(segment.to_string()).or_insert_with(|| {
            if is_terminal {
                Value::String(String::new())
            } else {
                Value::Object(Map::new())
            }
        });
        current = entry;
    }
}

/// Sections a concept note may carry; each must be an object when present.
const CONCEPT_SECTIONS: &[&str] = &[
    "summary",
    "details",
    "connections",
    "comparison",
    "relationship",
    "fundamental",
];

/// Validate a parsed answer against the contract for the given note kind.
///
/// Dispatch is on the externally supplied `kind` only -- the payload is
/// never inspected to guess which family it belongs to.
pub fn validate(kind: &NoteKind, value: Value) -> Result<NoteContent, SchemaError> {
    let Some(obj) = value.as_object() else {
        return Err(SchemaError::NotAnObject);
    };

    match kind {
        NoteKind::Cheatsheet => validate_cheatsheet(obj)?,
        _ => validate_concept(obj)?,
    }

    // Every *_bullets field anywhere in the tree must be a BulletNode
    // forest, regardless of family.
    check_bullets_recursively(&value, "")?;

    Ok(NoteContent(value))
}

/// Cheatsheet family: one required string field, arbitrary extras allowed.
fn validate_cheatsheet(obj: &Map<String, Value>) -> Result<(), SchemaError> {
    match obj.get("cheatsheet_content") {
        None => Err(SchemaError::MissingField {
            path: "cheatsheet_content".to_string(),
        }),
        Some(Value::String(_)) => Ok(()),
        Some(_) => Err(SchemaError::WrongShape {
            path: "cheatsheet_content".to_string(),
            expected: "string",
        }),
    }
}

/// Concept family: required tag/link arrays plus optional nested sections.
fn validate_concept(obj: &Map<String, Value>) -> Result<(), SchemaError> {
    require_string_array(obj, "tags_keywords")?;
    require_string_array(obj, "related_links_for_yaml")?;

    for section in CONCEPT_SECTIONS {
        if let Some(v) = obj.get(*section) {
            if !v.is_object() {
                return Err(SchemaError::WrongShape {
                    path: (*section).to_string(),
                    expected: "object",
                });
            }
        }
    }

    Ok(())
}

fn require_string_array(obj: &Map<String, Value>, field: &str) -> Result<(), SchemaError> {
    let Some(v) = obj.get(field) else {
        return Err(SchemaError::MissingField {
            path: field.to_string(),
        });
    };
    let Some(items) = v.as_array() else {
        return Err(SchemaError::WrongShape {
            path: field.to_string(),
            expected: "array of strings",
        });
    };
    for (i, item) in items.iter().enumerate() {
        if !item.is_string() {
            return Err(SchemaError::WrongShape {
                path: format!("{field}[{i}]"),
                expected: "string",
            });
        }
    }
    Ok(())
}

/// Walk the whole tree; any key ending in `_bullets` must hold a valid
/// bullet forest.
fn check_bullets_recursively(value: &Value, path: &str) -> Result<(), SchemaError> {
    let Some(obj) = value.as_object() else {
        return Ok(());
    };
    for (key, v) in obj {
        let child_path = if path.is_empty() {
            key.clone()
        } else {
            format!("{path}.{key}")
        };
        if key.ends_with("_bullets") {
            check_bullet_forest(v, &child_path)?;
        } else {
            check_bullets_recursively(v, &child_path)?;
        }
    }
    Ok(())
}

fn check_bullet_forest(value: &Value, path: &str) -> Result<(), SchemaError> {
    let Some(items) = value.as_array() else {
        return Err(SchemaError::WrongShape {
            path: path.to_string(),
            expected: "array of bullet nodes",
        });
    };
    for (i, item) in items.iter().enumerate() {
        check_bullet_node(item, &format!("{path}[{i}]"))?;
    }
    Ok(())
}

fn check_bullet_node(value: &Value, path: &str) -> Result<(), SchemaError> {
    let Some(obj) = value.as_object() else {
        return Err(SchemaError::WrongShape {
            path: path.to_string(),
            expected: "bullet node object",
        });
    };
    match obj.get("content") {
        Some(Value::String(_)) => {}
        Some(_) => {
            return Err(SchemaError::WrongShape {
                path: format!("{path}.content"),
                expected: "string",
            });
        }
        None => {
            return Err(SchemaError::MissingField {
                path: format!("{path}.content"),
            });
        }
    }
    if let Some(children) = obj.get("children") {
        check_bullet_forest(children, &format!("{path}.children"))?;
    }
    Ok(())
}
