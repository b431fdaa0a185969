//! Placeholder template engine: `{{dotted.path}}` extraction, path
//! resolution, and the array rendering conventions.

pub mod bullets;
pub mod engine;

pub use bullets::render_bullet_forest;
pub use engine::{ArrayRenderKind, extract_placeholders, populate};
