//! Tree rendering of models and their shadow chains.
//!
//! ```
//! use trellis::model::{Model, Schema, ShadowTreeDebug};
//! use trellis::attrs;
//!
//! let saved = Model::new(&Schema::plain(), attrs! { "title" => "Draft" });
//! let draft = saved.shadow();
//! draft.set("title", "Final");
//!
//! let text = ShadowTreeDebug::new().format(&draft);
//! assert!(text.contains("title = \"Final\""));
//! assert!(text.contains("title = \"Draft\""));
//! ```

use std::fmt::{self, Write};

use trellis_core::{TreeFormatOptions, TreeStyle};

use super::store::Model;
use super::value::{Map, Value};

/// Debug utility for visualizing a model, its local attributes, the models
/// nested in them and the parents it shadows.
#[derive(Debug, Clone, Default)]
pub struct ShadowTreeDebug {
    options: TreeFormatOptions,
}

impl ShadowTreeDebug {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: TreeFormatOptions) -> Self {
        Self { options }
    }

    /// Render `model` as a tree.
    pub fn format(&self, model: &Model) -> String {
        let mut output = String::new();
        // Writing into a String cannot fail.
        let _ = self.write_model(&mut output, model, None, 0, true);
        output
    }

    fn exceeds_depth(&self, depth: usize) -> bool {
        self.options.max_depth.is_some_and(|max| depth > max)
    }

    fn write_model(
        &self,
        out: &mut String,
        model: &Model,
        label: Option<&str>,
        depth: usize,
        is_last: bool,
    ) -> fmt::Result {
        if self.exceeds_depth(depth) {
            return Ok(());
        }

        out.push_str(&self.options.prefix(depth, is_last));
        if let Some(label) = label {
            write!(out, "{label}: ")?;
        }
        out.push_str(model.schema().name());
        if self.options.show_ids {
            write!(out, " [{:#x}]", model.id())?;
        }
        if model.parent().is_some() && self.options.style != TreeStyle::Compact {
            out.push_str(" (shadow)");
        }
        out.push('\n');

        let attributes = model.attributes();
        let parent = model.parent();
        self.write_entries(out, &attributes, depth + 1, parent.is_none())?;
        if let Some(parent) = parent {
            self.write_model(out, parent, Some("parent"), depth + 1, true)?;
        }
        Ok(())
    }

    fn write_entries(&self, out: &mut String, map: &Map, depth: usize, last_group: bool) -> fmt::Result {
        if self.exceeds_depth(depth) {
            return Ok(());
        }
        let count = map.len();
        for (i, (key, value)) in map.iter().enumerate() {
            let is_last = last_group && i + 1 == count;
            match value {
                Value::Model(nested) => self.write_model(out, nested, Some(key), depth, is_last)?,
                Value::Map(nested) => {
                    writeln!(out, "{}{key}", self.options.prefix(depth, is_last))?;
                    self.write_entries(out, nested, depth + 1, true)?;
                }
                other => {
                    out.push_str(&self.options.prefix(depth, is_last));
                    out.push_str(key);
                    if self.options.show_values {
                        write!(out, " = {}", describe(other))?;
                    }
                    out.push('\n');
                }
            }
        }
        Ok(())
    }
}

fn describe(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::String(s) => format!("{s:?}"),
        Value::Reference(reference) if reference.is_resolved() => {
            format!("reference -> {}", describe(&reference.flat_value()))
        }
        Value::Reference(_) => "reference (pending)".to_string(),
        other => other.to_json().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attrs;
    use crate::model::Schema;

    #[test]
    fn test_format_shadow_chain() {
        let schema = Schema::builder("Post").build();
        let saved = Model::new(&schema, attrs! { "title" => "Draft", "meta.tags" => 2 });
        let draft = saved.shadow();
        draft.set("title", "Final");

        let output = ShadowTreeDebug::new().format(&draft);
        let lines: Vec<&str> = output.lines().collect();
        assert!(lines[0].starts_with("Post ["));
        assert!(lines[0].ends_with("(shadow)"));
        assert!(output.contains("parent: Post"));
        assert!(output.contains("tags = 2"));
    }

    #[test]
    fn test_minimal_hides_ids_and_values() {
        let model = Model::new(&Schema::plain(), attrs! { "k" => 1 });
        let output = ShadowTreeDebug::with_options(TreeFormatOptions::minimal()).format(&model);
        assert_eq!(output.lines().next(), Some("Model"));
        assert!(output.contains('k'));
        assert!(!output.contains("= 1"));
    }

    #[test]
    fn test_max_depth_truncates() {
        let root = Model::new(&Schema::plain(), attrs! { "a" => 1 });
        let shadow = root.shadow();
        shadow.set("b", 2);
        let options = TreeFormatOptions {
            max_depth: Some(1),
            ..TreeFormatOptions::default()
        };
        let output = ShadowTreeDebug::with_options(options).format(&shadow);
        assert!(output.contains("parent: Model"));
        assert!(!output.contains("a = 1"));
    }
}
