//! Logging and debugging facilities for Trellis.
//!
//! This module provides:
//! - Target and span names for filtering `tracing` output by subsystem
//! - Shared tree-rendering options used by debug visualizers
//!
//! # Tracing Integration
//!
//! Trellis uses the `tracing` crate for instrumentation. To see logs,
//! install a subscriber in your application:
//!
//! ```ignore
//! tracing_subscriber::fmt()
//!     .with_env_filter("trellis::model=debug,trellis_core=trace")
//!     .init();
//! ```

/// Span names used throughout Trellis for tracing.
pub mod span_names {
    /// Signal emission span.
    pub const SIGNAL: &str = "trellis::signal";
    /// Model change emission span.
    pub const MODEL_CHANGE: &str = "trellis::model::change";
    /// Model (de)serialization span.
    pub const SERIALIZE: &str = "trellis::model::serialize";
}

/// Target names for log filtering.
///
/// Use these with `tracing` directives to filter logs by subsystem.
pub mod targets {
    /// Core framework target.
    pub const CORE: &str = "trellis_core";
    /// Signal/event bus target.
    pub const SIGNAL: &str = "trellis_core::signal";
    /// Reactive value target.
    pub const VARYING: &str = "trellis_core::varying";
    /// Observable collection target.
    pub const COLLECTION: &str = "trellis::collection";
    /// Model target.
    pub const MODEL: &str = "trellis::model";
}

/// Style options for tree visualization.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TreeStyle {
    /// ASCII characters for tree branches.
    Ascii,
    /// Unicode box-drawing characters.
    #[default]
    Unicode,
    /// Compact single-line representation.
    Compact,
}

/// Configuration for tree debug output.
#[derive(Debug, Clone)]
pub struct TreeFormatOptions {
    /// The style of tree visualization.
    pub style: TreeStyle,
    /// Whether to show node identities.
    pub show_ids: bool,
    /// Whether to show leaf values.
    pub show_values: bool,
    /// Maximum depth to traverse (None for unlimited).
    pub max_depth: Option<usize>,
    /// Indent size for each level.
    pub indent_size: usize,
}

impl Default for TreeFormatOptions {
    fn default() -> Self {
        Self {
            style: TreeStyle::default(),
            show_ids: true,
            show_values: true,
            max_depth: None,
            indent_size: 2,
        }
    }
}

impl TreeFormatOptions {
    /// Create options for detailed debugging output.
    pub fn detailed() -> Self {
        Self::default()
    }

    /// Create options for minimal output.
    pub fn minimal() -> Self {
        Self {
            show_ids: false,
            show_values: false,
            ..Default::default()
        }
    }

    /// Build the prefix string for a tree node at `depth`.
    pub fn prefix(&self, depth: usize, is_last: bool) -> String {
        if depth == 0 {
            return String::new();
        }

        let (branch, corner, last) = match self.style {
            TreeStyle::Ascii => ("|", "+--", "`--"),
            TreeStyle::Unicode => (
                "\u{2502}",
                "\u{251c}\u{2500}\u{2500}",
                "\u{2514}\u{2500}\u{2500}",
            ),
            TreeStyle::Compact => ("", "-", "-"),
        };

        let mut prefix = String::new();
        for _ in 0..(depth - 1) {
            prefix.push_str(branch);
            for _ in 0..self.indent_size {
                prefix.push(' ');
            }
        }
        prefix.push_str(if is_last { last } else { corner });
        prefix.push(' ');
        prefix
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_root_is_empty() {
        assert_eq!(TreeFormatOptions::default().prefix(0, true), "");
    }

    #[test]
    fn test_ascii_prefix() {
        let options = TreeFormatOptions {
            style: TreeStyle::Ascii,
            ..Default::default()
        };
        assert_eq!(options.prefix(1, false), "+-- ");
        assert_eq!(options.prefix(2, true), "|  `-- ");
    }
}
