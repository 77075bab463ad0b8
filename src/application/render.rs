//! Diff rendering seam.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("diff input of {actual} bytes exceeds the {limit} byte limit")]
    InputTooLarge { actual: usize, limit: usize },
    #[error("diff text is malformed: {0}")]
    Malformed(String),
}

/// Presentation knobs for HTML diff output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffHtmlOptions {
    /// Render old and new columns next to each other instead of one column.
    pub side_by_side: bool,
    /// Emit line numbers in a gutter.
    pub line_numbers: bool,
    /// Optional heading placed above the diff.
    pub title: Option<String>,
}

impl Default for DiffHtmlOptions {
    fn default() -> Self {
        Self {
            side_by_side: false,
            line_numbers: true,
            title: None,
        }
    }
}

/// Produces and formats textual diffs. Implementations must be pure.
pub trait DiffRenderer: Send + Sync {
    /// Unified diff of `old` against `new`, with `label` used in the file header.
    fn unified_diff(&self, label: &str, old: &str, new: &str) -> Result<String, RenderError>;

    fn render_html(&self, diff_text: &str, options: &DiffHtmlOptions)
    -> Result<String, RenderError>;
}
