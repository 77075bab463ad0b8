//! Diff rendering backed by `similar`.

use std::fmt::Write as _;

use similar::TextDiff;

use crate::application::render::{DiffHtmlOptions, DiffRenderer, RenderError};

pub const DEFAULT_MAX_INPUT_BYTES: usize = 1024 * 1024;
const CONTEXT_RADIUS: usize = 3;

#[derive(Debug, Clone)]
pub struct SimilarDiffRenderer {
    max_input_bytes: usize,
}

impl Default for SimilarDiffRenderer {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_INPUT_BYTES)
    }
}

impl SimilarDiffRenderer {
    pub fn new(max_input_bytes: usize) -> Self {
        Self { max_input_bytes }
    }

    fn check_size(&self, actual: usize) -> Result<(), RenderError> {
        if actual > self.max_input_bytes {
            return Err(RenderError::InputTooLarge {
                actual,
                limit: self.max_input_bytes,
            });
        }
        Ok(())
    }
}

impl DiffRenderer for SimilarDiffRenderer {
    fn unified_diff(&self, label: &str, old: &str, new: &str) -> Result<String, RenderError> {
        self.check_size(old.len().saturating_add(new.len()))?;

        let old_header = format!("a/{label}");
        let new_header = format!("b/{label}");
        let diff = TextDiff::from_lines(old, new);
        Ok(diff
            .unified_diff()
            .context_radius(CONTEXT_RADIUS)
            .header(&old_header, &new_header)
            .to_string())
    }

    fn render_html(
        &self,
        diff_text: &str,
        options: &DiffHtmlOptions,
    ) -> Result<String, RenderError> {
        self.check_size(diff_text.len())?;
        let lines = parse_unified(diff_text)?;

        let mut html = String::with_capacity(diff_text.len() * 2);
        html.push_str("<div class=\"diff\">\n");
        if let Some(title) = options.title.as_deref() {
            let _ = writeln!(html, "<h3 class=\"diff-title\">{}</h3>", escape_html(title));
        }
        html.push_str("<table class=\"diff-table\">\n");
        if options.side_by_side {
            render_side_by_side(&mut html, &lines, options.line_numbers);
        } else {
            render_inline(&mut html, &lines, options.line_numbers);
        }
        html.push_str("</table>\n</div>\n");
        Ok(html)
    }
}

#[derive(Debug, Clone, PartialEq)]
enum DiffLine<'a> {
    Hunk(&'a str),
    Context {
        old: usize,
        new: usize,
        text: &'a str,
    },
    Removed {
        old: usize,
        text: &'a str,
    },
    Added {
        new: usize,
        text: &'a str,
    },
    Note(&'a str),
}

fn parse_unified(diff_text: &str) -> Result<Vec<DiffLine<'_>>, RenderError> {
    let mut lines = Vec::new();
    let mut cursor: Option<(usize, usize)> = None;

    for (index, raw) in diff_text.lines().enumerate() {
        if raw.starts_with("@@") {
            cursor = Some(parse_hunk_header(raw).ok_or_else(|| {
                RenderError::Malformed(format!("bad hunk header on line {}", index + 1))
            })?);
            lines.push(DiffLine::Hunk(raw));
            continue;
        }

        let Some((old, new)) = cursor.as_mut() else {
            if raw.starts_with("---") || raw.starts_with("+++") || raw.is_empty() {
                continue;
            }
            return Err(RenderError::Malformed(format!(
                "line {} appears before the first hunk",
                index + 1
            )));
        };

        match raw.chars().next() {
            Some('+') => {
                lines.push(DiffLine::Added {
                    new: *new,
                    text: &raw[1..],
                });
                *new += 1;
            }
            Some('-') => {
                lines.push(DiffLine::Removed {
                    old: *old,
                    text: &raw[1..],
                });
                *old += 1;
            }
            Some(' ') | None => {
                lines.push(DiffLine::Context {
                    old: *old,
                    new: *new,
                    text: raw.get(1..).unwrap_or(""),
                });
                *old += 1;
                *new += 1;
            }
            Some('\\') => lines.push(DiffLine::Note(raw)),
            Some(_) => {
                return Err(RenderError::Malformed(format!(
                    "unexpected marker on line {}",
                    index + 1
                )));
            }
        }
    }

    Ok(lines)
}

/// Starting line numbers from `@@ -a,b +c,d @@`.
fn parse_hunk_header(line: &str) -> Option<(usize, usize)> {
    let mut parts = line.trim_start_matches('@').split_whitespace();
    let old = parts.next()?.strip_prefix('-')?;
    let new = parts.next()?.strip_prefix('+')?;
    let start = |range: &str| range.split(',').next()?.parse::<usize>().ok();
    Some((start(old)?, start(new)?))
}

fn number_cell(html: &mut String, number: Option<usize>, enabled: bool) {
    if !enabled {
        return;
    }
    match number {
        Some(number) => {
            let _ = write!(html, "<td class=\"diff-ln\">{number}</td>");
        }
        None => html.push_str("<td class=\"diff-ln\"></td>"),
    }
}

fn render_inline(html: &mut String, lines: &[DiffLine<'_>], line_numbers: bool) {
    let columns = if line_numbers { 3 } else { 1 };
    for line in lines {
        match line {
            DiffLine::Hunk(text) | DiffLine::Note(text) => {
                let _ = writeln!(
                    html,
                    "<tr class=\"diff-hunk\"><td colspan=\"{columns}\">{}</td></tr>",
                    escape_html(text)
                );
            }
            DiffLine::Context { old, new, text } => {
                html.push_str("<tr class=\"diff-context\">");
                number_cell(html, Some(*old), line_numbers);
                number_cell(html, Some(*new), line_numbers);
                let _ = writeln!(html, "<td class=\"diff-code\"> {}</td></tr>", escape_html(text));
            }
            DiffLine::Removed { old, text } => {
                html.push_str("<tr class=\"diff-del\">");
                number_cell(html, Some(*old), line_numbers);
                number_cell(html, None, line_numbers);
                let _ = writeln!(html, "<td class=\"diff-code\">-{}</td></tr>", escape_html(text));
            }
            DiffLine::Added { new, text } => {
                html.push_str("<tr class=\"diff-add\">");
                number_cell(html, None, line_numbers);
                number_cell(html, Some(*new), line_numbers);
                let _ = writeln!(html, "<td class=\"diff-code\">+{}</td></tr>", escape_html(text));
            }
        }
    }
}

/// Removed and added runs are paired row by row; the shorter side is padded.
fn render_side_by_side(html: &mut String, lines: &[DiffLine<'_>], line_numbers: bool) {
    let columns = if line_numbers { 4 } else { 2 };
    let mut removed: Vec<(usize, &str)> = Vec::new();
    let mut added: Vec<(usize, &str)> = Vec::new();

    let flush = |html: &mut String, removed: &mut Vec<(usize, &str)>, added: &mut Vec<(usize, &str)>| {
        let rows = removed.len().max(added.len());
        for row in 0..rows {
            html.push_str("<tr class=\"diff-change\">");
            side_cells(html, removed.get(row).copied(), "diff-del", line_numbers);
            side_cells(html, added.get(row).copied(), "diff-add", line_numbers);
            html.push_str("</tr>\n");
        }
        removed.clear();
        added.clear();
    };

    for line in lines {
        match line {
            DiffLine::Removed { old, text } => removed.push((*old, *text)),
            DiffLine::Added { new, text } => added.push((*new, *text)),
            DiffLine::Hunk(text) | DiffLine::Note(text) => {
                flush(html, &mut removed, &mut added);
                let _ = writeln!(
                    html,
                    "<tr class=\"diff-hunk\"><td colspan=\"{columns}\">{}</td></tr>",
                    escape_html(text)
                );
            }
            DiffLine::Context { old, new, text } => {
                flush(html, &mut removed, &mut added);
                html.push_str("<tr class=\"diff-context\">");
                side_cells(html, Some((*old, *text)), "diff-code", line_numbers);
                side_cells(html, Some((*new, *text)), "diff-code", line_numbers);
                html.push_str("</tr>\n");
            }
        }
    }
    flush(html, &mut removed, &mut added);
}

fn side_cells(html: &mut String, cell: Option<(usize, &str)>, class: &str, line_numbers: bool) {
    match cell {
        Some((number, text)) => {
            number_cell(html, Some(number), line_numbers);
            let _ = write!(html, "<td class=\"{class}\">{}</td>", escape_html(text));
        }
        None => {
            number_cell(html, None, line_numbers);
            html.push_str("<td class=\"diff-empty\"></td>");
        }
    }
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}
