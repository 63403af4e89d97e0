//! Fix applicator: write one finding's fix over one document line.
//!
//! Every application is a same-line replacement. No line is ever inserted or
//! removed, so the relative-to-absolute mapping of every other finding stays
//! valid and fixes can be applied in any order.
//!
//! Consequence: a fix that really needs a new line (a missing header, say) is
//! flattened onto the target line with a space instead of being inserted.
//! The formatting is wrong but every other finding still addresses the right
//! line.

use crate::error::FixError;
use crate::selection::{absolute_line, LineSpan};
use serde::Serialize;
use tracing::{info, warn};

/// The host's text buffer, addressed by 0-based line index.
pub trait DocumentEditor {
    fn line_count(&self) -> usize;

    /// Text of a line without its terminator.
    fn line(&self, index: usize) -> Option<String>;

    /// Replace the full text of one line as a single atomic edit.
    ///
    /// `Err` carries the reason the buffer refused the edit; the buffer must
    /// be unchanged in that case.
    fn replace_line(&mut self, index: usize, text: &str) -> Result<(), String>;

    /// Re-sync with backing storage before an edit is resolved.
    fn refresh(&mut self) -> Result<(), String> {
        Ok(())
    }
}

/// Record of a successful application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppliedFix {
    pub relative_line: usize,
    pub absolute_line: usize,
    pub previous_text: String,
    pub new_text: String,
}

fn is_line_break(c: char) -> bool {
    c == '\n' || c == '\r'
}

/// Whether the fix carries an intended multi-line layout.
pub fn is_multi_line(fix: &str) -> bool {
    fix.contains(is_line_break)
}

/// Collapse a multi-line fix into one line.
///
/// Segments are joined with a single space; whitespace at each join point
/// and empty segments are dropped. The first segment keeps its leading
/// indentation. Single-line fixes are returned unchanged.
pub fn flatten_fix(fix: &str) -> String {
    if !is_multi_line(fix) {
        return fix.to_string();
    }

    let mut out = String::with_capacity(fix.len());
    for (i, segment) in fix.split(is_line_break).enumerate() {
        let segment = if i == 0 || out.is_empty() {
            segment.trim_end()
        } else {
            segment.trim()
        };
        if segment.trim().is_empty() {
            continue;
        }
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(segment);
    }
    out
}

/// The fix split at its line-break markers, for display only.
pub fn display_lines(fix: &str) -> Vec<&str> {
    let lines: Vec<&str> = fix.lines().collect();
    if lines.is_empty() {
        vec![""]
    } else {
        lines
    }
}

/// Apply a fix to the document line addressed by `relative_line`.
///
/// `span` is where the analyzed selection sits in the document. A relative
/// line outside the span is refused even when the document has that line.
/// On any error the document is left untouched.
pub fn apply_fix<D: DocumentEditor + ?Sized>(
    doc: &mut D,
    span: LineSpan,
    relative_line: usize,
    fix: &str,
) -> Result<AppliedFix, FixError> {
    if !span.contains(relative_line) {
        warn!(relative_line, selection_lines = span.len, "fix target is outside the selection");
        return Err(FixError::OutsideSelection {
            relative_line,
            selection_lines: span.len,
        });
    }

    let absolute = absolute_line(span.start, relative_line);
    let line_count = doc.line_count();
    let not_found = || FixError::TargetLineNotFound {
        relative_line,
        absolute_line: absolute,
        line_count,
    };

    if absolute >= line_count {
        warn!(relative_line, absolute, line_count, "fix target line is gone");
        return Err(not_found());
    }
    let previous_text = doc.line(absolute).ok_or_else(not_found)?;

    let new_text = flatten_fix(fix);
    doc.replace_line(absolute, &new_text).map_err(|reason| {
        warn!(relative_line, absolute, %reason, "document rejected fix");
        FixError::EditRejected {
            relative_line,
            reason,
        }
    })?;

    info!(relative_line, absolute, "applied fix");
    Ok(AppliedFix {
        relative_line,
        absolute_line: absolute,
        previous_text,
        new_text,
    })
}

/// In-memory document.
///
/// Lines split exactly as `str::lines` splits them: on `\n`, with one
/// trailing `\r` stripped. Each line remembers its own terminator so `text()`
/// reproduces the input, mixed line endings included, apart from edited lines.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MemoryDocument {
    lines: Vec<String>,
    endings: Vec<&'static str>,
    read_only: bool,
}

impl MemoryDocument {
    pub fn from_text(text: &str) -> Self {
        let mut lines = Vec::new();
        let mut endings = Vec::new();
        let mut rest = text;
        while !rest.is_empty() {
            let (line, ending, next) = match rest.find('\n') {
                Some(pos) => match rest[..pos].strip_suffix('\r') {
                    Some(line) => (line, "\r\n", &rest[pos + 1..]),
                    None => (&rest[..pos], "\n", &rest[pos + 1..]),
                },
                None => (rest, "", ""),
            };
            lines.push(line.to_string());
            endings.push(ending);
            rest = next;
        }
        Self {
            lines,
            endings,
            read_only: false,
        }
    }

    pub fn read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn text(&self) -> String {
        let mut text = String::new();
        for (line, ending) in self.lines.iter().zip(&self.endings) {
            text.push_str(line);
            text.push_str(ending);
        }
        text
    }

    /// Shrink the document, as if the user deleted lines after analysis.
    pub fn truncate(&mut self, line_count: usize) {
        self.lines.truncate(line_count);
        self.endings.truncate(line_count);
    }
}

impl DocumentEditor for MemoryDocument {
    fn line_count(&self) -> usize {
        self.lines.len()
    }

    fn line(&self, index: usize) -> Option<String> {
        self.lines.get(index).cloned()
    }

    fn replace_line(&mut self, index: usize, text: &str) -> Result<(), String> {
        if self.read_only {
            return Err("document is read-only".to_string());
        }
        let slot = self
            .lines
            .get_mut(index)
            .ok_or_else(|| format!("line {} is out of range", index))?;
        *slot = text.to_string();
        Ok(())
    }
}
