//! The block of text a user chose to analyze.

use crate::error::AnalysisError;

/// A contiguous block of document text plus where it starts.
///
/// `start_line` is the 0-based index of the selection's first line in the
/// owning document. Relative lines reported by the model are 1-based indexes
/// into `text`, so relative line `r` lives at document line
/// `start_line + r - 1`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    text: String,
    start_line: usize,
}

impl Selection {
    /// Build a selection, rejecting text that is empty after trimming.
    pub fn new(text: impl Into<String>, start_line: usize) -> Result<Self, AnalysisError> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(AnalysisError::EmptySelection);
        }
        Ok(Self { text, start_line })
    }

    /// Select document lines `start..=end` (0-based, inclusive), clamped to the
    /// document. An empty or inverted range is an empty selection.
    pub fn from_lines<S: AsRef<str>>(
        lines: &[S],
        start: usize,
        end: usize,
    ) -> Result<Self, AnalysisError> {
        if lines.is_empty() || start > end || start >= lines.len() {
            return Err(AnalysisError::EmptySelection);
        }
        let end = end.min(lines.len() - 1);
        let text = lines[start..=end]
            .iter()
            .map(AsRef::as_ref)
            .collect::<Vec<_>>()
            .join("\n");
        Self::new(text, start)
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn start_line(&self) -> usize {
        self.start_line
    }

    /// Number of lines in the selection.
    pub fn line_count(&self) -> usize {
        self.text.lines().count().max(1)
    }

    /// 0-based document index of the selection's last line.
    pub fn end_line(&self) -> usize {
        self.start_line + self.line_count() - 1
    }

    /// Document line addressed by a 1-based relative line.
    pub fn absolute_line(&self, relative_line: usize) -> usize {
        absolute_line(self.start_line, relative_line)
    }

    pub fn span(&self) -> LineSpan {
        LineSpan::new(self.start_line, self.line_count())
    }
}

/// Where a selection sits in its document: its first line (0-based) and how
/// many lines it covers. This is all the fix host keeps of a selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineSpan {
    pub start: usize,
    pub len: usize,
}

impl LineSpan {
    pub fn new(start: usize, len: usize) -> Self {
        Self { start, len }
    }

    /// Whether a 1-based relative line falls inside the span.
    pub fn contains(&self, relative_line: usize) -> bool {
        (1..=self.len).contains(&relative_line)
    }
}

/// Map a 1-based relative line onto a 0-based document line.
///
/// A relative line of 0 is not valid input; it saturates to the selection's
/// first line rather than underflowing.
pub fn absolute_line(start_line: usize, relative_line: usize) -> usize {
    (start_line + relative_line).saturating_sub(1)
}
