//! Error taxonomy for analysis and fix application.
//!
//! Parsing and validation errors stop at the normalizer / finding-model
//! boundary and degrade to "no findings" or "fewer findings". Fix errors
//! always leave the document untouched.

use thiserror::Error;

/// Failures of an analysis request as a whole.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnalysisError {
    /// The selection was empty or whitespace only. Nothing is sent to the model.
    #[error("No text selected.")]
    EmptySelection,

    /// The model replied with something that is not a JSON array.
    #[error("Failed to parse AI response: {reason}")]
    MalformedResponse { reason: String },

    /// The model call itself failed (network, auth, refusal, ...).
    #[error("Analysis failed: {0}")]
    ModelCall(String),
}

impl AnalysisError {
    pub fn malformed(reason: impl Into<String>) -> Self {
        AnalysisError::MalformedResponse {
            reason: reason.into(),
        }
    }

    /// Whether the caller should surface this to the user as an error rather
    /// than an informational notice.
    pub fn is_user_error(&self) -> bool {
        !matches!(self, AnalysisError::EmptySelection)
    }
}

/// Failures while writing a fix back into the document.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FixError {
    /// The addressed line no longer exists (document or selection shrank).
    #[error("Cannot find target line {relative_line} (document line {absolute_line}, document has {line_count} lines)")]
    TargetLineNotFound {
        relative_line: usize,
        absolute_line: usize,
        line_count: usize,
    },

    /// The relative line is not inside the analyzed selection.
    #[error("Line {relative_line} is outside the analyzed selection ({selection_lines} lines)")]
    OutsideSelection {
        relative_line: usize,
        selection_lines: usize,
    },

    /// The document refused the edit (read-only buffer, failed write, ...).
    #[error("Failed to apply fix to line {relative_line}: {reason}")]
    EditRejected { relative_line: usize, reason: String },
}

impl FixError {
    pub fn relative_line(&self) -> usize {
        match self {
            FixError::TargetLineNotFound { relative_line, .. }
            | FixError::OutsideSelection { relative_line, .. }
            | FixError::EditRejected { relative_line, .. } => *relative_line,
        }
    }
}

/// Why a single element of the model's array was dropped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaViolation {
    #[error("element is not a JSON object")]
    NotAnObject,

    #[error("missing required field `{0}`")]
    MissingField(&'static str),

    #[error("field `{field}` has the wrong type (expected {expected})")]
    WrongType {
        field: &'static str,
        expected: &'static str,
    },

    #[error("line number must be a positive integer, got {0}")]
    InvalidLine(String),

    #[error("unrecognized severity `{0}`")]
    UnknownSeverity(String),

    #[error("line {line} is outside the {selection_lines}-line selection")]
    LineOutsideSelection { line: usize, selection_lines: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_selection_is_not_a_user_error() {
        assert!(!AnalysisError::EmptySelection.is_user_error());
        assert!(AnalysisError::malformed("eof").is_user_error());
    }

    #[test]
    fn test_fix_error_reports_relative_line() {
        let err = FixError::TargetLineNotFound {
            relative_line: 4,
            absolute_line: 13,
            line_count: 10,
        };
        assert_eq!(err.relative_line(), 4);
        assert!(err.to_string().contains("target line 4"));
    }

    #[test]
    fn test_schema_violation_messages_name_the_field() {
        let err = SchemaViolation::MissingField("severity");
        assert_eq!(err.to_string(), "missing required field `severity`");
    }
}
