//! Contracts between the results surface, the fix host and the model.

use crate::error::FixError;
use crate::fix::{apply_fix, AppliedFix, DocumentEditor};
use crate::prompt::AnalysisRequest;
use crate::selection::LineSpan;
use anyhow::Result;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Anything that can turn a prompt into the model's raw reply text.
pub trait ModelClient: Send + Sync {
    fn complete<'a>(&'a self, request: &'a AnalysisRequest) -> BoxFuture<'a, Result<String>>;
}

/// Surface -> host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "camelCase")]
pub enum SurfaceMessage {
    #[serde(rename_all = "camelCase")]
    ApplyFix {
        relative_line: usize,
        fix_text: String,
    },
}

/// Host -> surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "camelCase")]
pub enum HostMessage {
    #[serde(rename_all = "camelCase")]
    FixSucceeded { relative_line: usize },
    #[serde(rename_all = "camelCase")]
    FixFailed {
        relative_line: usize,
        reason: String,
    },
}

impl SurfaceMessage {
    pub fn relative_line(&self) -> usize {
        match self {
            SurfaceMessage::ApplyFix { relative_line, .. } => *relative_line,
        }
    }
}

impl HostMessage {
    pub fn relative_line(&self) -> usize {
        match self {
            HostMessage::FixSucceeded { relative_line }
            | HostMessage::FixFailed { relative_line, .. } => *relative_line,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, HostMessage::FixSucceeded { .. })
    }
}

impl From<&FixError> for HostMessage {
    fn from(err: &FixError) -> Self {
        HostMessage::FixFailed {
            relative_line: err.relative_line(),
            reason: err.to_string(),
        }
    }
}

/// Owns the document for one analyzed selection and answers apply requests.
///
/// Requests are handled one at a time in arrival order. Every request gets
/// exactly one reply.
#[derive(Debug)]
pub struct FixHost<D> {
    document: D,
    span: LineSpan,
    applied: Vec<AppliedFix>,
}

impl<D: DocumentEditor> FixHost<D> {
    pub fn new(document: D, span: LineSpan) -> Self {
        Self {
            document,
            span,
            applied: Vec::new(),
        }
    }

    pub fn handle(&mut self, message: SurfaceMessage) -> HostMessage {
        match message {
            SurfaceMessage::ApplyFix {
                relative_line,
                fix_text,
            } => {
                if let Err(reason) = self.document.refresh() {
                    warn!(relative_line, %reason, "document could not be refreshed");
                    return HostMessage::from(&FixError::EditRejected {
                        relative_line,
                        reason,
                    });
                }
                match apply_fix(&mut self.document, self.span, relative_line, &fix_text) {
                    Ok(applied) => {
                        self.applied.push(applied);
                        HostMessage::FixSucceeded { relative_line }
                    }
                    Err(err) => HostMessage::from(&err),
                }
            }
        }
    }

    pub fn span(&self) -> LineSpan {
        self.span
    }

    /// Edits made so far, oldest first.
    pub fn applied(&self) -> &[AppliedFix] {
        &self.applied
    }

    pub fn document(&self) -> &D {
        &self.document
    }

    pub fn document_mut(&mut self) -> &mut D {
        &mut self.document
    }

    pub fn into_document(self) -> D {
        self.document
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fix::MemoryDocument;
    use crate::selection::Selection;

    #[test]
    fn test_wire_format() {
        let msg = SurfaceMessage::ApplyFix {
            relative_line: 3,
            fix_text: "return 0;".to_string(),
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"command": "applyFix", "relativeLine": 3, "fixText": "return 0;"})
        );

        let reply: HostMessage =
            serde_json::from_str(r#"{"command":"fixSucceeded","relativeLine":3}"#).unwrap();
        assert_eq!(reply, HostMessage::FixSucceeded { relative_line: 3 });

        let failed = serde_json::to_value(HostMessage::FixFailed {
            relative_line: 2,
            reason: "nope".to_string(),
        })
        .unwrap();
        assert_eq!(failed["command"], "fixFailed");
        assert_eq!(failed["reason"], "nope");
    }

    #[test]
    fn test_host_applies_relative_to_selection() {
        let doc = MemoryDocument::from_text("a\nb\nc\nd\n");
        let mut host = FixHost::new(doc, LineSpan::new(2, 2));
        let reply = host.handle(SurfaceMessage::ApplyFix {
            relative_line: 2,
            fix_text: "D".to_string(),
        });
        assert!(reply.is_success());
        assert_eq!(host.document().text(), "a\nb\nc\nD\n");
        assert_eq!(host.applied().len(), 1);
        assert_eq!(host.applied()[0].absolute_line, 3);
    }

    struct StaleDocument(MemoryDocument);

    impl DocumentEditor for StaleDocument {
        fn line_count(&self) -> usize {
            self.0.line_count()
        }

        fn line(&self, index: usize) -> Option<String> {
            self.0.line(index)
        }

        fn replace_line(&mut self, index: usize, text: &str) -> Result<(), String> {
            self.0.replace_line(index, text)
        }

        fn refresh(&mut self) -> Result<(), String> {
            Err("file was deleted".to_string())
        }
    }

    #[test]
    fn test_refresh_failure_rejects_without_edit() {
        let mut host = FixHost::new(
            StaleDocument(MemoryDocument::from_text("a\n")),
            LineSpan::new(0, 1),
        );
        let reply = host.handle(SurfaceMessage::ApplyFix {
            relative_line: 1,
            fix_text: "b".to_string(),
        });
        match reply {
            HostMessage::FixFailed { reason, .. } => assert!(reason.contains("file was deleted")),
            other => panic!("unexpected reply: {:?}", other),
        }
        assert_eq!(host.document().0.text(), "a\n");
        assert!(host.applied().is_empty());
    }

    #[test]
    fn test_host_replies_failure_for_missing_line() {
        let doc = MemoryDocument::from_text("a\nb\n");
        let mut host = FixHost::new(doc, LineSpan::new(0, 5));
        let reply = host.handle(SurfaceMessage::ApplyFix {
            relative_line: 5,
            fix_text: "x".to_string(),
        });
        assert_eq!(reply.relative_line(), 5);
        assert!(!reply.is_success());
        assert_eq!(host.into_document().text(), "a\nb\n");
    }

    #[test]
    fn test_host_refuses_line_outside_selection() {
        let doc = MemoryDocument::from_text("a\nb\nc\nd\ne\n");
        let selection = Selection::from_lines(doc.lines(), 1, 2).unwrap();
        let mut host = FixHost::new(doc, selection.span());

        let reply = host.handle(SurfaceMessage::ApplyFix {
            relative_line: 4,
            fix_text: "X".to_string(),
        });
        match reply {
            HostMessage::FixFailed {
                relative_line,
                reason,
            } => {
                assert_eq!(relative_line, 4);
                assert!(reason.contains("outside the analyzed selection"));
            }
            other => panic!("unexpected reply: {:?}", other),
        }
        assert!(host.applied().is_empty());
        assert_eq!(host.into_document().text(), "a\nb\nc\nd\ne\n");
    }
}
