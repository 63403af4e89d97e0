//! The single analysis pipeline shared by both modes:
//! prompt -> model -> normalize -> validate -> order -> filter.
//!
//! Nothing here returns an error to the caller. Every failure becomes an
//! [`AnalysisReport`] with no findings and the error attached.

use linefix_core::finding::validate;
use linefix_core::response::normalize_response;
use linefix_core::{
    AnalysisError, AnalysisMode, AnalysisRequest, EdgeCase, FindingSet, ModelClient,
    RejectedElement, Selection,
};
use serde::ser::SerializeStruct;
use serde::Serialize;
use tracing::{debug, info, warn};

/// Outcome of one analysis invocation.
#[derive(Debug, Clone)]
pub struct AnalysisReport {
    pub mode: AnalysisMode,
    pub findings: FindingSet,
    pub edge_cases: Vec<EdgeCase>,
    pub error: Option<AnalysisError>,
}

impl Serialize for AnalysisReport {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("AnalysisReport", 5)?;
        state.serialize_field("mode", &self.mode)?;
        state.serialize_field("findings", self.findings.all())?;
        state.serialize_field("edgeCases", &self.edge_cases)?;
        state.serialize_field("rejected", self.findings.rejected())?;
        state.serialize_field("error", &self.error.as_ref().map(ToString::to_string))?;
        state.end()
    }
}

impl AnalysisReport {
    /// A report that carries only `error`.
    pub fn from_error(mode: AnalysisMode, error: AnalysisError) -> Self {
        Self {
            mode,
            findings: FindingSet::empty(mode.post_filter()),
            edge_cases: Vec::new(),
            error: Some(error),
        }
    }

    /// Elements the model sent that failed validation, in array order.
    pub fn rejected(&self) -> &[RejectedElement] {
        self.findings.rejected()
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// A successful run with nothing to show.
    pub fn is_no_issues(&self) -> bool {
        self.is_success() && self.findings.is_empty() && self.edge_cases.is_empty()
    }

    /// Message for the user, if the outcome deserves one.
    pub fn notice(&self) -> Option<String> {
        match &self.error {
            Some(err) => Some(err.to_string()),
            None if self.is_no_issues() => Some("No issues found".to_string()),
            None => None,
        }
    }
}

/// Turn a raw model reply into a report. Pure.
pub fn analyze_response(raw: &str, mode: AnalysisMode) -> AnalysisReport {
    report_from_reply(raw, mode, None)
}

/// Like [`analyze_response`], also rejecting findings that address a line
/// past the end of a `selection_lines`-line selection.
pub fn analyze_response_within(
    raw: &str,
    mode: AnalysisMode,
    selection_lines: usize,
) -> AnalysisReport {
    report_from_reply(raw, mode, Some(selection_lines))
}

fn report_from_reply(raw: &str, mode: AnalysisMode, selection_lines: Option<usize>) -> AnalysisReport {
    let elements = match normalize_response(raw) {
        Ok(elements) => elements,
        Err(err) => return AnalysisReport::from_error(mode, err),
    };

    let report = match mode {
        AnalysisMode::Review => AnalysisReport {
            mode,
            findings: match selection_lines {
                Some(lines) => FindingSet::from_elements_within(&elements, mode.post_filter(), lines),
                None => FindingSet::from_elements(&elements, mode.post_filter()),
            },
            edge_cases: Vec::new(),
            error: None,
        },
        AnalysisMode::EdgeCases => {
            let (edge_cases, rejected) = validate::<EdgeCase>(&elements);
            AnalysisReport {
                mode,
                findings: FindingSet::from_findings(Vec::new(), rejected, mode.post_filter()),
                edge_cases,
                error: None,
            }
        }
    };

    for rejected in report.rejected() {
        warn!(index = rejected.index, violation = %rejected.violation, "model element rejected");
    }
    info!(
        mode = mode.label(),
        elements = elements.len(),
        findings = report.findings.len(),
        actionable = report.findings.actionable_count(),
        edge_cases = report.edge_cases.len(),
        rejected = report.rejected().len(),
        "analysis complete"
    );
    report
}

/// Run one analysis of `selection` through `client`.
///
/// An empty selection returns immediately without calling the model.
pub async fn run_analysis<C>(client: &C, selection: &Selection, mode: AnalysisMode) -> AnalysisReport
where
    C: ModelClient + ?Sized,
{
    let request = match AnalysisRequest::build(selection, mode) {
        Ok(request) => request,
        Err(err) => return AnalysisReport::from_error(mode, err),
    };
    debug!(
        mode = mode.label(),
        start_line = selection.start_line(),
        lines = selection.line_count(),
        "sending analysis request"
    );

    match client.complete(&request).await {
        Ok(raw) => analyze_response_within(&raw, mode, selection.line_count()),
        Err(err) => {
            warn!(error = %err, "model call failed");
            AnalysisReport::from_error(mode, AnalysisError::ModelCall(format!("{:#}", err)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use linefix_core::Severity;

    #[test]
    fn test_review_response_is_ordered_and_filtered() {
        let raw = r#"```json
[
  {"relativeLine": 3, "severity": "error", "finding": "a", "fix": "x"},
  {"relativeLine": 1, "severity": "Info", "finding": "b", "fix": "y"},
  {"relativeLine": 1, "severity": "WARNING", "finding": "c", "fix": "z"},
  {"severity": "Error", "finding": "no line", "fix": "w"}
]
```"#;
        let report = analyze_response(raw, AnalysisMode::Review);
        assert!(report.is_success());
        let lines: Vec<_> = report.findings.all().iter().map(|f| f.relative_line()).collect();
        assert_eq!(lines, vec![1, 1, 3]);
        assert_eq!(report.findings.all()[0].severity(), Severity::Info);
        assert_eq!(report.findings.actionable_count(), 2);
        assert_eq!(report.rejected().len(), 1);
        assert_eq!(report.rejected()[0].index, 3);
    }

    #[test]
    fn test_prose_fails_closed() {
        let report = analyze_response("Sure! Here are the issues I found:", AnalysisMode::Review);
        assert!(report.findings.is_empty());
        assert!(matches!(
            report.error,
            Some(AnalysisError::MalformedResponse { .. })
        ));
        assert!(report.notice().unwrap().starts_with("Failed to parse AI response"));
    }

    #[test]
    fn test_empty_array_is_no_issues() {
        let report = analyze_response("[]", AnalysisMode::Review);
        assert!(report.is_success());
        assert!(report.is_no_issues());
        assert_eq!(report.notice().as_deref(), Some("No issues found"));
    }

    #[test]
    fn test_edge_case_mode_collects_edge_cases() {
        let raw = r#"[
  {"Sr. No.": 1, "input": "\"\"", "actualOutput": "crash", "expectedOutput": "0", "isBug": true, "fixedCode": "if (!s) return 0;"},
  {"Sr. No.": "2", "input": 5, "actualOutput": "5", "expectedOutput": "5", "isBug": false, "fixedCode": ""},
  {"input": "missing outputs"}
]"#;
        let report = analyze_response(raw, AnalysisMode::EdgeCases);
        assert!(report.is_success());
        assert_eq!(report.edge_cases.len(), 2);
        assert!(report.edge_cases[0].is_bug);
        assert_eq!(report.edge_cases[1].fixed_code, None);
        assert_eq!(report.edge_cases[1].input, "5");
        assert_eq!(report.findings.actionable_count(), 0);
        assert_eq!(report.rejected().len(), 1);
    }

    #[test]
    fn test_report_serializes_error_as_text() {
        let report = analyze_response("{}", AnalysisMode::Review);
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["mode"], "review");
        assert!(json["error"].as_str().unwrap().contains("JSON array"));
        assert_eq!(json["findings"], serde_json::json!([]));
        assert_eq!(json["rejected"], serde_json::json!([]));
    }
}
