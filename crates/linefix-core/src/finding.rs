//! Finding model, schema validation and ordering.
//!
//! Every element of the model's array is checked on its own: a malformed
//! element becomes a [`RejectedElement`] with a diagnostic and the rest of the
//! batch carries on.

use crate::error::SchemaViolation;
use crate::prompt::PostFilter;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;

// Accepted wire names, first match wins. The prompt asks for the first name
// in each list; the others are spellings models (and older prompts) use.
const LINE_KEYS: &[&str] = &["relativeLine", "lineNumber", "line"];
const SEVERITY_KEYS: &[&str] = &["severity"];
const DESCRIPTION_KEYS: &[&str] = &["finding", "description"];
const ORIGINAL_KEYS: &[&str] = &["original", "originalText"];
const FIX_KEYS: &[&str] = &["fix", "proposedFix", "fixedCode"];
const RATIONALE_KEYS: &[&str] = &["explanation", "rationale"];

const SERIAL_KEYS: &[&str] = &["Sr. No.", "srNo", "serial"];
const INPUT_KEYS: &[&str] = &["input"];
const ACTUAL_KEYS: &[&str] = &["actualOutput", "actual"];
const EXPECTED_KEYS: &[&str] = &["expectedOutput", "expected"];
const IS_BUG_KEYS: &[&str] = &["isBug"];
const FIXED_CODE_KEYS: &[&str] = &["fixedCode", "fix"];

/// Severity level, normalized from case-insensitive input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl Severity {
    /// Parse `"error"`, `"WARNING"`, `" Info "`, ...
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "error" => Some(Severity::Error),
            "warning" => Some(Severity::Warning),
            "info" => Some(Severity::Info),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Severity::Error => "Error",
            Severity::Warning => "Warning",
            Severity::Info => "Info",
        }
    }

    /// Info findings are informational and never offered as fixable.
    pub fn is_actionable(&self) -> bool {
        !matches!(self, Severity::Info)
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// One reported issue. Immutable once built; applying its fix changes the
/// document and the results session, never the finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Finding {
    relative_line: usize,
    severity: Severity,
    description: String,
    original_text: String,
    proposed_fix: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    rationale: Option<String>,
}

impl Finding {
    pub fn new(
        relative_line: usize,
        severity: Severity,
        description: impl Into<String>,
        proposed_fix: impl Into<String>,
    ) -> Self {
        Self {
            relative_line,
            severity,
            description: description.into(),
            original_text: String::new(),
            proposed_fix: proposed_fix.into(),
            rationale: None,
        }
    }

    pub fn with_original_text(mut self, original: impl Into<String>) -> Self {
        self.original_text = original.into();
        self
    }

    pub fn with_rationale(mut self, rationale: impl Into<String>) -> Self {
        let rationale = rationale.into();
        self.rationale = (!rationale.trim().is_empty()).then_some(rationale);
        self
    }

    /// 1-based line within the selection.
    pub fn relative_line(&self) -> usize {
        self.relative_line
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// The line as the model echoed it. Display only; never used for edits.
    pub fn original_text(&self) -> &str {
        &self.original_text
    }

    /// Fix text as the model sent it, line-break markers included.
    pub fn proposed_fix(&self) -> &str {
        &self.proposed_fix
    }

    pub fn rationale(&self) -> Option<&str> {
        self.rationale.as_deref()
    }

    pub fn is_actionable(&self) -> bool {
        self.severity.is_actionable()
    }
}

/// One row of the edge-case table. Informational; never applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeCase {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub serial: Option<String>,
    pub input: String,
    pub actual_output: String,
    pub expected_output: String,
    pub is_bug: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fixed_code: Option<String>,
}

/// An element of the model's array that failed validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RejectedElement {
    /// Position in the model's array (0-based).
    pub index: usize,
    #[serde(serialize_with = "serialize_violation")]
    pub violation: SchemaViolation,
}

fn serialize_violation<S: serde::Serializer>(
    violation: &SchemaViolation,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_str(violation)
}

/// Outcome of checking one element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Checked<T> {
    Valid(T),
    Rejected(RejectedElement),
}

/// Something the model's array elements can be validated into.
pub trait Candidate: Sized {
    fn from_element(value: &Value) -> Result<Self, SchemaViolation>;
}

/// Check one element against the schema of `T`.
pub fn check_element<T: Candidate>(index: usize, value: &Value) -> Checked<T> {
    match T::from_element(value) {
        Ok(item) => Checked::Valid(item),
        Err(violation) => {
            debug!(index, %violation, "dropping model element");
            Checked::Rejected(RejectedElement { index, violation })
        }
    }
}

/// Split elements into accepted values (input order) and rejections.
pub fn validate<T: Candidate>(elements: &[Value]) -> (Vec<T>, Vec<RejectedElement>) {
    let mut accepted = Vec::with_capacity(elements.len());
    let mut rejected = Vec::new();
    for (index, value) in elements.iter().enumerate() {
        match check_element::<T>(index, value) {
            Checked::Valid(item) => accepted.push(item),
            Checked::Rejected(r) => rejected.push(r),
        }
    }
    (accepted, rejected)
}

impl Candidate for Finding {
    fn from_element(value: &Value) -> Result<Self, SchemaViolation> {
        let obj = value.as_object().ok_or(SchemaViolation::NotAnObject)?;

        let relative_line = parse_line(
            field(obj, LINE_KEYS).ok_or(SchemaViolation::MissingField("relativeLine"))?,
        )?;
        let severity_raw = required_str(obj, SEVERITY_KEYS, "severity")?;
        let severity = Severity::parse(&severity_raw)
            .ok_or_else(|| SchemaViolation::UnknownSeverity(severity_raw.clone()))?;
        let description = required_str(obj, DESCRIPTION_KEYS, "finding")?;
        let proposed_fix = required_str(obj, FIX_KEYS, "fix")?;
        let original_text = optional_str(obj, ORIGINAL_KEYS, "original")?.unwrap_or_default();
        let rationale = optional_str(obj, RATIONALE_KEYS, "explanation")?;

        let mut finding = Finding::new(relative_line, severity, description, proposed_fix)
            .with_original_text(original_text);
        if let Some(rationale) = rationale {
            finding = finding.with_rationale(rationale);
        }
        Ok(finding)
    }
}

impl Candidate for EdgeCase {
    fn from_element(value: &Value) -> Result<Self, SchemaViolation> {
        let obj = value.as_object().ok_or(SchemaViolation::NotAnObject)?;

        let input = required_text(obj, INPUT_KEYS, "input")?;
        let actual_output = required_text(obj, ACTUAL_KEYS, "actualOutput")?;
        let expected_output = required_text(obj, EXPECTED_KEYS, "expectedOutput")?;
        let serial = field(obj, SERIAL_KEYS).and_then(scalar_text);
        let is_bug = match field(obj, IS_BUG_KEYS) {
            None => actual_output.trim() != expected_output.trim(),
            Some(Value::Bool(b)) => *b,
            Some(Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "yes" => true,
                "false" | "no" => false,
                _ => {
                    return Err(SchemaViolation::WrongType {
                        field: "isBug",
                        expected: "boolean",
                    })
                }
            },
            Some(_) => {
                return Err(SchemaViolation::WrongType {
                    field: "isBug",
                    expected: "boolean",
                })
            }
        };
        let fixed_code = optional_str(obj, FIXED_CODE_KEYS, "fixedCode")?
            .filter(|code| !code.trim().is_empty());

        Ok(EdgeCase {
            serial,
            input,
            actual_output,
            expected_output,
            is_bug,
            fixed_code,
        })
    }
}

fn field<'a>(obj: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|key| obj.get(*key))
        .find(|value| !value.is_null())
}

fn required_str(
    obj: &Map<String, Value>,
    keys: &[&str],
    name: &'static str,
) -> Result<String, SchemaViolation> {
    optional_str(obj, keys, name)?.ok_or(SchemaViolation::MissingField(name))
}

fn optional_str(
    obj: &Map<String, Value>,
    keys: &[&str],
    name: &'static str,
) -> Result<Option<String>, SchemaViolation> {
    match field(obj, keys) {
        None => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(SchemaViolation::WrongType {
            field: name,
            expected: "string",
        }),
    }
}

/// Like `required_str`, but numbers and booleans are accepted as text.
fn required_text(
    obj: &Map<String, Value>,
    keys: &[&str],
    name: &'static str,
) -> Result<String, SchemaViolation> {
    let value = field(obj, keys).ok_or(SchemaViolation::MissingField(name))?;
    scalar_text(value).ok_or(SchemaViolation::WrongType {
        field: name,
        expected: "string",
    })
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn parse_line(value: &Value) -> Result<usize, SchemaViolation> {
    let line = match value {
        Value::Number(n) => n.as_u64().and_then(|n| usize::try_from(n).ok()),
        Value::String(s) => s.trim().parse::<usize>().ok(),
        _ => {
            return Err(SchemaViolation::WrongType {
                field: "relativeLine",
                expected: "positive integer",
            })
        }
    };
    match line {
        Some(line) if line >= 1 => Ok(line),
        _ => Err(SchemaViolation::InvalidLine(value.to_string())),
    }
}

/// Validated, ordered findings for one analysis, plus what was dropped.
///
/// `all()` is sorted by relative line ascending and stable for ties. The
/// post filter only affects `actionable()`; nothing is removed from `all()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FindingSet {
    findings: Vec<Finding>,
    rejected: Vec<RejectedElement>,
    filter: PostFilter,
}

impl FindingSet {
    pub fn empty(filter: PostFilter) -> Self {
        Self {
            findings: Vec::new(),
            rejected: Vec::new(),
            filter,
        }
    }

    /// Validate raw elements and order the survivors.
    pub fn from_elements(elements: &[Value], filter: PostFilter) -> Self {
        let (findings, rejected) = validate::<Finding>(elements);
        Self::from_findings(findings, rejected, filter)
    }

    /// Like [`FindingSet::from_elements`], also rejecting findings that
    /// address a line past the end of a `selection_lines`-line selection.
    pub fn from_elements_within(
        elements: &[Value],
        filter: PostFilter,
        selection_lines: usize,
    ) -> Self {
        let mut findings = Vec::with_capacity(elements.len());
        let mut rejected = Vec::new();
        for (index, value) in elements.iter().enumerate() {
            match check_element::<Finding>(index, value) {
                Checked::Valid(finding) if finding.relative_line() > selection_lines => {
                    let violation = SchemaViolation::LineOutsideSelection {
                        line: finding.relative_line(),
                        selection_lines,
                    };
                    debug!(index, %violation, "dropping model element");
                    rejected.push(RejectedElement { index, violation });
                }
                Checked::Valid(finding) => findings.push(finding),
                Checked::Rejected(r) => rejected.push(r),
            }
        }
        Self::from_findings(findings, rejected, filter)
    }

    pub fn from_findings(
        mut findings: Vec<Finding>,
        rejected: Vec<RejectedElement>,
        filter: PostFilter,
    ) -> Self {
        // `sort_by_key` is stable: findings on the same line keep input order.
        findings.sort_by_key(Finding::relative_line);
        Self {
            findings,
            rejected,
            filter,
        }
    }

    /// Every validated finding, ordered.
    pub fn all(&self) -> &[Finding] {
        &self.findings
    }

    pub fn rejected(&self) -> &[RejectedElement] {
        &self.rejected
    }

    pub fn filter(&self) -> PostFilter {
        self.filter
    }

    /// Findings offered for interactive fixing, ordered.
    pub fn actionable(&self) -> impl Iterator<Item = &Finding> + '_ {
        let filter = self.filter;
        self.findings.iter().filter(move |f| match filter {
            PostFilter::HideInfo => f.is_actionable(),
            PostFilter::ShowAll => true,
        })
    }

    /// The `total` every progress counter is based on.
    pub fn actionable_count(&self) -> usize {
        self.actionable().count()
    }

    pub fn is_empty(&self) -> bool {
        self.findings.is_empty()
    }

    pub fn len(&self) -> usize {
        self.findings.len()
    }
}
