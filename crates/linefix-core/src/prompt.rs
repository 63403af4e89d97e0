// ═══════════════════════════════════════════════════════════════════════════════
// PROMPT BUILDER
// ═══════════════════════════════════════════════════════════════════════════════
//
// One request shape for both analysis modes: a fixed instruction block plus the
// selection with every line prefixed by its 1-based index.

use crate::error::AnalysisError;
use crate::selection::Selection;
use serde::{Deserialize, Serialize};

/// Marker the model is told to use inside a fix for an intended line break.
///
/// It arrives as a real newline once the reply is JSON-decoded. A literal
/// backslash-n left in decoded text is code, not a marker.
pub const LINE_BREAK_MARKER: &str = "\\n";

/// Shared output contract - the reply must be a bare JSON array
const JSON_ONLY_RULES: &str = r#"OUTPUT RULES:
- Respond with a JSON array and nothing else.
- No markdown fences, no prose before or after the array.
- If there is nothing to report, respond with []."#;

const REVIEW_INSTRUCTIONS: &str = r#"Analyze the following code for potential issues, edge cases, vulnerabilities, or improvements.

STRICT RULES:
1. Ignore any issue whose correctness depends only on values known at run time (for example the size of a variable-length array).
2. Missing headers or imports: report them on line 1. The fix must be the header line followed by "\n" and the original text of line 1.
3. Multi-line fixes: separate lines with "\n". Every fix replaces exactly the line it is reported on.
4. Do not include comments in fixed code.
5. Line numbers refer to the numbers prefixed to each line below, starting at 1.

Response format:
[
  {
    "relativeLine": number,
    "severity": "Error" | "Warning" | "Info",
    "finding": "Description",
    "original": "Original line text",
    "fix": "Corrected line text",
    "explanation": "Why"
  }
]"#;

const EDGE_CASE_INSTRUCTIONS: &str = r#"Act as a Senior Software QA Engineer and Lead Developer.
Analyze the provided code for logic flaws, boundary conditions, and performance bottlenecks.

TASK:
1. Identify every specific edge case (null/undefined, empty strings, extremely large numbers, negative values, special characters, ...).
2. Predict the CURRENT output of the code for that case ("actualOutput"). Keep it minimal.
3. Determine what the output SHOULD be by standard logic ("expectedOutput").
4. If actual differs from expected, provide corrected code for the incorrect lines only.

CONSTRAINTS:
- No conversational text, introductions, or explanations.
- Do not use comments in fixed code.
- Only update the lines which are incorrect, not the whole program.

Response format:
[
  {
    "Sr. No.": "serial number of the edge case",
    "input": "Specific input value used for this case",
    "actualOutput": "The current (buggy) result",
    "expectedOutput": "The intended/correct result",
    "isBug": true | false,
    "fixedCode": "Corrected code (only if isBug is true, otherwise empty string)"
  }
]"#;

/// Which analysis to run. Both share one pipeline; they differ in the
/// instructions sent and in how results are filtered for presentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AnalysisMode {
    /// Line-addressed findings with proposed fixes.
    #[default]
    Review,
    /// Edge-case table (input / actual / expected), informational only.
    EdgeCases,
}

/// Presentation filter applied after validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostFilter {
    /// `Info` findings stay in the validated set but are not offered as fixable.
    HideInfo,
    /// Everything validated is shown.
    ShowAll,
}

impl AnalysisMode {
    pub fn label(&self) -> &'static str {
        match self {
            AnalysisMode::Review => "review",
            AnalysisMode::EdgeCases => "edge-cases",
        }
    }

    /// Title shown while the model call is in flight.
    pub fn progress_title(&self) -> &'static str {
        match self {
            AnalysisMode::Review => "Analyzing selection",
            AnalysisMode::EdgeCases => "Analyzing selection for edge cases",
        }
    }

    pub fn post_filter(&self) -> PostFilter {
        match self {
            AnalysisMode::Review => PostFilter::HideInfo,
            AnalysisMode::EdgeCases => PostFilter::ShowAll,
        }
    }

    fn instructions(&self) -> String {
        let body = match self {
            AnalysisMode::Review => REVIEW_INSTRUCTIONS,
            AnalysisMode::EdgeCases => EDGE_CASE_INSTRUCTIONS,
        };
        format!("{}\n\n{}", body, JSON_ONLY_RULES)
    }
}

impl std::str::FromStr for AnalysisMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "review" | "selection" => Ok(AnalysisMode::Review),
            "edge-cases" | "edgecases" | "edge" => Ok(AnalysisMode::EdgeCases),
            other => Err(format!(
                "unknown analysis mode `{}` (expected `review` or `edge-cases`)",
                other
            )),
        }
    }
}

/// Request payload for the model collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisRequest {
    pub mode: AnalysisMode,
    /// Fixed instruction set for the mode.
    pub instructions: String,
    /// The selection, each line prefixed by its 1-based index.
    pub numbered_code: String,
}

impl AnalysisRequest {
    /// Build the request for a selection. Pure; no side effects.
    pub fn build(selection: &Selection, mode: AnalysisMode) -> Result<Self, AnalysisError> {
        if selection.text().trim().is_empty() {
            return Err(AnalysisError::EmptySelection);
        }
        Ok(Self {
            mode,
            instructions: mode.instructions(),
            numbered_code: number_lines(selection.text()),
        })
    }

    /// Single-message rendering for clients that take one prompt string.
    pub fn prompt_text(&self) -> String {
        format!(
            "{}\n\nCode to analyze:\n{}\n\nRespond with valid JSON only.",
            self.instructions, self.numbered_code
        )
    }

    /// User-message half when the instructions go in a system message.
    pub fn user_message(&self) -> String {
        format!(
            "Code to analyze:\n{}\n\nRespond with valid JSON only.",
            self.numbered_code
        )
    }
}

/// Prefix each line with its 1-based index: `"1: int x"`.
pub fn number_lines(text: &str) -> String {
    text.lines()
        .enumerate()
        .map(|(i, line)| format!("{}: {}", i + 1, line))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_number_lines_is_one_based() {
        assert_eq!(
            number_lines("int x\nprintf(\"%d\", x)"),
            "1: int x\n2: printf(\"%d\", x)"
        );
    }

    #[test]
    fn test_number_lines_keeps_blank_lines() {
        assert_eq!(number_lines("a\n\nb"), "1: a\n2: \n3: b");
    }

    #[test]
    fn test_review_request_carries_rules() {
        let sel = Selection::new("int x;", 0).unwrap();
        let req = AnalysisRequest::build(&sel, AnalysisMode::Review).unwrap();
        assert!(req.instructions.contains("run time"));
        assert!(req.instructions.contains("line 1"));
        assert!(req.instructions.contains(LINE_BREAK_MARKER));
        assert!(req.instructions.contains("JSON array and nothing else"));
        assert!(req.instructions.contains("\"relativeLine\""));
        assert_eq!(req.numbered_code, "1: int x;");
    }

    #[test]
    fn test_prompt_text_embeds_numbered_code() {
        let sel = Selection::new("a\nb", 4).unwrap();
        let req = AnalysisRequest::build(&sel, AnalysisMode::EdgeCases).unwrap();
        let prompt = req.prompt_text();
        assert!(prompt.contains("1: a\n2: b"));
        assert!(prompt.contains("actualOutput"));
        assert!(prompt.ends_with("Respond with valid JSON only."));
    }

    #[test]
    fn test_mode_post_filters() {
        assert_eq!(AnalysisMode::Review.post_filter(), PostFilter::HideInfo);
        assert_eq!(AnalysisMode::EdgeCases.post_filter(), PostFilter::ShowAll);
    }

    #[test]
    fn test_mode_from_str() {
        assert_eq!("Edge_Cases".parse::<AnalysisMode>(), Ok(AnalysisMode::EdgeCases));
        assert_eq!("review".parse::<AnalysisMode>(), Ok(AnalysisMode::Review));
        assert!("lint".parse::<AnalysisMode>().is_err());
    }

    #[test]
    fn test_mode_serde_is_kebab_case() {
        let json = serde_json::to_string(&AnalysisMode::EdgeCases).unwrap();
        assert_eq!(json, "\"edge-cases\"");
    }
}
