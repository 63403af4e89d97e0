//! Response normalizer: untrusted model text in, candidate elements out.
//!
//! Fail-closed: the reply either parses as one JSON array or the whole
//! response is rejected. There is no salvage of partial arrays.

use crate::error::AnalysisError;
use serde_json::Value;
use tracing::{debug, warn};

const FENCE: &str = "```";

/// Strip one leading and one trailing markdown fence, with or without a
/// language tag. Text without fences is returned trimmed.
pub fn strip_code_fence(text: &str) -> &str {
    let mut clean = text.trim();

    if let Some(rest) = clean.strip_prefix(FENCE) {
        // Language tag (`json`, `JSON`, `c++`, ...) runs up to the first
        // character that can start a JSON value or whitespace.
        let tag_len = rest
            .find(|c: char| !(c.is_ascii_alphanumeric() || matches!(c, '_' | '+' | '-' | '.')))
            .unwrap_or(rest.len());
        clean = rest[tag_len..].trim_start();
    }

    if let Some(rest) = clean.strip_suffix(FENCE) {
        clean = rest.trim_end();
    }

    clean.trim()
}

/// Parse the model reply into the raw elements of a JSON array.
///
/// An empty array is a normal outcome ("no issues found"). Anything that is
/// not a JSON array after fence stripping is `MalformedResponse`.
pub fn normalize_response(raw: &str) -> Result<Vec<Value>, AnalysisError> {
    let clean = strip_code_fence(raw);
    debug!(raw_len = raw.len(), clean_len = clean.len(), "normalizing model response");

    if clean.is_empty() {
        warn!("model returned an empty response");
        return Err(AnalysisError::malformed("empty response"));
    }

    match serde_json::from_str::<Value>(clean) {
        Ok(Value::Array(items)) => Ok(items),
        Ok(other) => {
            let kind = json_kind(&other);
            warn!(kind, "model response was valid JSON but not an array");
            Err(AnalysisError::malformed(format!(
                "expected a JSON array, got {}",
                kind
            )))
        }
        Err(err) => {
            // serde_json errors carry position only, never the offending text.
            warn!(error = %err, "model response is not valid JSON");
            Err(AnalysisError::malformed(err.to_string()))
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BODY: &str = r#"[{"relativeLine":1,"severity":"Warning"}]"#;

    #[test]
    fn test_strip_fence_with_language_tag() {
        let wrapped = format!("```json\n{}\n```", BODY);
        assert_eq!(strip_code_fence(&wrapped), BODY);
    }

    #[test]
    fn test_strip_fence_without_language_tag() {
        let wrapped = format!("```\n{}\n```", BODY);
        assert_eq!(strip_code_fence(&wrapped), BODY);
    }

    #[test]
    fn test_strip_fence_single_line() {
        let wrapped = format!("```json{}```", BODY);
        assert_eq!(strip_code_fence(&wrapped), BODY);
    }

    #[test]
    fn test_strip_fence_truncated_reply_keeps_body() {
        let wrapped = "```JSON\n[1, 2";
        assert_eq!(strip_code_fence(wrapped), "[1, 2");
    }

    #[test]
    fn test_unfenced_text_untouched() {
        assert_eq!(strip_code_fence(&format!("  {}\n", BODY)), BODY);
    }

    #[test]
    fn test_fenced_and_unfenced_normalize_identically() {
        let plain = normalize_response(BODY).unwrap();
        let tagged = normalize_response(&format!("```json\n{}\n```", BODY)).unwrap();
        let bare = normalize_response(&format!("```\n{}\n```", BODY)).unwrap();
        assert_eq!(plain, tagged);
        assert_eq!(plain, bare);
        assert_eq!(plain.len(), 1);
    }

    #[test]
    fn test_empty_array_is_success() {
        assert_eq!(normalize_response("[]").unwrap(), Vec::<Value>::new());
        assert!(normalize_response("```json\n[]\n```").unwrap().is_empty());
    }

    #[test]
    fn test_prose_is_malformed() {
        let err = normalize_response("Sure! Here are the issues I found: none.").unwrap_err();
        assert!(matches!(err, AnalysisError::MalformedResponse { .. }));
    }

    #[test]
    fn test_prose_around_array_is_malformed() {
        let err = normalize_response(&format!("Here you go:\n{}\nHope it helps", BODY)).unwrap_err();
        assert!(matches!(err, AnalysisError::MalformedResponse { .. }));
    }

    #[test]
    fn test_truncated_array_is_malformed() {
        let err = normalize_response(r#"[{"relativeLine":1,"severity":"Warn"#).unwrap_err();
        assert!(matches!(err, AnalysisError::MalformedResponse { .. }));
    }

    #[test]
    fn test_object_root_is_malformed() {
        let err = normalize_response(r#"{"findings": []}"#).unwrap_err();
        assert_eq!(
            err,
            AnalysisError::malformed("expected a JSON array, got an object")
        );
    }

    #[test]
    fn test_blank_response_is_malformed() {
        assert!(normalize_response("   ").is_err());
        assert!(normalize_response("```\n```").is_err());
    }

    #[test]
    fn test_error_does_not_echo_input() {
        let err = normalize_response("secret-token-abc is not json").unwrap_err();
        assert!(!err.to_string().contains("secret-token-abc"));
    }
}
