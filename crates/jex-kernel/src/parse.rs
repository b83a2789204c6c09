//! The shared parsing policy for raw text entering the pipeline.
//!
//! Both the primary piped input and captured function output go through the
//! same ladder: strict JSON first, then line-delimited JSON (each non-empty
//! line parsed independently, yielding an array), then either a raw-text
//! fallback (`parse_lenient`, for function output) or a fatal error with
//! remediation guidance (`parse_input`, for the piped input).

use serde_json::Value;
use thiserror::Error;

/// Fatal parse failure for the primary piped input.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum InputError {
    #[error(
        "piped input is not valid JSON (strict or line-delimited) near: {preview}\n  \
         pipe a JSON document or one JSON value per line, e.g.: echo '{{\"foo\": 1}}' | jex '.foo'"
    )]
    Malformed { preview: String },
}

/// Parse text that may legitimately be unstructured: falls back to the raw
/// text as a string value. Used for function output.
pub fn parse_lenient(text: &str) -> Value {
    parse_structured(text).unwrap_or_else(|| Value::String(text.to_string()))
}

/// Parse the primary piped input. Failure is fatal and carries guidance.
pub fn parse_input(text: &str) -> Result<Value, InputError> {
    parse_structured(text).ok_or_else(|| InputError::Malformed {
        preview: preview(text),
    })
}

fn parse_structured(text: &str) -> Option<Value> {
    if let Ok(value) = serde_json::from_str(text) {
        return Some(value);
    }
    parse_lines(text)
}

/// Line-delimited parse: every non-empty line must parse on its own.
/// A single line is never tried here; strict parsing already covered it.
fn parse_lines(text: &str) -> Option<Value> {
    let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
    if lines.len() < 2 {
        return None;
    }
    let mut items = Vec::with_capacity(lines.len());
    for line in lines {
        items.push(serde_json::from_str(line).ok()?);
    }
    Some(Value::Array(items))
}

fn preview(text: &str) -> String {
    let first = text.lines().find(|l| !l.trim().is_empty()).unwrap_or("");
    let mut p: String = first.trim().chars().take(60).collect();
    if p.len() < first.trim().len() {
        p.push('…');
    }
    p
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn strict_json_wins() {
        assert_eq!(parse_lenient(r#"{"a": 1}"#), json!({"a": 1}));
        assert_eq!(parse_lenient("3"), json!(3));
        assert_eq!(parse_lenient(r#""s""#), json!("s"));
    }

    #[test]
    fn line_delimited_becomes_an_array() {
        let text = "{\"a\": 1}\n{\"a\": 2}\n";
        assert_eq!(parse_lenient(text), json!([{"a": 1}, {"a": 2}]));
        assert_eq!(parse_input(text).unwrap(), json!([{"a": 1}, {"a": 2}]));
    }

    #[test]
    fn blank_lines_are_skipped_in_line_mode() {
        let text = "1\n\n2\n";
        assert_eq!(parse_lenient(text), json!([1, 2]));
    }

    #[test]
    fn lenient_falls_back_to_raw_text() {
        assert_eq!(parse_lenient("not json at all"), json!("not json at all"));
    }

    #[test]
    fn one_bad_line_fails_the_whole_line_parse() {
        let text = "1\nnope\n2\n";
        assert_eq!(parse_lenient(text), json!(text));
        assert!(parse_input(text).is_err());
    }

    #[test]
    fn input_error_carries_guidance() {
        let err = parse_input("definitely { not json").unwrap_err();
        let text = err.to_string();
        assert!(text.contains("definitely { not json"));
        assert!(text.contains("jex"));
    }
}
