//! Result formatting for the jex binary.
//!
//! Interactive terminals get ANSI-colored pretty JSON; piped output gets
//! plain pretty JSON so downstream tools (including jex itself) can parse
//! it back. The value display is suppressed entirely when the expression
//! printed its own output.

use std::io::IsTerminal;

use serde_json::Value;

/// Who is reading stdout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputContext {
    Interactive,
    Piped,
}

/// Detect the output context based on terminal state.
pub fn detect_context() -> OutputContext {
    if std::io::stdout().is_terminal() {
        OutputContext::Interactive
    } else {
        OutputContext::Piped
    }
}

const RESET: &str = "\x1b[0m";
const KEY: &str = "\x1b[36m"; // cyan
const STRING: &str = "\x1b[32m"; // green
const NUMBER: &str = "\x1b[33m"; // yellow
const LITERAL: &str = "\x1b[35m"; // magenta, for true/false/null

/// Render a value for the given context. Bare strings are printed without
/// quotes in both contexts, matching what shell users expect from a filter.
pub fn format_value(value: &Value, context: OutputContext) -> String {
    match value {
        Value::String(s) => s.clone(),
        _ => match context {
            OutputContext::Interactive => {
                let mut out = String::new();
                write_colored(value, 0, &mut out);
                out
            }
            // pretty-printing cannot fail for a Value tree
            OutputContext::Piped => {
                serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
            }
        },
    }
}

fn write_colored(value: &Value, indent: usize, out: &mut String) {
    let pad = "  ".repeat(indent);
    let inner_pad = "  ".repeat(indent + 1);
    match value {
        Value::Null | Value::Bool(_) => {
            out.push_str(LITERAL);
            out.push_str(&value.to_string());
            out.push_str(RESET);
        }
        Value::Number(n) => {
            out.push_str(NUMBER);
            out.push_str(&n.to_string());
            out.push_str(RESET);
        }
        Value::String(s) => {
            out.push_str(STRING);
            out.push_str(&Value::String(s.clone()).to_string());
            out.push_str(RESET);
        }
        Value::Array(items) => {
            if items.is_empty() {
                out.push_str("[]");
                return;
            }
            out.push_str("[\n");
            for (i, item) in items.iter().enumerate() {
                out.push_str(&inner_pad);
                write_colored(item, indent + 1, out);
                if i + 1 < items.len() {
                    out.push(',');
                }
                out.push('\n');
            }
            out.push_str(&pad);
            out.push(']');
        }
        Value::Object(map) => {
            if map.is_empty() {
                out.push_str("{}");
                return;
            }
            out.push_str("{\n");
            for (i, (key, item)) in map.iter().enumerate() {
                out.push_str(&inner_pad);
                out.push_str(KEY);
                out.push_str(&Value::String(key.clone()).to_string());
                out.push_str(RESET);
                out.push_str(": ");
                write_colored(item, indent + 1, out);
                if i + 1 < map.len() {
                    out.push(',');
                }
                out.push('\n');
            }
            out.push_str(&pad);
            out.push('}');
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn piped_output_is_plain_pretty_json() {
        let text = format_value(&json!({"a": [1, 2]}), OutputContext::Piped);
        assert!(!text.contains('\x1b'));
        let parsed: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed, json!({"a": [1, 2]}));
    }

    #[test]
    fn interactive_output_carries_color_codes() {
        let text = format_value(&json!({"a": 1}), OutputContext::Interactive);
        assert!(text.contains(KEY));
        assert!(text.contains(RESET));
    }

    #[test]
    fn interactive_output_parses_back_once_decolored() {
        let text = format_value(&json!({"a": [1, "x", null], "b": true}), OutputContext::Interactive);
        let plain: String = text
            .replace(RESET, "")
            .replace(KEY, "")
            .replace(STRING, "")
            .replace(NUMBER, "")
            .replace(LITERAL, "");
        let parsed: Value = serde_json::from_str(&plain).unwrap();
        assert_eq!(parsed, json!({"a": [1, "x", null], "b": true}));
    }

    #[test]
    fn bare_strings_print_without_quotes() {
        assert_eq!(format_value(&json!("hello"), OutputContext::Piped), "hello");
        assert_eq!(
            format_value(&json!("hello"), OutputContext::Interactive),
            "hello"
        );
    }

    #[test]
    fn empty_containers_stay_on_one_line() {
        assert_eq!(format_value(&json!([]), OutputContext::Piped), "[]");
        assert_eq!(format_value(&json!({}), OutputContext::Interactive), "{}");
    }
}
