//! Shell-backed function descriptors and the invocation protocol.
//!
//! A function binding is declared as a command template (`--fn.myFn 'curl
//! -s {}'`). Calling it materializes the template against the positional
//! arguments and runs the result synchronously through `sh -c`, and the
//! captured stdout is parsed with the lenient parsing policy (JSON, then
//! line-delimited JSON, then raw text).
//!
//! Placeholders: every unescaped `{}` is replaced by the first argument,
//! every unescaped `{i}` by the i-th (missing arguments substitute the empty
//! string). `\{...}` escapes a placeholder back to its literal text.

use std::process::{Command, Stdio};

use serde_json::Value;
use thiserror::Error;

use crate::parse::parse_lenient;

/// Errors from invoking a function binding.
///
/// A command that runs but exits non-zero is not an error: its stdout is
/// still the call's value, and the exit status is surfaced as a warning.
#[derive(Debug, Error)]
pub enum FnError {
    #[error("fn {name}: failed to spawn shell: {source}")]
    Spawn {
        name: String,
        #[source]
        source: std::io::Error,
    },
}

/// A named, shell-command-backed callable usable from within an expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FnDescriptor {
    name: String,
    template: String,
}

impl FnDescriptor {
    pub fn new(name: impl Into<String>, template: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            template: template.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The original, unsubstituted command template. Exposed to the
    /// expression engine as a read-only, non-enumerable `source` attribute
    /// on the callable.
    pub fn template(&self) -> &str {
        &self.template
    }

    /// Substitute positional arguments into the template.
    pub fn materialize(&self, args: &[Value]) -> String {
        let mut out = String::with_capacity(self.template.len());
        let bytes = self.template.as_bytes();
        let mut i = 0;
        while i < bytes.len() {
            match bytes[i] {
                b'\\' => match placeholder_at(&self.template[i + 1..]) {
                    // `\{i}` un-escapes to the literal placeholder text.
                    Some((_, len)) => {
                        out.push_str(&self.template[i + 1..i + 1 + len]);
                        i += 1 + len;
                    }
                    None => {
                        out.push('\\');
                        i += 1;
                    }
                },
                b'{' => match placeholder_at(&self.template[i..]) {
                    Some((index, len)) => {
                        if let Some(arg) = args.get(index) {
                            out.push_str(&argument_text(arg));
                        }
                        i += len;
                    }
                    None => {
                        out.push('{');
                        i += 1;
                    }
                },
                _ => {
                    let ch = self.template[i..].chars().next().unwrap_or('\u{fffd}');
                    out.push(ch);
                    i += ch.len_utf8();
                }
            }
        }
        out
    }

    /// Materialize and run the command, returning its parsed stdout.
    /// Blocks until the subprocess exits; no timeout is imposed.
    pub fn invoke(&self, args: &[Value]) -> Result<Value, FnError> {
        let command = self.materialize(args);
        let output = Command::new("sh")
            .arg("-c")
            .arg(&command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .output()
            .map_err(|source| FnError::Spawn {
                name: self.name.clone(),
                source,
            })?;

        if !output.status.success() {
            tracing::warn!(
                name = %self.name,
                command = %command,
                status = ?output.status.code(),
                "function command exited non-zero"
            );
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(parse_lenient(stdout.trim_end_matches('\n')))
    }
}

/// If `text` starts with a placeholder (`{}` or `{digits}`), return its
/// argument index and byte length.
fn placeholder_at(text: &str) -> Option<(usize, usize)> {
    let rest = text.strip_prefix('{')?;
    if let Some(_after) = rest.strip_prefix('}') {
        return Some((0, 2));
    }
    let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    if !rest[digits.len()..].starts_with('}') {
        return None;
    }
    let index = digits.parse().ok()?;
    Some((index, digits.len() + 2))
}

/// How an argument renders inside a command line: strings go in bare, every
/// other value as its JSON text.
fn argument_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn descriptor(template: &str) -> FnDescriptor {
        FnDescriptor::new("f", template)
    }

    #[test]
    fn empty_braces_take_the_first_argument() {
        let f = descriptor("echo {}");
        assert_eq!(f.materialize(&[json!("hello")]), "echo hello");
    }

    #[test]
    fn indexed_placeholders() {
        let f = descriptor("cp {0} {1}");
        assert_eq!(f.materialize(&[json!("a"), json!("b")]), "cp a b");
    }

    #[test]
    fn repeated_empty_braces_all_mean_argument_zero() {
        let f = descriptor("echo {} {}");
        assert_eq!(f.materialize(&[json!("x")]), "echo x x");
    }

    #[test]
    fn missing_argument_substitutes_empty() {
        let f = descriptor("echo [{2}]");
        assert_eq!(f.materialize(&[json!("only")]), "echo []");
    }

    #[test]
    fn escaped_placeholder_stays_literal() {
        let f = descriptor(r"echo \{0} {0}");
        assert_eq!(f.materialize(&[json!("v")]), "echo {0} v");
    }

    #[test]
    fn non_placeholder_braces_pass_through() {
        let f = descriptor("awk '{print $1}'");
        assert_eq!(f.materialize(&[]), "awk '{print $1}'");
    }

    #[test]
    fn non_string_arguments_render_as_json() {
        let f = descriptor("echo {0}");
        assert_eq!(f.materialize(&[json!({"a": 1})]), r#"echo {"a":1}"#);
        assert_eq!(f.materialize(&[json!(3)]), "echo 3");
    }

    #[test]
    fn invoke_parses_json_output() {
        let f = descriptor(r#"echo '{"n": 7}'"#);
        assert_eq!(f.invoke(&[]).unwrap(), json!({"n": 7}));
    }

    #[test]
    fn invoke_falls_back_to_raw_text() {
        let f = descriptor("echo plain words");
        assert_eq!(f.invoke(&[]).unwrap(), json!("plain words"));
    }

    #[test]
    fn invoke_substitutes_arguments() {
        let f = descriptor("echo {0}-{1}");
        assert_eq!(f.invoke(&[json!("a"), json!("b")]).unwrap(), json!("a-b"));
    }
}
