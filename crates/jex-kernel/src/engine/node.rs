//! Expression evaluation on the Node.js runtime.
//!
//! Each evaluation builds one self-contained program: a prelude that
//! declares every scope binding as a `const`, then a guarded `eval` of the
//! user's expression. The program reports back over stdout with sentinel
//! lines; anything that is not a sentinel is text the expression printed
//! itself and is relayed verbatim.
//!
//! Shell-command functions do not spawn shells from JavaScript. The
//! prelude binds them to a bridge that re-invokes this same executable
//! with `--call`, so the template protocol has exactly one implementation,
//! in [`crate::fun`].

use std::path::PathBuf;
use std::process::{Command, Stdio};

use serde_json::Value;

use crate::context::{BindingValue, Scope};

use super::{Evaluation, EngineFault, ExitRequest, ExpressionEngine};

const RESULT_SENTINEL: &str = "__JEX_RESULT ";
const ERROR_SENTINEL: &str = "__JEX_ERROR ";
const EXIT_SENTINEL: &str = "__JEX_EXIT ";

/// Environment variable overriding the runtime executable.
pub const NODE_ENV_VAR: &str = "JEX_NODE";

pub struct NodeEngine {
    runtime: PathBuf,
    bridge_exe: PathBuf,
}

impl NodeEngine {
    /// Resolve the runtime (honouring `$JEX_NODE`) and the path of the
    /// current executable, which the prelude re-invokes for function calls.
    pub fn new() -> Result<Self, EngineFault> {
        let runtime = std::env::var_os(NODE_ENV_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("node"));
        let bridge_exe = std::env::current_exe().map_err(|e| EngineFault::Unavailable {
            reason: format!("cannot locate own executable for function calls: {e}"),
        })?;
        Ok(NodeEngine { runtime, bridge_exe })
    }
}

impl ExpressionEngine for NodeEngine {
    fn evaluate(&mut self, expression: &str, scope: &Scope) -> Result<Evaluation, EngineFault> {
        let program = build_program(expression, scope, &self.bridge_exe.to_string_lossy());
        tracing::debug!(runtime = %self.runtime.display(), "evaluating expression");

        let output = Command::new(&self.runtime)
            .arg("-e")
            .arg(&program)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .output()
            .map_err(|e| EngineFault::Unavailable {
                reason: format!("cannot run {}: {e}", self.runtime.display()),
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        parse_transcript(&stdout, output.status.code())
    }
}

/// Assemble the program: function bridge, print capture, bindings, guarded
/// expression, result report.
fn build_program(expression: &str, scope: &Scope, bridge_exe: &str) -> String {
    let mut program = String::new();
    program.push_str("'use strict';\n");
    program.push_str("const { execFileSync } = require('node:child_process');\n");
    program.push_str("const __jex_log = console.log.bind(console);\n");
    program.push_str("let __jex_printed = false;\n");
    program.push_str(
        "console.log = (...a) => { __jex_printed = true; __jex_log(...a); };\n",
    );
    program.push_str("const __jex_call = (exe, template) => {\n");
    program.push_str(
        "  const fn = (...args) => JSON.parse(execFileSync(exe, ['--call', template, \
         ...args.map((a) => JSON.stringify(a === undefined ? null : a))], { encoding: 'utf8' }));\n",
    );
    program.push_str(
        "  Object.defineProperty(fn, 'source', { enumerable: false, value: template });\n",
    );
    program.push_str("  return fn;\n};\n");

    for binding in scope.iter() {
        let declaration = match &binding.value {
            BindingValue::Value(value) => {
                format!("const {} = {};\n", binding.name, js_literal(&value.to_string()))
            }
            BindingValue::Command(descriptor) => format!(
                "const {} = __jex_call({}, {});\n",
                binding.name,
                js_string(bridge_exe),
                js_string(descriptor.template()),
            ),
            BindingValue::Source(source) => {
                format!("const {} = ({});\n", binding.name, source)
            }
        };
        program.push_str(&declaration);
    }

    program.push_str("let __jex_result;\n");
    program.push_str("try {\n");
    program.push_str(&format!("  __jex_result = eval({});\n", js_string(expression)));
    program.push_str("} catch (e) {\n");
    // keep the diagnostic on the sentinel's line
    program.push_str(&format!(
        "  __jex_log('{ERROR_SENTINEL}' + String(e?.message ?? e).split('\\n')[0]);\n",
    ));
    program.push_str("  process.exit(1);\n}\n");
    program.push_str("let __jex_payload;\n");
    program.push_str("try {\n");
    program.push_str(
        "  __jex_payload = JSON.stringify({ printed: __jex_printed, \
         value: __jex_result === undefined ? null : __jex_result });\n",
    );
    program.push_str("} catch (e) {\n");
    program.push_str(&format!(
        "  __jex_log('{}result is not representable as JSON: ' + String(e?.message ?? e));\n",
        ERROR_SENTINEL,
    ));
    program.push_str("  process.exit(1);\n}\n");
    program.push_str(&format!(
        "__jex_log('{}' + (__jex_payload ?? '{{}}'));\n",
        RESULT_SENTINEL,
    ));
    program
}

/// Interpret the program's stdout: sentinel lines carry the outcome, every
/// other line is the expression's own output.
fn parse_transcript(stdout: &str, status: Option<i32>) -> Result<Evaluation, EngineFault> {
    let mut output = String::new();
    let mut payload: Option<&str> = None;
    let mut exit: Option<ExitRequest> = None;
    for line in stdout.lines() {
        if let Some(rest) = line.strip_prefix(RESULT_SENTINEL) {
            payload = Some(rest);
        } else if let Some(rest) = line.strip_prefix(ERROR_SENTINEL) {
            return Err(EngineFault::Expression { message: rest.to_string() });
        } else if let Some(rest) = line.strip_prefix(EXIT_SENTINEL) {
            let request: serde_json::Value =
                serde_json::from_str(rest.trim()).map_err(|_| EngineFault::Protocol {
                    detail: format!("bad exit request: {rest:?}"),
                })?;
            exit = Some(ExitRequest {
                code: request["code"].as_i64().unwrap_or(0) as i32,
                skip_save: request["skipSave"].as_bool().unwrap_or(false),
            });
        } else {
            output.push_str(line);
            output.push('\n');
        }
    }

    let printed = !output.is_empty();
    match (payload, exit) {
        (_, Some(request)) => Ok(Evaluation {
            value: Value::Null,
            output,
            printed,
            exit: Some(request),
        }),
        (Some(payload), None) => {
            let report: serde_json::Value =
                serde_json::from_str(payload).map_err(|e| EngineFault::Protocol {
                    detail: format!("unreadable result report: {e}"),
                })?;
            let printed = report["printed"].as_bool().unwrap_or(printed);
            let value = report.get("value").cloned().unwrap_or(Value::Null);
            Ok(Evaluation { value, output, printed, exit: None })
        }
        (None, None) => Err(EngineFault::Protocol {
            detail: format!(
                "runtime exited with status {status:?} without reporting a result",
            ),
        }),
    }
}

/// A JavaScript string literal for `text`. JSON string syntax is a strict
/// subset of JS string syntax, so encoding through serde_json is safe.
fn js_string(text: &str) -> String {
    serde_json::Value::String(text.to_string()).to_string()
}

/// JSON text is already a JavaScript expression; parenthesize so object
/// literals are not mistaken for blocks.
fn js_literal(json_text: &str) -> String {
    format!("({json_text})")
}
