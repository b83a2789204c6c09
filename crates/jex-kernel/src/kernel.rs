//! One invocation, end to end: resolve the main input, merge session
//! updates, rewrite the expression, assemble the scope, evaluate.
//!
//! The caller owns persistence. `run` mutates the session in place so that
//! everything accumulated before a failure (new named inputs, new
//! functions, the resolved main input) can still be saved when evaluation
//! itself faults.

use serde_json::Value;
use thiserror::Error;

use crate::context::{BindingOrigin, Collision, ContextError, ScopeBuilder, MAIN_BINDING};
use crate::engine::{EngineFault, ExitRequest, ExpressionEngine};
use crate::fun::FnDescriptor;
use crate::parse::{parse_input, InputError};
use crate::rewrite::rewrite;
use crate::session::Session;
use crate::stdlib::{CONTROL_UTILITIES, LIBRARY_HELPERS};

/// Options for one run, as parsed by the CLI layer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunOptions {
    /// The expression to evaluate. Absent or blank means "echo the input".
    pub expression: Option<String>,
    /// Extra name for the main input, alongside the default.
    pub alias: Option<String>,
    /// Named inputs for this run, remembered by the session.
    pub inputs: Vec<(String, Value)>,
    /// Function templates for this run, remembered by the session.
    pub fns: Vec<(String, String)>,
    /// Skip loading and saving the session file entirely.
    pub no_cache: bool,
    /// Remember the run's result under this name.
    pub save_as: Option<String>,
}

/// What a run produced.
#[derive(Debug, Clone, PartialEq)]
pub struct RunOutcome {
    pub value: Value,
    /// Text the expression printed itself.
    pub output: String,
    /// When set, skip echoing `value`.
    pub printed: bool,
    /// Early-exit request raised from inside the expression.
    pub exit: Option<ExitRequest>,
}

#[derive(Debug, Error)]
pub enum KernelError {
    #[error(transparent)]
    Input(#[from] InputError),
    #[error(transparent)]
    Context(#[from] ContextError),
    #[error(transparent)]
    Engine(#[from] EngineFault),
}

/// Execute one invocation against `session`, which is mutated in place:
/// run updates and the resolved main input land in it before evaluation,
/// the result lands in it after. The caller decides whether and when the
/// session is persisted.
pub fn run(
    opts: &RunOptions,
    piped: Option<&str>,
    session: &mut Session,
    engine: &mut dyn ExpressionEngine,
) -> Result<RunOutcome, KernelError> {
    // A name given to both --input.NAME and --fn.NAME in the same run is a
    // user error, not a retirement. The session merge below would silently
    // let one side win, so this is checked first.
    let mut collisions = Vec::new();
    for (name, _) in &opts.inputs {
        if opts.fns.iter().any(|(f, _)| f == name) {
            collisions.push(Collision {
                name: name.clone(),
                existing: BindingOrigin::NamedInput,
                incoming: BindingOrigin::Function,
            });
        }
    }
    if !collisions.is_empty() {
        return Err(ContextError::NameCollisions(collisions).into());
    }

    let mut updates = Session::default();
    for (name, value) in &opts.inputs {
        updates.set_value(name.clone(), value.clone());
    }
    for (name, template) in &opts.fns {
        updates.set_fn(name.clone(), template.clone());
    }
    *session = session.merge(&updates);

    // Main input: piped text wins, then the remembered input, then null.
    let raw_text = piped.filter(|text| !text.trim().is_empty());
    let main_input = match raw_text {
        Some(text) => parse_input(text)?,
        None => session.last_input.clone().unwrap_or(Value::Null),
    };
    session.last_input = Some(main_input.clone());

    let expression = opts
        .expression
        .as_deref()
        .map(str::trim)
        .filter(|e| !e.is_empty());

    let outcome = match expression {
        None => RunOutcome {
            value: main_input,
            output: String::new(),
            printed: false,
            exit: None,
        },
        Some(expression) => {
            let rewritten = rewrite(expression, MAIN_BINDING);
            tracing::debug!(%rewritten, "expression after shorthand expansion");

            let mut builder = ScopeBuilder::new().main_input(main_input);
            for &(name, source) in CONTROL_UTILITIES {
                builder = builder.control(name, source);
            }
            if let Some(alias) = &opts.alias {
                builder = builder.alias(alias.clone());
            }
            if let Some(text) = raw_text {
                builder = builder.raw_input(text);
            }
            for (name, value) in &session.values {
                builder = builder.named_input(name.clone(), value.clone());
            }
            for (name, template) in &session.fns {
                builder = builder.function(FnDescriptor::new(name, template));
            }
            for &(name, source) in LIBRARY_HELPERS {
                builder = builder.library(name, source);
            }
            let scope = builder.build()?;
            for name in scope.suppressed_helpers() {
                tracing::debug!(%name, "library helper shadowed by user binding");
            }

            let evaluation = engine.evaluate(&rewritten, &scope)?;
            RunOutcome {
                value: evaluation.value,
                output: evaluation.output,
                printed: evaluation.printed,
                exit: evaluation.exit,
            }
        }
    };

    // An explicit exit abandons the run's result.
    if outcome.exit.is_none() {
        session.last_output = Some(outcome.value.clone());
        if let Some(name) = &opts.save_as {
            session.set_value(name.clone(), outcome.value.clone());
        }
    }

    Ok(outcome)
}
