//! The expression engine seam.
//!
//! The kernel prepares an expression and a scope; an [`ExpressionEngine`]
//! turns them into a value. Everything engine-specific (which runtime, how
//! bindings are declared, how results come back) lives behind this trait,
//! so the kernel and its tests never depend on an installed runtime.

pub mod node;

use serde_json::Value;
use thiserror::Error;

use crate::context::Scope;

pub use node::NodeEngine;

/// An engine evaluates one expression against one scope.
pub trait ExpressionEngine {
    fn evaluate(&mut self, expression: &str, scope: &Scope) -> Result<Evaluation, EngineFault>;
}

/// The outcome of a successful evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    /// The expression's result, JSON-encoded. Non-encodable results
    /// (undefined, functions) come back as `Value::Null`.
    pub value: Value,
    /// Text the expression printed itself, to be relayed verbatim.
    pub output: String,
    /// Whether the expression printed anything. When it did, the caller
    /// skips echoing `value` so output is not duplicated.
    pub printed: bool,
    /// Set when the expression asked to end the run early.
    pub exit: Option<ExitRequest>,
}

/// An early-exit request raised from inside an expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitRequest {
    /// Process exit code to propagate.
    pub code: i32,
    /// An explicit exit abandons the run's result, so nothing is saved.
    pub skip_save: bool,
}

/// Why an evaluation could not produce a result.
#[derive(Debug, Error)]
pub enum EngineFault {
    /// The expression itself threw or failed to parse. The message is the
    /// engine's own diagnostic, relayed as-is.
    #[error("{message}")]
    Expression { message: String },
    /// The engine's runtime could not be started at all.
    #[error("expression engine unavailable: {reason}")]
    Unavailable { reason: String },
    /// The runtime started but its reply did not follow the protocol.
    #[error("unexpected engine output: {detail}")]
    Protocol { detail: String },
}
