//! jex-kernel: the core of jex.
//!
//! This crate provides:
//!
//! - **Lexer**: Tokenizes JavaScript expressions using logos
//! - **Rewrite**: Expands leading-dot shorthand into explicit references
//! - **Context**: Assembles the expression scope with deterministic precedence
//! - **Fun**: Shell-command function descriptors and their invocation protocol
//! - **Session**: The cross-invocation JSON cache store
//! - **Parse**: The shared JSON → NDJSON → raw-text parsing policy
//! - **Engine**: The expression-engine capability and its Node.js implementation
//! - **Kernel**: Run orchestration, one invocation end to end
//! - **Paths**: XDG-compliant path helpers

pub mod context;
pub mod engine;
pub mod fun;
pub mod kernel;
pub mod lexer;
pub mod parse;
pub mod paths;
pub mod rewrite;
pub mod session;
pub mod stdlib;

pub use context::{ContextError, Scope, ScopeBuilder, MAIN_BINDING, RAW_BINDING};
pub use engine::{EngineFault, Evaluation, ExitRequest, ExpressionEngine, NodeEngine};
pub use fun::FnDescriptor;
pub use kernel::{run, KernelError, RunOptions, RunOutcome};
pub use parse::{parse_input, parse_lenient, InputError};
pub use rewrite::rewrite;
pub use session::Session;

// XDG path primitives (scripting and tests compose their own paths)
pub use paths::{cache_dir, home_dir, session_file, xdg_cache_home};
