//! Execution-context assembly: named bindings with deterministic precedence.
//!
//! The evaluated expression sees one flat scope assembled from four
//! independent binding sources. Precedence, highest first:
//!
//! 1. Control utilities and the main-input aliases: added unconditionally;
//!    a collision inside this layer is a hard error.
//! 2. User named inputs and user functions: mutually exclusive by name;
//!    a collision is reported at build time, naming every conflict.
//! 3. Library helpers: silently skipped when the name is taken; the
//!    suppressed names are kept on the scope for diagnostics.
//!
//! The merge happens once, at build time, as an explicit pass over ordered
//! sources, never as runtime fallback-chain lookup.

use std::collections::HashMap;
use std::fmt;

use serde_json::Value;
use thiserror::Error;

use crate::fun::FnDescriptor;

/// Default identifier for the primary piped/cached input.
pub const MAIN_BINDING: &str = "input";

/// Identifier for the raw (unparsed) input text.
pub const RAW_BINDING: &str = "raw";

/// Where a binding came from. Origins drive precedence and are reported in
/// collision errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingOrigin {
    MainInput,
    NamedInput,
    Function,
    Library,
    Control,
}

impl fmt::Display for BindingOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BindingOrigin::MainInput => "main input",
            BindingOrigin::NamedInput => "named input",
            BindingOrigin::Function => "function",
            BindingOrigin::Library => "library helper",
            BindingOrigin::Control => "control utility",
        })
    }
}

/// What a binding resolves to inside the expression scope.
#[derive(Debug, Clone, PartialEq)]
pub enum BindingValue {
    /// A plain JSON value.
    Value(Value),
    /// A shell-command-backed callable.
    Command(FnDescriptor),
    /// Engine-side source text (library helpers, control utilities).
    Source(&'static str),
}

/// A named binding visible to the evaluated expression.
#[derive(Debug, Clone, PartialEq)]
pub struct Binding {
    pub name: String,
    pub origin: BindingOrigin,
    pub value: BindingValue,
}

/// One name claimed by two sources.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collision {
    pub name: String,
    pub existing: BindingOrigin,
    pub incoming: BindingOrigin,
}

impl fmt::Display for Collision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "`{}` ({} vs {})",
            self.name, self.existing, self.incoming
        )
    }
}

/// Context-build failures.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ContextError {
    /// Two sources that may not shadow each other claimed the same name.
    /// Lists every conflicting identifier, not just the first.
    #[error("conflicting bindings: {}", format_collisions(.0))]
    NameCollisions(Vec<Collision>),
}

fn format_collisions(collisions: &[Collision]) -> String {
    collisions
        .iter()
        .map(Collision::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// The final, flat binding set handed to the expression engine.
///
/// Iteration order is insertion order (control and main-input bindings
/// first), which the engine relies on when generating its prelude.
#[derive(Debug, Default)]
pub struct Scope {
    bindings: Vec<Binding>,
    index: HashMap<String, usize>,
    suppressed: Vec<String>,
}

impl Scope {
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&Binding> {
        self.index.get(name).map(|&i| &self.bindings[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &Binding> {
        self.bindings.iter()
    }

    /// Library helper names that lost to a user binding of the same name.
    pub fn suppressed_helpers(&self) -> &[String] {
        &self.suppressed
    }

    fn insert(&mut self, binding: Binding) {
        self.index.insert(binding.name.clone(), self.bindings.len());
        self.bindings.push(binding);
    }
}

/// Assembles a [`Scope`] from ordered binding sources.
#[derive(Debug, Default)]
pub struct ScopeBuilder {
    main_input: Option<Value>,
    alias: Option<String>,
    raw_input: Option<String>,
    inputs: Vec<(String, Value)>,
    functions: Vec<FnDescriptor>,
    library: Vec<(&'static str, &'static str)>,
    control: Vec<(&'static str, &'static str)>,
}

impl ScopeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// The primary piped/cached input, bound as `input`.
    pub fn main_input(mut self, value: Value) -> Self {
        self.main_input = Some(value);
        self
    }

    /// An additional user-chosen name for the main input. An alias equal to
    /// the default name is ignored rather than treated as a collision.
    pub fn alias(mut self, name: impl Into<String>) -> Self {
        self.alias = Some(name.into());
        self
    }

    /// The unparsed input text, bound as `raw`.
    pub fn raw_input(mut self, text: impl Into<String>) -> Self {
        self.raw_input = Some(text.into());
        self
    }

    pub fn named_input(mut self, name: impl Into<String>, value: Value) -> Self {
        self.inputs.push((name.into(), value));
        self
    }

    pub fn function(mut self, descriptor: FnDescriptor) -> Self {
        self.functions.push(descriptor);
        self
    }

    pub fn library(mut self, name: &'static str, source: &'static str) -> Self {
        self.library.push((name, source));
        self
    }

    pub fn control(mut self, name: &'static str, source: &'static str) -> Self {
        self.control.push((name, source));
        self
    }

    /// Merge all sources under the precedence rules.
    pub fn build(self) -> Result<Scope, ContextError> {
        let mut scope = Scope::default();
        let mut collisions = Vec::new();

        let mut claim = |scope: &mut Scope, binding: Binding, collisions: &mut Vec<Collision>| {
            match scope.get(&binding.name) {
                Some(existing) => collisions.push(Collision {
                    name: binding.name.clone(),
                    existing: existing.origin,
                    incoming: binding.origin,
                }),
                None => scope.insert(binding),
            }
        };

        // Unconditional layer: control utilities, then the main-input names.
        for (name, source) in &self.control {
            claim(
                &mut scope,
                Binding {
                    name: (*name).to_string(),
                    origin: BindingOrigin::Control,
                    value: BindingValue::Source(source),
                },
                &mut collisions,
            );
        }
        if let Some(value) = self.main_input {
            claim(
                &mut scope,
                Binding {
                    name: MAIN_BINDING.to_string(),
                    origin: BindingOrigin::MainInput,
                    value: BindingValue::Value(value.clone()),
                },
                &mut collisions,
            );
            if let Some(alias) = self.alias.filter(|a| a != MAIN_BINDING) {
                claim(
                    &mut scope,
                    Binding {
                        name: alias,
                        origin: BindingOrigin::MainInput,
                        value: BindingValue::Value(value),
                    },
                    &mut collisions,
                );
            }
            if let Some(raw) = self.raw_input {
                claim(
                    &mut scope,
                    Binding {
                        name: RAW_BINDING.to_string(),
                        origin: BindingOrigin::MainInput,
                        value: BindingValue::Value(Value::String(raw)),
                    },
                    &mut collisions,
                );
            }
        }

        // User layer: named inputs and functions, mutually exclusive by name.
        for (name, value) in self.inputs {
            claim(
                &mut scope,
                Binding {
                    name,
                    origin: BindingOrigin::NamedInput,
                    value: BindingValue::Value(value),
                },
                &mut collisions,
            );
        }
        for descriptor in self.functions {
            claim(
                &mut scope,
                Binding {
                    name: descriptor.name().to_string(),
                    origin: BindingOrigin::Function,
                    value: BindingValue::Command(descriptor),
                },
                &mut collisions,
            );
        }

        if !collisions.is_empty() {
            return Err(ContextError::NameCollisions(collisions));
        }

        // Library layer: user bindings always win, silently.
        for (name, source) in self.library {
            if scope.contains(name) {
                scope.suppressed.push(name.to_string());
            } else {
                scope.insert(Binding {
                    name: name.to_string(),
                    origin: BindingOrigin::Library,
                    value: BindingValue::Source(source),
                });
            }
        }

        Ok(scope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn main_input_binds_under_the_default_name() {
        let scope = ScopeBuilder::new().main_input(json!(1)).build().unwrap();
        assert_eq!(
            scope.get(MAIN_BINDING).map(|b| &b.value),
            Some(&BindingValue::Value(json!(1)))
        );
        assert_eq!(scope.len(), 1);
    }

    #[test]
    fn alias_adds_a_second_name_for_the_same_value() {
        let scope = ScopeBuilder::new()
            .main_input(json!({"a": 1}))
            .alias("data")
            .build()
            .unwrap();
        let main = scope.get(MAIN_BINDING).unwrap();
        let alias = scope.get("data").unwrap();
        assert_eq!(main.value, alias.value);
        assert_eq!(alias.origin, BindingOrigin::MainInput);
        assert_eq!(scope.len(), 2);
    }

    #[test]
    fn alias_equal_to_default_is_ignored() {
        let scope = ScopeBuilder::new()
            .main_input(json!(1))
            .alias(MAIN_BINDING)
            .build()
            .unwrap();
        assert_eq!(scope.len(), 1);
    }

    #[test]
    fn raw_input_binds_the_unparsed_text() {
        let scope = ScopeBuilder::new()
            .main_input(json!(1))
            .raw_input("1\n")
            .build()
            .unwrap();
        assert_eq!(
            scope.get(RAW_BINDING).map(|b| &b.value),
            Some(&BindingValue::Value(json!("1\n")))
        );
    }

    #[test]
    fn input_and_function_with_same_name_collide() {
        let err = ScopeBuilder::new()
            .named_input("x", json!(1))
            .function(FnDescriptor::new("x", "cmd"))
            .build()
            .unwrap_err();
        let ContextError::NameCollisions(collisions) = err;
        assert_eq!(collisions.len(), 1);
        assert_eq!(collisions[0].name, "x");
        assert_eq!(collisions[0].existing, BindingOrigin::NamedInput);
        assert_eq!(collisions[0].incoming, BindingOrigin::Function);
    }

    #[test]
    fn every_collision_is_reported() {
        let err = ScopeBuilder::new()
            .named_input("x", json!(1))
            .named_input("y", json!(2))
            .function(FnDescriptor::new("x", "a"))
            .function(FnDescriptor::new("y", "b"))
            .build()
            .unwrap_err();
        let ContextError::NameCollisions(collisions) = err;
        let names: Vec<&str> = collisions.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["x", "y"]);
    }

    #[test]
    fn user_input_colliding_with_alias_is_an_error() {
        let err = ScopeBuilder::new()
            .main_input(json!(1))
            .alias("data")
            .named_input("data", json!(2))
            .build()
            .unwrap_err();
        let ContextError::NameCollisions(collisions) = err;
        assert_eq!(collisions[0].existing, BindingOrigin::MainInput);
        assert_eq!(collisions[0].incoming, BindingOrigin::NamedInput);
    }

    #[test]
    fn user_function_colliding_with_control_is_an_error() {
        let err = ScopeBuilder::new()
            .control("exit", "() => {}")
            .function(FnDescriptor::new("exit", "cmd"))
            .build()
            .unwrap_err();
        let ContextError::NameCollisions(collisions) = err;
        assert_eq!(collisions[0].existing, BindingOrigin::Control);
    }

    #[test]
    fn library_helper_is_suppressed_not_overridden() {
        let scope = ScopeBuilder::new()
            .named_input("keys", json!([1, 2]))
            .library("keys", "(x) => Object.keys(x)")
            .library("len", "(x) => x.length")
            .build()
            .unwrap();
        assert_eq!(
            scope.get("keys").map(|b| b.origin),
            Some(BindingOrigin::NamedInput)
        );
        assert_eq!(scope.suppressed_helpers(), ["keys".to_string()]);
        assert!(scope.contains("len"));
    }

    #[test]
    fn collision_error_names_every_identifier() {
        let err = ScopeBuilder::new()
            .named_input("a", json!(1))
            .function(FnDescriptor::new("a", "cmd"))
            .build()
            .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("`a`"));
        assert!(message.contains("named input"));
        assert!(message.contains("function"));
    }

    #[test]
    fn iteration_preserves_insertion_order() {
        let scope = ScopeBuilder::new()
            .control("exit", "e")
            .main_input(json!(null))
            .named_input("n", json!(1))
            .library("keys", "k")
            .build()
            .unwrap();
        let names: Vec<&str> = scope.iter().map(|b| b.name.as_str()).collect();
        assert_eq!(names, vec!["exit", MAIN_BINDING, "n", "keys"]);
    }
}
