//! Session persistence across otherwise-stateless invocations.
//!
//! The session record is a small JSON document:
//!
//! ```json
//! { "values": {"name": ...}, "fns": {"name": "template"}, "in": ..., "out": ... }
//! ```
//!
//! Absent keys default, unknown keys are tolerated, so the schema can grow
//! without breaking older files. Loading never fails: a missing file is an
//! empty session and a corrupt file is recovered as an empty session with a
//! warning. Saving writes to a temp path in the same directory and renames,
//! so a concurrent reader never observes a partially-written file.
//!
//! There is no locking between concurrent invocations: the store is
//! explicitly last-writer-wins.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The persisted session record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// Named values available to expressions as bindings.
    #[serde(default)]
    pub values: BTreeMap<String, Value>,
    /// Named function templates (see the invocation protocol).
    #[serde(default)]
    pub fns: BTreeMap<String, String>,
    /// The last primary input, replayed when nothing is piped.
    #[serde(rename = "in", default)]
    pub last_input: Option<Value>,
    /// The last successful evaluation result.
    #[serde(rename = "out", default)]
    pub last_output: Option<Value>,
}

impl Session {
    /// Bind a value, retiring any same-named function from a prior run.
    pub fn set_value(&mut self, name: impl Into<String>, value: Value) {
        let name = name.into();
        self.fns.remove(&name);
        self.values.insert(name, value);
    }

    /// Bind a function template, retiring any same-named value.
    pub fn set_fn(&mut self, name: impl Into<String>, template: impl Into<String>) {
        let name = name.into();
        self.values.remove(&name);
        self.fns.insert(name, template.into());
    }

    /// Pure combination: apply `updates` on top of `self`, producing a new
    /// record. Each updated name goes through the retirement rule.
    pub fn merge(&self, updates: &Session) -> Session {
        let mut merged = self.clone();
        for (name, value) in &updates.values {
            merged.set_value(name.clone(), value.clone());
        }
        for (name, template) in &updates.fns {
            merged.set_fn(name.clone(), template.clone());
        }
        if updates.last_input.is_some() {
            merged.last_input = updates.last_input.clone();
        }
        if updates.last_output.is_some() {
            merged.last_output = updates.last_output.clone();
        }
        merged
    }

    /// Load the session at `path`. Absent or corrupt files yield an empty
    /// session; corruption is logged as recoverable, never fatal.
    pub fn load(path: &Path) -> Session {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Session::default(),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "could not read session file, starting empty");
                return Session::default();
            }
        };
        match serde_json::from_str(&text) {
            Ok(session) => session,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "session file is corrupt, starting empty");
                Session::default()
            }
        }
    }

    /// Persist the session at `path`, creating parent directories as needed.
    /// The write goes through a temp file plus rename.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating session directory: {}", parent.display()))?;
        }
        let text = serde_json::to_string_pretty(self).context("serializing session")?;
        let tmp = path.with_extension(format!("tmp.{}", std::process::id()));
        std::fs::write(&tmp, text)
            .with_context(|| format!("writing session temp file: {}", tmp.display()))?;
        std::fs::rename(&tmp, path)
            .with_context(|| format!("replacing session file: {}", path.display()))?;
        Ok(())
    }

    /// Remove the session file. A missing file is not an error.
    pub fn clear(path: &Path) -> Result<()> {
        match std::fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => {
                Err(e).with_context(|| format!("removing session file: {}", path.display()))
            }
        }
    }
}
