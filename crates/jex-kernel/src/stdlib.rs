//! Convenience bindings shipped with every evaluation.
//!
//! Each entry is a name paired with a JavaScript source snippet. Library
//! helpers sit at the bottom of the precedence order and are silently
//! shadowed by any user binding of the same name; control utilities sit at
//! the top and collide loudly instead (see [`crate::context`]).

/// Helpers that lose name conflicts to user bindings.
pub const LIBRARY_HELPERS: &[(&str, &str)] = &[
    ("keys", "(o) => Object.keys(o)"),
    ("values", "(o) => Object.values(o)"),
    ("entries", "(o) => Object.entries(o)"),
    ("len", "(x) => x?.length ?? Object.keys(x ?? {}).length"),
    ("sum", "(a) => a.reduce((t, n) => t + n, 0)"),
    ("uniq", "(a) => [...new Set(a)]"),
    (
        "sort",
        "(a, key) => [...a].sort(key ? (x, y) => (key(x) < key(y) ? -1 : key(x) > key(y) ? 1 : 0) : undefined)",
    ),
    ("flat", "(a, depth) => a.flat(depth ?? 1)"),
];

/// Utilities that win name conflicts and fail the run if a user binding
/// tries to take their name.
pub const CONTROL_UTILITIES: &[(&str, &str)] = &[
    // Ends the run with an exit code. Pending session updates still flush
    // unless the caller passes { skipSave: true }.
    (
        "exit",
        "(code, opts) => { console.log('__JEX_EXIT ' + JSON.stringify({ code: (code ?? 0) | 0, \
         skipSave: !!(opts && opts.skipSave) })); process.exit(0); }",
    ),
];

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn no_name_is_both_helper_and_control() {
        let helpers: HashSet<_> = LIBRARY_HELPERS.iter().map(|(n, _)| *n).collect();
        assert_eq!(helpers.len(), LIBRARY_HELPERS.len());
        for (name, _) in CONTROL_UTILITIES {
            assert!(!helpers.contains(name));
        }
    }

    #[test]
    fn snippets_are_single_expressions_or_blocks() {
        for (name, source) in LIBRARY_HELPERS.iter().chain(CONTROL_UTILITIES) {
            assert!(!name.is_empty());
            assert!(source.contains("=>"), "{name} is not an arrow function");
        }
    }
}
