//! XDG Base Directory paths for jex.
//!
//! Generic XDG primitives plus the jex-specific paths composed on top of
//! them. The session file location can be overridden with
//! `$JEX_SESSION_FILE`, which is how the tests keep away from the real
//! cache directory.

use std::path::PathBuf;

use directories::BaseDirs;

/// Environment variable overriding the session file location.
pub const SESSION_FILE_ENV_VAR: &str = "JEX_SESSION_FILE";

/// Get the user's home directory.
///
/// Returns `$HOME` or falls back to `/tmp` if not set.
pub fn home_dir() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
}

/// Get XDG cache home directory.
///
/// Returns `$XDG_CACHE_HOME` or falls back to `~/.cache`.
pub fn xdg_cache_home() -> PathBuf {
    BaseDirs::new()
        .map(|d| d.cache_dir().to_path_buf())
        .unwrap_or_else(|| home_dir().join(".cache"))
}

/// Get the jex cache directory.
///
/// Uses `$XDG_CACHE_HOME/jex` or falls back to `~/.cache/jex`.
pub fn cache_dir() -> PathBuf {
    xdg_cache_home().join("jex")
}

/// Get the session file path.
///
/// `$JEX_SESSION_FILE` takes precedence; otherwise the file lives in the
/// jex cache directory.
pub fn session_file() -> PathBuf {
    std::env::var_os(SESSION_FILE_ENV_VAR)
        .map(PathBuf::from)
        .unwrap_or_else(|| cache_dir().join("session.json"))
}
