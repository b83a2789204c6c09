//! Session store tests against real files under the system temp directory.

use std::path::PathBuf;

use jex_kernel::Session;
use serde_json::json;

/// A unique path that does not exist yet; callers clean up after themselves.
fn scratch_path(tag: &str) -> PathBuf {
    std::env::temp_dir().join(format!(
        "jex-session-test-{tag}-{}-{:?}",
        std::process::id(),
        std::thread::current().id()
    ))
}

#[test]
fn round_trip_preserves_every_field() {
    let path = scratch_path("roundtrip").join("nested").join("session.json");
    let mut session = Session::default();
    session.set_value("threshold", json!(10));
    session.set_fn("ls", "ls {}");
    session.last_input = Some(json!({"a": 1}));
    session.last_output = Some(json!([1, 2]));

    session.save(&path).unwrap();
    let loaded = Session::load(&path);
    assert_eq!(loaded, session);

    std::fs::remove_dir_all(path.parent().unwrap().parent().unwrap()).unwrap();
}

#[test]
fn missing_file_loads_as_empty() {
    let path = scratch_path("missing");
    assert_eq!(Session::load(&path), Session::default());
}

#[test]
fn corrupt_file_is_recovered_as_empty() {
    let path = scratch_path("corrupt");
    std::fs::write(&path, "{ not json").unwrap();
    assert_eq!(Session::load(&path), Session::default());
    std::fs::remove_file(&path).unwrap();
}

#[test]
fn save_replaces_an_existing_record() {
    let path = scratch_path("replace");
    let mut first = Session::default();
    first.set_value("a", json!(1));
    first.save(&path).unwrap();

    let mut second = Session::default();
    second.set_fn("a", "echo hi");
    second.save(&path).unwrap();

    let loaded = Session::load(&path);
    assert!(!loaded.values.contains_key("a"));
    assert_eq!(loaded.fns.get("a").map(String::as_str), Some("echo hi"));
    std::fs::remove_file(&path).unwrap();
}

#[test]
fn save_leaves_no_temp_file_behind() {
    let dir = scratch_path("tempfiles");
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("session.json");
    Session::default().save(&path).unwrap();
    let entries: Vec<_> = std::fs::read_dir(&dir).unwrap().collect();
    assert_eq!(entries.len(), 1);
    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn clear_is_idempotent() {
    let path = scratch_path("clear");
    Session::default().save(&path).unwrap();
    Session::clear(&path).unwrap();
    assert!(!path.exists());
    // A second clear of the now-missing file succeeds too.
    Session::clear(&path).unwrap();
}

#[test]
fn older_record_with_extra_keys_still_loads() {
    let path = scratch_path("forward-compat");
    std::fs::write(
        &path,
        r#"{"values": {"x": 1}, "fns": {}, "in": null, "out": null, "schema": 99}"#,
    )
    .unwrap();
    let loaded = Session::load(&path);
    assert_eq!(loaded.values.get("x"), Some(&json!(1)));
    std::fs::remove_file(&path).unwrap();
}
