use json_autosync::persist::{atomic_write, load};
use json_autosync::{connect, PrettyJson};
use serde_json::json;
use tempfile::TempDir;

#[test]
fn load_missing_file_is_empty_and_creates_nothing() {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join("missing.json");
    let map = load(&path, &PrettyJson).unwrap();
    assert!(map.is_empty());
    assert!(!path.exists());
}

#[test]
fn load_whitespace_only_file_is_empty() {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join("blank.json");
    std::fs::write(&path, "  \n").unwrap();
    assert!(load(&path, &PrettyJson).unwrap().is_empty());
}

#[test]
fn atomic_write_leaves_no_temp_file() {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join("atomic.json");
    atomic_write(&path, b"{}").unwrap();
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "{}");
    assert!(!dir.path().join("atomic.json.tmp").exists());
}

#[test]
fn atomic_write_without_extension() {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join(".configrc");
    atomic_write(&path, b"{}").unwrap();
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "{}");
    assert!(!dir.path().join(".configrc.tmp").exists());
}

#[test]
fn every_save_overwrites_the_whole_file() {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join("overwrite.json");
    let config = connect(&path).unwrap();
    config.set("long_key_with_a_long_value", "x".repeat(200)).unwrap();
    config.delete("long_key_with_a_long_value").unwrap();
    config.set("a", 1).unwrap();

    assert_eq!(std::fs::read_to_string(&path).unwrap(), "{\n  \"a\": 1\n}");
    let reloaded = connect(&path).unwrap();
    assert_eq!(reloaded, json!({"a": 1}));
}

#[test]
fn write_into_missing_directory_is_an_io_error() {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join("no_such_dir").join("config.json");
    let config = connect(&path).unwrap();
    let err = config.set("a", 1).unwrap_err();
    assert!(matches!(err, json_autosync::Error::Io(_)));
    // the change is kept in memory
    assert_eq!(config, json!({"a": 1}));
}
