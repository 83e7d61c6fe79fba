#![allow(missing_docs)]

use std::path::{Path, PathBuf};

use assert_cmd::cargo::cargo_bin_cmd;
use tempfile::TempDir;

fn db_path(name: &str) -> (TempDir, PathBuf) {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join(format!("{name}.rkv"));
    (dir, path)
}

fn stdout_of(args: &[&str], db: &Path, tail: &[&str]) -> String {
    let output = cargo_bin_cmd!("radixkv")
        .args(args)
        .arg(db)
        .args(tail)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    String::from_utf8(output).expect("utf8 output")
}

#[test]
fn put_then_get_round_trips_through_the_file() {
    let (_dir, db) = db_path("put_get");
    stdout_of(&["put"], &db, &["greeting", "hello"]);
    stdout_of(&["put"], &db, &["greet", "hi"]);
    assert_eq!(stdout_of(&["get"], &db, &["greeting"]).trim(), "hello");
    assert_eq!(stdout_of(&["get"], &db, &["greet"]).trim(), "hi");
}

#[test]
fn missing_key_exits_with_status_two() {
    let (_dir, db) = db_path("missing");
    stdout_of(&["put"], &db, &["present", "1"]);
    cargo_bin_cmd!("radixkv")
        .arg("get")
        .arg(&db)
        .arg("absent")
        .assert()
        .code(2);
}

#[test]
fn hex_arguments_and_output() {
    let (_dir, db) = db_path("hex");
    stdout_of(&["put", "--hex"], &db, &["00ff", "deadbeef"]);
    assert_eq!(stdout_of(&["get", "--hex"], &db, &["00ff"]).trim(), "deadbeef");
}

#[test]
fn stats_reports_root_after_commit() {
    let (_dir, db) = db_path("stats");
    assert!(stdout_of(&["stats"], &db, &[]).contains("empty database"));
    stdout_of(&["put"], &db, &["k", "v"]);
    let report = stdout_of(&["stats"], &db, &[]);
    assert!(report.contains("root offset: "));
    assert!(!report.contains("empty database"));
}
