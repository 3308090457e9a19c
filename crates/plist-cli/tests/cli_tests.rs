//! Integration tests for the `plist` CLI binary.
//!
//! These use `assert_cmd` and `predicates` to exercise the parse and kinds
//! subcommands through the actual binary, including stdin piping, file
//! input, chunked feeding, and error handling.

// `Command::cargo_bin` was deprecated in assert_cmd 2.1.2 in favor of
// `cargo::cargo_bin_cmd!`. Allow it until we migrate.
#![allow(deprecated)]

use assert_cmd::Command;
use predicates::prelude::*;

const SAMPLE: &str = r#"{ "name" : "Alice" ; "scores" : ( 95 , 87 , 92 ) ; }"#;

// ─────────────────────────────────────────────────────────────────────────────
// Parse subcommand
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn parse_stdin_to_stdout() {
    Command::cargo_bin("plist")
        .unwrap()
        .arg("parse")
        .write_stdin(SAMPLE)
        .assert()
        .success()
        .stdout(predicate::str::contains("dict"))
        .stdout(predicate::str::contains("key=name"))
        .stdout(predicate::str::contains("string=Alice"))
        .stdout(predicate::str::contains("integer=95"));
}

#[test]
fn parse_file_input() {
    let path = "/tmp/plist-test-parse-input.plist";
    std::fs::write(path, SAMPLE).unwrap();

    Command::cargo_bin("plist")
        .unwrap()
        .args(["parse", "-i", path])
        .assert()
        .success()
        .stdout(predicate::str::contains("key=scores"))
        .stdout(predicate::str::contains("array"));

    let _ = std::fs::remove_file(path);
}

#[test]
fn parse_with_single_byte_chunks_matches_default() {
    let default_out = Command::cargo_bin("plist")
        .unwrap()
        .arg("parse")
        .write_stdin(SAMPLE)
        .output()
        .expect("parse should run");
    assert!(default_out.status.success());

    let chunked_out = Command::cargo_bin("plist")
        .unwrap()
        .args(["parse", "--chunk-size", "1"])
        .write_stdin(SAMPLE)
        .output()
        .expect("parse should run");
    assert!(chunked_out.status.success());

    assert_eq!(default_out.stdout, chunked_out.stdout);
}

#[test]
fn parse_scalar_document() {
    Command::cargo_bin("plist")
        .unwrap()
        .arg("parse")
        .write_stdin("<*D2001-11-12 18:31:01 +0000>")
        .assert()
        .success()
        .stdout(predicate::str::contains("date=2001-11-12T18:31:01+0000"));
}

#[test]
fn parse_invalid_input_fails() {
    Command::cargo_bin("plist")
        .unwrap()
        .arg("parse")
        .write_stdin("{ oops }")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to parse"));
}

#[test]
fn parse_incomplete_input_fails() {
    Command::cargo_bin("plist")
        .unwrap()
        .arg("parse")
        .write_stdin(r#"{ "open" : 1 ;"#)
        .assert()
        .failure()
        .stderr(predicate::str::contains("complete property list"));
}

#[test]
fn parse_missing_file_fails() {
    Command::cargo_bin("plist")
        .unwrap()
        .args(["parse", "-i", "/tmp/plist-test-does-not-exist.plist"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read file"));
}

// ─────────────────────────────────────────────────────────────────────────────
// Kinds subcommand
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn kinds_lists_all_names() {
    let assert = Command::cargo_bin("plist")
        .unwrap()
        .arg("kinds")
        .assert()
        .success();
    let stdout = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    let names: Vec<&str> = stdout.lines().collect();
    assert_eq!(
        names,
        ["dict", "key", "array", "data", "date", "string", "integer", "real", "boolean"]
    );
}

// ─────────────────────────────────────────────────────────────────────────────
// General behavior
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn help_flag_shows_usage() {
    Command::cargo_bin("plist")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("parse"))
        .stdout(predicate::str::contains("kinds"));
}

#[test]
fn unknown_subcommand_fails() {
    Command::cargo_bin("plist")
        .unwrap()
        .arg("frobnicate")
        .assert()
        .failure()
        .stderr(predicate::str::contains("error").or(predicate::str::contains("unrecognized")));
}
