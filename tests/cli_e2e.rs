//! End-to-end CLI tests for chatimport.
//!
//! These tests run the actual binary and check its stdout, stderr and exit
//! codes.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test --test cli_e2e
//! ```

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::PathBuf;
use tempfile::{TempDir, tempdir};

// ============================================================================
// Test Fixtures
// ============================================================================

fn setup_fixtures() -> TempDir {
    let dir = tempdir().expect("Failed to create temp dir");

    let group = r#"{
  "session": {"wxid": "1234@chatroom", "nickname": "Book Club", "type": "群聊", "messageCount": 4},
  "messages": [
    {"localId": 1, "createTime": 1705314600, "type": "文本消息", "content": "Hello!", "senderUsername": "wxid_alice", "senderDisplayName": "Alice"},
    {"localId": 2, "createTime": 1705314660, "type": "图片消息", "content": null, "senderUsername": "wxid_bob", "senderDisplayName": "Bob"},
    {"localId": 3, "createTime": 1705314720, "type": "文本消息", "content": "Nice", "senderUsername": "wxid_alice", "senderDisplayName": "Alice"},
    {"localId": 4, "createTime": 1705314780, "type": "文本消息", "content": "no sender"}
  ]
}"#;
    fs::write(dir.path().join("group.json"), group).unwrap();

    let telegram = r#"{
  "name": "Test Chat",
  "type": "personal_chat",
  "messages": [
    {"id": 1, "type": "message", "date_unixtime": "1705314600", "from": "Alice", "text": "Hello!"}
  ]
}"#;
    fs::write(dir.path().join("telegram.json"), telegram).unwrap();

    let truncated = r#"{"session": {"nickname": "Cut"}, "messages": [{"createTime": 1, "senderUsername": "wxid_a"}, {"createTime": "#;
    fs::write(dir.path().join("truncated.json"), truncated).unwrap();

    dir
}

fn fixture(dir: &TempDir, name: &str) -> PathBuf {
    dir.path().join(name)
}

fn chatimport() -> Command {
    Command::cargo_bin("chatimport").expect("Failed to find binary")
}

// ============================================================================
// detect
// ============================================================================

#[test]
fn test_detect_wechat() {
    let dir = setup_fixtures();
    chatimport()
        .arg("detect")
        .arg(fixture(&dir, "group.json"))
        .assert()
        .success()
        .stdout(predicate::str::contains("wechat-json"))
        .stdout(predicate::str::contains("WeChat"));
}

#[test]
fn test_detect_unrecognized() {
    let dir = setup_fixtures();
    chatimport()
        .arg("detect")
        .arg(fixture(&dir, "telegram.json"))
        .assert()
        .code(2)
        .stderr(predicate::str::contains("format not recognized"));
}

#[test]
fn test_detect_missing_file() {
    chatimport()
        .args(["detect", "/nonexistent/file.json"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Error"));
}

// ============================================================================
// parse
// ============================================================================

#[test]
fn test_parse_writes_json_lines() {
    let dir = setup_fixtures();
    let output = chatimport()
        .arg("parse")
        .arg(fixture(&dir, "group.json"))
        .output()
        .unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    let events: Vec<serde_json::Value> = stdout
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    let kinds: Vec<&str> = events.iter().map(|e| e["event"].as_str().unwrap()).collect();
    assert_eq!(
        kinds,
        vec!["progress", "meta", "members", "messages", "progress", "done"]
    );

    assert_eq!(events[1]["name"], "Book Club");
    assert_eq!(events[1]["type"], "group");
    assert_eq!(events[1]["platform"], "wechat");
    assert_eq!(events[3]["messages"][1]["type"], "IMAGE");
    assert_eq!(events[5]["message_count"], 3);
    assert_eq!(events[5]["member_count"], 2);
}

#[test]
fn test_parse_summary() {
    let dir = setup_fixtures();
    chatimport()
        .arg("parse")
        .arg(fixture(&dir, "group.json"))
        .arg("--summary")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Book Club: 3 messages, 2 members, 1 dropped",
        ))
        .stderr(predicate::str::contains("100.0%"));
}

#[test]
fn test_parse_batch_size() {
    let dir = setup_fixtures();
    let output = chatimport()
        .arg("parse")
        .arg(fixture(&dir, "group.json"))
        .args(["--batch-size", "1"])
        .output()
        .unwrap();
    let stdout = String::from_utf8(output.stdout).unwrap();
    let batches = stdout
        .lines()
        .filter(|line| line.contains(r#""event":"messages""#))
        .count();
    assert_eq!(batches, 3);
}

#[test]
fn test_parse_zero_batch_size_fails() {
    let dir = setup_fixtures();
    chatimport()
        .arg("parse")
        .arg(fixture(&dir, "group.json"))
        .args(["--batch-size", "0"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains(r#""event":"error""#));
}

#[test]
fn test_parse_truncated_file() {
    let dir = setup_fixtures();
    chatimport()
        .arg("parse")
        .arg(fixture(&dir, "truncated.json"))
        .assert()
        .code(1)
        .stdout(predicate::str::contains(r#""event":"error""#))
        .stdout(predicate::str::contains(r#""event":"done""#).not());
}

#[test]
fn test_parse_unrecognized() {
    let dir = setup_fixtures();
    chatimport()
        .arg("parse")
        .arg(fixture(&dir, "telegram.json"))
        .assert()
        .code(2)
        .stdout(predicate::str::is_empty());
}

#[test]
fn test_parse_forced_format() {
    let dir = setup_fixtures();
    // Forcing the plugin skips detection; the file has no message array it knows
    chatimport()
        .arg("parse")
        .arg(fixture(&dir, "telegram.json"))
        .args(["--format", "wechat-json", "--summary"])
        .assert()
        .success()
        .stdout(predicate::str::contains("0 messages"));
}

#[test]
fn test_parse_unknown_forced_format() {
    let dir = setup_fixtures();
    chatimport()
        .arg("parse")
        .arg(fixture(&dir, "group.json"))
        .args(["--format", "signal-json"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("wechat-json"));
}

// ============================================================================
// formats / misc
// ============================================================================

#[test]
fn test_formats_lists_builtin() {
    chatimport()
        .arg("formats")
        .assert()
        .success()
        .stdout(predicate::str::contains("wechat-json"))
        .stdout(predicate::str::contains("priority 10"));
}

#[test]
fn test_help() {
    chatimport()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("detect"))
        .stdout(predicate::str::contains("parse"))
        .stdout(predicate::str::contains("formats"));
}

#[test]
fn test_version() {
    chatimport()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}
