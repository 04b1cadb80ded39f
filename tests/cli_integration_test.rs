//! CLI Integration Tests
//!
//! Runs the searchql binary the way a shell user would and checks its output
//! and exit status.

use std::io::Write;
use std::process::{Command, Output};

fn searchql(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_searchql"))
        .args(args)
        .output()
        .expect("run searchql")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn test_parse_table() {
    let output = searchql(&["parse", "is:unresolved assignee:me"]);
    assert!(output.status.success(), "searchql failed: {output:?}");
    let text = stdout(&output);
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].starts_with("filter:0"));
    assert!(lines[0].contains("key=is"));
    assert!(lines[1].starts_with("freeText:0"));
    assert!(lines[2].contains("value=\"me\""));
}

#[test]
fn test_parse_json() {
    let output = searchql(&["parse", "--json", "duration:>500ms"]);
    assert!(output.status.success(), "searchql failed: {output:?}");
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).expect("valid json");
    assert_eq!(json["source"], "duration:>500ms");
    assert_eq!(json["tokens"][0]["operator"], ">");
    assert_eq!(json["tokens"][0]["value"]["kind"], "duration");
}

#[test]
fn test_parse_raw_keeps_spaces() {
    let output = searchql(&["parse", "--raw", "foo bar"]);
    assert!(output.status.success());
    let text = stdout(&output);
    assert_eq!(text.lines().count(), 3);
    assert!(text.contains("spaces:0"));
}

#[test]
fn test_operators() {
    let output = searchql(&["operators", "duration:>500ms", "--token", "filter:0"]);
    assert!(output.status.success(), "searchql failed: {output:?}");
    let text = stdout(&output);
    assert!(text.contains(">= (:>=)"));
    assert!(text.contains("is not (:)"));

    let output = searchql(&["operators", "just text", "--token", "freeText:0"]);
    assert!(!output.status.success());
}

#[test]
fn test_edit_and_delete() {
    let output = searchql(&["edit", "a:1 b:2", "--token", "filter:1", "--text", "3"]);
    assert!(output.status.success(), "searchql failed: {output:?}");
    assert_eq!(stdout(&output).trim_end(), "a:1 b:3");

    let output = searchql(&[
        "edit", "a:1 b:2", "--token", "filter:0", "--part", "key", "--text", "x",
    ]);
    assert_eq!(stdout(&output).trim_end(), "x:1 b:2");

    let output = searchql(&["delete", "a:1 b:2", "--token", "filter:0"]);
    assert!(output.status.success());
    assert_eq!(stdout(&output).trim_end(), "b:2");
}

#[test]
fn test_errors_exit_non_zero() {
    let output = searchql(&["edit", "a:1", "--token", "filter:4", "--text", "3"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("Error"));

    let output = searchql(&["delete", "a:1", "--token", "bogus"]);
    assert_eq!(output.status.code(), Some(1));

    let output = searchql(&["parse", "a:1", "--config", "/no/such/config.toml"]);
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn test_word_at_cursor() {
    let output = searchql(&["word", "is:unresolved assignee:me", "--cursor", "16"]);
    assert!(output.status.success());
    assert_eq!(stdout(&output).trim_end(), "assignee:me");
}

#[test]
fn test_config_flag_and_global_options() {
    let mut file = tempfile::Builder::new()
        .suffix(".json")
        .tempfile()
        .expect("create temp file");
    write!(file, r#"{{"fields": {{"status": {{"type": "text"}}}}}}"#).expect("write config");

    let output = searchql(&[
        "parse",
        "status:open nope:1",
        "--config",
        file.path().to_str().unwrap(),
    ]);
    assert!(output.status.success(), "searchql failed: {output:?}");
    let text = stdout(&output);
    assert!(text.contains("invalid=unknown_key"));

    let output = searchql(&["parse", "--flatten-parens", "(a:1)"]);
    assert!(stdout(&output).contains("paren:1"));

    let output = searchql(&["parse", "--no-boolean", "a:1 OR b:2"]);
    assert!(!stdout(&output).contains("logicBoolean"));
}
