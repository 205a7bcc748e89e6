//! Integration tests for headless mode.

use super::common::run_headless;
use crate::integration::student_db;

#[test]
fn test_headless_basic_execution() {
    let (code, stdout, _) = run_headless(&["--events", "key:esc"]);

    assert_eq!(code, 0, "Expected exit code 0");
    assert!(stdout.contains("Events: 1 executed"), "got: {stdout}");
    assert!(stdout.contains("Chat with SQL"));
}

#[test]
fn test_headless_greeting_and_placeholder() {
    let (code, stdout, _) = run_headless(&[
        "--events",
        "assert:contains:Hello! How can I assist you with your SQL queries today?,assert:contains:Enter your SQL query here:,assert:state:message_count=1",
        "--output",
        "json",
    ]);

    assert_eq!(code, 0, "got: {stdout}");
    assert!(stdout.contains(r#""passed": 3"#));
    assert!(stdout.contains(r#""failed": 0"#));
}

#[test]
fn test_headless_assertion_fail() {
    let (code, stdout, _) = run_headless(&[
        "--events",
        "type:hello,assert:contains:goodbye",
        "--output",
        "json",
    ]);

    assert_eq!(code, 1, "Should exit with code 1 on assertion failure");
    assert!(stdout.contains(r#""input_text": "hello""#));
    assert!(stdout.contains(r#""failed": 1"#));
}

#[tokio::test]
async fn test_headless_answers_count_question() {
    let (_dir, path) = student_db().await;
    let path = path.to_string_lossy().to_string();

    let (code, stdout, stderr) = run_headless(&[
        "--local-db",
        &path,
        "--events",
        "type:How many rows are in table STUDENT?,key:enter,assert:state:phase=Idle,assert:state:message_count=3",
        "--output",
        "json",
    ]);

    assert_eq!(code, 0, "stdout: {stdout}\nstderr: {stderr}");
    let parsed: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(
        parsed["state"]["last_message"],
        "There are 5 rows in the STUDENT table."
    );
    assert_eq!(parsed["transcript"][1]["content"], "How many rows are in table STUDENT?");
}

#[test]
fn test_headless_incomplete_mysql_details_halt() {
    let (code, stdout, _) = run_headless(&[
        "--events",
        "key:tab,key:tab,key:space,key:tab,type:How many rows?,key:enter,assert:contains:Please provide all MySQL connection details.,assert:state:phase=Halted,assert:state:message_count=1",
        "--output",
        "json",
    ]);

    assert_eq!(code, 0, "got: {stdout}");
    assert!(stdout.contains(r#""mode": "remote""#));
    assert!(stdout.contains(r#""failed": 0"#));
}

#[test]
fn test_headless_clear_chat_restores_greeting() {
    let (code, stdout, _) = run_headless(&[
        "--events",
        "type:How many rows?,key:enter,key:ctrl+l,assert:state:message_count=1",
        "--output",
        "json",
    ]);

    assert_eq!(code, 0, "got: {stdout}");
    assert!(stdout.contains(r#""failed": 0"#));
}

#[test]
fn test_headless_requires_events() {
    let (code, _, stderr) = run_headless(&[]);
    assert_eq!(code, 1);
    assert!(stderr.contains("--headless requires --events or --script"));
}
