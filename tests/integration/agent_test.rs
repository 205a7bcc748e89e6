//! End-to-end agent turns against a real SQLite file with the scripted model.

use super::student_db;
use pretty_assertions::assert_eq;
use sqlchat::agent::{toolkit, AgentStep, ReactAgent, SqlToolkit};
use sqlchat::app::{Orchestrator, SessionSettings};
use sqlchat::config::Config;
use sqlchat::connection::{ConnectionConfig, HandleFactory};
use sqlchat::llm::{LlmProvider, MockLlmClient};
use sqlchat::session::{run_turn, ChatLoop, ChatRole, GREETING};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

fn orchestrator_for(path: PathBuf) -> Orchestrator {
    let mut config = Config::default();
    config.database.local_path = Some(path);
    Orchestrator::new(config, LlmProvider::Mock)
}

#[tokio::test]
async fn test_row_count_question() {
    let (_dir, path) = student_db().await;
    let orchestrator = orchestrator_for(path);
    let mut steps = Vec::new();

    let answer = orchestrator
        .answer(
            &SessionSettings::default(),
            "How many rows are in table STUDENT?",
            &mut |step| steps.push(step),
        )
        .await
        .unwrap();

    assert_eq!(answer, "There are 5 rows in the STUDENT table.");
    let actions: Vec<(String, String)> = steps
        .into_iter()
        .filter_map(|step| match step {
            AgentStep::Action { tool, input } => Some((tool, input)),
            _ => None,
        })
        .collect();
    assert_eq!(
        actions,
        vec![
            (toolkit::LIST_TABLES.to_string(), String::new()),
            (toolkit::SCHEMA.to_string(), "STUDENT".to_string()),
            (
                toolkit::QUERY.to_string(),
                "SELECT COUNT(*) FROM STUDENT".to_string()
            ),
        ]
    );
}

#[tokio::test]
async fn test_turns_share_one_cached_handle() {
    let (_dir, path) = student_db().await;
    let orchestrator = orchestrator_for(path);
    let settings = SessionSettings::default();

    for _ in 0..2 {
        orchestrator
            .answer(&settings, "How many students are there?", &mut |_| {})
            .await
            .unwrap();
    }

    assert_eq!(orchestrator.factory().cached().await, 1);
    orchestrator.close().await;
    assert_eq!(orchestrator.factory().cached().await, 0);
}

#[tokio::test]
async fn test_chat_session_records_turn() {
    let (_dir, path) = student_db().await;
    let factory = HandleFactory::new(&path, Duration::from_secs(7200));
    let db = factory.configure(&ConnectionConfig::Local).await.unwrap();
    let agent = ReactAgent::new(Arc::new(MockLlmClient::new()), db).unwrap();

    let mut chat = ChatLoop::new();
    run_turn(&mut chat, &agent, "How many rows are in table STUDENT?", &mut |_| {})
        .await
        .unwrap();

    let messages = chat.messages();
    assert_eq!(messages.len(), 3);
    assert_eq!(messages[0].content, GREETING);
    assert_eq!(messages[1].role, ChatRole::User);
    assert_eq!(messages[2].content, "There are 5 rows in the STUDENT table.");
}

#[tokio::test]
async fn test_query_tool_refuses_writes_on_real_file() {
    let (_dir, path) = student_db().await;
    let factory = HandleFactory::new(&path, Duration::from_secs(7200));
    let db = factory.configure(&ConnectionConfig::Local).await.unwrap();
    let tools = SqlToolkit::new(db.clone(), Arc::new(MockLlmClient::new()));

    let output = tools
        .execute(toolkit::QUERY, "DELETE FROM STUDENT")
        .await
        .unwrap();
    assert!(output.starts_with("Error:"), "got: {output}");

    let count = tools
        .execute(toolkit::QUERY, "SELECT COUNT(*) FROM STUDENT")
        .await
        .unwrap();
    assert_eq!(count, "COUNT(*)\n5");
}

#[tokio::test]
async fn test_schema_tool_shows_create_statement_and_sample_rows() {
    let (_dir, path) = student_db().await;
    let factory = HandleFactory::new(&path, Duration::from_secs(7200));
    let db = factory.configure(&ConnectionConfig::Local).await.unwrap();
    let tools = SqlToolkit::new(db, Arc::new(MockLlmClient::new()));

    let output = tools.execute(toolkit::SCHEMA, "STUDENT").await.unwrap();
    assert!(output.contains("CREATE TABLE"), "got: {output}");
    assert!(output.contains("3 rows from STUDENT table:"), "got: {output}");
    assert!(output.contains("Krish"), "got: {output}");
}

#[tokio::test]
async fn test_missing_database_fails_the_turn_only() {
    let dir = tempfile::tempdir().unwrap();
    let orchestrator = orchestrator_for(dir.path().join("absent.db"));

    let err = orchestrator
        .answer(&SessionSettings::default(), "How many?", &mut |_| {})
        .await
        .unwrap_err();
    assert_eq!(err.category(), "Connection Error");

    let mut chat = ChatLoop::new();
    chat.submit("How many?").unwrap();
    chat.complete(Err(err));
    assert!(!chat.is_awaiting());
    assert!(chat.messages()[2].content.starts_with("Connection error:"));
}
