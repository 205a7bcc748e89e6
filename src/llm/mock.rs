//! Mock LLM client for testing.
//!
//! Without a script it plays a deterministic ReAct agent: list the tables,
//! read the schema of the table the question names, run one query and answer
//! from its result. Scripted replies take precedence, in order.

use async_trait::async_trait;
use futures::stream::{self, BoxStream};
use futures::StreamExt;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::error::{Result, SqlChatError};
use crate::llm::types::{Message, Role};
use crate::llm::LlmClient;

/// Mock LLM client that returns canned or rule-based responses.
#[derive(Debug, Clone, Default)]
pub struct MockLlmClient {
    script: Arc<Mutex<VecDeque<String>>>,
    /// Every prompt received, last user message only.
    prompts: Arc<Mutex<Vec<String>>>,
    fail_with: Option<String>,
}

impl MockLlmClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replies with the given strings, one per call, then falls back to the
    /// built-in agent behavior.
    pub fn scripted<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            script: Arc::new(Mutex::new(responses.into_iter().map(Into::into).collect())),
            ..Self::default()
        }
    }

    /// Every call fails with an LLM error carrying `message`.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            fail_with: Some(message.into()),
            ..Self::default()
        }
    }

    /// Number of completions requested so far.
    pub fn call_count(&self) -> usize {
        self.prompts.lock().map(|p| p.len()).unwrap_or_default()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }

    fn respond(&self, messages: &[Message]) -> Result<String> {
        let input = messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.clone())
            .unwrap_or_default();

        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(input.clone());
        }

        if let Some(message) = &self.fail_with {
            return Err(SqlChatError::llm(message.clone()));
        }

        if let Some(next) = self.script.lock().ok().and_then(|mut s| s.pop_front()) {
            return Ok(next);
        }

        Ok(react_step(&input))
    }
}

/// Produces the next agent step for a ReAct prompt.
fn react_step(prompt: &str) -> String {
    if let Some(query) = checker_query(prompt) {
        return query;
    }

    let Some(question_at) = prompt.rfind("Question: ") else {
        return "Final Answer: I don't understand that question. Could you please rephrase it?"
            .to_string();
    };
    let tail = &prompt[question_at + "Question: ".len()..];
    let question = tail.lines().next().unwrap_or_default().trim().to_string();

    let mut last_action: Option<(String, String)> = None;
    let mut pending: Option<(String, String)> = None;
    let mut observations: Vec<(String, String, String)> = Vec::new();
    let mut lines = tail.lines().peekable();

    while let Some(line) = lines.next() {
        if let Some(action) = line.strip_prefix("Action: ") {
            let input = lines
                .peek()
                .and_then(|next| next.strip_prefix("Action Input: "))
                .unwrap_or_default()
                .to_string();
            pending = Some((action.trim().to_string(), input.trim().to_string()));
        } else if let Some(observation) = line.strip_prefix("Observation: ") {
            let mut text = observation.to_string();
            while let Some(next) = lines.peek() {
                if next.starts_with("Thought:") {
                    break;
                }
                text.push('\n');
                text.push_str(next);
                lines.next();
            }
            if let Some((action, input)) = pending.take() {
                last_action = Some((action.clone(), input.clone()));
                observations.push((action, input, text.trim().to_string()));
            }
        }
    }

    let tables = observations
        .iter()
        .find(|(action, _, _)| action == "sql_db_list_tables")
        .map(|(_, _, output)| {
            output
                .split(',')
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .collect::<Vec<_>>()
        })
        .unwrap_or_default();

    let target = tables
        .iter()
        .find(|t| {
            question
                .split(|c: char| !c.is_alphanumeric() && c != '_')
                .any(|word| word.eq_ignore_ascii_case(t))
        })
        .or_else(|| tables.first())
        .cloned();

    match last_action.as_ref().map(|(a, _)| a.as_str()) {
        None => "I should look at the tables in the database to see what I can query.\n\
                 Action: sql_db_list_tables\nAction Input: "
            .to_string(),
        Some("sql_db_list_tables") => match target {
            Some(table) => format!(
                "The {table} table looks relevant. I should query its schema.\n\
                 Action: sql_db_schema\nAction Input: {table}"
            ),
            None => "Final Answer: The database has no tables.".to_string(),
        },
        Some("sql_db_schema") => {
            let table = target.unwrap_or_default();
            let sql = if question.to_lowercase().contains("how many") {
                format!("SELECT COUNT(*) FROM {table}")
            } else {
                format!("SELECT * FROM {table} LIMIT 10")
            };
            format!("I can now query the table.\nAction: sql_db_query\nAction Input: {sql}")
        }
        Some(_) => {
            let (action, _, output) = observations
                .last()
                .cloned()
                .unwrap_or_default();
            let table = target.unwrap_or_default();
            if action == "sql_db_query" && question.to_lowercase().contains("how many") {
                let count = output.lines().last().unwrap_or_default().trim().to_string();
                format!(
                    "I now know the final answer.\nFinal Answer: There are {count} rows in the {table} table."
                )
            } else {
                format!("I now know the final answer.\nFinal Answer: {output}")
            }
        }
    }
}

/// Returns the query unchanged when asked to double-check one.
fn checker_query(prompt: &str) -> Option<String> {
    if !prompt.contains("Double check the") {
        return None;
    }
    let start = prompt.find("```")? + 3;
    let rest = &prompt[start..];
    let rest = rest.strip_prefix("sql").unwrap_or(rest);
    let end = rest.find("```")?;
    Some(rest[..end].trim().to_string())
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, messages: &[Message], stop: &[&str]) -> Result<String> {
        let mut response = self.respond(messages)?;
        if let Some(cut) = stop.iter().filter_map(|s| response.find(s)).min() {
            response.truncate(cut);
        }
        Ok(response)
    }

    async fn complete_stream(
        &self,
        messages: &[Message],
        stop: &[&str],
    ) -> Result<BoxStream<'static, Result<String>>> {
        let response = self.complete(messages, stop).await?;

        let chunks: Vec<String> = response
            .chars()
            .collect::<Vec<_>>()
            .chunks(10)
            .map(|c| c.iter().collect())
            .collect();

        Ok(stream::iter(chunks.into_iter().map(Ok)).boxed())
    }

    fn model(&self) -> &str {
        "mock"
    }
}
