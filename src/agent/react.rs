//! Zero-shot ReAct loop.

use async_trait::async_trait;
use futures::StreamExt;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::parser::{AgentOutput, OutputParser};
use super::prompt::{append_step, build_react_prompt};
use super::{Agent, AgentStep, SqlToolkit, ToolDefinition};
use crate::db::DatabaseHandle;
use crate::error::Result;
use crate::llm::{LlmClient, Message};

/// Iteration ceiling per question.
pub const MAX_ITERATIONS: usize = 15;

/// Answer given when the ceiling is reached.
pub const ITERATION_LIMIT_ANSWER: &str = "Agent stopped due to iteration limit or time limit.";

const OBSERVATION_STOP: &str = "\nObservation:";

/// Tool name reported for format-error observations.
const FORMAT_ERROR_TOOL: &str = "_Exception";

/// SQL agent driving a streaming LLM through the toolkit.
pub struct ReactAgent {
    llm: Arc<dyn LlmClient>,
    toolkit: SqlToolkit,
    parser: OutputParser,
    max_iterations: usize,
}

impl ReactAgent {
    pub fn new(llm: Arc<dyn LlmClient>, db: DatabaseHandle) -> Result<Self> {
        Ok(Self {
            toolkit: SqlToolkit::new(db, llm.clone()),
            llm,
            parser: OutputParser::new()?,
            max_iterations: MAX_ITERATIONS,
        })
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Streams one model turn, forwarding chunks as tokens.
    async fn next_output(
        &self,
        prompt: String,
        on_step: &mut (dyn FnMut(AgentStep) + Send),
    ) -> Result<String> {
        let messages = [Message::user(prompt)];
        let mut stream = self
            .llm
            .complete_stream(&messages, &[OBSERVATION_STOP])
            .await?;

        let mut output = String::new();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            output.push_str(&chunk);
            on_step(AgentStep::Token(chunk));
        }

        // Providers that ignore the stop sequence would otherwise answer
        // their own action.
        if let Some(cut) = output.find(OBSERVATION_STOP) {
            output.truncate(cut);
        }
        Ok(output)
    }
}

#[async_trait]
impl Agent for ReactAgent {
    fn available_actions(&self) -> Vec<ToolDefinition> {
        self.toolkit.tools()
    }

    async fn run(
        &self,
        question: &str,
        on_step: &mut (dyn FnMut(AgentStep) + Send),
    ) -> Result<String> {
        let tools = self.toolkit.tools();
        let dialect = self.toolkit.dialect();
        let mut scratchpad = String::new();

        info!(model = self.llm.model(), dialect = dialect, "Agent run started");

        for iteration in 1..=self.max_iterations {
            let prompt = build_react_prompt(dialect, &tools, question, &scratchpad);
            let output = self.next_output(prompt, on_step).await?;
            debug!(iteration = iteration, output_len = output.len(), "Model step");

            match self.parser.parse(&output) {
                Ok(AgentOutput::Finish { answer, thought }) => {
                    if !thought.is_empty() {
                        on_step(AgentStep::Thought(thought));
                    }
                    info!(iterations = iteration, "Agent produced final answer");
                    return Ok(answer);
                }
                Ok(AgentOutput::Action {
                    tool,
                    input,
                    thought,
                }) => {
                    if !thought.is_empty() {
                        on_step(AgentStep::Thought(thought));
                    }
                    on_step(AgentStep::Action {
                        tool: tool.clone(),
                        input: input.clone(),
                    });

                    let observation = self.toolkit.execute(&tool, &input).await?;
                    on_step(AgentStep::Observation {
                        tool,
                        output: observation.clone(),
                    });
                    append_step(&mut scratchpad, &output, &observation);
                }
                Err(format_error) => {
                    warn!(iteration = iteration, error = %format_error, "Unparseable model output");
                    let observation = format_error.observation();
                    on_step(AgentStep::Observation {
                        tool: FORMAT_ERROR_TOOL.to_string(),
                        output: observation.to_string(),
                    });
                    append_step(&mut scratchpad, &output, observation);
                }
            }
        }

        warn!(max_iterations = self.max_iterations, "Agent hit iteration limit");
        Ok(ITERATION_LIMIT_ANSWER.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::toolkit::{LIST_TABLES, QUERY, SCHEMA};
    use crate::db::{Column, ColumnInfo, MockDatabaseClient, QueryResult, Schema, Table, Value};
    use crate::llm::MockLlmClient;
    use pretty_assertions::assert_eq;

    fn student_db() -> MockDatabaseClient {
        let schema = Schema {
            tables: vec![
                Table::new("CLASSES").with_column(Column::new("CLASS", "TEXT")),
                Table::new("STUDENT")
                    .with_column(Column::new("NAME", "VARCHAR(25)"))
                    .with_column(Column::new("MARKS", "INT")),
            ],
            foreign_keys: Vec::new(),
        };
        MockDatabaseClient::with_schema(schema).with_result(
            "SELECT COUNT(*) FROM STUDENT",
            QueryResult::with_data(
                vec![ColumnInfo::new("COUNT(*)", "INTEGER")],
                vec![vec![Value::Int(5)]],
            ),
        )
    }

    fn actions(steps: &[AgentStep]) -> Vec<(String, String)> {
        steps
            .iter()
            .filter_map(|step| match step {
                AgentStep::Action { tool, input } => Some((tool.clone(), input.clone())),
                _ => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_count_question_runs_schema_then_count() {
        let db = Arc::new(student_db());
        let llm = Arc::new(MockLlmClient::new());
        let agent = ReactAgent::new(llm.clone(), db.clone()).unwrap();

        let mut steps = Vec::new();
        let answer = agent
            .run("How many rows are in table STUDENT?", &mut |step| steps.push(step))
            .await
            .unwrap();

        assert_eq!(answer, "There are 5 rows in the STUDENT table.");
        assert_eq!(
            actions(&steps),
            vec![
                (LIST_TABLES.to_string(), String::new()),
                (SCHEMA.to_string(), "STUDENT".to_string()),
                (QUERY.to_string(), "SELECT COUNT(*) FROM STUDENT".to_string()),
            ]
        );
        assert_eq!(llm.call_count(), 4);
        assert_eq!(
            db.executed().last().map(String::as_str),
            Some("SELECT COUNT(*) FROM STUDENT")
        );
        assert!(steps.iter().any(|s| matches!(s, AgentStep::Token(_))));
    }

    #[tokio::test]
    async fn test_observations_reach_the_next_prompt() {
        let llm = Arc::new(MockLlmClient::new());
        let agent = ReactAgent::new(llm.clone(), Arc::new(student_db())).unwrap();

        agent
            .run("How many rows are in table STUDENT?", &mut |_| {})
            .await
            .unwrap();

        let prompts = llm.prompts();
        assert!(prompts[1].ends_with(
            "Action: sql_db_list_tables\nAction Input: \nObservation: CLASSES, STUDENT\nThought: "
        ));
        assert!(prompts[2].contains("Observation: CREATE TABLE \"STUDENT\""));
    }

    #[tokio::test]
    async fn test_format_error_is_fed_back() {
        let llm = Arc::new(MockLlmClient::scripted([
            "I am thinking very hard.",
            "Final Answer: done",
        ]));
        let agent = ReactAgent::new(llm.clone(), Arc::new(student_db())).unwrap();

        let mut steps = Vec::new();
        let answer = agent.run("q", &mut |step| steps.push(step)).await.unwrap();

        assert_eq!(answer, "done");
        assert!(steps.contains(&AgentStep::Observation {
            tool: FORMAT_ERROR_TOOL.to_string(),
            output: "Invalid Format: Missing 'Action:' after 'Thought:'".to_string(),
        }));
        assert!(llm.prompts()[1].contains("Observation: Invalid Format"));
    }

    #[tokio::test]
    async fn test_unknown_tool_is_observed() {
        let llm = Arc::new(MockLlmClient::scripted([
            "Action: drop_everything\nAction Input: now",
            "Final Answer: I don't know",
        ]));
        let agent = ReactAgent::new(llm, Arc::new(student_db())).unwrap();

        let mut steps = Vec::new();
        let answer = agent.run("q", &mut |step| steps.push(step)).await.unwrap();

        assert_eq!(answer, "I don't know");
        let observation = steps.iter().find_map(|s| match s {
            AgentStep::Observation { output, .. } => Some(output.clone()),
            _ => None,
        });
        assert!(observation
            .unwrap()
            .starts_with("drop_everything is not a valid tool"));
    }

    #[tokio::test]
    async fn test_iteration_limit() {
        let script = std::iter::repeat("Action: sql_db_list_tables\nAction Input: ").take(3);
        let llm = Arc::new(MockLlmClient::scripted(script));
        let agent = ReactAgent::new(llm.clone(), Arc::new(student_db()))
            .unwrap()
            .with_max_iterations(3);

        let answer = agent.run("q", &mut |_| {}).await.unwrap();

        assert_eq!(answer, ITERATION_LIMIT_ANSWER);
        assert_eq!(llm.call_count(), 3);
    }

    #[tokio::test]
    async fn test_provider_error_ends_run() {
        let llm = Arc::new(MockLlmClient::failing("Rate limited"));
        let agent = ReactAgent::new(llm, Arc::new(student_db())).unwrap();

        let err = agent.run("q", &mut |_| {}).await.unwrap_err();
        assert_eq!(err.category(), "LLM Error");
    }

    #[test]
    fn test_available_actions() {
        let agent = ReactAgent::new(
            Arc::new(MockLlmClient::new()),
            Arc::new(MockDatabaseClient::new()),
        )
        .unwrap();
        assert_eq!(agent.available_actions().len(), 4);
    }
}
