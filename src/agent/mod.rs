//! SQL agent.
//!
//! A zero-shot ReAct agent: the model alternates between thinking and calling
//! one of the database tools until it can give a final answer. Every step is
//! reported to the caller as it happens so the chat can show a live trace.

pub mod parser;
pub mod prompt;
pub mod react;
pub mod toolkit;

pub use parser::{AgentOutput, OutputParser};
pub use react::{ReactAgent, ITERATION_LIMIT_ANSWER, MAX_ITERATIONS};
pub use toolkit::SqlToolkit;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// A tool the agent may call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
}

impl ToolDefinition {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
        }
    }
}

/// One observable step of an agent run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentStep {
    /// Reasoning text preceding an action or the final answer.
    Thought(String),
    /// A tool call the agent decided on.
    Action { tool: String, input: String },
    /// What the tool returned.
    Observation { tool: String, output: String },
    /// A chunk of streamed model output.
    Token(String),
}

impl AgentStep {
    /// Short label for trace rendering.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Thought(_) => "Thought",
            Self::Action { .. } => "Action",
            Self::Observation { .. } => "Observation",
            Self::Token(_) => "Token",
        }
    }
}

/// An agent that answers questions with the help of tools.
#[async_trait]
pub trait Agent: Send + Sync {
    /// Tools the agent can call.
    fn available_actions(&self) -> Vec<ToolDefinition>;

    /// Answers `question`, reporting each step to `on_step`.
    ///
    /// Tool failures are fed back to the model; only model or provider
    /// errors end the run with an error.
    async fn run(
        &self,
        question: &str,
        on_step: &mut (dyn FnMut(AgentStep) + Send),
    ) -> Result<String>;
}
