//! Error types for sqlchat.
//!
//! A single flat taxonomy shared by the database layer, the LLM client,
//! the agent and the chat loop.

use thiserror::Error;

/// Main error type for sqlchat operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SqlChatError {
    /// Database connection errors (file missing, host unreachable, auth failed)
    #[error("Connection error: {0}")]
    Connection(String),

    /// Query execution errors (syntax errors, read-only violations)
    #[error("Query error: {0}")]
    Query(String),

    /// LLM API errors (rate limits, auth, timeouts)
    #[error("LLM error: {0}")]
    Llm(String),

    /// Configuration errors (incomplete connection details, missing API key)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Agent loop errors (unrecoverable model output, tool failures)
    #[error("Agent error: {0}")]
    Agent(String),

    /// Internal application errors (unexpected states, bugs)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl SqlChatError {
    /// Creates a connection error with the given message.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Creates a query error with the given message.
    pub fn query(msg: impl Into<String>) -> Self {
        Self::Query(msg.into())
    }

    /// Creates an LLM error with the given message.
    pub fn llm(msg: impl Into<String>) -> Self {
        Self::Llm(msg.into())
    }

    /// Creates a configuration error with the given message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn agent(msg: impl Into<String>) -> Self {
        Self::Agent(msg.into())
    }

    /// Creates an internal error with the given message.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Returns the error category as a string for display purposes.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Connection(_) => "Connection Error",
            Self::Query(_) => "Query Error",
            Self::Llm(_) => "LLM Error",
            Self::Config(_) => "Configuration Error",
            Self::Agent(_) => "Agent Error",
            Self::Internal(_) => "Internal Error",
        }
    }

    /// The bare message without the category prefix, as shown in the chat.
    pub fn message(&self) -> &str {
        match self {
            Self::Connection(m)
            | Self::Query(m)
            | Self::Llm(m)
            | Self::Config(m)
            | Self::Agent(m)
            | Self::Internal(m) => m,
        }
    }
}

/// Result type alias using SqlChatError.
pub type Result<T> = std::result::Result<T, SqlChatError>;
