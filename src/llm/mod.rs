//! LLM integration.
//!
//! A provider-agnostic client trait, the Groq implementation and a scripted
//! mock used by tests and `--mock-llm`.

pub mod factory;
pub mod groq;
pub mod mock;
pub mod types;

pub use factory::{create_client, INVALID_API_KEY};
pub use groq::{GroqClient, GroqConfig};
pub use mock::MockLlmClient;
pub use types::{Message, Role};

use async_trait::async_trait;
use futures::stream::BoxStream;
use std::str::FromStr;

use crate::error::Result;

/// Trait for LLM clients that can generate completions.
///
/// `stop` lists sequences at which the model must stop generating; the
/// sequence itself is not included in the output.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Generates a completion and returns it as a single string.
    async fn complete(&self, messages: &[Message], stop: &[&str]) -> Result<String>;

    /// Generates a streaming completion, yielding chunks as they arrive.
    async fn complete_stream(
        &self,
        messages: &[Message],
        stop: &[&str],
    ) -> Result<BoxStream<'static, Result<String>>>;

    /// Name of the model this client is bound to.
    fn model(&self) -> &str;
}

/// LLM provider type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LlmProvider {
    /// Groq hosted models (OpenAI-compatible API)
    #[default]
    Groq,
    /// Scripted client for testing (no API key required)
    Mock,
}

impl LlmProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Groq => "groq",
            Self::Mock => "mock",
        }
    }
}

impl FromStr for LlmProvider {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "groq" => Ok(Self::Groq),
            "mock" => Ok(Self::Mock),
            _ => Err(format!("Unknown LLM provider: {}", s)),
        }
    }
}

impl std::fmt::Display for LlmProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_from_str() {
        assert_eq!("groq".parse::<LlmProvider>().unwrap(), LlmProvider::Groq);
        assert_eq!("MOCK".parse::<LlmProvider>().unwrap(), LlmProvider::Mock);
        assert!("openai".parse::<LlmProvider>().is_err());
    }

    #[test]
    fn test_provider_display() {
        assert_eq!(LlmProvider::Groq.to_string(), "groq");
        assert_eq!(LlmProvider::default(), LlmProvider::Groq);
    }

    #[tokio::test]
    async fn test_mock_client_implements_trait() {
        let client: Box<dyn LlmClient> = Box::new(MockLlmClient::scripted(["Final Answer: 4"]));
        let response = client.complete(&[Message::user("2 + 2?")], &[]).await.unwrap();
        assert_eq!(response, "Final Answer: 4");
    }
}
