//! LLM client factory.

use std::sync::Arc;

use crate::config::LlmConfig;
use crate::error::{Result, SqlChatError};
use crate::llm::{GroqClient, GroqConfig, LlmClient, LlmProvider, MockLlmClient};

/// Notice shown when no usable API key was entered.
pub const INVALID_API_KEY: &str = "Please enter a valid Groq API Key.";

/// Creates an LLM client for the given provider.
///
/// Groq requires a non-blank `api_key`; the mock ignores it.
pub fn create_client(
    provider: LlmProvider,
    api_key: &str,
    config: &LlmConfig,
) -> Result<Arc<dyn LlmClient>> {
    match provider {
        LlmProvider::Groq => {
            let key = api_key.trim();
            if key.is_empty() {
                return Err(SqlChatError::config(INVALID_API_KEY));
            }
            let groq = GroqConfig::new(key, &config.model)
                .with_base_url(&config.base_url)
                .with_timeout(config.timeout_secs);
            Ok(Arc::new(GroqClient::new(groq)?))
        }
        LlmProvider::Mock => Ok(Arc::new(MockLlmClient::new())),
    }
}
