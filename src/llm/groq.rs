//! Groq LLM client.
//!
//! Groq serves an OpenAI-compatible chat completions API. Requests are made
//! once; failures are reported to the caller without retrying.

use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::error::{Result, SqlChatError};
use crate::llm::types::Message;
use crate::llm::LlmClient;

/// Default timeout for API requests.
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Groq chat completions endpoint.
pub const GROQ_API_URL: &str = "https://api.groq.com/openai/v1/chat/completions";

/// Groq client configuration.
#[derive(Clone)]
pub struct GroqConfig {
    pub api_key: String,
    /// Model to use (e.g., "llama3-8b-8192").
    pub model: String,
    pub base_url: String,
    pub timeout_secs: u64,
}

impl GroqConfig {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            base_url: GROQ_API_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

impl std::fmt::Debug for GroqConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GroqConfig")
            .field("api_key", &"***")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// Groq LLM client.
#[derive(Debug, Clone)]
pub struct GroqClient {
    config: GroqConfig,
    client: Client,
}

impl GroqClient {
    pub fn new(config: GroqConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| SqlChatError::llm(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    fn build_request(&self, messages: &[Message], stop: &[&str], stream: bool) -> GroqRequest {
        GroqRequest {
            model: self.config.model.clone(),
            messages: messages
                .iter()
                .map(|m| GroqMessage {
                    role: m.role.as_str().to_string(),
                    content: m.content.clone(),
                })
                .collect(),
            stream,
            temperature: 0.0,
            stop: (!stop.is_empty()).then(|| stop.iter().map(|s| s.to_string()).collect()),
        }
    }

    async fn send(&self, request: &GroqRequest) -> Result<reqwest::Response> {
        debug!(model = %request.model, stream = request.stream, "Sending Groq request");

        let response = self
            .client
            .post(&self.config.base_url)
            .bearer_auth(&self.config.api_key)
            .json(request)
            .send()
            .await
            .map_err(map_request_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(parse_error(status, &body));
        }

        Ok(response)
    }
}

fn map_request_error(e: reqwest::Error) -> SqlChatError {
    if e.is_timeout() {
        SqlChatError::llm("Request timed out. Try again.")
    } else if e.is_connect() {
        SqlChatError::llm("Failed to connect to the Groq API. Check your network.")
    } else {
        SqlChatError::llm(format!("Request failed: {}", e))
    }
}

/// Maps an unsuccessful API response to an error.
fn parse_error(status: reqwest::StatusCode, body: &str) -> SqlChatError {
    if status == reqwest::StatusCode::UNAUTHORIZED {
        return SqlChatError::llm("Authentication failed. Check your Groq API key.");
    }

    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        return SqlChatError::llm("Rate limited. Please wait and try again.");
    }

    if let Ok(error_response) = serde_json::from_str::<GroqErrorResponse>(body) {
        return SqlChatError::llm(format!("Groq API error: {}", error_response.error.message));
    }

    SqlChatError::llm(format!("Groq API error ({}): {}", status, body))
}

#[async_trait]
impl LlmClient for GroqClient {
    async fn complete(&self, messages: &[Message], stop: &[&str]) -> Result<String> {
        let request = self.build_request(messages, stop, false);
        let response = self.send(&request).await?;

        let body = response
            .text()
            .await
            .map_err(|e| SqlChatError::llm(format!("Failed to read response: {}", e)))?;
        let parsed: GroqResponse = serde_json::from_str(&body)
            .map_err(|e| SqlChatError::llm(format!("Failed to parse response: {}", e)))?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| SqlChatError::llm("No response from Groq"))
    }

    async fn complete_stream(
        &self,
        messages: &[Message],
        stop: &[&str],
    ) -> Result<BoxStream<'static, Result<String>>> {
        let request = self.build_request(messages, stop, true);
        let response = self.send(&request).await?;

        // Network chunks can split an SSE line; only complete lines are parsed.
        let parsed_stream = response
            .bytes_stream()
            .scan(Vec::new(), |buffer, chunk| {
                let item = chunk
                    .map_err(|e| SqlChatError::llm(format!("Stream error: {}", e)))
                    .and_then(|bytes| match take_complete_lines(buffer, &bytes) {
                        Some(complete) => parse_sse_chunk(&complete),
                        None => Ok(None),
                    });
                futures::future::ready(Some(item))
            })
            .filter_map(|result| async move {
                match result {
                    Ok(Some(content)) => Some(Ok(content)),
                    Ok(None) => None,
                    Err(e) => Some(Err(e)),
                }
            });

        Ok(parsed_stream.boxed())
    }

    fn model(&self) -> &str {
        &self.config.model
    }
}

/// Appends `bytes` to `buffer` and removes every complete line from it.
///
/// Decoding waits for the newline, so a multi-byte character split across
/// network chunks stays intact.
fn take_complete_lines(buffer: &mut Vec<u8>, bytes: &[u8]) -> Option<String> {
    buffer.extend_from_slice(bytes);
    let end = buffer.iter().rposition(|&b| b == b'\n')?;
    let complete: Vec<u8> = buffer.drain(..=end).collect();
    Some(String::from_utf8_lossy(&complete).into_owned())
}

/// Parses complete Server-Sent Events lines into the concatenated delta text.
fn parse_sse_chunk(chunk: &str) -> Result<Option<String>> {
    let mut content = String::new();

    for line in chunk.lines() {
        let line = line.trim();

        if line.is_empty() || line.starts_with(':') || line == "data: [DONE]" {
            continue;
        }

        if let Some(data) = line.strip_prefix("data: ") {
            if let Ok(error_response) = serde_json::from_str::<GroqErrorResponse>(data) {
                return Err(SqlChatError::llm(format!(
                    "Groq API error: {}",
                    error_response.error.message
                )));
            }
            if let Ok(event) = serde_json::from_str::<GroqStreamEvent>(data) {
                if let Some(delta) = event.choices.first().and_then(|c| c.delta.content.as_ref()) {
                    content.push_str(delta);
                }
            }
        }
    }

    Ok((!content.is_empty()).then_some(content))
}

// Groq API types

#[derive(Debug, Serialize)]
struct GroqRequest {
    model: String,
    messages: Vec<GroqMessage>,
    stream: bool,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop: Option<Vec<String>>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GroqMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct GroqResponse {
    choices: Vec<GroqChoice>,
}

#[derive(Debug, Deserialize)]
struct GroqChoice {
    message: GroqMessage,
}

#[derive(Debug, Deserialize)]
struct GroqStreamEvent {
    choices: Vec<GroqStreamChoice>,
}

#[derive(Debug, Deserialize)]
struct GroqStreamChoice {
    delta: GroqDelta,
}

#[derive(Debug, Deserialize)]
struct GroqDelta {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GroqErrorResponse {
    error: GroqError,
}

#[derive(Debug, Deserialize)]
struct GroqError {
    message: String,
}
