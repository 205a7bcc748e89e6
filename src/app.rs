//! Core orchestrator for sqlchat.
//!
//! Turns the sidebar settings into a database handle and an LLM client, and
//! runs one question through the agent. Shared by the terminal UI and
//! headless mode.

use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

use crate::agent::{Agent, AgentStep, ReactAgent};
use crate::config::Config;
use crate::connection::{ConnectionConfig, HandleFactory, MISSING_REMOTE_DETAILS};
use crate::error::Result;
use crate::llm::{create_client, LlmProvider, INVALID_API_KEY};

/// What the sidebar currently holds.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SessionSettings {
    pub connection: ConnectionConfig,
    pub api_key: String,
}

/// Why a question cannot be asked yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Blocker {
    /// Remote mode with an empty field. Halts the chat.
    MissingRemoteDetails,
    /// No API key for a provider that needs one.
    MissingApiKey,
}

impl Blocker {
    pub fn notice(&self) -> &'static str {
        match self {
            Self::MissingRemoteDetails => MISSING_REMOTE_DETAILS,
            Self::MissingApiKey => INVALID_API_KEY,
        }
    }

    /// Whether the chat must stop until the settings change.
    pub fn halts(&self) -> bool {
        matches!(self, Self::MissingRemoteDetails)
    }
}

/// Everything that keeps a question from being asked, in display order.
pub fn blockers(settings: &SessionSettings, provider: LlmProvider) -> Vec<Blocker> {
    let mut blockers = Vec::new();
    if settings.connection.validate().is_err() {
        blockers.push(Blocker::MissingRemoteDetails);
    }
    if provider == LlmProvider::Groq && settings.api_key.trim().is_empty() {
        blockers.push(Blocker::MissingApiKey);
    }
    blockers
}

/// The main orchestrator that coordinates all components.
#[derive(Clone)]
pub struct Orchestrator {
    factory: Arc<HandleFactory>,
    provider: LlmProvider,
    config: Arc<Config>,
}

impl Orchestrator {
    pub fn new(config: Config, provider: LlmProvider) -> Self {
        let factory = HandleFactory::new(
            config.database.local_db_path(),
            config.database.cache_ttl(),
        );
        Self::with_factory(config, provider, factory)
    }

    pub fn with_factory(config: Config, provider: LlmProvider, factory: HandleFactory) -> Self {
        Self {
            factory: Arc::new(factory),
            provider,
            config: Arc::new(config),
        }
    }

    pub fn provider(&self) -> LlmProvider {
        self.provider
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn factory(&self) -> &HandleFactory {
        &self.factory
    }

    pub fn blockers(&self, settings: &SessionSettings) -> Vec<Blocker> {
        blockers(settings, self.provider)
    }

    /// Builds an agent over the cached handle for `settings`.
    pub async fn prepare(&self, settings: &SessionSettings) -> Result<ReactAgent> {
        settings.connection.validate()?;
        let llm = create_client(self.provider, &settings.api_key, &self.config.llm)?;
        let handle = self.factory.configure(&settings.connection).await?;
        ReactAgent::new(llm, handle)
    }

    /// Answers one question, streaming agent steps to `on_step`.
    pub async fn answer(
        &self,
        settings: &SessionSettings,
        question: &str,
        on_step: &mut (dyn FnMut(AgentStep) + Send),
    ) -> Result<String> {
        let start = Instant::now();
        let agent = self.prepare(settings).await?;
        let result = agent.run(question, on_step).await;

        match &result {
            Ok(answer) => info!(
                connection = %settings.connection.display_string(),
                answer_len = answer.len(),
                duration_ms = start.elapsed().as_millis() as u64,
                "Question answered"
            ),
            Err(e) => warn!(
                connection = %settings.connection.display_string(),
                error = %e,
                "Question failed"
            ),
        }
        result
    }

    /// Closes every cached database handle.
    pub async fn close(&self) {
        self.factory.shutdown().await;
    }
}
