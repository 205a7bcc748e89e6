//! Turn-taking state machine for the chat.
//!
//! `Idle` accepts one question and moves to `AwaitingAnswer`; the answer (or
//! the error that replaced it) moves back to `Idle`. `Halted` blocks input
//! while the connection settings are unusable.

use tracing::{debug, warn};

use super::{ChatMessage, SessionState};
use crate::agent::{Agent, AgentStep};
use crate::error::{Result, SqlChatError};

/// Rejection for a question submitted while another is being answered.
pub const TURN_IN_PROGRESS: &str = "Still answering the previous question.";

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ChatPhase {
    #[default]
    Idle,
    AwaitingAnswer,
    /// Input is blocked until the settings change; holds the notice to show.
    Halted(String),
}

impl ChatPhase {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::AwaitingAnswer => "AwaitingAnswer",
            Self::Halted(_) => "Halted",
        }
    }
}

/// Session plus the phase of the current turn.
#[derive(Debug, Clone, Default)]
pub struct ChatLoop {
    session: SessionState,
    phase: ChatPhase,
    /// Halt requested mid-turn, applied once the answer arrives.
    pending_halt: Option<String>,
}

impl ChatLoop {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> &ChatPhase {
        &self.phase
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    pub fn messages(&self) -> &[ChatMessage] {
        self.session.messages()
    }

    pub fn is_awaiting(&self) -> bool {
        self.phase == ChatPhase::AwaitingAnswer
    }

    /// Notice explaining why input is blocked, if it is.
    pub fn halt_notice(&self) -> Option<&str> {
        match &self.phase {
            ChatPhase::Halted(notice) => Some(notice),
            _ => None,
        }
    }

    /// Accepts a question and records it as a user message.
    ///
    /// Returns `Ok(None)` for blank input, which changes nothing.
    pub fn submit(&mut self, question: &str) -> Result<Option<String>> {
        match &self.phase {
            ChatPhase::Halted(notice) => return Err(SqlChatError::config(notice.clone())),
            ChatPhase::AwaitingAnswer => return Err(SqlChatError::agent(TURN_IN_PROGRESS)),
            ChatPhase::Idle => {}
        }

        let question = question.trim();
        if question.is_empty() {
            return Ok(None);
        }

        self.session.push(ChatMessage::user(question));
        self.phase = ChatPhase::AwaitingAnswer;
        debug!(messages = self.session.len(), "Question submitted");
        Ok(Some(question.to_string()))
    }

    /// Records the outcome of the pending turn as an assistant message.
    pub fn complete(&mut self, outcome: Result<String>) {
        if self.phase != ChatPhase::AwaitingAnswer {
            warn!(phase = self.phase.name(), "Answer arrived with no question pending");
            return;
        }

        let content = match outcome {
            Ok(answer) => answer,
            Err(e) => {
                warn!(error = %e, "Turn failed");
                e.to_string()
            }
        };
        self.session.push(ChatMessage::assistant(content));
        self.phase = match self.pending_halt.take() {
            Some(notice) => ChatPhase::Halted(notice),
            None => ChatPhase::Idle,
        };
    }

    /// Restores the greeting. Refused while a question is being answered.
    pub fn reset(&mut self) -> bool {
        if self.is_awaiting() {
            return false;
        }
        self.session.reset();
        true
    }

    /// Blocks input until [`resume`](Self::resume). Mid-turn, the halt takes
    /// effect when the answer is recorded.
    pub fn halt(&mut self, notice: impl Into<String>) {
        if self.is_awaiting() {
            self.pending_halt = Some(notice.into());
        } else {
            self.phase = ChatPhase::Halted(notice.into());
        }
    }

    pub fn resume(&mut self) {
        self.pending_halt = None;
        if matches!(self.phase, ChatPhase::Halted(_)) {
            self.phase = ChatPhase::Idle;
        }
    }
}

/// Runs one complete turn inline: submit, answer, record.
///
/// Returns `Ok(false)` when the question was blank.
pub async fn run_turn(
    chat: &mut ChatLoop,
    agent: &dyn Agent,
    question: &str,
    on_step: &mut (dyn FnMut(AgentStep) + Send),
) -> Result<bool> {
    let Some(question) = chat.submit(question)? else {
        return Ok(false);
    };
    let outcome = agent.run(&question, on_step).await;
    chat.complete(outcome);
    Ok(true)
}
