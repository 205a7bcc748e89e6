//! Chat session state.
//!
//! The session is an ordered, append-only list of role-tagged messages that
//! always starts with the assistant greeting. It lives for one process.

mod chat_loop;

pub use chat_loop::{run_turn, ChatLoop, ChatPhase, TURN_IN_PROGRESS};

/// First message of every session.
pub const GREETING: &str = "Hello! How can I assist you with your SQL queries today?";

/// Who wrote a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatRole {
    Assistant,
    User,
}

impl ChatRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Assistant => "assistant",
            Self::User => "user",
        }
    }

    /// Label shown in the chat panel.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Assistant => "Assistant",
            Self::User => "You",
        }
    }
}

/// A message in the chat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// The ordered messages of the current session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    messages: Vec<ChatMessage>,
}

impl SessionState {
    /// Creates a session holding only the greeting.
    pub fn new() -> Self {
        Self {
            messages: vec![ChatMessage::assistant(GREETING)],
        }
    }

    /// Drops every message and starts over with the greeting.
    pub fn reset(&mut self) {
        self.messages.clear();
        self.messages.push(ChatMessage::assistant(GREETING));
    }

    pub fn push(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }

    /// Ends the session, handing back its messages.
    pub fn end(self) -> Vec<ChatMessage> {
        self.messages
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session_has_greeting() {
        let session = SessionState::new();
        assert_eq!(session.messages(), &[ChatMessage::assistant(GREETING)]);
    }

    #[test]
    fn test_reset_leaves_single_greeting() {
        let mut session = SessionState::new();
        session.push(ChatMessage::user("How many students?"));
        session.push(ChatMessage::assistant("5"));
        assert_eq!(session.len(), 3);

        session.reset();
        assert_eq!(session.len(), 1);
        assert_eq!(session.last(), Some(&ChatMessage::assistant(GREETING)));
    }

    #[test]
    fn test_messages_keep_insertion_order() {
        let mut session = SessionState::new();
        session.push(ChatMessage::user("a"));
        session.push(ChatMessage::assistant("b"));

        let roles: Vec<ChatRole> = session.end().into_iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![ChatRole::Assistant, ChatRole::User, ChatRole::Assistant]);
    }

    #[test]
    fn test_role_labels() {
        assert_eq!(ChatRole::User.as_str(), "user");
        assert_eq!(ChatRole::Assistant.label(), "Assistant");
        assert_eq!(ChatRole::User.label(), "You");
    }
}
