//! Event handling for the TUI.
//!
//! Processes keyboard and terminal events using crossterm.

use crate::error::{Result, SqlChatError};
use crossterm::event::{self, Event as CrosstermEvent, KeyEvent, KeyEventKind};
use std::time::Duration;

/// Application events.
#[derive(Debug)]
pub enum Event {
    Key(KeyEvent),
    Resize(u16, u16),
    /// A periodic tick (for animations/updates).
    Tick,
}

impl Event {
    /// Converts a crossterm event, dropping key releases.
    pub fn from_crossterm(event: CrosstermEvent) -> Self {
        match event {
            CrosstermEvent::Key(key) if key.kind != KeyEventKind::Release => Event::Key(key),
            CrosstermEvent::Resize(width, height) => Event::Resize(width, height),
            _ => Event::Tick,
        }
    }
}

/// Polls terminal events.
pub struct EventHandler {
    tick_rate: Duration,
}

impl EventHandler {
    pub fn new() -> Self {
        Self {
            tick_rate: Duration::from_millis(100),
        }
    }

    pub fn with_tick_rate(tick_rate: Duration) -> Self {
        Self { tick_rate }
    }

    pub fn tick_rate(&self) -> Duration {
        self.tick_rate
    }

    /// Blocks for up to one tick waiting for the next event.
    pub fn next(&self) -> Result<Event> {
        let ready = event::poll(self.tick_rate)
            .map_err(|e| SqlChatError::internal(format!("Failed to poll events: {e}")))?;
        if !ready {
            return Ok(Event::Tick);
        }
        let event = event::read()
            .map_err(|e| SqlChatError::internal(format!("Failed to read event: {e}")))?;
        Ok(Event::from_crossterm(event))
    }
}

impl Default for EventHandler {
    fn default() -> Self {
        Self::new()
    }
}
