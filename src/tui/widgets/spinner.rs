//! Spinner widget for the TUI.
//!
//! Animated indicator shown in the header while a question is answered.

use std::time::Instant;

/// Dot animation frames for the agent thinking.
const DOT_FRAMES: &[&str] = &["", ".", "..", "..."];

/// Animation speed in milliseconds per frame.
const FRAME_DURATION_MS: u128 = 100;

/// Spinner state for animated indicators.
#[derive(Debug, Clone)]
pub struct Spinner {
    start_time: Instant,
    label: String,
}

impl Spinner {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            start_time: Instant::now(),
            label: label.into(),
        }
    }

    /// Spinner shown while the agent works on a question.
    pub fn thinking() -> Self {
        Self::new("Thinking")
    }

    /// Returns the current frame of the animation.
    pub fn frame(&self) -> &'static str {
        let frame_index = (self.start_time.elapsed().as_millis() / FRAME_DURATION_MS) as usize;
        DOT_FRAMES[frame_index % DOT_FRAMES.len()]
    }

    pub fn display(&self) -> String {
        format!("{}{}", self.label, self.frame())
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}
