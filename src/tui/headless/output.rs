//! Output formatting for headless mode.
//!
//! Text prints the final screen, JSON adds state and the transcript, frames
//! prints the screen after every event.

use super::{HeadlessResult, HeadlessState, TranscriptEntry};
use ratatui::buffer::Buffer;
use serde::Serialize;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    Frames,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            "frames" => Ok(Self::Frames),
            other => Err(format!(
                "Invalid output format: '{other}'. Valid formats: text, json, frames"
            )),
        }
    }
}

/// Renders a ratatui buffer to a string.
pub struct ScreenRenderer;

impl ScreenRenderer {
    /// Renders a buffer to plain text, trimming trailing blanks.
    pub fn render(buffer: &Buffer) -> String {
        let area = buffer.area;

        let mut lines: Vec<String> = (area.top()..area.bottom())
            .map(|y| {
                let line: String = (area.left()..area.right())
                    .map(|x| buffer[(x, y)].symbol())
                    .collect();
                line.trim_end_matches(' ').to_string()
            })
            .collect();

        while lines.last().is_some_and(|l| l.is_empty()) {
            lines.pop();
        }

        format!("{}\n", lines.join("\n"))
    }
}

#[derive(Debug, Serialize)]
struct JsonOutput<'a> {
    screen: &'a str,
    screen_lines: &'a [String],
    events_executed: usize,
    duration_ms: u64,
    assertions: AssertionSummary,
    state: &'a HeadlessState,
    transcript: &'a [TranscriptEntry],
}

#[derive(Debug, Serialize)]
struct AssertionSummary {
    passed: usize,
    failed: usize,
}

/// Formats headless execution results.
pub struct HeadlessOutput {
    format: OutputFormat,
}

impl HeadlessOutput {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn format(&self, result: &HeadlessResult) -> String {
        match self.format {
            OutputFormat::Text => self.format_text(result),
            OutputFormat::Json => self.format_json(result),
            OutputFormat::Frames => self.format_frames(result),
        }
    }

    fn assertion_summary(result: &HeadlessResult) -> Option<String> {
        (result.assertions_passed > 0 || result.assertions_failed > 0).then(|| {
            format!(
                "Assertions: {} passed, {} failed",
                result.assertions_passed, result.assertions_failed
            )
        })
    }

    fn format_text(&self, result: &HeadlessResult) -> String {
        let assertions = Self::assertion_summary(result)
            .map(|s| format!(" | {s}"))
            .unwrap_or_default();

        format!(
            "{}\nEvents: {} executed in {}ms{}\n",
            result.screen,
            result.events_executed,
            result.duration.as_millis(),
            assertions
        )
    }

    fn format_json(&self, result: &HeadlessResult) -> String {
        let json_output = JsonOutput {
            screen: &result.screen,
            screen_lines: &result.screen_lines,
            events_executed: result.events_executed,
            duration_ms: result.duration.as_millis() as u64,
            assertions: AssertionSummary {
                passed: result.assertions_passed,
                failed: result.assertions_failed,
            },
            state: &result.state,
            transcript: &result.transcript,
        };

        serde_json::to_string_pretty(&json_output)
            .unwrap_or_else(|e| format!("{{\"error\": \"Failed to serialize: {e}\"}}"))
    }

    fn format_frames(&self, result: &HeadlessResult) -> String {
        let frames_text: String = result
            .frames
            .iter()
            .map(|frame| {
                let event_desc = frame.event.as_deref().unwrap_or("initial");
                format!(
                    "=== FRAME {} ({}) ===\n{}\n\n",
                    frame.number, event_desc, frame.screen
                )
            })
            .collect();

        let assertions = Self::assertion_summary(result)
            .map(|s| format!("{s}\n"))
            .unwrap_or_default();

        format!(
            "{}Total: {} frames, {} events executed in {}ms\n{}",
            frames_text,
            result.frames.len(),
            result.events_executed,
            result.duration.as_millis(),
            assertions
        )
    }
}
