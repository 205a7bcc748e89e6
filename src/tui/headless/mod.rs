//! Headless mode for scripted testing and automation.
//!
//! Runs the TUI against an in-memory terminal, executing scripted events and
//! capturing output for verification. Questions are answered inline, so every
//! event after `key:enter` sees the finished turn.

mod events;
mod output;

pub use events::{Assertion, Event, EventParser};
pub use output::{HeadlessOutput, OutputFormat, ScreenRenderer};

use crate::agent::AgentStep;
use crate::app::Orchestrator;
use crate::cli::Cli;
use crate::error::{Result, SqlChatError};
use crate::tui::app::{Action, App, SidebarForm};
use crate::tui::ui;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::backend::TestBackend;
use ratatui::layout::Rect;
use ratatui::Terminal;
use serde::Serialize;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::info;

/// Configuration for headless mode execution.
#[derive(Debug, Clone)]
pub struct HeadlessConfig {
    pub width: u16,
    pub height: u16,
    pub output_format: OutputFormat,
    /// Stop on the first failed assertion.
    pub fail_fast: bool,
    /// Where to write output (None = stdout).
    pub output_file: Option<PathBuf>,
}

impl Default for HeadlessConfig {
    fn default() -> Self {
        Self {
            width: 100,
            height: 40,
            output_format: OutputFormat::Text,
            fail_fast: false,
            output_file: None,
        }
    }
}

impl HeadlessConfig {
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let (width, height) = cli.parse_screen_size().map_err(SqlChatError::config)?;
        let output_format = cli.parse_output_format().map_err(SqlChatError::config)?;

        Ok(Self {
            width,
            height,
            output_format,
            fail_fast: cli.fail_fast,
            output_file: cli.output_file.clone(),
        })
    }
}

/// One chat message in the JSON output.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TranscriptEntry {
    pub role: String,
    pub content: String,
}

/// Result of headless execution.
#[derive(Debug)]
pub struct HeadlessResult {
    pub screen: String,
    pub screen_lines: Vec<String>,
    pub events_executed: usize,
    pub duration: Duration,
    pub assertions_passed: usize,
    pub assertions_failed: usize,
    pub state: HeadlessState,
    pub transcript: Vec<TranscriptEntry>,
    /// Frame captures (frames output only).
    pub frames: Vec<Frame>,
}

/// Snapshot of application state, queried by `assert:state:` events.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct HeadlessState {
    pub input_text: String,
    pub focus: String,
    pub phase: String,
    pub mode: String,
    pub is_processing: bool,
    pub message_count: usize,
    pub running: bool,
    pub last_message: String,
}

impl HeadlessState {
    pub fn from_app(app: &App) -> Self {
        Self {
            input_text: app.input.text.clone(),
            focus: format!("{:?}", app.focus),
            phase: app.phase_name().to_string(),
            mode: app.form.mode.as_str().to_string(),
            is_processing: app.is_processing(),
            message_count: app.chat.messages().len(),
            running: app.running,
            last_message: app
                .chat
                .messages()
                .last()
                .map(|m| m.content.clone())
                .unwrap_or_default(),
        }
    }

    /// Looks up a field by name.
    pub fn field(&self, name: &str) -> Option<String> {
        match name {
            "input_text" => Some(self.input_text.clone()),
            "focus" => Some(self.focus.clone()),
            "phase" => Some(self.phase.clone()),
            "mode" => Some(self.mode.clone()),
            "is_processing" => Some(self.is_processing.to_string()),
            "message_count" => Some(self.message_count.to_string()),
            "running" => Some(self.running.to_string()),
            "last_message" => Some(self.last_message.clone()),
            _ => None,
        }
    }
}

/// The screen after an event.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Frame number (0 = initial state).
    pub number: usize,
    pub event: Option<String>,
    pub screen: String,
}

/// Runs the TUI in headless mode.
pub struct HeadlessRunner {
    config: HeadlessConfig,
    terminal: Terminal<TestBackend>,
    app: App,
    orchestrator: Orchestrator,
    events: Vec<Event>,
    frames: Vec<Frame>,
    assertions_passed: usize,
    assertions_failed: usize,
}

impl HeadlessRunner {
    pub fn new(config: HeadlessConfig, orchestrator: Orchestrator, form: SidebarForm) -> Result<Self> {
        let backend = TestBackend::new(config.width, config.height);
        let terminal = Terminal::new(backend)
            .map_err(|e| SqlChatError::internal(format!("Failed to create test terminal: {e}")))?;
        let app = App::new(form, orchestrator.provider());

        Ok(Self {
            config,
            terminal,
            app,
            orchestrator,
            events: Vec::new(),
            frames: Vec::new(),
            assertions_passed: 0,
            assertions_failed: 0,
        })
    }

    /// Loads events from a string (comma-separated or newline-separated).
    pub fn load_events(&mut self, input: &str) -> Result<()> {
        self.events = EventParser::new().parse_all(input)?;
        Ok(())
    }

    /// Loads events from a script file, or stdin for "-".
    pub fn load_script(&mut self, path: &str) -> Result<()> {
        let content = if path == "-" {
            std::io::read_to_string(std::io::stdin())
                .map_err(|e| SqlChatError::internal(format!("Failed to read stdin: {e}")))?
        } else {
            std::fs::read_to_string(path)
                .map_err(|e| SqlChatError::internal(format!("Failed to read script file: {e}")))?
        };

        self.load_events(&content)
    }

    pub fn app(&self) -> &App {
        &self.app
    }

    /// Executes every loaded event and returns the result.
    pub async fn run(mut self) -> Result<HeadlessResult> {
        let start_time = Instant::now();
        self.capture_frame(None)?;

        let events = std::mem::take(&mut self.events);
        let mut events_executed = 0;

        for event in events {
            let event_str = event.to_string();
            let keep_going = self.apply(&event).await?;
            events_executed += 1;

            self.draw()?;
            if self.config.output_format == OutputFormat::Frames {
                self.capture_frame(Some(event_str))?;
            }

            if !keep_going || !self.app.running {
                break;
            }
        }

        self.draw()?;
        let screen = self.render_screen();
        let screen_lines = screen.lines().map(String::from).collect();
        let transcript = self
            .app
            .chat
            .messages()
            .iter()
            .map(|m| TranscriptEntry {
                role: m.role.as_str().to_string(),
                content: m.content.clone(),
            })
            .collect();

        self.orchestrator.close().await;

        Ok(HeadlessResult {
            screen,
            screen_lines,
            events_executed,
            duration: start_time.elapsed(),
            assertions_passed: self.assertions_passed,
            assertions_failed: self.assertions_failed,
            state: HeadlessState::from_app(&self.app),
            transcript,
            frames: self.frames,
        })
    }

    /// Applies one event. Returns false when a fail-fast assertion failed.
    async fn apply(&mut self, event: &Event) -> Result<bool> {
        match event {
            Event::Key(key) => self.press(*key).await,
            Event::Type(text) => {
                for c in text.chars() {
                    self.press(KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE))
                        .await;
                }
            }
            Event::Wait(duration) => tokio::time::sleep(*duration).await,
            Event::Resize(w, h) => {
                self.terminal
                    .resize(Rect::new(0, 0, *w, *h))
                    .map_err(|e| SqlChatError::internal(format!("Resize failed: {e}")))?;
            }
            // Captured as frames
            Event::Snapshot(_) => {}
            Event::Assert(assertion) => {
                self.draw()?;
                let screen = self.render_screen();
                if assertion.check(&screen, &HeadlessState::from_app(&self.app)) {
                    self.assertions_passed += 1;
                } else {
                    self.assertions_failed += 1;
                    info!(assertion = %event, "Assertion failed");
                    if self.config.fail_fast {
                        return Ok(false);
                    }
                }
            }
        }
        Ok(true)
    }

    /// Sends a key to the app, answering any question it asks inline.
    async fn press(&mut self, key: KeyEvent) {
        let Some(Action::Ask { question, settings }) = self.app.handle_key(key) else {
            return;
        };

        let app = &mut self.app;
        let mut on_step = |step: AgentStep| app.on_step(step);
        let outcome = self
            .orchestrator
            .answer(&settings, &question, &mut on_step)
            .await;
        self.app.finish_turn(outcome);
    }

    fn draw(&mut self) -> Result<()> {
        self.terminal
            .draw(|frame| ui::render(frame, &self.app))
            .map_err(|e| SqlChatError::internal(format!("Failed to render: {e}")))?;
        Ok(())
    }

    fn render_screen(&self) -> String {
        ScreenRenderer::render(self.terminal.backend().buffer())
    }

    fn capture_frame(&mut self, event: Option<String>) -> Result<()> {
        self.draw()?;
        let screen = self.render_screen();
        let number = self.frames.len();
        self.frames.push(Frame {
            number,
            event,
            screen,
        });
        Ok(())
    }
}

/// Runs headless mode from CLI arguments. Returns the process exit code.
pub async fn run_headless(cli: &Cli, orchestrator: Orchestrator, form: SidebarForm) -> Result<i32> {
    cli.validate_headless().map_err(SqlChatError::config)?;

    let config = HeadlessConfig::from_cli(cli)?;
    let mut runner = HeadlessRunner::new(config.clone(), orchestrator, form)?;

    if let Some(ref events) = cli.events {
        runner.load_events(events)?;
    } else if let Some(ref script_path) = cli.script {
        runner.load_script(script_path)?;
    }

    let result = runner.run().await?;
    let output_str = HeadlessOutput::new(config.output_format).format(&result);

    if let Some(ref path) = config.output_file {
        std::fs::write(path, &output_str)
            .map_err(|e| SqlChatError::internal(format!("Failed to write output file: {e}")))?;
    } else {
        print!("{output_str}");
    }

    Ok(if result.assertions_failed > 0 { 1 } else { 0 })
}
