//! Terminal User Interface for sqlchat.
//!
//! Provides the main TUI application loop using ratatui and crossterm.

pub mod app;
mod events;
pub mod headless;
pub mod text;
mod ui;
pub mod widgets;

pub use app::{Action, App, SidebarForm};
pub use events::{Event, EventHandler};

use crate::agent::AgentStep;
use crate::app::Orchestrator;
use crate::error::{Result, SqlChatError};
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io::{self, Stdout};
use std::panic;
use tokio::sync::mpsc;
use tracing::{debug, info};

/// Messages sent from a running turn to the main loop.
#[derive(Debug)]
pub enum AsyncMessage {
    Step(AgentStep),
    TurnFinished(Result<String>),
}

/// The main TUI application runner.
pub struct Tui {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    event_handler: EventHandler,
}

impl Tui {
    /// Creates a new TUI instance, initializing the terminal.
    pub fn new() -> Result<Self> {
        let terminal = Self::setup_terminal()?;
        Ok(Self {
            terminal,
            event_handler: EventHandler::new(),
        })
    }

    fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
        enable_raw_mode()
            .map_err(|e| SqlChatError::internal(format!("Failed to enable raw mode: {e}")))?;

        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture).map_err(|e| {
            SqlChatError::internal(format!("Failed to enter alternate screen: {e}"))
        })?;

        Terminal::new(CrosstermBackend::new(stdout))
            .map_err(|e| SqlChatError::internal(format!("Failed to create terminal: {e}")))
    }

    fn restore_terminal(&mut self) -> Result<()> {
        disable_raw_mode()
            .map_err(|e| SqlChatError::internal(format!("Failed to disable raw mode: {e}")))?;

        execute!(
            self.terminal.backend_mut(),
            LeaveAlternateScreen,
            DisableMouseCapture
        )
        .map_err(|e| SqlChatError::internal(format!("Failed to leave alternate screen: {e}")))?;

        self.terminal
            .show_cursor()
            .map_err(|e| SqlChatError::internal(format!("Failed to show cursor: {e}")))
    }

    /// Runs the event loop until the user quits.
    pub async fn run(&mut self, app_state: &mut App, orchestrator: Orchestrator) -> Result<()> {
        // Restore the terminal on panic
        let original_hook = panic::take_hook();
        panic::set_hook(Box::new(move |panic_info| {
            let _ = disable_raw_mode();
            let _ = execute!(io::stdout(), LeaveAlternateScreen, DisableMouseCapture);
            original_hook(panic_info);
        }));

        let (tx, mut rx) = mpsc::unbounded_channel::<AsyncMessage>();
        let result = self
            .run_event_loop(app_state, &orchestrator, tx, &mut rx)
            .await;

        orchestrator.close().await;
        let _ = panic::take_hook();

        result
    }

    async fn run_event_loop(
        &mut self,
        app_state: &mut App,
        orchestrator: &Orchestrator,
        tx: mpsc::UnboundedSender<AsyncMessage>,
        rx: &mut mpsc::UnboundedReceiver<AsyncMessage>,
    ) -> Result<()> {
        loop {
            self.terminal
                .draw(|frame| ui::render(frame, app_state))
                .map_err(|e| SqlChatError::internal(format!("Failed to draw: {e}")))?;

            if !app_state.running {
                break;
            }

            let tick_rate = self.event_handler.tick_rate();
            tokio::select! {
                event = tokio::task::spawn_blocking(move || EventHandler::with_tick_rate(tick_rate).next()) => {
                    let event = event
                        .map_err(|e| SqlChatError::internal(format!("Event task failed: {e}")))??;
                    if let Event::Key(key) = event {
                        if let Some(Action::Ask { question, settings }) = app_state.handle_key(key) {
                            spawn_turn(orchestrator.clone(), settings, question, tx.clone());
                        }
                    }
                }

                Some(msg) = rx.recv() => {
                    match msg {
                        AsyncMessage::Step(step) => app_state.on_step(step),
                        AsyncMessage::TurnFinished(outcome) => app_state.finish_turn(outcome),
                    }
                }
            }
        }

        Ok(())
    }
}

impl Drop for Tui {
    fn drop(&mut self) {
        let _ = self.restore_terminal();
    }
}

/// Answers a question in the background, reporting back over `tx`.
fn spawn_turn(
    orchestrator: Orchestrator,
    settings: crate::app::SessionSettings,
    question: String,
    tx: mpsc::UnboundedSender<AsyncMessage>,
) {
    debug!(question_len = question.len(), "Starting turn");
    tokio::spawn(async move {
        let step_tx = tx.clone();
        let mut on_step = move |step: AgentStep| {
            let _ = step_tx.send(AsyncMessage::Step(step));
        };
        let outcome = orchestrator.answer(&settings, &question, &mut on_step).await;
        let _ = tx.send(AsyncMessage::TurnFinished(outcome));
    });
}

/// Runs the interactive TUI.
pub async fn run_async(orchestrator: Orchestrator, form: SidebarForm) -> Result<()> {
    let mut app_state = App::new(form, orchestrator.provider());
    info!(provider = orchestrator.provider().as_str(), "Starting TUI");

    let mut tui = Tui::new()?;
    tui.run(&mut app_state, orchestrator).await
}
