//! UI rendering for the TUI.
//!
//! Defines the layout and renders all UI components.

use super::app::{App, Focus};
use super::widgets::chat::{ChatPanel, ChatView};
use super::widgets::{header, input, sidebar};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    text::Span,
    Frame,
};

/// Renders the entire UI.
pub fn render(frame: &mut Frame, app: &App) {
    let area = frame.area();

    // Main layout: header, content, status, input
    let main_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // Header
            Constraint::Min(3),    // Content (sidebar + chat)
            Constraint::Length(1), // Status
            Constraint::Length(3), // Input
        ])
        .split(area);

    // Content layout: sidebar (30%) and chat (70%)
    let content_layout = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(30), Constraint::Percentage(70)])
        .split(main_layout[1]);

    render_header(frame, main_layout[0], app);
    render_sidebar(frame, content_layout[0], app);
    render_chat(frame, content_layout[1], app);
    render_status(frame, main_layout[2], app);
    render_input(frame, main_layout[3], app);
}

fn render_header(frame: &mut Frame, area: Rect, app: &App) {
    let info = app.connection_info();
    let widget = header::Header::new(&info, app.spinner.as_ref(), app.is_halted());
    frame.render_widget(widget, area);
}

fn render_chat(frame: &mut Frame, area: Rect, app: &App) {
    let view = ChatView {
        messages: app.chat.messages(),
        trace: &app.trace,
        streaming: &app.streaming,
        notices: &app.notices,
        halt_notice: app.chat.halt_notice(),
    };
    let widget = ChatPanel::new(view, app.chat_scroll, app.focus == Focus::Chat);
    frame.render_widget(widget, area);
}

fn render_sidebar(frame: &mut Frame, area: Rect, app: &App) {
    let widget = sidebar::Sidebar::new(&app.form, app.focus == Focus::Sidebar);
    frame.render_widget(widget, area);
}

fn render_status(frame: &mut Frame, area: Rect, app: &App) {
    let text = match &app.status {
        Some(status) => Span::styled(format!(" {status}"), Style::default().fg(Color::Yellow)),
        None => Span::styled(
            " Tab: switch focus  Ctrl+L: clear chat  Ctrl+C: quit",
            Style::default().fg(Color::DarkGray),
        ),
    };
    frame.render_widget(text, area);
}

fn render_input(frame: &mut Frame, area: Rect, app: &App) {
    let focused = app.focus == Focus::Input;
    let widget = input::InputBar::new(&app.input.text, app.input.cursor, focused);
    frame.render_widget(widget, area);

    if focused {
        // Account for border (1) and prompt "> " (2)
        let available = area.width.saturating_sub(5) as usize;
        let visible = app.input.cursor - input::calculate_scroll_offset(app.input.cursor, available);
        let cursor_x = area.x + 1 + 2 + visible as u16;
        frame.set_cursor_position((cursor_x, area.y + 1));
    }
}
