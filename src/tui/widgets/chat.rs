//! Chat panel widget for the TUI.
//!
//! Displays the conversation, the live trace of the turn in progress and any
//! notice blocking input.

use crate::session::{ChatMessage, ChatRole};
use crate::tui::app::TraceEntry;
use crate::tui::text::wrap_text;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget},
};

/// What the chat panel shows.
pub struct ChatView<'a> {
    pub messages: &'a [ChatMessage],
    pub trace: &'a [TraceEntry],
    pub streaming: &'a str,
    pub notices: &'a [&'static str],
    pub halt_notice: Option<&'a str>,
}

impl ChatView<'_> {
    /// Lays the view out as lines wrapped to `width`.
    pub fn lines(&self, width: usize) -> Vec<Line<'static>> {
        let mut lines = Vec::new();

        for notice in self.notices {
            push_wrapped(&mut lines, notice, width, Style::default().fg(Color::Yellow));
            lines.push(Line::from(""));
        }

        for message in self.messages {
            let label_style = match message.role {
                ChatRole::Assistant => Style::default().fg(Color::Green),
                ChatRole::User => Style::default().fg(Color::Cyan),
            }
            .add_modifier(Modifier::BOLD);
            lines.push(Line::from(Span::styled(message.role.label(), label_style)));
            push_wrapped(&mut lines, &message.content, width, Style::default());
            lines.push(Line::from(""));
        }

        let trace_style = Style::default().fg(Color::DarkGray);
        for entry in self.trace {
            push_wrapped(
                &mut lines,
                &format!("{}: {}", entry.label, entry.text),
                width,
                trace_style,
            );
        }
        if !self.streaming.is_empty() {
            push_wrapped(&mut lines, self.streaming, width, trace_style);
        }

        if let Some(notice) = self.halt_notice {
            push_wrapped(&mut lines, notice, width, Style::default().fg(Color::Red));
        }

        lines
    }
}

fn push_wrapped(lines: &mut Vec<Line<'static>>, text: &str, width: usize, style: Style) {
    lines.extend(
        wrap_text(text, width)
            .into_iter()
            .map(|l| Line::from(Span::styled(l, style))),
    );
}

/// Top line to show so that `scroll` counts lines up from the bottom.
pub fn scroll_position(total: usize, height: usize, scroll: usize) -> usize {
    let max = total.saturating_sub(height);
    max - scroll.min(max)
}

/// Chat panel widget.
pub struct ChatPanel<'a> {
    view: ChatView<'a>,
    scroll: usize,
    focused: bool,
}

impl<'a> ChatPanel<'a> {
    pub fn new(view: ChatView<'a>, scroll: usize, focused: bool) -> Self {
        Self {
            view,
            scroll,
            focused,
        }
    }
}

impl Widget for ChatPanel<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let border_style = if self.focused {
            Style::default().fg(Color::Cyan)
        } else {
            Style::default().fg(Color::DarkGray)
        };

        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(border_style)
            .title(" Chat ");

        let inner = block.inner(area);
        let lines = self.view.lines(inner.width as usize);
        let top = scroll_position(lines.len(), inner.height as usize, self.scroll);

        Paragraph::new(lines)
            .block(block)
            .scroll((top.min(u16::MAX as usize) as u16, 0))
            .render(area, buf);
    }
}
