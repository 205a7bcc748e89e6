//! Header widget for the TUI.
//!
//! Shows the title, the spinner while the agent works, and the active
//! database on the right.

use super::spinner::Spinner;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::Span,
    widgets::Widget,
};

/// Page title.
pub const TITLE: &str = "Chat with SQL";

/// Header bar widget.
pub struct Header<'a> {
    connection_info: &'a str,
    spinner: Option<&'a Spinner>,
    halted: bool,
}

impl<'a> Header<'a> {
    pub fn new(connection_info: &'a str, spinner: Option<&'a Spinner>, halted: bool) -> Self {
        Self {
            connection_info,
            spinner,
            halted,
        }
    }
}

impl Widget for Header<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let style = Style::default()
            .bg(Color::Blue)
            .fg(Color::White)
            .add_modifier(Modifier::BOLD);

        for x in area.left()..area.right() {
            buf[(x, area.y)].set_style(style);
        }

        let left_span = Span::styled(format!(" {TITLE}"), style);
        buf.set_span(area.x, area.y, &left_span, area.width);

        if let Some(spinner) = self.spinner {
            let spinner_text = spinner.display();
            let spinner_style = style.fg(Color::Yellow);
            let spinner_width = spinner_text.chars().count() as u16;
            let spinner_x = area.x + (area.width.saturating_sub(spinner_width)) / 2;
            buf.set_string(spinner_x, area.y, &spinner_text, spinner_style);
        }

        // Connection status dot, then the database
        let status_dot = if self.halted { "○" } else { "●" };
        let status_color = if self.halted { Color::Red } else { Color::Green };
        let db_text = format!(" [db: {}] ", self.connection_info);
        let right_width = db_text.chars().count() as u16 + 2;
        if right_width < area.width {
            let right_x = area.right().saturating_sub(right_width);
            buf.set_string(right_x, area.y, " ", style);
            buf.set_string(right_x + 1, area.y, status_dot, style.fg(status_color));
            buf.set_string(right_x + 2, area.y, &db_text, style);
        }
    }
}
