//! Sidebar widget for the TUI.
//!
//! Renders the connection selector, the MySQL credential fields, the Groq
//! API key and the clear chat button.

use crate::connection::ConnectionMode;
use crate::tui::app::{SidebarField, SidebarForm};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget, Wrap},
};

/// Sidebar widget for the settings form.
pub struct Sidebar<'a> {
    form: &'a SidebarForm,
    focused: bool,
}

impl<'a> Sidebar<'a> {
    pub fn new(form: &'a SidebarForm, focused: bool) -> Self {
        Self { form, focused }
    }

    /// Masks secrets so they never reach the screen.
    fn display_value(field: SidebarField, value: &str) -> String {
        if field.is_masked() {
            "*".repeat(value.chars().count())
        } else {
            value.to_string()
        }
    }

    pub fn lines(&self) -> Vec<Line<'static>> {
        let selected = self.form.selected_field();
        let highlight = |field: SidebarField| {
            if self.focused && field == selected {
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            }
        };
        let label_style = Style::default().fg(Color::Gray);

        let mut lines = Vec::new();
        for field in self.form.fields() {
            match field {
                SidebarField::Mode => {
                    lines.push(Line::from(Span::styled(field.label(), label_style)));
                    for mode in [ConnectionMode::Local, ConnectionMode::Remote] {
                        let mark = if self.form.mode == mode { "(•)" } else { "( )" };
                        lines.push(Line::from(Span::styled(
                            format!("{mark} {}", mode.label()),
                            highlight(field),
                        )));
                    }
                }
                SidebarField::ClearChat => {
                    lines.push(Line::from(Span::styled("[ Clear chat ]", highlight(field))));
                }
                _ => {
                    let value = Self::display_value(field, self.form.value(field));
                    lines.push(Line::from(Span::styled(field.label(), label_style)));
                    lines.push(Line::from(Span::styled(
                        format!("> {value}"),
                        highlight(field),
                    )));
                }
            }
            lines.push(Line::from(""));
        }
        lines
    }
}

impl Widget for Sidebar<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let border_style = if self.focused {
            Style::default().fg(Color::Cyan)
        } else {
            Style::default().fg(Color::DarkGray)
        };

        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(border_style)
            .title(" Settings ");

        Paragraph::new(self.lines())
            .block(block)
            .wrap(Wrap { trim: false })
            .render(area, buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(lines: &[Line<'_>]) -> Vec<String> {
        lines.iter().map(|l| l.to_string()).collect()
    }

    #[test]
    fn test_local_mode_hides_mysql_fields() {
        let form = SidebarForm::default();
        let lines = text(&Sidebar::new(&form, false).lines());

        assert!(lines.contains(&"(•) Use SQLite 3 Database".to_string()));
        assert!(lines.contains(&"( ) Connect to MySQL Database".to_string()));
        assert!(!lines.iter().any(|l| l.contains("MySQL host")));
        assert!(lines.contains(&"Enter Groq API Key".to_string()));
    }

    #[test]
    fn test_secrets_are_masked() {
        let mut form = SidebarForm::default();
        form.toggle_mode();
        form.remote.password = "hunter2".to_string();
        form.api_key = "gsk-abc".to_string();
        let lines = text(&Sidebar::new(&form, true).lines());

        assert!(lines.contains(&"> *******".to_string()));
        assert!(!lines.iter().any(|l| l.contains("hunter2") || l.contains("gsk-abc")));
        assert!(lines.contains(&"Enter MySQL port".to_string()));
    }
}
