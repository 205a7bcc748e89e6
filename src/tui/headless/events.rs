//! Event DSL parser for headless mode.
//!
//! Parses event strings like "key:enter", "type:hello", "wait:100ms" or
//! "assert:state:phase=Halted" into executable events.

use super::HeadlessState;
use crate::error::{Result, SqlChatError};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use std::fmt;
use std::time::Duration;

/// An assertion to check against the screen or state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Assertion {
    /// Screen contains text (case-insensitive).
    Contains(String),
    ContainsExact(String),
    NotContains(String),
    Matches(String),
    StateEquals { field: String, value: String },
    /// Numeric comparison (>=, <=, >, <).
    StateCompare {
        field: String,
        op: String,
        value: String,
    },
}

impl Assertion {
    pub fn check(&self, screen: &str, state: &HeadlessState) -> bool {
        match self {
            Self::Contains(text) => screen.to_lowercase().contains(&text.to_lowercase()),
            Self::ContainsExact(text) => screen.contains(text),
            Self::NotContains(text) => !screen.to_lowercase().contains(&text.to_lowercase()),
            Self::Matches(pattern) => regex::Regex::new(pattern)
                .map(|re| re.is_match(screen))
                .unwrap_or(false),
            Self::StateEquals { field, value } => {
                state.field(field).as_deref() == Some(value.as_str())
            }
            Self::StateCompare { field, op, value } => {
                compare_values(state.field(field).as_deref(), op, value)
            }
        }
    }
}

fn compare_values(actual: Option<&str>, op: &str, expected: &str) -> bool {
    let Some(actual) = actual else {
        return false;
    };

    match (actual.parse::<i64>(), expected.parse::<i64>()) {
        (Ok(a), Ok(e)) => match op {
            ">=" => a >= e,
            "<=" => a <= e,
            ">" => a > e,
            "<" => a < e,
            _ => false,
        },
        _ => false,
    }
}

/// A parsed event that can be executed.
#[derive(Debug, Clone)]
pub enum Event {
    Key(KeyEvent),
    /// Type text into the focused panel.
    Type(String),
    /// Wait for a duration.
    Wait(Duration),
    Resize(u16, u16),
    /// Capture a named frame.
    Snapshot(String),
    Assert(Assertion),
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key(key) => {
                let mut parts = Vec::new();
                if key.modifiers.contains(KeyModifiers::CONTROL) {
                    parts.push("ctrl".to_string());
                }
                if key.modifiers.contains(KeyModifiers::ALT) {
                    parts.push("alt".to_string());
                }
                parts.push(key_code_to_string(&key.code));
                write!(f, "key:{}", parts.join("+"))
            }
            Self::Type(text) => write!(f, "type:{text}"),
            Self::Wait(d) => write!(f, "wait:{}ms", d.as_millis()),
            Self::Resize(w, h) => write!(f, "resize:{w}x{h}"),
            Self::Snapshot(name) => write!(f, "snapshot:{name}"),
            Self::Assert(a) => match a {
                Assertion::Contains(t) => write!(f, "assert:contains:{t}"),
                Assertion::ContainsExact(t) => write!(f, "assert:contains-exact:{t}"),
                Assertion::NotContains(t) => write!(f, "assert:not-contains:{t}"),
                Assertion::Matches(p) => write!(f, "assert:matches:{p}"),
                Assertion::StateEquals { field, value } => {
                    write!(f, "assert:state:{field}={value}")
                }
                Assertion::StateCompare { field, op, value } => {
                    write!(f, "assert:state:{field}{op}{value}")
                }
            },
        }
    }
}

fn key_code_to_string(code: &KeyCode) -> String {
    match code {
        KeyCode::Char(' ') => "space".to_string(),
        KeyCode::Char(c) => c.to_string(),
        KeyCode::Enter => "enter".to_string(),
        KeyCode::Esc => "esc".to_string(),
        KeyCode::Tab => "tab".to_string(),
        KeyCode::BackTab => "backtab".to_string(),
        KeyCode::Backspace => "backspace".to_string(),
        KeyCode::Delete => "delete".to_string(),
        KeyCode::Up => "up".to_string(),
        KeyCode::Down => "down".to_string(),
        KeyCode::Left => "left".to_string(),
        KeyCode::Right => "right".to_string(),
        KeyCode::Home => "home".to_string(),
        KeyCode::End => "end".to_string(),
        KeyCode::PageUp => "pageup".to_string(),
        KeyCode::PageDown => "pagedown".to_string(),
        _ => "unknown".to_string(),
    }
}

/// Parser for the event DSL.
#[derive(Debug, Default)]
pub struct EventParser;

impl EventParser {
    pub fn new() -> Self {
        Self
    }

    /// Parses all events from an input string.
    ///
    /// Events are separated by commas or newlines; `#` starts a comment line.
    pub fn parse_all(&self, input: &str) -> Result<Vec<Event>> {
        input
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .flat_map(|line| line.split(','))
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(|part| self.parse_one(part))
            .collect()
    }

    pub fn parse_one(&self, input: &str) -> Result<Event> {
        let input = input.trim();
        let Some((event_type, value)) = input.split_once(':') else {
            return Err(SqlChatError::config(format!(
                "Invalid event syntax: '{input}'. Expected format: type:value"
            )));
        };

        match event_type.trim().to_lowercase().as_str() {
            "key" => self.parse_key(value.trim()),
            // Leading spaces are kept so "type: x" types " x"
            "type" => Ok(Event::Type(value.to_string())),
            "wait" => self.parse_wait(value.trim()),
            "resize" => self.parse_resize(value.trim()),
            "snapshot" => Ok(Event::Snapshot(value.trim().to_string())),
            "assert" => self.parse_assert(value.trim()),
            other => Err(SqlChatError::config(format!(
                "Unknown event type: '{other}'. Valid types: key, type, wait, resize, snapshot, assert"
            ))),
        }
    }

    /// Parses a key like "enter", "ctrl+c" or "shift+tab".
    fn parse_key(&self, value: &str) -> Result<Event> {
        let mut parts: Vec<&str> = value.split('+').collect();
        let key_str = parts.pop().unwrap_or_default();
        let mut modifiers = KeyModifiers::empty();

        for part in parts {
            match part.to_lowercase().as_str() {
                "ctrl" | "control" => modifiers |= KeyModifiers::CONTROL,
                "alt" => modifiers |= KeyModifiers::ALT,
                "shift" => modifiers |= KeyModifiers::SHIFT,
                _ => {
                    return Err(SqlChatError::config(format!(
                        "Unknown modifier: '{part}'. Valid modifiers: ctrl, alt, shift"
                    )));
                }
            }
        }

        let mut code = self.parse_key_code(key_str)?;
        if code == KeyCode::Tab && modifiers.contains(KeyModifiers::SHIFT) {
            code = KeyCode::BackTab;
            modifiers.remove(KeyModifiers::SHIFT);
        }

        Ok(Event::Key(KeyEvent::new(code, modifiers)))
    }

    fn parse_key_code(&self, s: &str) -> Result<KeyCode> {
        let code = match s.to_lowercase().as_str() {
            "enter" | "return" => KeyCode::Enter,
            "esc" | "escape" => KeyCode::Esc,
            "tab" => KeyCode::Tab,
            "backtab" => KeyCode::BackTab,
            "backspace" | "bs" => KeyCode::Backspace,
            "delete" | "del" => KeyCode::Delete,
            "up" => KeyCode::Up,
            "down" => KeyCode::Down,
            "left" => KeyCode::Left,
            "right" => KeyCode::Right,
            "home" => KeyCode::Home,
            "end" => KeyCode::End,
            "pageup" | "pgup" => KeyCode::PageUp,
            "pagedown" | "pgdn" => KeyCode::PageDown,
            "space" => KeyCode::Char(' '),
            _ => {
                let mut chars = s.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => KeyCode::Char(c),
                    _ => {
                        return Err(SqlChatError::config(format!(
                            "Unknown key: '{s}'. Use single characters or named keys like enter, esc, tab, etc."
                        )));
                    }
                }
            }
        };
        Ok(code)
    }

    /// Parses "100ms", "2s" or a bare number of milliseconds.
    fn parse_wait(&self, value: &str) -> Result<Event> {
        let value = value.to_lowercase();
        let invalid = || SqlChatError::config(format!("Invalid duration: '{value}'"));

        let duration = if let Some(ms) = value.strip_suffix("ms") {
            Duration::from_millis(ms.parse().map_err(|_| invalid())?)
        } else if let Some(secs) = value.strip_suffix('s') {
            Duration::from_secs(secs.parse().map_err(|_| invalid())?)
        } else {
            Duration::from_millis(value.parse().map_err(|_| invalid())?)
        };

        Ok(Event::Wait(duration))
    }

    /// Parses "120x40".
    fn parse_resize(&self, value: &str) -> Result<Event> {
        let Some((w, h)) = value.split_once('x') else {
            return Err(SqlChatError::config(format!(
                "Invalid resize format: '{value}'. Expected WIDTHxHEIGHT"
            )));
        };

        let width: u16 = w
            .parse()
            .map_err(|_| SqlChatError::config(format!("Invalid width: '{w}'")))?;
        let height: u16 = h
            .parse()
            .map_err(|_| SqlChatError::config(format!("Invalid height: '{h}'")))?;

        Ok(Event::Resize(width, height))
    }

    fn parse_assert(&self, value: &str) -> Result<Event> {
        let Some((assert_type, rest)) = value.split_once(':') else {
            return Err(SqlChatError::config(format!(
                "Invalid assertion syntax: '{value}'. Expected assert:type:value"
            )));
        };
        let rest = rest.trim();

        let assertion = match assert_type.trim().to_lowercase().as_str() {
            "contains" => Assertion::Contains(rest.to_string()),
            "contains-exact" => Assertion::ContainsExact(rest.to_string()),
            "not-contains" => Assertion::NotContains(rest.to_string()),
            "matches" => Assertion::Matches(rest.to_string()),
            "state" => self.parse_state_assertion(rest)?,
            other => {
                return Err(SqlChatError::config(format!(
                    "Unknown assertion type: '{other}'. Valid types: contains, contains-exact, not-contains, matches, state"
                )));
            }
        };

        Ok(Event::Assert(assertion))
    }

    /// Parses "phase=Halted" or "message_count>=2".
    fn parse_state_assertion(&self, value: &str) -> Result<Assertion> {
        // The field name ends at the first operator character.
        let Some(pos) = value.find(['=', '<', '>']) else {
            return Err(SqlChatError::config(format!(
                "Invalid state assertion: '{value}'. Expected field=value or field>=value"
            )));
        };
        let field = value[..pos].trim().to_string();
        let tail = &value[pos..];

        for op in [">=", "<=", ">", "<"] {
            if let Some(expected) = tail.strip_prefix(op) {
                return Ok(Assertion::StateCompare {
                    field,
                    op: op.to_string(),
                    value: expected.trim().to_string(),
                });
            }
        }

        let expected = tail.trim_start_matches('=');
        Ok(Assertion::StateEquals {
            field,
            value: expected.trim().to_string(),
        })
    }
}
