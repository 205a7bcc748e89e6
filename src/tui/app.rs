//! Application state for the TUI.
//!
//! Holds the sidebar form, the input line, the chat loop and the live trace
//! of the turn in progress. Key handling mutates this state and returns an
//! [`Action`] when the runner has work to do.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use super::text::find_word_start_backward;
use super::widgets::spinner::Spinner;
use crate::agent::AgentStep;
use crate::app::{blockers, Blocker, SessionSettings};
use crate::config::RemoteDefaults;
use crate::connection::{ConnectionConfig, ConnectionMode, RemoteConfig};
use crate::error::Result;
use crate::llm::LlmProvider;
use crate::session::{ChatLoop, ChatPhase};

/// Which panel currently has focus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Focus {
    #[default]
    Input,
    Chat,
    Sidebar,
}

impl Focus {
    /// Cycles to the next focus panel.
    pub fn next(self) -> Self {
        match self {
            Self::Input => Self::Chat,
            Self::Chat => Self::Sidebar,
            Self::Sidebar => Self::Input,
        }
    }

    pub fn prev(self) -> Self {
        match self {
            Self::Input => Self::Sidebar,
            Self::Chat => Self::Input,
            Self::Sidebar => Self::Chat,
        }
    }
}

/// Work the runner must do after a key press.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Answer this question with these settings.
    Ask {
        question: String,
        settings: SessionSettings,
    },
    Quit,
}

/// Input state for text editing. The cursor counts characters.
#[derive(Debug, Default)]
pub struct InputState {
    pub text: String,
    pub cursor: usize,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    fn byte_index(&self, char_index: usize) -> usize {
        self.text
            .char_indices()
            .nth(char_index)
            .map(|(i, _)| i)
            .unwrap_or(self.text.len())
    }

    fn char_len(&self) -> usize {
        self.text.chars().count()
    }

    pub fn insert(&mut self, c: char) {
        let at = self.byte_index(self.cursor);
        self.text.insert(at, c);
        self.cursor += 1;
    }

    pub fn backspace(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
            let at = self.byte_index(self.cursor);
            self.text.remove(at);
        }
    }

    pub fn delete(&mut self) {
        if self.cursor < self.char_len() {
            let at = self.byte_index(self.cursor);
            self.text.remove(at);
        }
    }

    /// Deletes the word before the cursor (Ctrl+W).
    pub fn delete_word_backward(&mut self) {
        let start = find_word_start_backward(&self.text, self.cursor);
        let from = self.byte_index(start);
        let to = self.byte_index(self.cursor);
        self.text.replace_range(from..to, "");
        self.cursor = start;
    }

    pub fn move_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn move_right(&mut self) {
        if self.cursor < self.char_len() {
            self.cursor += 1;
        }
    }

    pub fn move_home(&mut self) {
        self.cursor = 0;
    }

    pub fn move_end(&mut self) {
        self.cursor = self.char_len();
    }

    /// Clears the input and returns the previous text.
    pub fn take(&mut self) -> String {
        self.cursor = 0;
        std::mem::take(&mut self.text)
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// A row of the sidebar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SidebarField {
    Mode,
    Host,
    User,
    Password,
    Database,
    Port,
    ApiKey,
    ClearChat,
}

impl SidebarField {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Mode => "Select an option",
            Self::Host => "Enter MySQL host string",
            Self::User => "Enter MySQL username",
            Self::Password => "Enter MySQL password",
            Self::Database => "Enter MySQL database name",
            Self::Port => "Enter MySQL port",
            Self::ApiKey => "Enter Groq API Key",
            Self::ClearChat => "Clear chat",
        }
    }

    pub fn is_masked(&self) -> bool {
        matches!(self, Self::Password | Self::ApiKey)
    }

    pub fn is_text(&self) -> bool {
        !matches!(self, Self::Mode | Self::ClearChat)
    }
}

/// The connection selector and credential inputs.
#[derive(Debug, Clone, Default)]
pub struct SidebarForm {
    pub mode: ConnectionMode,
    pub remote: RemoteConfig,
    pub api_key: String,
    pub selected: usize,
}

impl SidebarForm {
    /// Prefills the form from configured defaults and a known API key.
    pub fn new(defaults: &RemoteDefaults, api_key: Option<String>) -> Self {
        Self {
            mode: ConnectionMode::Local,
            remote: RemoteConfig {
                host: defaults.host.clone().unwrap_or_default(),
                user: defaults.user.clone().unwrap_or_default(),
                password: String::new(),
                database: defaults.database.clone().unwrap_or_default(),
                port: defaults.port.clone().unwrap_or_default(),
            },
            api_key: api_key.unwrap_or_default(),
            selected: 0,
        }
    }

    /// Rows in display order; remote fields only show in remote mode.
    pub fn fields(&self) -> Vec<SidebarField> {
        let mut fields = vec![SidebarField::Mode];
        if self.mode == ConnectionMode::Remote {
            fields.extend([
                SidebarField::Host,
                SidebarField::User,
                SidebarField::Password,
                SidebarField::Database,
                SidebarField::Port,
            ]);
        }
        fields.extend([SidebarField::ApiKey, SidebarField::ClearChat]);
        fields
    }

    pub fn selected_field(&self) -> SidebarField {
        let fields = self.fields();
        fields
            .get(self.selected)
            .or_else(|| fields.last())
            .copied()
            .unwrap_or(SidebarField::Mode)
    }

    pub fn select_next(&mut self) {
        let count = self.fields().len();
        self.selected = (self.selected + 1) % count;
    }

    pub fn select_prev(&mut self) {
        let count = self.fields().len();
        self.selected = (self.selected + count - 1) % count;
    }

    pub fn toggle_mode(&mut self) {
        self.mode = self.mode.toggle();
        self.selected = 0;
    }

    pub fn value(&self, field: SidebarField) -> &str {
        match field {
            SidebarField::Host => &self.remote.host,
            SidebarField::User => &self.remote.user,
            SidebarField::Password => &self.remote.password,
            SidebarField::Database => &self.remote.database,
            SidebarField::Port => &self.remote.port,
            SidebarField::ApiKey => &self.api_key,
            SidebarField::Mode | SidebarField::ClearChat => "",
        }
    }

    pub fn value_mut(&mut self, field: SidebarField) -> Option<&mut String> {
        match field {
            SidebarField::Host => Some(&mut self.remote.host),
            SidebarField::User => Some(&mut self.remote.user),
            SidebarField::Password => Some(&mut self.remote.password),
            SidebarField::Database => Some(&mut self.remote.database),
            SidebarField::Port => Some(&mut self.remote.port),
            SidebarField::ApiKey => Some(&mut self.api_key),
            SidebarField::Mode | SidebarField::ClearChat => None,
        }
    }

    pub fn settings(&self) -> SessionSettings {
        let connection = match self.mode {
            ConnectionMode::Local => ConnectionConfig::Local,
            ConnectionMode::Remote => ConnectionConfig::Remote(self.remote.clone()),
        };
        SessionSettings {
            connection,
            api_key: self.api_key.clone(),
        }
    }
}

/// One line of the live trace of a running turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceEntry {
    pub label: &'static str,
    pub text: String,
}

/// Main application state.
pub struct App {
    pub running: bool,
    pub focus: Focus,
    pub input: InputState,
    pub form: SidebarForm,
    pub chat: ChatLoop,
    /// Steps of the turn in progress.
    pub trace: Vec<TraceEntry>,
    /// Model output streamed since the last completed step.
    pub streaming: String,
    /// Chat scroll offset (lines from bottom).
    pub chat_scroll: usize,
    /// Non-halting notices, such as a missing API key.
    pub notices: Vec<&'static str>,
    /// Transient status line (rejected submits and the like).
    pub status: Option<String>,
    pub spinner: Option<Spinner>,
    provider: LlmProvider,
    /// Settings as last committed; what turns run with.
    committed: SessionSettings,
}

impl App {
    pub fn new(form: SidebarForm, provider: LlmProvider) -> Self {
        let mut app = Self {
            running: true,
            focus: Focus::default(),
            input: InputState::new(),
            committed: form.settings(),
            form,
            chat: ChatLoop::new(),
            trace: Vec::new(),
            streaming: String::new(),
            chat_scroll: 0,
            notices: Vec::new(),
            status: None,
            spinner: None,
            provider,
        };
        app.commit_settings();
        app
    }

    pub fn provider(&self) -> LlmProvider {
        self.provider
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.committed
    }

    pub fn is_processing(&self) -> bool {
        self.chat.is_awaiting()
    }

    /// Display string of the committed connection for the header.
    pub fn connection_info(&self) -> String {
        self.committed.connection.display_string()
    }

    /// Re-evaluates the form, like a form submit: halts or resumes the chat
    /// and refreshes the notices.
    pub fn commit_settings(&mut self) {
        self.committed = self.form.settings();
        let found = blockers(&self.committed, self.provider);

        match found.iter().find(|b| b.halts()) {
            Some(blocker) => self.chat.halt(blocker.notice()),
            None => self.chat.resume(),
        }
        self.notices = found
            .iter()
            .filter(|b| !b.halts())
            .map(Blocker::notice)
            .collect();
    }

    /// Restores the greeting ("Clear chat").
    pub fn clear_chat(&mut self) {
        if self.chat.reset() {
            self.chat_scroll = 0;
            self.status = None;
        } else {
            self.status = Some("Wait for the current answer before clearing the chat.".to_string());
        }
    }

    /// Handles a key press.
    pub fn handle_key(&mut self, key: KeyEvent) -> Option<Action> {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

        match key.code {
            KeyCode::Char('c') | KeyCode::Char('q') if ctrl => {
                self.running = false;
                return Some(Action::Quit);
            }
            KeyCode::Char('l') if ctrl => {
                self.clear_chat();
                return None;
            }
            KeyCode::Tab => {
                self.leave_focus();
                self.focus = self.focus.next();
                return None;
            }
            KeyCode::BackTab => {
                self.leave_focus();
                self.focus = self.focus.prev();
                return None;
            }
            _ => {}
        }

        match self.focus {
            Focus::Input => self.handle_input_key(key),
            Focus::Chat => {
                self.handle_chat_key(key);
                None
            }
            Focus::Sidebar => {
                self.handle_sidebar_key(key);
                None
            }
        }
    }

    fn leave_focus(&mut self) {
        if self.focus == Focus::Sidebar {
            self.commit_settings();
        }
    }

    fn handle_input_key(&mut self, key: KeyEvent) -> Option<Action> {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Enter => return self.submit_input(),
            KeyCode::Char('w') if ctrl => self.input.delete_word_backward(),
            KeyCode::Char('u') if ctrl => {
                self.input.take();
            }
            KeyCode::Char(c) if !ctrl => self.input.insert(c),
            KeyCode::Backspace => self.input.backspace(),
            KeyCode::Delete => self.input.delete(),
            KeyCode::Left => self.input.move_left(),
            KeyCode::Right => self.input.move_right(),
            KeyCode::Home => self.input.move_home(),
            KeyCode::End => self.input.move_end(),
            KeyCode::Esc => {
                self.input.take();
            }
            _ => {}
        }
        None
    }

    fn handle_chat_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Up => self.chat_scroll = self.chat_scroll.saturating_add(1),
            KeyCode::Down => self.chat_scroll = self.chat_scroll.saturating_sub(1),
            KeyCode::PageUp => self.chat_scroll = self.chat_scroll.saturating_add(10),
            KeyCode::PageDown => self.chat_scroll = self.chat_scroll.saturating_sub(10),
            // Clamped during render
            KeyCode::Home => self.chat_scroll = usize::MAX,
            KeyCode::End => self.chat_scroll = 0,
            _ => {}
        }
    }

    fn handle_sidebar_key(&mut self, key: KeyEvent) {
        let field = self.form.selected_field();
        match key.code {
            KeyCode::Up => self.form.select_prev(),
            KeyCode::Down => self.form.select_next(),
            KeyCode::Left | KeyCode::Right | KeyCode::Char(' ') | KeyCode::Enter
                if field == SidebarField::Mode =>
            {
                self.form.toggle_mode();
                self.commit_settings();
            }
            KeyCode::Enter | KeyCode::Char(' ') if field == SidebarField::ClearChat => {
                self.clear_chat();
            }
            KeyCode::Enter => {
                self.commit_settings();
                self.form.select_next();
            }
            KeyCode::Char(c) => {
                if let Some(value) = self.form.value_mut(field) {
                    value.push(c);
                }
            }
            KeyCode::Backspace => {
                if let Some(value) = self.form.value_mut(field) {
                    value.pop();
                }
            }
            _ => {}
        }
    }

    /// Submits the input line as a question.
    ///
    /// Rejected submits keep the text and explain why in the status line.
    pub fn submit_input(&mut self) -> Option<Action> {
        if self.input.text.trim().is_empty() {
            self.input.take();
            return None;
        }

        if let Some(notice) = self.notices.first() {
            self.status = Some(notice.to_string());
            return None;
        }

        match self.chat.submit(&self.input.text) {
            Ok(Some(question)) => {
                self.input.take();
                self.begin_turn();
                Some(Action::Ask {
                    question,
                    settings: self.committed.clone(),
                })
            }
            Ok(None) => None,
            Err(e) => {
                self.status = Some(e.message().to_string());
                None
            }
        }
    }

    fn begin_turn(&mut self) {
        self.trace.clear();
        self.streaming.clear();
        self.status = None;
        self.chat_scroll = 0;
        self.spinner = Some(Spinner::thinking());
    }

    /// Records a step of the running turn.
    pub fn on_step(&mut self, step: AgentStep) {
        let label = step.label();
        match step {
            AgentStep::Token(chunk) => {
                self.streaming.push_str(&chunk);
                return;
            }
            AgentStep::Thought(text) => self.push_trace(label, text),
            AgentStep::Action { tool, input } => {
                let text = if input.is_empty() {
                    tool
                } else {
                    format!("{tool}: {input}")
                };
                self.push_trace(label, text);
            }
            AgentStep::Observation { output, .. } => self.push_trace(label, output),
        }
        self.streaming.clear();
    }

    fn push_trace(&mut self, label: &'static str, text: String) {
        self.trace.push(TraceEntry { label, text });
        self.chat_scroll = 0;
    }

    /// Ends the running turn with its answer or error.
    pub fn finish_turn(&mut self, outcome: Result<String>) {
        self.chat.complete(outcome);
        self.trace.clear();
        self.streaming.clear();
        self.spinner = None;
        self.chat_scroll = 0;
    }

    /// Name of the chat phase, for headless assertions.
    pub fn phase_name(&self) -> &'static str {
        self.chat.phase().name()
    }

    pub fn is_halted(&self) -> bool {
        matches!(self.chat.phase(), ChatPhase::Halted(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::MISSING_REMOTE_DETAILS;
    use crate::llm::INVALID_API_KEY;
    use crate::session::GREETING;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            app.handle_key(key(KeyCode::Char(c)));
        }
    }

    fn mock_app() -> App {
        App::new(SidebarForm::default(), LlmProvider::Mock)
    }

    fn remote_defaults() -> RemoteDefaults {
        RemoteDefaults {
            host: Some("localhost".to_string()),
            port: Some("3306".to_string()),
            user: Some("root".to_string()),
            database: Some("shop".to_string()),
        }
    }

    #[test]
    fn test_input_insert_and_backspace() {
        let mut input = InputState::new();
        input.insert('h');
        input.insert('é');
        input.insert('!');
        assert_eq!(input.text, "hé!");
        input.move_left();
        input.backspace();
        assert_eq!(input.text, "h!");
        assert_eq!(input.cursor, 1);
    }

    #[test]
    fn test_input_delete_and_movement() {
        let mut input = InputState::new();
        input.text = "hello".to_string();
        input.move_end();
        assert_eq!(input.cursor, 5);
        input.move_home();
        input.delete();
        assert_eq!(input.text, "ello");
        input.move_right();
        assert_eq!(input.cursor, 1);
    }

    #[test]
    fn test_input_delete_word_backward() {
        let mut input = InputState::new();
        input.text = "how many rows".to_string();
        input.move_end();
        input.delete_word_backward();
        assert_eq!(input.text, "how many ");
        assert_eq!(input.cursor, 9);
    }

    #[test]
    fn test_focus_cycle() {
        let focus = Focus::Input;
        assert_eq!(focus.next(), Focus::Chat);
        assert_eq!(focus.next().next(), Focus::Sidebar);
        assert_eq!(focus.next().next().next(), Focus::Input);
        assert_eq!(focus.prev(), Focus::Sidebar);
    }

    #[test]
    fn test_new_app_shows_greeting() {
        let app = mock_app();
        assert!(app.running);
        assert_eq!(app.focus, Focus::Input);
        assert_eq!(app.chat.messages().len(), 1);
        assert_eq!(app.chat.messages()[0].content, GREETING);
        assert!(app.notices.is_empty());
    }

    #[test]
    fn test_enter_asks_question() {
        let mut app = mock_app();
        type_text(&mut app, "How many rows are in table STUDENT?");

        let action = app.handle_key(key(KeyCode::Enter));
        assert_eq!(
            action,
            Some(Action::Ask {
                question: "How many rows are in table STUDENT?".to_string(),
                settings: SessionSettings::default(),
            })
        );
        assert!(app.input.is_empty());
        assert!(app.is_processing());
        assert!(app.spinner.is_some());
    }

    #[test]
    fn test_second_question_rejected_while_processing() {
        let mut app = mock_app();
        type_text(&mut app, "first");
        app.handle_key(key(KeyCode::Enter));
        type_text(&mut app, "second");

        assert_eq!(app.handle_key(key(KeyCode::Enter)), None);
        assert_eq!(app.input.text, "second");
        assert!(app.status.is_some());
        assert_eq!(app.chat.messages().len(), 2);
    }

    #[test]
    fn test_trace_and_finish_turn() {
        let mut app = mock_app();
        type_text(&mut app, "q");
        app.handle_key(key(KeyCode::Enter));

        app.on_step(AgentStep::Token("Action: sql_db".to_string()));
        assert_eq!(app.streaming, "Action: sql_db");
        app.on_step(AgentStep::Action {
            tool: "sql_db_list_tables".to_string(),
            input: String::new(),
        });
        assert!(app.streaming.is_empty());
        assert_eq!(
            app.trace,
            vec![TraceEntry {
                label: "Action",
                text: "sql_db_list_tables".to_string()
            }]
        );

        app.finish_turn(Ok("There are 5 rows.".to_string()));
        assert!(!app.is_processing());
        assert!(app.trace.is_empty());
        assert!(app.spinner.is_none());
        assert_eq!(app.chat.messages().len(), 3);
    }

    #[test]
    fn test_missing_api_key_blocks_submit() {
        let mut app = App::new(SidebarForm::default(), LlmProvider::Groq);
        assert_eq!(app.notices, vec![INVALID_API_KEY]);

        type_text(&mut app, "q");
        assert_eq!(app.handle_key(key(KeyCode::Enter)), None);
        assert_eq!(app.status.as_deref(), Some(INVALID_API_KEY));
        assert_eq!(app.input.text, "q");
        assert_eq!(app.chat.messages().len(), 1);
    }

    #[test]
    fn test_api_key_from_form_clears_notice() {
        let form = SidebarForm::new(&RemoteDefaults::default(), Some("gsk-test".to_string()));
        let app = App::new(form, LlmProvider::Groq);
        assert!(app.notices.is_empty());
    }

    #[test]
    fn test_remote_without_password_halts() {
        let form = SidebarForm::new(&remote_defaults(), None);
        let mut app = App::new(form, LlmProvider::Mock);

        // Tab to the sidebar, toggle the radio, tab back to the input.
        app.handle_key(key(KeyCode::Tab));
        app.handle_key(key(KeyCode::Tab));
        assert_eq!(app.focus, Focus::Sidebar);
        app.handle_key(key(KeyCode::Char(' ')));
        assert_eq!(app.form.mode, ConnectionMode::Remote);
        assert!(app.is_halted());
        assert_eq!(app.chat.halt_notice(), Some(MISSING_REMOTE_DETAILS));

        app.handle_key(key(KeyCode::Tab));
        type_text(&mut app, "How many rows?");
        assert_eq!(app.handle_key(key(KeyCode::Enter)), None);
        assert_eq!(app.chat.messages().len(), 1);
        assert_eq!(app.status.as_deref(), Some(MISSING_REMOTE_DETAILS));
    }

    #[test]
    fn test_switching_to_remote_mid_turn_halts_after_answer() {
        let form = SidebarForm::new(&remote_defaults(), None);
        let mut app = App::new(form, LlmProvider::Mock);

        type_text(&mut app, "How many rows?");
        assert!(matches!(
            app.handle_key(key(KeyCode::Enter)),
            Some(Action::Ask { .. })
        ));
        assert!(app.is_processing());

        app.handle_key(key(KeyCode::Tab));
        app.handle_key(key(KeyCode::Tab));
        app.handle_key(key(KeyCode::Char(' ')));
        app.handle_key(key(KeyCode::Tab));
        assert_eq!(app.form.mode, ConnectionMode::Remote);

        app.finish_turn(Ok("There are 5 rows.".to_string()));
        assert!(app.is_halted());
        assert_eq!(app.chat.messages().len(), 3);

        type_text(&mut app, "And now?");
        assert_eq!(app.handle_key(key(KeyCode::Enter)), None);
        assert_eq!(app.chat.messages().len(), 3);
    }

    #[test]
    fn test_filling_password_resumes() {
        let form = SidebarForm::new(&remote_defaults(), None);
        let mut app = App::new(form, LlmProvider::Mock);
        app.focus = Focus::Sidebar;
        app.handle_key(key(KeyCode::Enter));
        assert!(app.is_halted());

        // Mode, Host, User, Password
        for _ in 0..3 {
            app.handle_key(key(KeyCode::Down));
        }
        assert_eq!(app.form.selected_field(), SidebarField::Password);
        type_text(&mut app, "secret");
        app.handle_key(key(KeyCode::Enter));

        assert!(!app.is_halted());
        assert_eq!(app.phase_name(), "Idle");
        assert!(matches!(
            app.settings().connection,
            ConnectionConfig::Remote(ref r) if r.password == "secret"
        ));
    }

    #[test]
    fn test_uncommitted_edits_do_not_apply() {
        let form = SidebarForm::new(&remote_defaults(), None);
        let mut app = App::new(form, LlmProvider::Mock);
        app.focus = Focus::Sidebar;
        app.handle_key(key(KeyCode::Enter));
        for _ in 0..3 {
            app.handle_key(key(KeyCode::Down));
        }
        type_text(&mut app, "secret");
        assert!(app.is_halted());

        app.handle_key(key(KeyCode::Tab));
        assert!(!app.is_halted());
    }

    #[test]
    fn test_clear_chat_button() {
        let mut app = mock_app();
        app.chat.submit("q").unwrap();
        app.finish_turn(Ok("a".to_string()));
        assert_eq!(app.chat.messages().len(), 3);

        app.focus = Focus::Sidebar;
        while app.form.selected_field() != SidebarField::ClearChat {
            app.handle_key(key(KeyCode::Down));
        }
        app.handle_key(key(KeyCode::Enter));
        assert_eq!(app.chat.messages().len(), 1);
    }

    #[test]
    fn test_ctrl_l_refused_mid_turn() {
        let mut app = mock_app();
        type_text(&mut app, "q");
        app.handle_key(key(KeyCode::Enter));

        app.handle_key(KeyEvent::new(KeyCode::Char('l'), KeyModifiers::CONTROL));
        assert_eq!(app.chat.messages().len(), 2);
        assert!(app.status.is_some());
    }

    #[test]
    fn test_ctrl_c_quits() {
        let mut app = mock_app();
        let action = app.handle_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL));
        assert_eq!(action, Some(Action::Quit));
        assert!(!app.running);
    }

    #[test]
    fn test_sidebar_fields_follow_mode() {
        let mut form = SidebarForm::default();
        assert_eq!(
            form.fields(),
            vec![SidebarField::Mode, SidebarField::ApiKey, SidebarField::ClearChat]
        );
        form.toggle_mode();
        assert_eq!(form.fields().len(), 8);
        assert!(SidebarField::Password.is_masked());
        assert!(!SidebarField::Mode.is_text());
    }
}
