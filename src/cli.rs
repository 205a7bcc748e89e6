//! Command-line argument parsing for sqlchat.

use crate::config::Config;
use crate::llm::LlmProvider;
use crate::tui::headless::OutputFormat;
use clap::Parser;
use std::path::PathBuf;

/// Chat with a SQL database from the terminal.
#[derive(Parser, Debug)]
#[command(name = "sqlchat")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Config file path
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Path of the local SQLite database (default: example.db next to the binary's sources)
    #[arg(long, value_name = "PATH")]
    pub local_db: Option<PathBuf>,

    /// Groq model to use
    #[arg(long, value_name = "MODEL")]
    pub model: Option<String>,

    /// Groq API key, pre-filled into the sidebar
    #[arg(long, env = "GROQ_API_KEY", hide_env_values = true, value_name = "KEY")]
    pub api_key: Option<String>,

    /// Answer with the scripted offline model instead of Groq
    #[arg(long)]
    pub mock_llm: bool,

    // === Headless mode options ===
    /// Run in headless mode (no terminal UI, for testing/automation)
    #[arg(long)]
    pub headless: bool,

    /// Comma-separated events to execute in headless mode (e.g., "type:hello,key:enter")
    #[arg(long, value_name = "EVENTS")]
    pub events: Option<String>,

    /// Path to script file with events (use "-" for stdin)
    #[arg(long, value_name = "PATH")]
    pub script: Option<String>,

    /// Screen size for headless mode (WIDTHxHEIGHT, e.g., "120x40")
    #[arg(long, value_name = "SIZE", default_value = "120x40")]
    pub size: String,

    /// Output format for headless mode: text, json or frames
    #[arg(long, value_name = "FORMAT", default_value = "text")]
    pub output: String,

    /// Write output to file instead of stdout
    #[arg(long, value_name = "PATH")]
    pub output_file: Option<PathBuf>,

    /// Stop on first assertion failure
    #[arg(long)]
    pub fail_fast: bool,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Uses the --config argument if provided, otherwise the default path.
    pub fn config_path(&self) -> PathBuf {
        self.config.clone().unwrap_or_else(Config::default_path)
    }

    pub fn provider(&self) -> LlmProvider {
        if self.mock_llm {
            LlmProvider::Mock
        } else {
            LlmProvider::Groq
        }
    }

    /// Layers command-line overrides on top of the file configuration.
    pub fn apply_overrides(&self, config: &mut Config) {
        if let Some(ref path) = self.local_db {
            config.database.local_path = Some(path.clone());
        }
        if let Some(ref model) = self.model {
            config.llm.model = model.clone();
        }
    }

    /// The API key with surrounding whitespace removed; blank counts as absent.
    pub fn api_key(&self) -> Option<String> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .map(String::from)
    }

    /// Parses the screen size from the --size argument.
    pub fn parse_screen_size(&self) -> std::result::Result<(u16, u16), String> {
        let invalid = || {
            format!(
                "Invalid size format: '{}'. Expected WIDTHxHEIGHT (e.g., 120x40)",
                self.size
            )
        };
        let (w, h) = self.size.split_once('x').ok_or_else(invalid)?;
        let width = w
            .parse::<u16>()
            .map_err(|_| format!("Invalid width: '{w}'"))?;
        let height = h
            .parse::<u16>()
            .map_err(|_| format!("Invalid height: '{h}'"))?;
        if width == 0 || height == 0 {
            return Err(invalid());
        }
        Ok((width, height))
    }

    pub fn parse_output_format(&self) -> std::result::Result<OutputFormat, String> {
        self.output.parse()
    }

    /// Validates headless mode arguments.
    pub fn validate_headless(&self) -> std::result::Result<(), String> {
        if !self.headless {
            return Ok(());
        }

        if self.events.is_none() && self.script.is_none() {
            return Err("--headless requires --events or --script".to_string());
        }

        self.parse_screen_size()?;
        self.parse_output_format()?;
        Ok(())
    }
}
