//! Logging setup.
//!
//! The interactive UI owns the terminal, so logs go to a file there; headless
//! runs log to stderr where test harnesses can capture them.

use std::fs::{self, File};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Initializes file logging for the interactive UI.
///
/// The file is truncated on every start. Location: `~/.local/state/sqlchat/sqlchat.log`
/// on Linux, or the platform state/config directory elsewhere.
pub fn init_file_logging() {
    let log_path = get_log_path();

    if let Some(parent) = log_path.parent() {
        if let Err(e) = fs::create_dir_all(parent) {
            eprintln!("Warning: Could not create log directory: {e}");
            return;
        }
    }

    let log_file = match File::create(&log_path) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Warning: Could not create log file: {e}");
            return;
        }
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(log_file)
        .with_ansi(false)
        .try_init();
}

/// Initializes stderr logging for headless mode.
pub fn init_stderr_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(std::io::stderr)
        .try_init();
}

/// Returns the path for the log file.
pub fn get_log_path() -> PathBuf {
    if let Some(state_dir) = dirs::state_dir() {
        return state_dir.join("sqlchat").join("sqlchat.log");
    }

    if let Some(config_dir) = dirs::config_dir() {
        return config_dir.join("sqlchat").join("sqlchat.log");
    }

    std::env::temp_dir().join("sqlchat.log")
}
