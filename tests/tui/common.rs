//! Common test utilities for TUI tests.

use std::process::Command;
use tempfile::TempDir;

/// Runs sqlchat in headless mode with the offline model and no user config.
///
/// The config path points into an empty temporary directory, so defaults apply.
pub fn run_headless(args: &[&str]) -> (i32, String, String) {
    let config_dir = TempDir::new().unwrap();
    let config_path = config_dir.path().join("config.toml");

    let output = Command::new(env!("CARGO_BIN_EXE_sqlchat"))
        .arg("--config")
        .arg(&config_path)
        .args(["--headless", "--mock-llm"])
        .args(args)
        .env_remove("GROQ_API_KEY")
        .output()
        .expect("Failed to execute command");

    let exit_code = output.status.code().unwrap_or(-1);
    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();

    (exit_code, stdout, stderr)
}
