//! sqlchat - chat with a SQL database from the terminal.
//!
//! This library exposes the core modules for use in integration tests.

pub mod agent;
pub mod app;
pub mod cli;
pub mod config;
pub mod connection;
pub mod db;
pub mod error;
pub mod llm;
pub mod logging;
pub mod safety;
pub mod session;
pub mod tui;
