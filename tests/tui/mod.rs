//! Tests that drive the built binary in headless mode.

mod common;
mod headless_test;
