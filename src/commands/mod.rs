//! Command implementations for the CLI
//!
//! - start: Start the log server
//! - test: Test configuration validity

pub mod start;
