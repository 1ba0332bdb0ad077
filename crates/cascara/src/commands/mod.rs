//! Command implementations for the Cascara CLI
//!
//! Each command module handles the CLI interface and delegates to
//! cascara-core for actual implementation.

pub mod process;
pub mod units;
