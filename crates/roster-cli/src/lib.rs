//! roster: terminal front end for the roster controller
//!
//! The binary wires an [`roster_client::HttpStore`] per collection into a
//! [`roster_sdk::RosterController`], loads the roster and runs one
//! subcommand against it.

pub mod commands;
pub mod config;
pub mod prompt;

pub use commands::{execute_command, RosterCommands};
pub use config::{CliConfig, Overrides};
pub use prompt::TerminalPrompter;
