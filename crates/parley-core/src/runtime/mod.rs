//! Bot runtime
//!
//! Turns gateway events into generation requests and memory resets.

pub mod commands;
mod handler;

pub use commands::{Command, clear_memory_reply, parse_prefix_command, slash_commands};
pub use handler::{Bot, BotConfig, DEFAULT_COMMAND_PREFIX};
