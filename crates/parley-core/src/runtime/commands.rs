//! Bot commands
//!
//! Prefix commands (`!sage hello`, `!clearmemory`) and the matching slash
//! command definitions registered with Discord.

use serde_json::{Value, json};
use tracing::warn;

/// Name of the command that forgets a user's conversations.
pub const CLEAR_MEMORY_COMMAND: &str = "clearmemory";

/// Slash option type for strings.
const STRING_OPTION: u64 = 3;
/// Application command type for chat input (slash) commands.
const CHAT_INPUT: u64 = 1;
/// Discord's limit on command name length.
const MAX_COMMAND_NAME: usize = 32;

/// A parsed prefix command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Talk to a persona.
    Persona { name: String, text: String },
    /// A persona was named without a message.
    MissingMessage { name: String },
    ClearMemory,
}

/// Parse `content` as a prefix command.
///
/// Returns `None` for anything that is not addressed to a known persona or
/// the clear-memory command.
pub fn parse_prefix_command(content: &str, prefix: &str, personas: &[String]) -> Option<Command> {
    let body = content.strip_prefix(prefix)?;
    let (name, text) = match body.split_once(char::is_whitespace) {
        Some((name, text)) => (name, text.trim()),
        None => (body, ""),
    };

    if name == CLEAR_MEMORY_COMMAND {
        return Some(Command::ClearMemory);
    }
    if !personas.iter().any(|persona| persona == name) {
        return None;
    }

    if text.is_empty() {
        Some(Command::MissingMessage {
            name: name.to_string(),
        })
    } else {
        Some(Command::Persona {
            name: name.to_string(),
            text: text.to_string(),
        })
    }
}

pub fn usage(prefix: &str, persona: &str) -> String {
    format!("Usage: `{}{} <message>`", prefix, persona)
}

/// Reply to a clear-memory request.
pub fn clear_memory_reply(cleared: usize) -> String {
    if cleared > 0 {
        format!(
            "Cleared your conversation memory for {} character(s).",
            cleared
        )
    } else {
        "You don't have any conversation memory to clear.".to_string()
    }
}

/// Whether Discord accepts `name` as a slash command name.
pub fn is_valid_command_name(name: &str) -> bool {
    let len = name.chars().count();
    (1..=MAX_COMMAND_NAME).contains(&len)
        && name
            .chars()
            .all(|c| c == '-' || c == '_' || (c.is_alphanumeric() && !c.is_uppercase()))
}

/// Slash command definitions: one per persona plus `/clearmemory`.
///
/// Personas whose names Discord would reject are skipped with a warning;
/// they stay reachable through the prefix command.
pub fn slash_commands(personas: &[String]) -> Vec<Value> {
    let mut commands: Vec<Value> = personas
        .iter()
        .filter(|persona| persona.as_str() != CLEAR_MEMORY_COMMAND)
        .filter(|persona| {
            let valid = is_valid_command_name(persona);
            if !valid {
                warn!("Persona '{}' is not a valid slash command name, skipping", persona);
            }
            valid
        })
        .map(|persona| {
            json!({
                "name": persona,
                "type": CHAT_INPUT,
                "description": format!("Talk to {}", persona),
                "options": [{
                    "type": STRING_OPTION,
                    "name": "message",
                    "description": format!("What do you want to say to {}?", persona),
                    "required": true
                }]
            })
        })
        .collect();

    commands.push(json!({
        "name": CLEAR_MEMORY_COMMAND,
        "type": CHAT_INPUT,
        "description": "Clear your conversation memory with all characters"
    }));
    commands
}
