//! Effective settings: flags and environment over the config file over defaults.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Result, bail};
use parley_ai::OllamaConfig;
use parley_core::SessionConfig;
use parley_core::runtime::{BotConfig, DEFAULT_COMMAND_PREFIX};

use super::cli_config::CliConfig;
use crate::cli::SettingsArgs;

const DEFAULT_CHARACTERS_DIR: &str = "characters";
const DEFAULT_BASE_PROMPT: &str = "baseSystem.txt";

#[derive(Debug, Clone)]
pub struct Settings {
    pub discord_token: Option<String>,
    pub bot: BotConfig,
    pub ollama: OllamaConfig,
    pub characters_dir: PathBuf,
    pub base_prompt: PathBuf,
    pub session: SessionConfig,
}

impl Settings {
    pub fn resolve(args: &SettingsArgs, file: &CliConfig) -> Self {
        let ollama_defaults = OllamaConfig::default();
        let session_defaults = SessionConfig::default();

        let session = SessionConfig {
            max_turns: file
                .session
                .max_turns
                .unwrap_or(session_defaults.max_turns),
            memory_expiry: file
                .session
                .memory_expiry_secs
                .map(Duration::from_secs)
                .unwrap_or(session_defaults.memory_expiry),
            message_limit: file
                .session
                .message_limit
                .unwrap_or(session_defaults.message_limit),
            revision_interval: file
                .session
                .revision_interval_ms
                .map(Duration::from_millis)
                .unwrap_or(session_defaults.revision_interval),
            ..session_defaults
        };

        Self {
            discord_token: non_empty(args.token.clone())
                .or_else(|| non_empty(file.discord.token.clone())),
            bot: BotConfig {
                command_prefix: file
                    .discord
                    .command_prefix
                    .clone()
                    .unwrap_or_else(|| DEFAULT_COMMAND_PREFIX.to_string()),
                guild_id: non_empty(args.guild_id.clone())
                    .or_else(|| non_empty(file.discord.guild_id.clone())),
            },
            ollama: OllamaConfig {
                base_url: args
                    .ollama_url
                    .clone()
                    .or_else(|| file.ollama.base_url.clone())
                    .unwrap_or(ollama_defaults.base_url),
                model: args
                    .model
                    .clone()
                    .or_else(|| file.ollama.model.clone())
                    .unwrap_or(ollama_defaults.model),
                connect_timeout: ollama_defaults.connect_timeout,
            },
            characters_dir: args
                .characters_dir
                .clone()
                .or_else(|| file.prompts.characters_dir.clone())
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CHARACTERS_DIR)),
            base_prompt: args
                .base_prompt
                .clone()
                .or_else(|| file.prompts.base_prompt.clone())
                .unwrap_or_else(|| PathBuf::from(DEFAULT_BASE_PROMPT)),
            session,
        }
    }

    /// The Discord token, required to connect.
    pub fn require_token(&self) -> Result<&str> {
        match self.discord_token.as_deref() {
            Some(token) => Ok(token),
            None => bail!("DISCORD_TOKEN not set (pass --token, set the variable or add it to the config file)"),
        }
    }

    /// Reject settings the bot cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.session.max_turns == 0 {
            bail!("session.max_turns must be at least 1");
        }
        if self.session.message_limit == 0 {
            bail!("session.message_limit must be at least 1");
        }
        if self.bot.command_prefix.is_empty() {
            bail!("discord.command_prefix must not be empty");
        }
        Ok(())
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
