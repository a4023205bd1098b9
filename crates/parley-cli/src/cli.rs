use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug, Default)]
#[command(name = "parley")]
#[command(version, about = "Parley - Discord character bot backed by Ollama")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    #[command(flatten)]
    pub settings: SettingsArgs,

    /// Config file (defaults to ~/.config/parley/config.toml)
    #[arg(long, global = true, env = "PARLEY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Also write logs to daily rolling files in this directory
    #[arg(long, global = true, env = "PARLEY_LOG_DIR")]
    pub log_dir: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Settings that override the config file.
#[derive(Args, Debug, Default, Clone)]
pub struct SettingsArgs {
    /// Discord bot token
    #[arg(long, env = "DISCORD_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Register slash commands in this guild only (globally when unset)
    #[arg(long, env = "GUILD_ID")]
    pub guild_id: Option<String>,

    /// Ollama model name
    #[arg(long, env = "OLLAMA_MODEL")]
    pub model: Option<String>,

    /// Ollama server URL
    #[arg(long, env = "OLLAMA_BASE_URL")]
    pub ollama_url: Option<String>,

    /// Directory of `<persona>.txt` prompt files
    #[arg(long, env = "PARLEY_CHARACTERS_DIR")]
    pub characters_dir: Option<PathBuf>,

    /// Base system prompt file
    #[arg(long, env = "PARLEY_BASE_PROMPT")]
    pub base_prompt: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Connect to Discord and serve requests (default)
    Run,

    /// List the personas found in the characters directory
    Personas,
}
