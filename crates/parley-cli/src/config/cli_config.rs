//! Configuration file support
//!
//! Loads configuration from ~/.config/parley/config.toml

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration file contents. Every field is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CliConfig {
    #[serde(default)]
    pub discord: DiscordSection,
    #[serde(default)]
    pub ollama: OllamaSection,
    #[serde(default)]
    pub prompts: PromptsSection,
    #[serde(default)]
    pub session: SessionSection,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiscordSection {
    pub token: Option<String>,
    pub guild_id: Option<String>,
    /// Prefix for text commands
    pub command_prefix: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OllamaSection {
    pub base_url: Option<String>,
    pub model: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PromptsSection {
    pub characters_dir: Option<PathBuf>,
    pub base_prompt: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionSection {
    pub max_turns: Option<usize>,
    pub memory_expiry_secs: Option<u64>,
    pub message_limit: Option<usize>,
    pub revision_interval_ms: Option<u64>,
}

impl CliConfig {
    /// Load configuration from default path
    pub fn load() -> Self {
        Self::load_from_path(Self::default_path())
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: Option<PathBuf>) -> Self {
        let Some(path) = path else {
            return Self::default();
        };

        if !path.exists() {
            return Self::default();
        }

        match std::fs::read_to_string(&path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(config) => config,
                Err(e) => {
                    tracing::warn!("Ignoring invalid config {}: {}", path.display(), e);
                    Self::default()
                }
            },
            Err(_) => Self::default(),
        }
    }

    /// Get the default configuration file path
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("parley").join("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_is_default() {
        let dir = tempdir().unwrap();
        let config = CliConfig::load_from_path(Some(dir.path().join("absent.toml")));
        assert!(config.discord.token.is_none());
        assert!(CliConfig::load_from_path(None).ollama.model.is_none());
    }

    #[test]
    fn test_load_sections() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[discord]
guild_id = "123"
command_prefix = "?"

[ollama]
model = "llama3"

[prompts]
characters_dir = "/srv/characters"

[session]
max_turns = 4
revision_interval_ms = 1000
"#,
        )
        .unwrap();

        let config = CliConfig::load_from_path(Some(path));
        assert_eq!(config.discord.guild_id.as_deref(), Some("123"));
        assert_eq!(config.discord.command_prefix.as_deref(), Some("?"));
        assert_eq!(config.ollama.model.as_deref(), Some("llama3"));
        assert_eq!(
            config.prompts.characters_dir,
            Some(PathBuf::from("/srv/characters"))
        );
        assert_eq!(config.session.max_turns, Some(4));
        assert_eq!(config.session.revision_interval_ms, Some(1000));
        assert!(config.session.message_limit.is_none());
    }

    #[test]
    fn test_invalid_file_is_default() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[discord\ntoken = ").unwrap();
        let config = CliConfig::load_from_path(Some(path));
        assert!(config.discord.token.is_none());
    }
}
