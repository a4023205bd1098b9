//! Prompt files
//!
//! The base system prompt is a single text file loaded once at startup.
//! Personas are `<name>.txt` files in the characters directory, read on
//! every request so edits take effect without a restart.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::PromptError;

const PERSONA_EXTENSION: &str = "txt";

/// Source of the system and persona prompt text.
pub trait PersonaPrompts: Send + Sync {
    /// Base system prompt shared by every persona.
    fn base_prompt(&self) -> &str;

    /// Character prompt for `persona`.
    fn persona_prompt(&self, persona: &str) -> Result<String, PromptError>;
}

/// Prompt files on disk.
#[derive(Debug, Clone)]
pub struct PromptLibrary {
    base_prompt: String,
    characters_dir: PathBuf,
}

impl PromptLibrary {
    /// Load the base prompt and remember where personas live.
    ///
    /// Fails with [`PromptError::ConfigMissing`] when the base prompt file
    /// does not exist.
    pub fn load(
        base_prompt_path: impl AsRef<Path>,
        characters_dir: impl Into<PathBuf>,
    ) -> Result<Self, PromptError> {
        let base_prompt_path = base_prompt_path.as_ref();
        if !base_prompt_path.is_file() {
            return Err(PromptError::ConfigMissing(base_prompt_path.to_path_buf()));
        }
        let base_prompt = read_trimmed(base_prompt_path)?;

        Ok(Self {
            base_prompt,
            characters_dir: characters_dir.into(),
        })
    }

    /// Build a library from in-memory base text.
    pub fn with_base_prompt(base_prompt: impl Into<String>, characters_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_prompt: base_prompt.into(),
            characters_dir: characters_dir.into(),
        }
    }

    /// Persona names discovered in the characters directory, sorted.
    ///
    /// A missing directory yields no personas.
    pub fn list_personas(&self) -> Vec<String> {
        let entries = match std::fs::read_dir(&self.characters_dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(
                    "Cannot read characters directory {}: {}",
                    self.characters_dir.display(),
                    e
                );
                return Vec::new();
            }
        };

        let mut personas: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_file())
            .filter(|path| path.extension().and_then(|e| e.to_str()) == Some(PERSONA_EXTENSION))
            .filter_map(|path| path.file_stem().and_then(|s| s.to_str()).map(str::to_string))
            .collect();
        personas.sort();
        personas
    }

    fn persona_path(&self, persona: &str) -> Option<PathBuf> {
        if persona.is_empty() || persona.contains(['/', '\\']) || persona.contains("..") {
            return None;
        }
        Some(
            self.characters_dir
                .join(format!("{}.{}", persona, PERSONA_EXTENSION)),
        )
    }
}

impl PersonaPrompts for PromptLibrary {
    fn base_prompt(&self) -> &str {
        &self.base_prompt
    }

    fn persona_prompt(&self, persona: &str) -> Result<String, PromptError> {
        let path = self
            .persona_path(persona)
            .filter(|path| path.is_file())
            .ok_or_else(|| PromptError::NotFound(persona.to_string()))?;
        debug!("Loading persona prompt from {}", path.display());
        read_trimmed(&path)
    }
}

fn read_trimmed(path: &Path) -> Result<String, PromptError> {
    std::fs::read_to_string(path)
        .map(|text| text.trim().to_string())
        .map_err(|source| PromptError::Io {
            path: path.to_path_buf(),
            source,
        })
}
