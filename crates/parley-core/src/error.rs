//! Error types for generation sessions

use std::path::PathBuf;

use parley_ai::AiError;
use thiserror::Error;

/// Prompt file errors
#[derive(Error, Debug)]
pub enum PromptError {
    /// No prompt file exists for the requested persona.
    #[error("Character '{0}' not found.")]
    NotFound(String),

    /// The base system prompt is missing; fatal at startup.
    #[error("Base system prompt not found at {}", .0.display())]
    ConfigMissing(PathBuf),

    #[error("Failed to read prompt file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Messaging transport errors. Surfaced to the caller, never retried.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Discord API returned {status} for {action}: {message}")]
    Api {
        action: &'static str,
        status: u16,
        message: String,
    },

    #[error("Discord gateway unavailable: {0}")]
    Gateway(String),

    #[error("Unexpected Discord response: {0}")]
    InvalidResponse(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Transport failure: {0}")]
    Other(String),
}

/// Recoverable per-request failures, reported to the requester.
#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("Character '{0}' not found.")]
    PersonaNotFound(String),

    /// A persona file exists but could not be read.
    #[error(transparent)]
    Prompt(PromptError),

    /// Backend unavailable, transport dropped mid-stream or undecodable event.
    #[error(transparent)]
    Backend(#[from] AiError),

    #[error("The model returned no output")]
    EmptyResult,
}

impl From<PromptError> for GenerationError {
    fn from(err: PromptError) -> Self {
        match err {
            PromptError::NotFound(persona) => Self::PersonaNotFound(persona),
            other => Self::Prompt(other),
        }
    }
}
