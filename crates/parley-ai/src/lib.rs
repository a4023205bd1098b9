//! Parley backend client
//!
//! Talks to a streaming chat backend (Ollama `/api/chat`) and turns its
//! newline-delimited JSON response into a lazy stream of text increments.

pub mod error;
pub mod llm;

pub use error::{AiError, Result};
pub use llm::{ChatBackend, Message, OllamaClient, OllamaConfig, Role, TokenStream};
