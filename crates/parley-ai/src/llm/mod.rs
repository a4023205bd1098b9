//! LLM module - streaming chat backends

mod client;
pub mod decoder;
#[cfg(any(test, feature = "test-utils"))]
pub mod mock_client;
mod ollama;

pub use client::{ChatBackend, ChatRequest, Message, Role, TokenStream};
pub use decoder::{ChatStreamEvent, NdjsonDecoder, decode_ndjson};
pub use ollama::{OllamaClient, OllamaConfig};
