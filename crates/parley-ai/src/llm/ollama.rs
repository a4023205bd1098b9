//! Ollama chat client
//!
//! Streams `/api/chat` responses. The request carries no overall timeout:
//! generations are long-lived and only end when the backend says so or the
//! transport fails.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use tracing::debug;

use super::client::{ChatBackend, ChatRequest, Message, TokenStream};
use super::decoder::decode_ndjson;
use crate::error::{AiError, Result};

const OLLAMA_CHAT_ENDPOINT: &str = "/api/chat";
const PROVIDER: &str = "Ollama";

/// Truncation applied to error bodies to avoid echoing large responses.
const MAX_ERROR_BODY: usize = 512;

/// Ollama client configuration
#[derive(Debug, Clone)]
pub struct OllamaConfig {
    pub base_url: String,
    pub model: String,
    /// Bound on establishing the connection; the stream itself is unbounded.
    pub connect_timeout: Option<Duration>,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            model: "granite3-moe:1b".to_string(),
            connect_timeout: Some(Duration::from_secs(10)),
        }
    }
}

/// Streaming client for a local Ollama server
pub struct OllamaClient {
    client: Client,
    config: OllamaConfig,
}

impl OllamaClient {
    pub fn new(config: OllamaConfig) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.connect_timeout {
            builder = builder.connect_timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
            config,
        })
    }

    fn chat_url(&self) -> String {
        format!(
            "{}{}",
            self.config.base_url.trim_end_matches('/'),
            OLLAMA_CHAT_ENDPOINT
        )
    }
}

async fn response_to_error(response: Response) -> AiError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    let message = match body.char_indices().nth(MAX_ERROR_BODY) {
        Some((cut, _)) => format!("{}... [truncated]", &body[..cut]),
        None => body,
    };

    AiError::BackendUnavailable {
        provider: PROVIDER.to_string(),
        status,
        message: message.trim().to_string(),
    }
}

#[async_trait]
impl ChatBackend for OllamaClient {
    fn provider(&self) -> &str {
        PROVIDER
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    async fn stream_chat(&self, messages: Vec<Message>) -> Result<TokenStream> {
        let request = ChatRequest {
            model: &self.config.model,
            messages: &messages,
            stream: true,
        };

        debug!(
            "Opening {} chat stream (model={}, messages={})",
            PROVIDER,
            self.config.model,
            messages.len()
        );

        let response = self.client.post(self.chat_url()).json(&request).send().await?;

        if !response.status().is_success() {
            return Err(response_to_error(response).await);
        }

        Ok(decode_ndjson(response.bytes_stream()))
    }
}
