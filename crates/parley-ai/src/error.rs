//! Error types for the backend client

use thiserror::Error;

/// Backend error types
#[derive(Error, Debug)]
pub enum AiError {
    /// The backend answered with a non-success status before streaming.
    #[error("{provider} HTTP {status}{}", format_detail(.message))]
    BackendUnavailable {
        provider: String,
        status: u16,
        message: String,
    },

    /// A line of the stream could not be parsed as a chat event.
    #[error("Invalid stream event: {0}")]
    Decode(String),

    /// The transport failed while the stream was being read.
    #[error("Stream error: {0}")]
    Stream(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

fn format_detail(message: &str) -> String {
    if message.is_empty() {
        String::new()
    } else {
        format!(": {}", message)
    }
}

/// Result type alias for backend operations
pub type Result<T> = std::result::Result<T, AiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_unavailable_display() {
        let err = AiError::BackendUnavailable {
            provider: "Ollama".to_string(),
            status: 503,
            message: String::new(),
        };
        assert_eq!(err.to_string(), "Ollama HTTP 503");

        let err = AiError::BackendUnavailable {
            provider: "Ollama".to_string(),
            status: 404,
            message: "model not found".to_string(),
        };
        assert_eq!(err.to_string(), "Ollama HTTP 404: model not found");
    }
}
