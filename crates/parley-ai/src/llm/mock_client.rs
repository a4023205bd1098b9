//! Scripted mock backend for coordinator and stress tests.

use std::collections::VecDeque;
use std::sync::Arc;

use async_stream::stream;
use async_trait::async_trait;
use tokio::sync::{Mutex, Notify};
use tokio::time::{Duration, sleep};

use super::client::{ChatBackend, Message, TokenStream};
use crate::error::{AiError, Result};

/// One scripted step of a mock stream.
#[derive(Debug, Clone)]
pub enum MockStep {
    /// Yield a text increment.
    Token(String),
    /// Pause before the next step.
    Delay(Duration),
    /// Block until the gate is notified.
    Gate(Arc<Notify>),
    /// Yield a transport error and end the stream.
    Fail(String),
}

/// Scripted reply for a single `stream_chat` call.
#[derive(Debug, Clone, Default)]
pub struct MockScript {
    unavailable: Option<u16>,
    steps: Vec<MockStep>,
}

impl MockScript {
    /// A reply streaming the given increments, then done.
    pub fn tokens<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            unavailable: None,
            steps: tokens
                .into_iter()
                .map(|t| MockStep::Token(t.into()))
                .collect(),
        }
    }

    /// A request rejected with the given HTTP status.
    pub fn unavailable(status: u16) -> Self {
        Self {
            unavailable: Some(status),
            steps: Vec::new(),
        }
    }

    /// Hold the stream open at the current position until `gate` fires.
    pub fn then_wait(mut self, gate: Arc<Notify>) -> Self {
        self.steps.push(MockStep::Gate(gate));
        self
    }

    pub fn then_delay(mut self, delay: Duration) -> Self {
        self.steps.push(MockStep::Delay(delay));
        self
    }

    pub fn then_tokens<I, S>(mut self, tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.steps
            .extend(tokens.into_iter().map(|t| MockStep::Token(t.into())));
        self
    }

    pub fn then_fail(mut self, message: impl Into<String>) -> Self {
        self.steps.push(MockStep::Fail(message.into()));
        self
    }
}

/// Deterministic backend replaying scripts in order.
///
/// Calls beyond the scripted ones stream nothing and end immediately.
#[derive(Default)]
pub struct MockBackend {
    scripts: Mutex<VecDeque<MockScript>>,
    requests: Mutex<Vec<Vec<Message>>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_scripts(scripts: impl IntoIterator<Item = MockScript>) -> Self {
        Self {
            scripts: Mutex::new(scripts.into_iter().collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Message lists received so far, in call order.
    pub async fn requests(&self) -> Vec<Vec<Message>> {
        self.requests.lock().await.clone()
    }
}

#[async_trait]
impl ChatBackend for MockBackend {
    fn provider(&self) -> &str {
        "mock"
    }

    fn model(&self) -> &str {
        "mock-model"
    }

    async fn stream_chat(&self, messages: Vec<Message>) -> Result<TokenStream> {
        self.requests.lock().await.push(messages);
        let script = self.scripts.lock().await.pop_front().unwrap_or_default();

        if let Some(status) = script.unavailable {
            return Err(AiError::BackendUnavailable {
                provider: "mock".to_string(),
                status,
                message: String::new(),
            });
        }

        Ok(Box::pin(stream! {
            for step in script.steps {
                match step {
                    MockStep::Token(text) => {
                        yield Ok(text);
                    }
                    MockStep::Delay(delay) => sleep(delay).await,
                    MockStep::Gate(gate) => gate.notified().await,
                    MockStep::Fail(message) => {
                        yield Err(AiError::Stream(message));
                        return;
                    }
                }
            }
        }))
    }
}
