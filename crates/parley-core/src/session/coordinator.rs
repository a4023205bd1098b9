//! Generation coordinator
//!
//! Runs one request from arrival to final output: memory bookkeeping,
//! single-flight per persona, streaming, progressive publishing and the
//! memory commit.

use std::sync::Arc;

use futures::StreamExt;
use parley_ai::{ChatBackend, Message};
use tracing::{debug, info, warn};

use super::publisher::ProgressPublisher;
use super::state::SessionState;
use crate::channel::{PresenceIndicator, PresenceStatus, ReplySurface, Requester};
use crate::config::SessionConfig;
use crate::error::{GenerationError, TransportError};
use crate::memory::ConversationKey;
use crate::prompts::PersonaPrompts;

/// One request to talk to a persona.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub requester: Requester,
    pub persona: String,
    pub text: String,
}

impl GenerationRequest {
    pub fn new(requester: Requester, persona: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            requester,
            persona: persona.into(),
            text: text.into(),
        }
    }

    fn key(&self) -> ConversationKey {
        ConversationKey::new(&self.requester.id, &self.persona)
    }
}

/// How a handled request ended. Every variant leaves the persona idle.
#[derive(Debug)]
pub enum GenerationOutcome {
    /// Reply committed to memory and delivered.
    Completed { reply: String, segments: usize },
    /// The persona was already generating; a busy notice was sent.
    Busy,
    /// Reported to the requester; memory untouched.
    Rejected(GenerationError),
}

/// Orchestrates generations against a chat backend.
pub struct GenerationCoordinator {
    state: Arc<SessionState>,
    backend: Arc<dyn ChatBackend>,
    prompts: Arc<dyn PersonaPrompts>,
    presence: Arc<dyn PresenceIndicator>,
    config: SessionConfig,
}

impl GenerationCoordinator {
    pub fn new(
        state: Arc<SessionState>,
        backend: Arc<dyn ChatBackend>,
        prompts: Arc<dyn PersonaPrompts>,
        presence: Arc<dyn PresenceIndicator>,
        config: SessionConfig,
    ) -> Self {
        Self {
            state,
            backend,
            prompts,
            presence,
            config,
        }
    }

    pub fn state(&self) -> &Arc<SessionState> {
        &self.state
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Forget every conversation of `identity`. Returns how many were cleared.
    pub fn clear_memory(&self, identity: &str) -> usize {
        let cleared = self.state.memory().clear_all(identity);
        info!("Cleared {} conversation(s) for user {}", cleared, identity);
        cleared
    }

    /// Handle one request, publishing through `surface`.
    ///
    /// Recoverable failures are reported to the requester and returned as
    /// [`GenerationOutcome::Rejected`]. Only transport failures of `surface`
    /// are returned as errors; the persona is idle again either way.
    pub async fn handle(
        &self,
        request: &GenerationRequest,
        surface: &dyn ReplySurface,
    ) -> Result<GenerationOutcome, TransportError> {
        let key = request.key();
        self.state.memory().touch(&key);

        let persona_prompt = match self.prompts.persona_prompt(&request.persona) {
            Ok(prompt) => prompt,
            Err(e) => {
                let err = GenerationError::from(e);
                let notice = match &err {
                    GenerationError::PersonaNotFound(_) => err.to_string(),
                    other => {
                        warn!("Failed to load persona '{}': {}", request.persona, other);
                        self.error_notice(other)
                    }
                };
                surface.send(&notice).await?;
                return Ok(GenerationOutcome::Rejected(err));
            }
        };

        // Single flight is per persona, not per conversation: while one user
        // talks to a persona, everyone else asking that persona is turned away.
        let lock = self.state.persona_lock(&request.persona);
        let Ok(_persona_guard) = lock.try_lock_owned() else {
            return self.reject_busy(request, surface).await;
        };
        if self.state.is_generating(&request.persona) {
            return self.reject_busy(request, surface).await;
        }

        let mut context = Vec::new();
        context.push(Message::system(system_prompt(
            self.prompts.base_prompt(),
            &persona_prompt,
        )));
        context.extend(self.state.memory().get(&key));
        context.push(Message::user(annotated_request(&request.requester, &request.text)));

        self.state.set_generating(&request.persona, true);
        let flag = scopeguard::guard((), |_| {
            self.state.set_generating(&request.persona, false);
        });
        self.update_presence(PresenceStatus::Busy).await;

        let result = self.generate(request, &key, context, surface).await;

        drop(flag);
        if !self.state.any_generating() {
            self.update_presence(PresenceStatus::Idle).await;
        }
        result
    }

    async fn generate(
        &self,
        request: &GenerationRequest,
        key: &ConversationKey,
        context: Vec<Message>,
        surface: &dyn ReplySurface,
    ) -> Result<GenerationOutcome, TransportError> {
        let mut publisher = ProgressPublisher::start(
            surface,
            &self.config.placeholder_message,
            self.config.message_limit,
            self.config.revision_interval,
        )
        .await?;

        debug!(
            "Generating for {} as '{}' ({} context messages, model {})",
            request.requester.id,
            request.persona,
            context.len(),
            self.backend.model()
        );

        let mut stream = match self.backend.stream_chat(context).await {
            Ok(stream) => stream,
            Err(e) => return self.fail(&publisher, e.into()).await,
        };

        let mut reply = String::new();
        while let Some(increment) = stream.next().await {
            match increment {
                Ok(text) => {
                    reply.push_str(&text);
                    publisher.on_update(&reply).await?;
                }
                Err(e) => return self.fail(&publisher, e.into()).await,
            }
        }

        if reply.trim().is_empty() {
            publisher.replace(&self.config.empty_message).await?;
            return Ok(GenerationOutcome::Rejected(GenerationError::EmptyResult));
        }

        self.state.memory().append(
            key,
            Message::user(&request.text),
            Message::assistant(&reply),
        );
        let segments = publisher.deliver(&reply).await?;

        info!(
            "Completed '{}' reply for {} ({} chars, {} segment(s))",
            request.persona,
            request.requester.id,
            reply.chars().count(),
            segments
        );
        Ok(GenerationOutcome::Completed { reply, segments })
    }

    async fn fail(
        &self,
        publisher: &ProgressPublisher<'_>,
        err: GenerationError,
    ) -> Result<GenerationOutcome, TransportError> {
        warn!("Generation failed: {}", err);
        publisher.replace(&self.error_notice(&err)).await?;
        Ok(GenerationOutcome::Rejected(err))
    }

    /// Busy rejections are an expected outcome, not a failure.
    async fn reject_busy(
        &self,
        request: &GenerationRequest,
        surface: &dyn ReplySurface,
    ) -> Result<GenerationOutcome, TransportError> {
        debug!("Persona '{}' is busy", request.persona);
        surface.send(&self.config.busy_message).await?;
        Ok(GenerationOutcome::Busy)
    }

    fn error_notice(&self, err: &GenerationError) -> String {
        format!("{}: {}", self.config.error_prefix, err)
    }

    async fn update_presence(&self, status: PresenceStatus) {
        if let Err(e) = self.presence.set_presence(status).await {
            warn!("Failed to set presence to {:?}: {}", status, e);
        }
    }
}

fn system_prompt(base: &str, persona: &str) -> String {
    format!(
        "---SYSTEM PROMPT---\n\n{}\n\n---CHARACTER INFORMATION---\n\n{}",
        base, persona
    )
}

/// User turn sent to the model; names the requester and how to ping them.
fn annotated_request(requester: &Requester, text: &str) -> String {
    format!(
        "{} (@{}) has asked: {}.\n\n(to ping the user, use {})",
        requester.display_name,
        requester.username,
        text,
        requester.mention()
    )
}
