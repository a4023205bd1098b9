//! Reply surfaces backed by the Discord REST API.

use std::sync::Arc;

use async_trait::async_trait;

use super::discord::DiscordChannel;
use super::traits::{MessageHandle, ReplySurface};
use crate::error::TransportError;

/// Replies posted as plain messages in the channel a prefix command came from.
#[derive(Clone)]
pub struct ChannelReply {
    discord: Arc<DiscordChannel>,
    channel_id: String,
}

impl ChannelReply {
    pub fn new(discord: Arc<DiscordChannel>, channel_id: impl Into<String>) -> Self {
        Self {
            discord,
            channel_id: channel_id.into(),
        }
    }
}

#[async_trait]
impl ReplySurface for ChannelReply {
    async fn send(&self, content: &str) -> Result<MessageHandle, TransportError> {
        self.discord.create_message(&self.channel_id, content).await
    }

    async fn revise(&self, handle: &MessageHandle, content: &str) -> Result<(), TransportError> {
        self.discord
            .edit_message(&handle.channel_id, &handle.message_id, content)
            .await
    }
}

/// Replies posted as follow-ups to a deferred slash command.
///
/// The interaction must already be deferred; follow-ups are accepted for
/// fifteen minutes after the command was invoked.
#[derive(Clone)]
pub struct InteractionReply {
    discord: Arc<DiscordChannel>,
    application_id: String,
    token: String,
}

impl InteractionReply {
    pub fn new(
        discord: Arc<DiscordChannel>,
        application_id: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        Self {
            discord,
            application_id: application_id.into(),
            token: token.into(),
        }
    }
}

#[async_trait]
impl ReplySurface for InteractionReply {
    async fn send(&self, content: &str) -> Result<MessageHandle, TransportError> {
        self.discord
            .create_followup(&self.application_id, &self.token, content)
            .await
    }

    async fn revise(&self, handle: &MessageHandle, content: &str) -> Result<(), TransportError> {
        self.discord
            .edit_followup(&self.application_id, &self.token, &handle.message_id, content)
            .await
    }
}
