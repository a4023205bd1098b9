//! Gateway event handler
//!
//! Drives the Discord gateway stream, registers commands once the session
//! is ready and dispatches every request onto its own task.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tokio_stream::StreamExt;
use tracing::{debug, error, info, warn};

use super::commands::{
    CLEAR_MEMORY_COMMAND, Command, clear_memory_reply, parse_prefix_command, slash_commands, usage,
};
use crate::channel::{
    ChannelReply, DiscordChannel, GatewayEvent, InboundInteraction, InboundMessage,
    InteractionReply,
};
use crate::session::{GenerationCoordinator, GenerationRequest};

#[cfg(test)]
const STREAM_RECONNECT_DELAY: Duration = Duration::from_millis(20);
#[cfg(not(test))]
const STREAM_RECONNECT_DELAY: Duration = Duration::from_secs(2);

pub const DEFAULT_COMMAND_PREFIX: &str = "!";

/// Bot configuration
#[derive(Debug, Clone)]
pub struct BotConfig {
    /// Prefix for text commands (default: "!")
    pub command_prefix: String,
    /// Register slash commands in this guild only; globally when unset.
    pub guild_id: Option<String>,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            command_prefix: DEFAULT_COMMAND_PREFIX.to_string(),
            guild_id: None,
        }
    }
}

/// Routes gateway events to the generation coordinator.
pub struct Bot {
    discord: Arc<DiscordChannel>,
    coordinator: Arc<GenerationCoordinator>,
    personas: Vec<String>,
    config: BotConfig,
    commands_registered: AtomicBool,
}

impl Bot {
    pub fn new(
        discord: Arc<DiscordChannel>,
        coordinator: Arc<GenerationCoordinator>,
        personas: Vec<String>,
        config: BotConfig,
    ) -> Self {
        Self {
            discord,
            coordinator,
            personas,
            config,
            commands_registered: AtomicBool::new(false),
        }
    }

    /// Listen on the gateway forever, reconnecting when the stream ends.
    pub async fn run(self: Arc<Self>) {
        info!(
            "Starting Discord handler ({} persona(s): {})",
            self.personas.len(),
            self.personas.join(", ")
        );

        loop {
            let Some(mut stream) = self.discord.start_receiving() else {
                warn!(
                    "Failed to start Discord gateway stream, retrying in {:?}",
                    STREAM_RECONNECT_DELAY
                );
                sleep(STREAM_RECONNECT_DELAY).await;
                continue;
            };

            while let Some(event) = stream.next().await {
                self.handle_event(event).await;
            }

            warn!(
                "Discord gateway stream ended, restarting in {:?}",
                STREAM_RECONNECT_DELAY
            );
            sleep(STREAM_RECONNECT_DELAY).await;
        }
    }

    /// Handle one gateway event.
    ///
    /// Requests are spawned onto their own task, whose handle is returned.
    pub async fn handle_event(self: &Arc<Self>, event: GatewayEvent) -> Option<JoinHandle<()>> {
        match event {
            GatewayEvent::Ready {
                application_id,
                bot_user,
            } => {
                info!("Logged in as {}", bot_user);
                if !self.commands_registered.swap(true, Ordering::SeqCst)
                    && let Err(e) = self.register_commands(&application_id).await
                {
                    error!("Failed to register slash commands: {:#}", e);
                    self.commands_registered.store(false, Ordering::SeqCst);
                }
                None
            }
            GatewayEvent::Message(message) => {
                if message.author_is_bot {
                    return None;
                }
                let command = parse_prefix_command(
                    &message.content,
                    &self.config.command_prefix,
                    &self.personas,
                )?;
                let bot = self.clone();
                Some(tokio::spawn(async move {
                    if let Err(e) = bot.on_command(&message, command).await {
                        error!("Error handling message {}: {:#}", message.id, e);
                    }
                }))
            }
            GatewayEvent::Interaction(interaction) => {
                let bot = self.clone();
                Some(tokio::spawn(async move {
                    if let Err(e) = bot.on_interaction(&interaction).await {
                        error!("Error handling interaction {}: {:#}", interaction.id, e);
                    }
                }))
            }
        }
    }

    async fn register_commands(&self, application_id: &str) -> Result<()> {
        let commands = slash_commands(&self.personas);
        let guild_id = self.config.guild_id.as_deref();
        let registered = self
            .discord
            .register_commands(application_id, guild_id, &commands)
            .await
            .context("Failed to register slash commands")?;

        match guild_id {
            Some(guild) => info!("Synced {} command(s) to guild {}", registered, guild),
            None => info!(
                "Synced {} command(s) globally (may take up to 1 hour)",
                registered
            ),
        }
        Ok(())
    }

    async fn on_command(&self, message: &InboundMessage, command: Command) -> Result<()> {
        debug!(
            "Command {:?} from {} in {}",
            command, message.author.id, message.channel_id
        );

        match command {
            Command::Persona { name, text } => {
                let surface = ChannelReply::new(self.discord.clone(), &message.channel_id);
                let request = GenerationRequest::new(message.author.clone(), name, text);
                self.coordinator
                    .handle(&request, &surface)
                    .await
                    .context("Failed to publish reply")?;
            }
            Command::MissingMessage { name } => {
                self.discord
                    .create_message(
                        &message.channel_id,
                        &usage(&self.config.command_prefix, &name),
                    )
                    .await?;
            }
            Command::ClearMemory => {
                let cleared = self.coordinator.clear_memory(&message.author.id);
                self.discord
                    .create_message(&message.channel_id, &clear_memory_reply(cleared))
                    .await?;
            }
        }
        Ok(())
    }

    async fn on_interaction(&self, interaction: &InboundInteraction) -> Result<()> {
        debug!(
            "Slash command /{} from {}",
            interaction.command, interaction.user.id
        );

        if interaction.command == CLEAR_MEMORY_COMMAND {
            let cleared = self.coordinator.clear_memory(&interaction.user.id);
            self.discord
                .reply_ephemeral(&interaction.id, &interaction.token, &clear_memory_reply(cleared))
                .await?;
            return Ok(());
        }

        if !self.personas.contains(&interaction.command) {
            self.discord
                .reply_ephemeral(
                    &interaction.id,
                    &interaction.token,
                    &format!("Character '{}' not found.", interaction.command),
                )
                .await?;
            return Ok(());
        }

        // Generations outlive the 3 second response window; answer with follow-ups.
        self.discord
            .defer_interaction(&interaction.id, &interaction.token)
            .await?;

        let text = interaction.message.as_deref().unwrap_or("").trim();
        if text.is_empty() {
            self.discord
                .create_followup(
                    &interaction.application_id,
                    &interaction.token,
                    &format!("Usage: `/{} message:<text>`", interaction.command),
                )
                .await?;
            return Ok(());
        }

        let surface = InteractionReply::new(
            self.discord.clone(),
            &interaction.application_id,
            &interaction.token,
        );
        let request =
            GenerationRequest::new(interaction.user.clone(), &interaction.command, text);
        self.coordinator
            .handle(&request, &surface)
            .await
            .context("Failed to publish reply")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::DiscordConfig;
    use crate::channel::mock::MockPresence;
    use crate::config::SessionConfig;
    use crate::prompts::PromptLibrary;
    use crate::session::SessionState;
    use parley_ai::llm::mock_client::MockBackend;

    fn bot() -> Arc<Bot> {
        let config = SessionConfig::default();
        let coordinator = Arc::new(GenerationCoordinator::new(
            Arc::new(SessionState::new(&config)),
            Arc::new(MockBackend::new()),
            Arc::new(PromptLibrary::with_base_prompt("base", "characters")),
            Arc::new(MockPresence::new()),
            config,
        ));
        // Unroutable API base: nothing here may reach the network.
        let discord = Arc::new(DiscordChannel::new(
            DiscordConfig::new("token").with_api_base("http://127.0.0.1:9"),
        ));
        Arc::new(Bot::new(
            discord,
            coordinator,
            vec!["sage".to_string()],
            BotConfig::default(),
        ))
    }

    fn message(content: &str, is_bot: bool) -> InboundMessage {
        InboundMessage {
            id: "m1".to_string(),
            channel_id: "c1".to_string(),
            guild_id: None,
            author: crate::channel::Requester::new("42", "ada", "Ada"),
            author_is_bot: is_bot,
            content: content.to_string(),
        }
    }

    #[tokio::test]
    async fn test_bot_messages_are_ignored() {
        let bot = bot();
        let handle = bot
            .handle_event(GatewayEvent::Message(message("!sage hi", true)))
            .await;
        assert!(handle.is_none());
    }

    #[tokio::test]
    async fn test_plain_chatter_is_ignored() {
        let bot = bot();
        let handle = bot
            .handle_event(GatewayEvent::Message(message("good morning", false)))
            .await;
        assert!(handle.is_none());
    }

    #[tokio::test]
    async fn test_commands_are_dispatched_on_tasks() {
        let bot = bot();
        let handle = bot
            .handle_event(GatewayEvent::Message(message("!clearmemory", false)))
            .await;
        // The reply fails against the unroutable API; the task still finishes.
        handle.unwrap().await.unwrap();
    }

    #[test]
    fn test_default_config() {
        let config = BotConfig::default();
        assert_eq!(config.command_prefix, "!");
        assert!(config.guild_id.is_none());
    }
}
