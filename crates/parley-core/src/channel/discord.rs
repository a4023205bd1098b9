//! Discord channel implementation.
//!
//! Uses the Discord Gateway WebSocket for receiving events and presence
//! updates, and the REST API for messages, interaction responses and
//! command registration.

use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::SinkExt;
use futures::stream::StreamExt;
use parking_lot::Mutex;
use reqwest::{Client, Method, StatusCode};
use serde_json::{Value, json};
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tracing::{debug, error, info, warn};

use super::traits::{MessageHandle, PresenceIndicator, PresenceStatus};
use super::types::GatewayEvent;
use crate::error::TransportError;

pub const DISCORD_API_BASE: &str = "https://discord.com/api/v10";

/// Intents: GUILDS (1) | GUILD_MESSAGES (512) | DIRECT_MESSAGES (4096) | MESSAGE_CONTENT (32768)
const GATEWAY_INTENTS: u64 = 1 | 512 | 4096 | 32768;

const DEFAULT_HEARTBEAT_MS: u64 = 41250;

/// Interaction callback: deferred channel message with source.
const DEFERRED_CHANNEL_MESSAGE: u64 = 5;
/// Interaction callback: channel message with source.
const CHANNEL_MESSAGE: u64 = 4;
/// Message flag: only the invoking user sees the reply.
const EPHEMERAL_FLAG: u64 = 64;

/// Discord channel configuration.
#[derive(Debug, Clone)]
pub struct DiscordConfig {
    pub bot_token: String,
    /// REST base URL; overridable for tests.
    pub api_base: String,
}

impl DiscordConfig {
    pub fn new(bot_token: impl Into<String>) -> Self {
        Self {
            bot_token: bot_token.into(),
            api_base: DISCORD_API_BASE.to_string(),
        }
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }
}

type GatewaySender = mpsc::UnboundedSender<String>;

/// Discord channel that receives via Gateway WebSocket and sends via REST API.
pub struct DiscordChannel {
    config: DiscordConfig,
    client: Client,
    polling: Arc<AtomicBool>,
    /// Outbound gateway frames; `None` while disconnected.
    gateway_tx: Arc<Mutex<Option<GatewaySender>>>,
}

impl DiscordChannel {
    pub fn new(config: DiscordConfig) -> Self {
        Self {
            config,
            client: Client::new(),
            polling: Arc::new(AtomicBool::new(false)),
            gateway_tx: Arc::new(Mutex::new(None)),
        }
    }

    /// Whether a gateway connection is currently running.
    pub fn is_polling(&self) -> bool {
        self.polling.load(Ordering::SeqCst)
    }

    /// Ask the running gateway loop to stop after its next frame.
    pub fn stop_polling(&self) {
        self.polling.store(false, Ordering::SeqCst);
    }

    // ------------------------------------------------------------------
    // REST
    // ------------------------------------------------------------------

    async fn request(
        &self,
        method: Method,
        path: &str,
        action: &'static str,
        body: Option<&Value>,
    ) -> Result<Value, TransportError> {
        let mut request = self
            .client
            .request(method, format!("{}{}", self.config.api_base, path))
            .header("Authorization", format!("Bot {}", self.config.bot_token));
        if let Some(body) = body {
            request = request.json(body);
        }

        let resp = request.send().await?;
        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            warn!("Discord {} failed ({}): {}", action, status, message);
            return Err(TransportError::Api {
                action,
                status: status.as_u16(),
                message,
            });
        }

        if status == StatusCode::NO_CONTENT {
            return Ok(Value::Null);
        }
        let text = resp.text().await?;
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text).map_err(|e| TransportError::InvalidResponse(e.to_string()))
    }

    /// Post a new message to a channel.
    pub async fn create_message(
        &self,
        channel_id: &str,
        content: &str,
    ) -> Result<MessageHandle, TransportError> {
        let body = json!({ "content": content });
        let message = self
            .request(
                Method::POST,
                &format!("/channels/{}/messages", channel_id),
                "create message",
                Some(&body),
            )
            .await?;
        message_handle(&message, channel_id)
    }

    /// Replace the content of a channel message.
    pub async fn edit_message(
        &self,
        channel_id: &str,
        message_id: &str,
        content: &str,
    ) -> Result<(), TransportError> {
        let body = json!({ "content": content });
        self.request(
            Method::PATCH,
            &format!("/channels/{}/messages/{}", channel_id, message_id),
            "edit message",
            Some(&body),
        )
        .await?;
        Ok(())
    }

    /// Acknowledge an interaction now and answer it later with follow-ups.
    pub async fn defer_interaction(
        &self,
        interaction_id: &str,
        token: &str,
    ) -> Result<(), TransportError> {
        let body = json!({ "type": DEFERRED_CHANNEL_MESSAGE });
        self.request(
            Method::POST,
            &format!("/interactions/{}/{}/callback", interaction_id, token),
            "defer interaction",
            Some(&body),
        )
        .await?;
        Ok(())
    }

    /// Answer an interaction with a message only the invoking user sees.
    pub async fn reply_ephemeral(
        &self,
        interaction_id: &str,
        token: &str,
        content: &str,
    ) -> Result<(), TransportError> {
        let body = json!({
            "type": CHANNEL_MESSAGE,
            "data": { "content": content, "flags": EPHEMERAL_FLAG }
        });
        self.request(
            Method::POST,
            &format!("/interactions/{}/{}/callback", interaction_id, token),
            "reply to interaction",
            Some(&body),
        )
        .await?;
        Ok(())
    }

    /// Send a follow-up message for a deferred interaction.
    pub async fn create_followup(
        &self,
        application_id: &str,
        token: &str,
        content: &str,
    ) -> Result<MessageHandle, TransportError> {
        let body = json!({ "content": content });
        let message = self
            .request(
                Method::POST,
                &format!("/webhooks/{}/{}", application_id, token),
                "create follow-up",
                Some(&body),
            )
            .await?;
        message_handle(&message, "")
    }

    /// Replace the content of a follow-up message.
    pub async fn edit_followup(
        &self,
        application_id: &str,
        token: &str,
        message_id: &str,
        content: &str,
    ) -> Result<(), TransportError> {
        let body = json!({ "content": content });
        self.request(
            Method::PATCH,
            &format!("/webhooks/{}/{}/messages/{}", application_id, token, message_id),
            "edit follow-up",
            Some(&body),
        )
        .await?;
        Ok(())
    }

    /// Overwrite the application's slash commands.
    ///
    /// Registers per guild when `guild_id` is set (visible immediately),
    /// globally otherwise (may take up to an hour to propagate).
    pub async fn register_commands(
        &self,
        application_id: &str,
        guild_id: Option<&str>,
        commands: &[Value],
    ) -> Result<usize, TransportError> {
        let path = match guild_id {
            Some(guild) => format!("/applications/{}/guilds/{}/commands", application_id, guild),
            None => format!("/applications/{}/commands", application_id),
        };
        let body = Value::Array(commands.to_vec());
        let registered = self
            .request(Method::PUT, &path, "register commands", Some(&body))
            .await?;
        Ok(registered.as_array().map_or(0, Vec::len))
    }

    // ------------------------------------------------------------------
    // Gateway
    // ------------------------------------------------------------------

    fn send_gateway(&self, payload: Value) -> Result<(), TransportError> {
        let guard = self.gateway_tx.lock();
        let Some(tx) = guard.as_ref() else {
            return Err(TransportError::Gateway("not connected".to_string()));
        };
        tx.send(payload.to_string())
            .map_err(|_| TransportError::Gateway("connection closed".to_string()))
    }

    /// Start the Gateway WebSocket connection and return an event stream.
    ///
    /// Returns `None` if a connection is already running. The stream ends
    /// when the connection drops; callers reconnect by calling this again.
    pub fn start_receiving(
        &self,
    ) -> Option<Pin<Box<dyn tokio_stream::Stream<Item = GatewayEvent> + Send>>> {
        let token = self.config.bot_token.clone();
        let api_base = self.config.api_base.clone();
        let client = self.client.clone();
        let polling = self.polling.clone();
        let gateway_tx = self.gateway_tx.clone();

        if polling.swap(true, Ordering::SeqCst) {
            warn!("Discord gateway already running");
            return None;
        }

        let (tx, rx) = mpsc::channel::<GatewayEvent>(256);

        tokio::spawn(async move {
            let _guard = scopeguard::guard((), |_| {
                polling.store(false, Ordering::SeqCst);
            });

            // Get gateway URL
            let gateway_url = match Self::fetch_gateway_url(&client, &api_base, &token).await {
                Ok(url) => url,
                Err(e) => {
                    error!("Failed to get Discord gateway URL: {}", e);
                    return;
                }
            };

            info!("Connecting to Discord Gateway: {}", gateway_url);

            let ws_stream = match tokio_tungstenite::connect_async(&gateway_url).await {
                Ok((stream, _)) => stream,
                Err(e) => {
                    error!("Failed to connect to Discord Gateway: {}", e);
                    return;
                }
            };

            let (mut ws_write, mut ws_read) = ws_stream.split();

            // Read Hello (opcode 10) to get heartbeat interval
            let heartbeat_interval = match ws_read.next().await {
                Some(Ok(msg)) => {
                    let text = msg.to_text().unwrap_or("{}");
                    let payload: Value = serde_json::from_str(text).unwrap_or_default();
                    if payload["op"].as_u64() == Some(10) {
                        payload["d"]["heartbeat_interval"]
                            .as_u64()
                            .unwrap_or(DEFAULT_HEARTBEAT_MS)
                    } else {
                        warn!("Expected Hello (op 10), got: {}", text);
                        DEFAULT_HEARTBEAT_MS
                    }
                }
                _ => {
                    error!("No Hello from Discord Gateway");
                    return;
                }
            };

            debug!("Discord heartbeat interval: {}ms", heartbeat_interval);

            // Single writer task; everything else sends frames through the queue.
            let (out_tx, mut out_rx) = mpsc::unbounded_channel::<String>();
            let writer = tokio::spawn(async move {
                while let Some(frame) = out_rx.recv().await {
                    if let Err(e) = ws_write.send(WsMessage::Text(frame.into())).await {
                        warn!("Discord gateway write failed: {}", e);
                        break;
                    }
                }
            });

            if out_tx.send(identify_payload(&token).to_string()).is_err() {
                error!("Failed to queue Identify");
                writer.abort();
                return;
            }
            *gateway_tx.lock() = Some(out_tx.clone());

            let sequence = Arc::new(AtomicI64::new(-1));

            // Spawn heartbeat task
            let hb_tx = out_tx.clone();
            let hb_sequence = sequence.clone();
            let heartbeat = tokio::spawn(async move {
                let mut interval =
                    tokio::time::interval(std::time::Duration::from_millis(heartbeat_interval));
                interval.tick().await;
                loop {
                    interval.tick().await;
                    if !send_heartbeat(&hb_tx, &hb_sequence) {
                        break;
                    }
                }
            });

            // Read events
            while let Some(msg_result) = ws_read.next().await {
                if !polling.load(Ordering::SeqCst) {
                    break;
                }

                let msg = match msg_result {
                    Ok(m) => m,
                    Err(e) => {
                        warn!("Discord WebSocket error: {}", e);
                        break;
                    }
                };

                let text = match msg.to_text() {
                    Ok(t) => t,
                    Err(_) => continue,
                };

                let payload: Value = match serde_json::from_str(text) {
                    Ok(v) => v,
                    Err(_) => continue,
                };

                if let Some(seq) = payload["s"].as_i64() {
                    sequence.store(seq, Ordering::SeqCst);
                }

                match payload["op"].as_u64() {
                    Some(0) => {
                        let kind = payload["t"].as_str().unwrap_or("");
                        let Some(event) = GatewayEvent::from_dispatch(kind, &payload["d"]) else {
                            continue;
                        };
                        if tx.send(event).await.is_err() {
                            debug!("Discord event channel closed");
                            break;
                        }
                    }
                    Some(1) => {
                        if !send_heartbeat(&out_tx, &sequence) {
                            break;
                        }
                    }
                    Some(7) | Some(9) => {
                        warn!(
                            "Discord asked to reconnect (op {})",
                            payload["op"].as_u64().unwrap_or_default()
                        );
                        break;
                    }
                    _ => {}
                }
            }

            *gateway_tx.lock() = None;
            heartbeat.abort();
            writer.abort();
            info!("Discord gateway connection ended");
        });

        Some(Box::pin(tokio_stream::wrappers::ReceiverStream::new(rx)))
    }

    async fn fetch_gateway_url(client: &Client, api_base: &str, token: &str) -> Result<String> {
        let resp = client
            .get(format!("{}/gateway/bot", api_base))
            .header("Authorization", format!("Bot {}", token))
            .send()
            .await
            .context("Failed to get Discord gateway URL")?;

        let body: Value = resp.json().await?;
        let url = body["url"]
            .as_str()
            .context("Missing 'url' in gateway response")?;
        Ok(format!("{}/?v=10&encoding=json", url))
    }
}

#[async_trait]
impl PresenceIndicator for DiscordChannel {
    async fn set_presence(&self, status: PresenceStatus) -> Result<(), TransportError> {
        debug!("Setting Discord presence to {}", status.as_discord_status());
        self.send_gateway(presence_payload(status))
    }
}

fn message_handle(message: &Value, fallback_channel: &str) -> Result<MessageHandle, TransportError> {
    let message_id = message["id"]
        .as_str()
        .ok_or_else(|| TransportError::InvalidResponse("message without id".to_string()))?;
    let channel_id = message["channel_id"].as_str().unwrap_or(fallback_channel);
    Ok(MessageHandle::new(channel_id, message_id))
}

fn presence_body(status: PresenceStatus) -> Value {
    json!({
        "since": null,
        "activities": [],
        "status": status.as_discord_status(),
        "afk": false
    })
}

fn presence_payload(status: PresenceStatus) -> Value {
    json!({ "op": 3, "d": presence_body(status) })
}

fn identify_payload(token: &str) -> Value {
    json!({
        "op": 2,
        "d": {
            "token": token,
            "intents": GATEWAY_INTENTS,
            "properties": {
                "os": std::env::consts::OS,
                "browser": "parley",
                "device": "parley"
            },
            "presence": presence_body(PresenceStatus::Idle)
        }
    })
}

/// Queue a heartbeat. Returns false once the gateway writer has gone away.
fn send_heartbeat(tx: &GatewaySender, sequence: &AtomicI64) -> bool {
    if tx.send(heartbeat_payload(sequence).to_string()).is_err() {
        warn!("Discord heartbeat failed: gateway writer closed");
        return false;
    }
    true
}

fn heartbeat_payload(sequence: &AtomicI64) -> Value {
    let seq = sequence.load(Ordering::SeqCst);
    if seq < 0 {
        json!({ "op": 1, "d": null })
    } else {
        json!({ "op": 1, "d": seq })
    }
}
