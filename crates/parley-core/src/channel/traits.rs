//! Reply and presence capabilities

use async_trait::async_trait;

use crate::error::TransportError;

/// Reference to a message that can be revised later.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MessageHandle {
    pub channel_id: String,
    pub message_id: String,
}

impl MessageHandle {
    pub fn new(channel_id: impl Into<String>, message_id: impl Into<String>) -> Self {
        Self {
            channel_id: channel_id.into(),
            message_id: message_id.into(),
        }
    }
}

/// Where a generation publishes its output.
///
/// Implementations exist per entry surface: plain channel messages for
/// prefix commands, interaction follow-ups for slash commands.
#[async_trait]
pub trait ReplySurface: Send + Sync {
    /// Send a new message and return a handle to it.
    async fn send(&self, content: &str) -> Result<MessageHandle, TransportError>;

    /// Replace the content of a message sent earlier.
    async fn revise(&self, handle: &MessageHandle, content: &str) -> Result<(), TransportError>;
}

/// Bot-wide presence shown while any persona is generating.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresenceStatus {
    /// At least one generation is streaming.
    Busy,
    /// Nothing is generating.
    Idle,
}

impl PresenceStatus {
    /// Discord status string for gateway presence updates.
    pub fn as_discord_status(&self) -> &'static str {
        match self {
            Self::Busy => "online",
            Self::Idle => "idle",
        }
    }
}

/// Sets the bot-wide presence indicator.
#[async_trait]
pub trait PresenceIndicator: Send + Sync {
    async fn set_presence(&self, status: PresenceStatus) -> Result<(), TransportError>;
}

/// In-memory fakes for testing
#[cfg(any(test, feature = "test-utils"))]
pub mod mock {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// One recorded call on a [`MockSurface`].
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum SurfaceEvent {
        Sent { message_id: String, content: String },
        Revised { message_id: String, content: String },
    }

    /// Records every send and revision; can be told to fail.
    #[derive(Default)]
    pub struct MockSurface {
        events: Mutex<Vec<SurfaceEvent>>,
        next_id: AtomicUsize,
        fail_revisions: Mutex<bool>,
    }

    impl MockSurface {
        pub fn new() -> Self {
            Self::default()
        }

        /// Make every subsequent `revise` fail.
        pub fn fail_revisions(&self) {
            *self.fail_revisions.lock() = true;
        }

        pub fn events(&self) -> Vec<SurfaceEvent> {
            self.events.lock().clone()
        }

        /// Contents of all newly sent messages, in order.
        pub fn sent(&self) -> Vec<String> {
            self.events
                .lock()
                .iter()
                .filter_map(|event| match event {
                    SurfaceEvent::Sent { content, .. } => Some(content.clone()),
                    SurfaceEvent::Revised { .. } => None,
                })
                .collect()
        }

        /// Contents of all revisions, in order.
        pub fn revisions(&self) -> Vec<String> {
            self.events
                .lock()
                .iter()
                .filter_map(|event| match event {
                    SurfaceEvent::Revised { content, .. } => Some(content.clone()),
                    SurfaceEvent::Sent { .. } => None,
                })
                .collect()
        }

        /// Current content of a message after all revisions.
        pub fn current_content(&self, message_id: &str) -> Option<String> {
            self.events
                .lock()
                .iter()
                .filter_map(|event| match event {
                    SurfaceEvent::Sent { message_id: id, content }
                    | SurfaceEvent::Revised { message_id: id, content }
                        if id == message_id =>
                    {
                        Some(content.clone())
                    }
                    _ => None,
                })
                .last()
        }
    }

    #[async_trait]
    impl ReplySurface for MockSurface {
        async fn send(&self, content: &str) -> Result<MessageHandle, TransportError> {
            let message_id = format!("msg-{}", self.next_id.fetch_add(1, Ordering::SeqCst));
            self.events.lock().push(SurfaceEvent::Sent {
                message_id: message_id.clone(),
                content: content.to_string(),
            });
            Ok(MessageHandle::new("mock-channel", message_id))
        }

        async fn revise(&self, handle: &MessageHandle, content: &str) -> Result<(), TransportError> {
            if *self.fail_revisions.lock() {
                return Err(TransportError::Other("revision rejected".to_string()));
            }
            self.events.lock().push(SurfaceEvent::Revised {
                message_id: handle.message_id.clone(),
                content: content.to_string(),
            });
            Ok(())
        }
    }

    /// Records presence changes.
    #[derive(Default)]
    pub struct MockPresence {
        statuses: Mutex<Vec<PresenceStatus>>,
    }

    impl MockPresence {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn statuses(&self) -> Vec<PresenceStatus> {
            self.statuses.lock().clone()
        }

        pub fn last(&self) -> Option<PresenceStatus> {
            self.statuses.lock().last().copied()
        }
    }

    #[async_trait]
    impl PresenceIndicator for MockPresence {
        async fn set_presence(&self, status: PresenceStatus) -> Result<(), TransportError> {
            self.statuses.lock().push(status);
            Ok(())
        }
    }
}
