//! Session configuration

use std::time::Duration;

/// Turns of history kept per conversation (one turn = user + assistant).
pub const DEFAULT_MAX_TURNS: usize = 8;
/// Idle time after which a conversation is forgotten.
pub const DEFAULT_MEMORY_EXPIRY: Duration = Duration::from_secs(60 * 60 * 24);
/// Discord's hard limit for message content.
pub const DEFAULT_MESSAGE_LIMIT: usize = 2000;
/// Minimum spacing between live revisions of the placeholder.
pub const DEFAULT_REVISION_INTERVAL: Duration = Duration::from_millis(600);

/// Constants and user-facing notices for generation sessions.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub max_turns: usize,
    pub memory_expiry: Duration,
    pub message_limit: usize,
    pub revision_interval: Duration,
    /// Placeholder sent before the first increment arrives.
    pub placeholder_message: String,
    /// Notice for a request hitting a persona that is already generating.
    pub busy_message: String,
    /// Notice for a whitespace-only reply.
    pub empty_message: String,
    /// Prefix of the notice shown when the backend fails.
    pub error_prefix: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_turns: DEFAULT_MAX_TURNS,
            memory_expiry: DEFAULT_MEMORY_EXPIRY,
            message_limit: DEFAULT_MESSAGE_LIMIT,
            revision_interval: DEFAULT_REVISION_INTERVAL,
            placeholder_message: "Hmmm... let me think about that...".to_string(),
            busy_message: "I'm currently already thinking right now, give me a second and I'll get back to you.".to_string(),
            empty_message: "The model returned no output.".to_string(),
            error_prefix: "Something went wrong while communicating with the model backend"
                .to_string(),
        }
    }
}
