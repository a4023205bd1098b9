//! Parley core
//!
//! Generation session management for the Parley Discord bot: bounded,
//! expiring conversation memory, per-persona single-flight generation,
//! rate-limited progressive publishing and the Discord channel plumbing
//! that carries requests in and replies out.

pub mod channel;
pub mod config;
pub mod error;
pub mod memory;
pub mod prompts;
pub mod runtime;
pub mod session;

pub use config::SessionConfig;
pub use error::{GenerationError, PromptError, TransportError};
pub use memory::{ConversationKey, MemoryStore};
pub use prompts::{PersonaPrompts, PromptLibrary};
pub use session::{GenerationCoordinator, GenerationOutcome, GenerationRequest, SessionState};
