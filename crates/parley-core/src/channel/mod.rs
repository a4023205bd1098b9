//! Discord communication layer
//!
//! Inbound requests arrive over the Discord Gateway; replies leave through
//! the REST API. The generation session only sees two small capabilities:
//!
//! ```text
//! ┌──────────────────────────────┐     ┌──────────────────────────────┐
//! │        trait ReplySurface    │     │    trait PresenceIndicator   │
//! │  - send(text) -> handle      │     │  - set_presence(status)      │
//! │  - revise(handle, text)      │     └──────────────────────────────┘
//! └──────────────────────────────┘                  │
//!        │                  │                       ▼
//!        ▼                  ▼                DiscordChannel (op 3)
//!  ChannelReply      InteractionReply
//!  (prefix cmds)     (slash cmds)
//! ```
//!
//! Both surfaces are backed by [`DiscordChannel`], which also owns the
//! gateway connection and command registration.

pub mod chunk;
pub mod discord;
mod reply;
mod traits;
mod types;

pub use discord::{DiscordChannel, DiscordConfig};
pub use reply::{ChannelReply, InteractionReply};
pub use traits::{MessageHandle, PresenceIndicator, PresenceStatus, ReplySurface};
pub use types::{GatewayEvent, InboundInteraction, InboundMessage, Requester};

#[cfg(any(test, feature = "test-utils"))]
pub use traits::mock;
