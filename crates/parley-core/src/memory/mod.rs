//! Short-lived conversation memory.
//!
//! History is kept per (identity, persona) pair, bounded to a fixed number
//! of turns and forgotten after a period of inactivity. Expiry is lazy:
//! every request sweeps stale conversations before touching its own.

mod store;

pub use store::{ConversationKey, MemoryStore};
