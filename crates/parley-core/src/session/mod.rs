//! Generation sessions
//!
//! Per persona the lifecycle is `Idle -> Generating -> Idle`. A request
//! arriving while its persona is generating gets a busy notice instead of
//! being queued, and every exit path, failures included, returns the
//! persona to idle.

mod coordinator;
mod publisher;
mod state;

pub use coordinator::{GenerationCoordinator, GenerationOutcome, GenerationRequest};
pub use publisher::ProgressPublisher;
pub use state::SessionState;
