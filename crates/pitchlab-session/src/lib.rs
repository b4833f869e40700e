//! Conversational session core for the Pitchlab platform.
//!
//! Owns the in-memory registry of active practice sessions and the per-turn
//! pipeline that realizes one transcribed utterance into an ordered event
//! sequence: the trainee's transcript line, a persona-conditioned reply, the
//! reply's transcript line, and (when synthesis succeeds) the reply audio.
//!
//! Sessions are isolated from each other: the store serializes operations
//! per session id, the pipeline serializes turns per session id, and every
//! outbound event names its destination session explicitly. Nothing here
//! survives the process; there is no persistence layer.

pub mod events;
pub mod pipeline;
pub mod store;

pub use events::{EventSink, OutboundEvent};
pub use pipeline::TurnPipeline;
pub use store::SessionStore;
