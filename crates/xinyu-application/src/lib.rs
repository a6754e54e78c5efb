//! Application layer for the Xinyu client.
//!
//! Provides `ConversationController`, which drives the domain state from
//! `xinyu-core` around calls to a `ChatBackend`, and the events it publishes.

pub mod controller;
pub mod events;


pub use controller::{ConversationController, SendOutcome, TranslationToggle};
pub use events::ConversationEvent;
