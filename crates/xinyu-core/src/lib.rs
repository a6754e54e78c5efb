//! Domain layer of the Xinyu client.
//!
//! Holds the message/translation state model, the translation batch planner,
//! the backend contract and the shared error type. Nothing here performs I/O.

pub mod backend;
pub mod constants;
pub mod error;
pub mod message;
pub mod state;
pub mod translation;

pub use backend::{ChatBackend, ChatReply, HealthStatus, TranslationResult};
pub use error::{Result, XinyuError};
pub use message::{Message, MessageRole};
pub use state::{ConversationState, PendingChat, SendRejection};
pub use translation::{
    BatchPolicy, TargetLanguage, TranslationBatch, TranslationEntry, TranslationSettings,
    plan_translation_batches,
};
