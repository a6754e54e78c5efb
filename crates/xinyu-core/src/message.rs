//! Conversation message types.
//!
//! Messages are immutable once appended to the thread. Their position in the
//! thread is their identity for translation lookup.

use serde::{Deserialize, Serialize};

/// Represents the author of a message in the thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// Message typed by the user.
    User,
    /// Message produced by the assistant (or a fixed client-side notice).
    Assistant,
}

/// A single message in the conversation thread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// The author of the message.
    pub role: MessageRole,
    /// The text of the message.
    pub content: String,
    /// Emotion tag the backend attached to an assistant reply.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emotion: Option<String>,
}

impl Message {
    /// Creates a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
            emotion: None,
        }
    }

    /// Creates an assistant message without an emotion tag.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
            emotion: None,
        }
    }

    /// Attaches an emotion tag.
    pub fn with_emotion(mut self, emotion: Option<String>) -> Self {
        self.emotion = emotion;
        self
    }
}
