//! Change notifications published by the controller.

use xinyu_core::{Message, TranslationEntry, TranslationSettings};

/// Something observable changed in the conversation state.
///
/// Front ends subscribe to these instead of polling the state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversationEvent {
    /// A message was appended at `index`.
    MessageAppended { index: usize, message: Message },
    /// The translation of message `index` was stored or replaced.
    TranslationUpdated {
        index: usize,
        entry: TranslationEntry,
    },
    /// The thread was replaced by a new session.
    SessionReset { session_id: String },
    /// A chat request started (`true`) or finished (`false`).
    BusyChanged(bool),
    TranslationSettingsChanged(TranslationSettings),
}
