//! The conversation state model.
//!
//! `ConversationState` owns the message thread, the active session id, the
//! in-flight flag, the input buffer and the translation overlay. It performs no
//! I/O: the controller in `xinyu-application` drives it around backend calls.

use std::collections::BTreeMap;

use crate::constants::{DEFAULT_SESSION_ID, NEW_SESSION_MESSAGE, WELCOME_MESSAGE};
use crate::message::Message;
use crate::translation::{
    BatchPolicy, TargetLanguage, TranslationBatch, TranslationEntry, TranslationSettings,
    plan_translation_batches,
};

/// Why a send was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendRejection {
    /// The text was empty or whitespace only.
    Empty,
    /// A chat request is already in flight.
    Busy,
}

/// A chat request that has been admitted and is about to go out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingChat {
    /// Index of the optimistically appended user message.
    pub index: usize,
    pub message: String,
    pub session_id: String,
    pub generation: u64,
}

/// In-memory state of one conversation thread.
#[derive(Debug, Clone)]
pub struct ConversationState {
    messages: Vec<Message>,
    session_id: String,
    busy: bool,
    input: String,
    translations: BTreeMap<usize, TranslationEntry>,
    settings: TranslationSettings,
    /// Bumped on every session reset; responses tagged with an older value are stale.
    generation: u64,
}

impl Default for ConversationState {
    fn default() -> Self {
        Self::new(TranslationSettings::default())
    }
}

impl ConversationState {
    /// Creates a thread holding only the welcome message.
    pub fn new(settings: TranslationSettings) -> Self {
        Self {
            messages: vec![Message::assistant(WELCOME_MESSAGE)],
            session_id: DEFAULT_SESSION_ID.to_string(),
            busy: false,
            input: String::new(),
            translations: BTreeMap::new(),
            settings,
            generation: 0,
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn set_input(&mut self, input: impl Into<String>) {
        self.input = input.into();
    }

    pub fn settings(&self) -> TranslationSettings {
        self.settings
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// All cached translations, shown or not.
    pub fn translations(&self) -> &BTreeMap<usize, TranslationEntry> {
        &self.translations
    }

    /// The translation to display for `index`, hidden while the overlay is off.
    pub fn visible_translation(&self, index: usize) -> Option<&TranslationEntry> {
        if !self.settings.enabled {
            return None;
        }
        self.translations.get(&index)
    }

    /// Admits a send: appends the user message, clears the input buffer and
    /// raises the in-flight flag.
    pub fn begin_send(&mut self, text: &str) -> Result<PendingChat, SendRejection> {
        if text.trim().is_empty() {
            return Err(SendRejection::Empty);
        }
        if self.busy {
            return Err(SendRejection::Busy);
        }

        self.messages.push(Message::user(text));
        self.input.clear();
        self.busy = true;

        Ok(PendingChat {
            index: self.messages.len() - 1,
            message: text.to_string(),
            session_id: self.session_id.clone(),
            generation: self.generation,
        })
    }

    /// Finishes a send started under `generation`.
    ///
    /// The in-flight flag is always lowered. `reply` is appended only if no
    /// session reset happened meanwhile; its index is returned in that case.
    pub fn complete_send(&mut self, generation: u64, reply: Message) -> Option<usize> {
        self.busy = false;
        if generation != self.generation {
            return None;
        }
        self.messages.push(reply);
        Some(self.messages.len() - 1)
    }

    /// Switches to `session_id`, leaving a single new-session message and an
    /// empty overlay.
    pub fn reset_session(&mut self, session_id: impl Into<String>) {
        self.generation += 1;
        self.session_id = session_id.into();
        self.messages = vec![Message::assistant(NEW_SESSION_MESSAGE)];
        self.translations.clear();
    }

    /// Stores a translation requested under `generation` in `language`.
    ///
    /// Entries from before a session reset, or for a target language that is no
    /// longer selected, are dropped. Returns whether the entry was kept.
    pub fn apply_translation(
        &mut self,
        generation: u64,
        language: TargetLanguage,
        index: usize,
        entry: TranslationEntry,
    ) -> bool {
        if generation != self.generation || language != self.settings.target_language {
            return false;
        }
        self.translations.insert(index, entry);
        true
    }

    /// Flips the overlay switch and returns the new value. Cached entries survive.
    pub fn toggle_translation(&mut self) -> bool {
        self.settings.enabled = !self.settings.enabled;
        self.settings.enabled
    }

    /// Changes the target language and drops every cached entry.
    pub fn set_target_language(&mut self, language: TargetLanguage) {
        self.settings.target_language = language;
        self.translations.clear();
    }

    /// Plans the sweep over every message that has no cached translation yet.
    pub fn plan_translation_sweep(&self, policy: BatchPolicy) -> Vec<TranslationBatch> {
        plan_translation_batches(
            self.messages.len(),
            |index| self.translations.contains_key(&index),
            policy,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::FALLBACK_MESSAGE;
    use crate::message::MessageRole;

    fn entry(text: &str) -> TranslationEntry {
        TranslationEntry {
            translated_text: text.to_string(),
            source_lang: "zh-CN".to_string(),
            target_lang: "en".to_string(),
            skipped: false,
        }
    }

    #[test]
    fn test_new_state_has_welcome_message() {
        let state = ConversationState::default();
        assert_eq!(state.messages().len(), 1);
        assert_eq!(state.messages()[0].content, WELCOME_MESSAGE);
        assert_eq!(state.session_id(), DEFAULT_SESSION_ID);
        assert!(!state.is_busy());
    }

    #[test]
    fn test_begin_send_rejects_blank_text() {
        let mut state = ConversationState::default();
        assert_eq!(state.begin_send(""), Err(SendRejection::Empty));
        assert_eq!(state.begin_send("  \n\t"), Err(SendRejection::Empty));
        assert_eq!(state.messages().len(), 1);
    }

    #[test]
    fn test_begin_send_appends_and_clears_input() {
        let mut state = ConversationState::default();
        state.set_input("我失恋了");

        let pending = state.begin_send("我失恋了").unwrap();

        assert_eq!(pending.index, 1);
        assert_eq!(pending.session_id, DEFAULT_SESSION_ID);
        assert_eq!(state.messages()[1].role, MessageRole::User);
        assert_eq!(state.input(), "");
        assert!(state.is_busy());
        assert_eq!(state.begin_send("again"), Err(SendRejection::Busy));
        assert_eq!(state.messages().len(), 2);
    }

    #[test]
    fn test_complete_send_appends_reply() {
        let mut state = ConversationState::default();
        let pending = state.begin_send("hi").unwrap();

        let index = state.complete_send(pending.generation, Message::assistant(FALLBACK_MESSAGE));

        assert_eq!(index, Some(2));
        assert!(!state.is_busy());
    }

    #[test]
    fn test_complete_send_after_reset_is_dropped_but_unblocks() {
        let mut state = ConversationState::default();
        let pending = state.begin_send("hi").unwrap();
        state.reset_session("abc");

        let index = state.complete_send(pending.generation, Message::assistant("late"));

        assert_eq!(index, None);
        assert!(!state.is_busy());
        assert_eq!(state.messages().len(), 1);
        assert_eq!(state.messages()[0].content, NEW_SESSION_MESSAGE);
    }

    #[test]
    fn test_reset_clears_translations_and_bumps_generation() {
        let mut state = ConversationState::default();
        assert!(state.apply_translation(0, TargetLanguage::Auto, 0, entry("Hello")));

        state.reset_session("s-2");

        assert_eq!(state.session_id(), "s-2");
        assert_eq!(state.generation(), 1);
        assert!(state.translations().is_empty());
        assert!(!state.apply_translation(0, TargetLanguage::Auto, 0, entry("stale")));
        assert!(state.translations().is_empty());
    }

    #[test]
    fn test_toggle_keeps_cache_and_hides_overlay() {
        let mut state = ConversationState::default();
        state.apply_translation(0, TargetLanguage::Auto, 0, entry("Hello"));

        assert!(state.toggle_translation());
        assert!(state.visible_translation(0).is_some());

        assert!(!state.toggle_translation());
        assert!(state.visible_translation(0).is_none());
        assert_eq!(state.translations().len(), 1);
    }

    #[test]
    fn test_target_language_change_clears_cache() {
        let mut state = ConversationState::default();
        state.apply_translation(0, TargetLanguage::Auto, 0, entry("Hello"));

        state.set_target_language(TargetLanguage::En);

        assert!(state.translations().is_empty());
        assert_eq!(state.settings().target_language, TargetLanguage::En);
    }

    #[test]
    fn test_translation_for_previous_language_is_dropped() {
        let mut state = ConversationState::default();
        state.set_target_language(TargetLanguage::ZhCn);

        assert!(!state.apply_translation(0, TargetLanguage::Auto, 0, entry("old")));
        assert!(state.apply_translation(0, TargetLanguage::ZhCn, 0, entry("你好")));
        assert_eq!(state.translations()[&0].translated_text, "你好");
    }

    #[test]
    fn test_sweep_skips_cached_messages() {
        let mut state = ConversationState::default();
        for i in 0..3 {
            let pending = state.begin_send(&format!("m{i}")).unwrap();
            state.complete_send(pending.generation, Message::assistant("ok"));
        }
        state.apply_translation(0, TargetLanguage::Auto, 1, entry("cached"));

        let batches = state.plan_translation_sweep(BatchPolicy::default());

        assert_eq!(batches.len(), 3);
        assert_eq!(batches[0].indices, vec![0, 2]);
        assert_eq!(batches[2].indices, vec![6]);
    }
}
