//! Conversation controller.
//!
//! `ConversationController` owns the conversation state and mediates every
//! backend call: chat, session reset and translation. Results are reconciled
//! back into the state and announced as `ConversationEvent`s.
//!
//! # Concurrency
//!
//! The state sits behind an `Arc<RwLock<_>>` and the lock is never held across
//! a backend call. At most one chat request is in flight (the busy flag);
//! translation requests are spawned as independent tasks without limit and are
//! never cancelled. Each request is tagged with the session generation at issue
//! time so that responses arriving after a reset are dropped.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tokio::sync::{RwLock, broadcast};
use tokio::task::JoinHandle;
use xinyu_core::constants::FALLBACK_MESSAGE;
use xinyu_core::{
    BatchPolicy, ChatBackend, ConversationState, HealthStatus, Message, Result, SendRejection,
    TargetLanguage, TranslationBatch, TranslationEntry, TranslationSettings, XinyuError,
};

use crate::events::ConversationEvent;

const EVENT_CAPACITY: usize = 256;

/// What became of a `send_message` call.
#[derive(Debug)]
pub enum SendOutcome {
    /// Nothing was sent.
    Ignored(SendRejection),
    /// The assistant's reply was appended at `index`.
    Replied { index: usize },
    /// The request failed; the fallback notice was appended at `index`.
    Failed { index: usize, error: XinyuError },
    /// The session was reset while the request was in flight; nothing was appended.
    Discarded,
}

/// Result of flipping the translation switch.
#[derive(Debug)]
pub struct TranslationToggle {
    /// The switch position after the toggle.
    pub enabled: bool,
    /// The sweep that was scheduled; empty when switching off.
    pub batches: Vec<TranslationBatch>,
    handles: Vec<JoinHandle<()>>,
}

impl TranslationToggle {
    /// Waits until every scheduled batch has fired and its requests completed.
    pub async fn wait(self) {
        for result in join_all(self.handles).await {
            if let Err(err) = result {
                tracing::warn!("[ConversationController] Translation batch task failed: {}", err);
            }
        }
    }
}

/// State-owning controller for one conversation thread.
#[derive(Clone)]
pub struct ConversationController {
    state: Arc<RwLock<ConversationState>>,
    backend: Arc<dyn ChatBackend>,
    policy: BatchPolicy,
    events: broadcast::Sender<ConversationEvent>,
}

impl ConversationController {
    /// Creates a controller with the default batch policy (3 requests every 500ms).
    pub fn new(backend: Arc<dyn ChatBackend>, settings: TranslationSettings) -> Self {
        Self::with_policy(backend, settings, BatchPolicy::default())
    }

    pub fn with_policy(
        backend: Arc<dyn ChatBackend>,
        settings: TranslationSettings,
        policy: BatchPolicy,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            state: Arc::new(RwLock::new(ConversationState::new(settings))),
            backend,
            policy,
            events,
        }
    }

    /// Subscribes to state change notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<ConversationEvent> {
        self.events.subscribe()
    }

    /// Returns a copy of the current state.
    pub async fn snapshot(&self) -> ConversationState {
        self.state.read().await.clone()
    }

    /// The translation to show for message `index`; `None` while the overlay is off.
    pub async fn translation_for(&self, index: usize) -> Option<TranslationEntry> {
        self.state.read().await.visible_translation(index).cloned()
    }

    pub async fn set_input(&self, input: impl Into<String>) {
        self.state.write().await.set_input(input);
    }

    /// Sends whatever is in the input buffer.
    pub async fn submit_input(&self) -> SendOutcome {
        let input = self.state.read().await.input().to_string();
        self.send_message(&input).await
    }

    /// Sends one user message and waits for the assistant's reply.
    ///
    /// The user message is appended before the request goes out and the input
    /// buffer is cleared at the same moment. Failures are answered locally with
    /// the fallback notice and are not retried.
    pub async fn send_message(&self, text: &str) -> SendOutcome {
        let (pending, settings) = {
            let mut state = self.state.write().await;
            match state.begin_send(text) {
                Ok(pending) => (pending, state.settings()),
                Err(rejection) => {
                    tracing::debug!("[ConversationController] Send ignored: {:?}", rejection);
                    return SendOutcome::Ignored(rejection);
                }
            }
        };

        self.emit(ConversationEvent::MessageAppended {
            index: pending.index,
            message: Message::user(pending.message.clone()),
        });
        self.emit(ConversationEvent::BusyChanged(true));

        if settings.enabled {
            self.spawn_translation(
                pending.message.clone(),
                pending.index,
                pending.generation,
                settings.target_language,
            );
        }

        tracing::debug!(
            session_id = %pending.session_id,
            "[ConversationController] Sending chat message"
        );
        let (reply, error) = match self
            .backend
            .chat(&pending.message, &pending.session_id)
            .await
        {
            Ok(reply) => (
                Message::assistant(reply.message).with_emotion(reply.emotion),
                None,
            ),
            Err(err) => {
                tracing::error!("[ConversationController] Error sending message: {}", err);
                (Message::assistant(FALLBACK_MESSAGE), Some(err))
            }
        };

        let (appended, settings) = {
            let mut state = self.state.write().await;
            let appended = state.complete_send(pending.generation, reply.clone());
            (appended, state.settings())
        };

        let Some(index) = appended else {
            tracing::debug!(
                "[ConversationController] Session was reset while waiting, reply discarded"
            );
            self.emit(ConversationEvent::BusyChanged(false));
            return SendOutcome::Discarded;
        };

        let content = reply.content.clone();
        self.emit(ConversationEvent::MessageAppended {
            index,
            message: reply,
        });
        self.emit(ConversationEvent::BusyChanged(false));

        match error {
            Some(error) => SendOutcome::Failed { index, error },
            None => {
                if settings.enabled {
                    self.spawn_translation(
                        content,
                        index,
                        pending.generation,
                        settings.target_language,
                    );
                }
                SendOutcome::Replied { index }
            }
        }
    }

    /// Starts a fresh session.
    ///
    /// On success the thread is reduced to the new-session message and the
    /// translation overlay is emptied. On failure nothing changes; the error is
    /// logged and returned.
    pub async fn new_session(&self) -> Result<String> {
        let session_id = match self.backend.new_session().await {
            Ok(session_id) => session_id,
            Err(err) => {
                tracing::error!("[ConversationController] Error creating new session: {}", err);
                return Err(err);
            }
        };

        self.state.write().await.reset_session(session_id.clone());
        tracing::info!(
            session_id = %session_id,
            "[ConversationController] New session started"
        );
        self.emit(ConversationEvent::SessionReset {
            session_id: session_id.clone(),
        });

        Ok(session_id)
    }

    /// Drops the current session's server-side history, then starts a new one.
    ///
    /// A failed delete is only logged.
    pub async fn end_session(&self) -> Result<String> {
        let current = self.state.read().await.session_id().to_string();
        if let Err(err) = self.backend.delete_session(&current).await {
            tracing::warn!(
                "[ConversationController] Failed to delete session {}: {}",
                current,
                err
            );
        }
        self.new_session().await
    }

    /// Requests a translation of `text` for message `index`.
    ///
    /// Fire-and-forget: the returned handle may be dropped. A successful,
    /// non-empty result replaces whatever entry `index` had; failures leave the
    /// message untranslated.
    pub async fn translate_message(&self, text: impl Into<String>, index: usize) -> JoinHandle<()> {
        let (generation, target) = {
            let state = self.state.read().await;
            (state.generation(), state.settings().target_language)
        };
        self.spawn_translation(text.into(), index, generation, target)
    }

    /// Flips the translation overlay.
    ///
    /// Switching on schedules a sweep over every message without a cached
    /// translation, in batches fired `policy.delay` apart. Switching off cancels
    /// nothing; late results still land in the cache.
    pub async fn toggle_translation(&self) -> TranslationToggle {
        let (settings, generation, batches, work) = {
            let mut state = self.state.write().await;
            let enabled = state.toggle_translation();
            let batches = if enabled {
                state.plan_translation_sweep(self.policy)
            } else {
                Vec::new()
            };
            let work: Vec<(Duration, Vec<(usize, String)>)> = batches
                .iter()
                .map(|batch| {
                    let items = batch
                        .indices
                        .iter()
                        .filter_map(|&index| {
                            state
                                .messages()
                                .get(index)
                                .map(|message| (index, message.content.clone()))
                        })
                        .collect();
                    (batch.delay, items)
                })
                .collect();
            (state.settings(), state.generation(), batches, work)
        };

        tracing::info!(
            enabled = settings.enabled,
            batches = batches.len(),
            "[ConversationController] Translation toggled"
        );
        self.emit(ConversationEvent::TranslationSettingsChanged(settings));

        let handles = work
            .into_iter()
            .map(|(delay, items)| {
                self.spawn_batch(delay, items, generation, settings.target_language)
            })
            .collect();

        TranslationToggle {
            enabled: settings.enabled,
            batches,
            handles,
        }
    }

    /// Selects the translation language and drops every cached translation.
    pub async fn set_target_language(&self, language: TargetLanguage) {
        let settings = {
            let mut state = self.state.write().await;
            state.set_target_language(language);
            state.settings()
        };
        tracing::info!(
            target_language = %language,
            "[ConversationController] Target language changed"
        );
        self.emit(ConversationEvent::TranslationSettingsChanged(settings));
    }

    pub async fn check_health(&self) -> Result<HealthStatus> {
        self.backend.health().await
    }

    pub async fn detect_language(&self, text: &str) -> Result<String> {
        self.backend.detect_language(text).await
    }

    fn spawn_batch(
        &self,
        delay: Duration,
        items: Vec<(usize, String)>,
        generation: u64,
        target: TargetLanguage,
    ) -> JoinHandle<()> {
        let controller = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let requests: Vec<JoinHandle<()>> = items
                .into_iter()
                .map(|(index, text)| controller.spawn_translation(text, index, generation, target))
                .collect();
            join_all(requests).await;
        })
    }

    fn spawn_translation(
        &self,
        text: String,
        index: usize,
        generation: u64,
        target: TargetLanguage,
    ) -> JoinHandle<()> {
        let controller = self.clone();
        tokio::spawn(async move {
            controller
                .run_translation(text, index, generation, target)
                .await;
        })
    }

    async fn run_translation(
        &self,
        text: String,
        index: usize,
        generation: u64,
        target: TargetLanguage,
    ) {
        let result = match self.backend.translate(&text, target).await {
            Ok(result) => result,
            Err(err) => {
                tracing::warn!(index, "[ConversationController] Translation failed: {}", err);
                return;
            }
        };

        let Some(entry) = result.into_entry() else {
            tracing::debug!(index, "[ConversationController] Empty translation ignored");
            return;
        };

        let kept = self
            .state
            .write()
            .await
            .apply_translation(generation, target, index, entry.clone());

        if kept {
            self.emit(ConversationEvent::TranslationUpdated { index, entry });
        } else {
            tracing::debug!(index, "[ConversationController] Stale translation dropped");
        }
    }

    fn emit(&self, event: ConversationEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}
