//! Backend contract.
//!
//! The assistant, the translator and the session store all live behind the
//! backend's HTTP API. This trait is the seam the controller talks through;
//! `xinyu-interaction` provides the HTTP implementation.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::translation::{TargetLanguage, TranslationEntry};

/// The assistant's answer to one chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatReply {
    pub message: String,
    #[serde(default)]
    pub emotion: Option<String>,
}

/// Result of one translation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationResult {
    #[serde(default)]
    pub translated_text: String,
    #[serde(default)]
    pub source_lang: String,
    #[serde(default)]
    pub target_lang: String,
    #[serde(default)]
    pub skipped: bool,
}

impl TranslationResult {
    /// Converts into a cache entry; empty translations produce nothing.
    pub fn into_entry(self) -> Option<TranslationEntry> {
        if self.translated_text.is_empty() {
            return None;
        }
        Some(TranslationEntry {
            translated_text: self.translated_text,
            source_lang: self.source_lang,
            target_lang: self.target_lang,
            skipped: self.skipped,
        })
    }
}

/// Backend liveness report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub message: String,
}

impl HealthStatus {
    pub fn is_ok(&self) -> bool {
        self.status == "ok"
    }
}

/// Operations the backend exposes to the client.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Sends one user message within `session_id` and returns the reply.
    async fn chat(&self, message: &str, session_id: &str) -> Result<ChatReply>;

    /// Asks the backend for a fresh session identifier.
    async fn new_session(&self) -> Result<String>;

    /// Translates `text`; `TargetLanguage::Auto` lets the backend choose.
    async fn translate(&self, text: &str, target: TargetLanguage) -> Result<TranslationResult>;

    /// Drops the server-side history of `session_id`.
    async fn delete_session(&self, session_id: &str) -> Result<()>;

    /// Detects the language of `text`, returning its code.
    async fn detect_language(&self, text: &str) -> Result<String>;

    /// Checks that the backend is reachable.
    async fn health(&self) -> Result<HealthStatus>;
}
