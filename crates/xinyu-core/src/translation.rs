//! Translation overlay types and the batch planner.
//!
//! Translations are a best-effort overlay on the message thread, keyed by
//! message index. The planner decides which indices are requested when the
//! overlay is switched on, and when.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use strum::{Display, EnumIter, EnumString};

/// Number of translation requests fired together when the overlay is enabled.
pub const DEFAULT_BATCH_SIZE: usize = 3;

/// Delay between two consecutive translation batches.
pub const DEFAULT_BATCH_DELAY: Duration = Duration::from_millis(500);

/// The language translations are requested in.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
)]
#[strum(ascii_case_insensitive)]
pub enum TargetLanguage {
    /// Let the backend pick the opposite of the detected source language.
    #[default]
    #[serde(rename = "auto")]
    #[strum(serialize = "auto")]
    Auto,
    #[serde(rename = "zh-CN")]
    #[strum(serialize = "zh-CN")]
    ZhCn,
    #[serde(rename = "en")]
    #[strum(serialize = "en")]
    En,
}

impl TargetLanguage {
    /// The value sent as `target_lang`; `None` lets the backend choose.
    pub fn as_request_code(&self) -> Option<&'static str> {
        match self {
            Self::Auto => None,
            Self::ZhCn => Some("zh-CN"),
            Self::En => Some("en"),
        }
    }
}

/// User-facing translation switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationSettings {
    pub enabled: bool,
    #[serde(default)]
    pub target_language: TargetLanguage,
}

/// A cached translation of one message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationEntry {
    pub translated_text: String,
    pub source_lang: String,
    pub target_lang: String,
    /// Set when the backend found source and target identical and echoed the text.
    #[serde(default)]
    pub skipped: bool,
}

/// How the enable-time translation sweep is split up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchPolicy {
    pub size: usize,
    pub delay: Duration,
}

impl Default for BatchPolicy {
    fn default() -> Self {
        Self {
            size: DEFAULT_BATCH_SIZE,
            delay: DEFAULT_BATCH_DELAY,
        }
    }
}

/// A group of message indices fired together after `delay`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationBatch {
    /// Delay relative to the moment the sweep was planned.
    pub delay: Duration,
    pub indices: Vec<usize>,
}

/// Plans the translation sweep over `message_count` messages.
///
/// Indices are grouped by position (`index / size`), so group `k` always fires
/// at `k * delay`, saturating at `Duration::MAX`. Indices for which `is_cached`
/// returns true are left out, and a group with nothing left to translate is
/// omitted entirely.
pub fn plan_translation_batches(
    message_count: usize,
    is_cached: impl Fn(usize) -> bool,
    policy: BatchPolicy,
) -> Vec<TranslationBatch> {
    let size = policy.size.max(1);

    (0..message_count)
        .step_by(size)
        .enumerate()
        .filter_map(|(group, start)| {
            let end = (start + size).min(message_count);
            let indices: Vec<usize> = (start..end).filter(|&i| !is_cached(i)).collect();
            if indices.is_empty() {
                return None;
            }
            Some(TranslationBatch {
                delay: u32::try_from(group)
                    .ok()
                    .and_then(|group| policy.delay.checked_mul(group))
                    .unwrap_or(Duration::MAX),
                indices,
            })
        })
        .collect()
}
