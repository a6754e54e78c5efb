//! Client configuration.
//!
//! Read from `~/.config/xinyu/config.toml`. A missing file yields the defaults;
//! `XINYU_BASE_URL` overrides the backend address.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use xinyu_core::translation::{DEFAULT_BATCH_DELAY, DEFAULT_BATCH_SIZE};
use xinyu_core::{BatchPolicy, Result, TargetLanguage, TranslationSettings, XinyuError};

/// Environment variable overriding `backend.base_url`.
pub const BASE_URL_ENV: &str = "XINYU_BASE_URL";

const DEFAULT_BASE_URL: &str = "http://localhost:5000";

/// Root of config.toml
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub translation: TranslationConfig,
}

/// `[backend]` table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
        }
    }
}

/// `[translation]` table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub target_language: TargetLanguage,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_batch_delay_ms")]
    pub batch_delay_ms: u64,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            target_language: TargetLanguage::Auto,
            batch_size: default_batch_size(),
            batch_delay_ms: default_batch_delay_ms(),
        }
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

fn default_batch_delay_ms() -> u64 {
    DEFAULT_BATCH_DELAY.as_millis() as u64
}

impl ClientConfig {
    /// Loads the config from the default location and applies the environment.
    pub fn load() -> Result<Self> {
        let path = Self::default_path()?;
        let config = Self::load_from(&path)?;
        Ok(config.with_base_url_override(std::env::var(BASE_URL_ENV).ok()))
    }

    /// Loads the config from `path`. Missing or empty files yield the defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: Self = toml::from_str(&content)?;
        tracing::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Returns `~/.config/xinyu/config.toml`.
    pub fn default_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Returns `~/.config/xinyu/`.
    pub fn config_dir() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| XinyuError::config("Could not determine home directory"))?;
        Ok(home.join(".config").join("xinyu"))
    }

    /// Replaces the backend address when `base_url` is set and non-blank.
    pub fn with_base_url_override(mut self, base_url: Option<String>) -> Self {
        if let Some(url) = base_url.filter(|url| !url.trim().is_empty()) {
            self.backend.base_url = url.trim().to_string();
        }
        self
    }

    pub fn translation_settings(&self) -> TranslationSettings {
        TranslationSettings {
            enabled: self.translation.enabled,
            target_language: self.translation.target_language,
        }
    }

    pub fn batch_policy(&self) -> BatchPolicy {
        BatchPolicy {
            size: self.translation.batch_size,
            delay: Duration::from_millis(self.translation.batch_delay_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config = ClientConfig::load_from(&temp_dir.path().join("config.toml")).unwrap();

        assert_eq!(config, ClientConfig::default());
        assert_eq!(config.backend.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.batch_policy(), BatchPolicy::default());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        fs::write(
            &path,
            "[translation]\nenabled = true\ntarget_language = \"zh-CN\"\n",
        )
        .unwrap();

        let config = ClientConfig::load_from(&path).unwrap();

        let settings = config.translation_settings();
        assert!(settings.enabled);
        assert_eq!(settings.target_language, TargetLanguage::ZhCn);
        assert_eq!(config.translation.batch_size, 3);
        assert_eq!(config.backend.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn test_invalid_toml_is_a_serialization_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        fs::write(&path, "[backend\nbase_url = 1").unwrap();

        let err = ClientConfig::load_from(&path).unwrap_err();
        assert!(matches!(err, XinyuError::Serialization { .. }));
    }

    #[test]
    fn test_base_url_override() {
        let config = ClientConfig::default()
            .with_base_url_override(Some(" http://10.0.0.2:8080 ".to_string()));
        assert_eq!(config.backend.base_url, "http://10.0.0.2:8080");

        let untouched = ClientConfig::default().with_base_url_override(Some("  ".to_string()));
        assert_eq!(untouched.backend.base_url, DEFAULT_BASE_URL);
    }
}
