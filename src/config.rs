//! Configuration management for CineMate
//!
//! Handles config file loading/saving and environment overrides.
//! Config is stored at ~/.config/cinemate/config.toml

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::api::{ClientOptions, DEFAULT_BASE_URL, DEFAULT_PLATFORM};
use crate::slider::{SliderConfig, DEFAULT_AUTOPLAY_INTERVAL};
use crate::storage::FileStore;

/// Environment variable overriding the API root
pub const ENV_API_URL: &str = "CINEMATE_API_URL";
/// Environment variable overriding the `x-platform` header
pub const ENV_PLATFORM: &str = "CINEMATE_PLATFORM";

/// Application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// API root, e.g. https://api.cinemate.app/api/v1
    pub api_base_url: String,
    /// Value sent in the x-platform header
    pub platform: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Session file location (defaults to the data dir)
    pub store_path: Option<PathBuf>,
    /// Carousel defaults
    pub slider: SliderSettings,
}

/// Carousel settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SliderSettings {
    pub autoplay_interval_ms: u64,
    pub loop_items: bool,
}

impl Default for SliderSettings {
    fn default() -> Self {
        Self {
            autoplay_interval_ms: DEFAULT_AUTOPLAY_INTERVAL.as_millis() as u64,
            loop_items: true,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_BASE_URL.to_string(),
            platform: DEFAULT_PLATFORM.to_string(),
            timeout_secs: 10,
            store_path: None,
            slider: SliderSettings::default(),
        }
    }
}

impl Config {
    /// Get config file path (~/.config/cinemate/config.toml)
    pub fn path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("cinemate").join("config.toml"))
    }

    /// Load config from the default file, or defaults if not found
    pub fn load() -> Self {
        let config = Self::path()
            .map(|p| Self::load_from(&p))
            .unwrap_or_default();
        config.with_env_overrides()
    }

    /// Load config from an explicit file; a missing or invalid file yields defaults
    pub fn load_from(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(text) => toml::from_str(&text).unwrap_or_else(|e| {
                tracing::warn!(path = %path.display(), error = %e, "Invalid config, using defaults");
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    /// Apply CINEMATE_API_URL / CINEMATE_PLATFORM
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(url) = std::env::var(ENV_API_URL) {
            self.api_base_url = url;
        }
        if let Ok(platform) = std::env::var(ENV_PLATFORM) {
            self.platform = platform;
        }
        self
    }

    /// Save config to the default file
    pub fn save(&self) -> Result<()> {
        let path = Self::path().ok_or_else(|| anyhow::anyhow!("Could not determine config path"))?;
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let toml = toml::to_string_pretty(self)?;
        std::fs::write(path, toml)?;
        Ok(())
    }

    pub fn client_options(&self) -> ClientOptions {
        ClientOptions {
            base_url: self.api_base_url.clone(),
            platform: self.platform.clone(),
            timeout: Duration::from_secs(self.timeout_secs),
        }
    }

    /// Where the session file lives
    pub fn store_path(&self) -> PathBuf {
        self.store_path
            .clone()
            .or_else(FileStore::default_path)
            .unwrap_or_else(|| PathBuf::from("cinemate-session.json"))
    }

    pub fn slider_config(&self) -> SliderConfig {
        SliderConfig {
            autoplay_interval: Duration::from_millis(self.slider.autoplay_interval_ms),
            loop_items: self.slider.loop_items,
            ..SliderConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.api_base_url, DEFAULT_BASE_URL);
        assert_eq!(config.timeout_secs, 10);
        assert!(config.store_path.is_none());
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: Config = toml::from_str("platform = \"ios\"\n[slider]\nloop_items = false\n").unwrap();
        assert_eq!(config.platform, "ios");
        assert_eq!(config.api_base_url, DEFAULT_BASE_URL);
        assert!(!config.slider.loop_items);
        assert_eq!(config.slider.autoplay_interval_ms, 3000);
    }

    #[test]
    fn test_client_options_timeout() {
        let config = Config {
            timeout_secs: 4,
            ..Config::default()
        };
        assert_eq!(config.client_options().timeout, Duration::from_secs(4));
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let config = Config {
            platform: "android".into(),
            ..Config::default()
        };
        config.save_to(&path).unwrap();
        assert_eq!(Config::load_from(&path), config);
    }

    #[test]
    fn test_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(Config::load_from(&dir.path().join("nope.toml")), Config::default());
    }
}
