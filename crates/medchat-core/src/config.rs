use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use anyhow::{Result, anyhow};
use log::warn;

pub const DEFAULT_SERVER_URL: &str = "http://localhost:5000";
pub const DEFAULT_PROMPT: &str = "Please analyze this image.";
pub const SERVER_URL_ENV: &str = "MEDCHAT_SERVER_URL";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    pub server_url: String,
    pub generate_speech: bool,
    /// Text sent with an uploaded image or PDF when the input is empty
    pub default_prompt: String,
    pub typing_interval_ms: u64,
    pub request_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub fn new() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            generate_speech: true,
            default_prompt: DEFAULT_PROMPT.to_string(),
            typing_interval_ms: 30,
            request_timeout_secs: 120,
        }
    }

    pub fn load() -> Result<Self> {
        let config_path = Self::get_config_path()?;
        Self::load_from(&config_path)
    }

    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            return Ok(Self::new());
        }

        let config_content = fs::read_to_string(config_path)?;
        let config: Config = serde_json::from_str(&config_content)?;
        Ok(config)
    }

    /// Like `load`, but an unreadable file is logged and replaced by defaults
    pub fn load_or_default() -> Self {
        match Self::get_config_path() {
            Ok(path) => Self::load_or_default_from(&path),
            Err(e) => {
                warn!("{}; using default config", e);
                Self::new()
            }
        }
    }

    pub fn load_or_default_from(config_path: &Path) -> Self {
        Self::load_from(config_path).unwrap_or_else(|e| {
            warn!("Ignoring unreadable config {}: {}", config_path.display(), e);
            Self::new()
        })
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::get_config_path()?;
        self.save_to(&config_path)
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        // Create config directory if it doesn't exist
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let config_content = serde_json::to_string_pretty(self)?;
        fs::write(config_path, config_content)?;
        Ok(())
    }

    pub fn save_server_url(url: &str) -> Result<()> {
        let mut config = Self::load().unwrap_or_else(|_| Self::new());
        config.server_url = url.to_string();
        config.save()
    }

    /// Environment beats the config file
    pub fn apply_env(&mut self) {
        if let Ok(url) = std::env::var(SERVER_URL_ENV) {
            if !url.trim().is_empty() {
                self.server_url = url.trim().to_string();
            }
        }
    }

    pub fn typing_interval(&self) -> Duration {
        Duration::from_millis(self.typing_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("medchat").join("config.json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("config.json")).unwrap();
        assert_eq!(config, Config::new());
        assert_eq!(config.default_prompt, "Please analyze this image.");
        assert!(config.generate_speech);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"server_url": "http://clinic.local:8080"}"#).unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.server_url, "http://clinic.local:8080");
        assert_eq!(config.typing_interval(), Duration::from_millis(30));
    }

    #[test]
    fn test_corrupt_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ server_url: nope").unwrap();

        assert!(Config::load_from(&path).is_err());
        assert_eq!(Config::load_or_default_from(&path), Config::new());
    }

    #[test]
    fn test_save_round_trip_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("medchat").join("config.json");

        let mut config = Config::new();
        config.generate_speech = false;
        config.save_to(&path).unwrap();

        assert_eq!(Config::load_from(&path).unwrap(), config);
    }
}
