use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::ConfigError;

pub const API_URL_ENV: &str = "CONFESSION_API_URL";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub feed: FeedConfig,
    pub moderation: ModerationConfig,
    pub embed: EmbedConfig,
    /// Host the app reports itself as running on; decides whether embeds are attempted.
    pub deployment_host: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub request_timeout_seconds: u64,
    pub user_agent: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FeedConfig {
    pub first_batch: usize,
    pub full_batch: usize,
    pub page_size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ModerationConfig {
    pub page_size: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EmbedConfig {
    pub parse_delay_ms: u64,
    pub settle_delay_ms: u64,
    pub sdk_retry_delay_ms: u64,
    pub always_fallback: bool,
    pub production_hosts: Vec<String>,
    pub app_id: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            feed: FeedConfig::default(),
            moderation: ModerationConfig::default(),
            embed: EmbedConfig::default(),
            deployment_host: "localhost".to_string(),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000/api".to_string(),
            request_timeout_seconds: 15,
            user_agent: "ConfessionBoard/0.1".to_string(),
        }
    }
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            first_batch: 100,
            full_batch: 500,
            page_size: 12,
        }
    }
}

impl Default for ModerationConfig {
    fn default() -> Self {
        Self { page_size: 10 }
    }
}

impl Default for EmbedConfig {
    fn default() -> Self {
        Self {
            parse_delay_ms: 500,
            settle_delay_ms: 2000,
            sdk_retry_delay_ms: 2000,
            always_fallback: true,
            production_hosts: Vec::new(),
            app_id: "567416515679221".to_string(),
        }
    }
}

impl ApiConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}

impl AppConfig {
    pub fn config_dir() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        let app_config_dir = config_dir.join("confession-board");
        std::fs::create_dir_all(&app_config_dir)?;
        Ok(app_config_dir)
    }

    pub fn config_file_path() -> Result<PathBuf, ConfigError> {
        Ok(Self::config_dir()?.join("config.json"))
    }

    /// Loads the config file, falling back to (and trying to write) defaults.
    /// `CONFESSION_API_URL` overrides the API base URL either way.
    pub fn load() -> Self {
        let mut config = match Self::load_from_file() {
            Ok(config) => config,
            Err(e) => {
                warn!(error = %e, "unable to load configuration, using defaults");
                let default_config = Self::default();
                if let Err(save_err) = default_config.save() {
                    warn!(error = %save_err, "unable to save default configuration");
                }
                default_config
            }
        };
        if let Ok(url) = std::env::var(API_URL_ENV) {
            info!(%url, "API base URL overridden from environment");
            config.api.base_url = url;
        }
        config
    }

    fn load_from_file() -> Result<Self, ConfigError> {
        let config_path = Self::config_file_path()?;
        let config_content = std::fs::read_to_string(config_path)?;
        Ok(serde_json::from_str(&config_content)?)
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        let config_path = Self::config_file_path()?;
        let config_json = serde_json::to_string_pretty(self)?;
        std::fs::write(config_path, config_json)?;
        Ok(())
    }

    pub fn session_file_path() -> Result<PathBuf, ConfigError> {
        Ok(Self::config_dir()?.join("session.json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_fills_in_defaults() {
        let config: AppConfig =
            serde_json::from_str(r#"{"feed":{"page_size":20},"deployment_host":"confess.example"}"#)
                .unwrap();
        assert_eq!(config.feed.page_size, 20);
        assert_eq!(config.feed.first_batch, 100);
        assert_eq!(config.feed.full_batch, 500);
        assert_eq!(config.moderation.page_size, 10);
        assert_eq!(config.deployment_host, "confess.example");
        assert!(config.embed.always_fallback);
    }
}
