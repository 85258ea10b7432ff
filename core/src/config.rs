use crate::errors::{ChatError, ChatResult};
use crate::protocol::ReplyStyle;
use crate::types::RequestFormat;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const APP_NAME: &str = "food-assistant";

pub const DEFAULT_CHAT_ENDPOINT: &str = "http://localhost:5678/webhook/chat";
pub const DEFAULT_FEEDBACK_ENDPOINT: &str = "http://localhost:8080/feedback";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_LOG_LEVEL: &str = "warn";

pub const CHAT_URL_ENV: &str = "FOOD_ASSISTANT_CHAT_URL";
pub const FEEDBACK_URL_ENV: &str = "FOOD_ASSISTANT_FEEDBACK_URL";

/// Client configuration. Every field is optional so that file, environment and
/// command line layers can be merged; accessors fall back to defaults.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct ClientConfig {
    pub chat_endpoint: Option<String>,
    pub feedback_endpoint: Option<String>,
    pub archive_endpoint: Option<String>,
    pub request_format: Option<RequestFormat>,
    pub reply_style: Option<ReplyStyle>,
    pub request_timeout_secs: Option<u64>,
    pub connect_timeout_secs: Option<u64>,
    pub log_level: Option<String>,
}

impl ClientConfig {
    /// Loads configuration from a file if it exists, otherwise returns the default config
    pub fn load_from_file(path: &Path) -> ChatResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .map_err(|e| ChatError::ConfigError(format!("Failed to read config file: {}", e)))?;

        toml::from_str(&content)
            .map_err(|e| ChatError::ConfigError(format!("Failed to parse config file: {}", e)))
    }

    /// Saves configuration to a file
    pub fn save_to_file(&self, path: &Path) -> ChatResult<()> {
        let content = toml::to_string(self)
            .map_err(|e| ChatError::ConfigError(format!("Failed to serialize config: {}", e)))?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                ChatError::ConfigError(format!("Failed to create config directory: {}", e))
            })?;
        }

        fs::write(path, content)
            .map_err(|e| ChatError::ConfigError(format!("Failed to write config file: {}", e)))
    }

    /// Endpoint overrides taken from the process environment
    pub fn from_env() -> Self {
        Self {
            chat_endpoint: env::var(CHAT_URL_ENV).ok().filter(|v| !v.is_empty()),
            feedback_endpoint: env::var(FEEDBACK_URL_ENV).ok().filter(|v| !v.is_empty()),
            ..Self::default()
        }
    }

    /// Merges this config with another config, preferring values from the other config if present
    pub fn merge(&self, other: &Self) -> Self {
        Self {
            chat_endpoint: other
                .chat_endpoint
                .clone()
                .or_else(|| self.chat_endpoint.clone()),
            feedback_endpoint: other
                .feedback_endpoint
                .clone()
                .or_else(|| self.feedback_endpoint.clone()),
            archive_endpoint: other
                .archive_endpoint
                .clone()
                .or_else(|| self.archive_endpoint.clone()),
            request_format: other.request_format.or(self.request_format),
            reply_style: other.reply_style.or(self.reply_style),
            request_timeout_secs: other.request_timeout_secs.or(self.request_timeout_secs),
            connect_timeout_secs: other.connect_timeout_secs.or(self.connect_timeout_secs),
            log_level: other.log_level.clone().or_else(|| self.log_level.clone()),
        }
    }

    pub fn chat_endpoint(&self) -> &str {
        self.chat_endpoint.as_deref().unwrap_or(DEFAULT_CHAT_ENDPOINT)
    }

    pub fn feedback_endpoint(&self) -> &str {
        self.feedback_endpoint
            .as_deref()
            .unwrap_or(DEFAULT_FEEDBACK_ENDPOINT)
    }

    pub fn archive_endpoint(&self) -> Option<&str> {
        self.archive_endpoint.as_deref().filter(|url| !url.is_empty())
    }

    pub fn request_format(&self) -> RequestFormat {
        self.request_format.unwrap_or_default()
    }

    pub fn reply_style(&self) -> ReplyStyle {
        self.reply_style.unwrap_or_default()
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(
            self.request_timeout_secs
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
        )
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(
            self.connect_timeout_secs
                .unwrap_or(DEFAULT_CONNECT_TIMEOUT_SECS),
        )
    }

    pub fn log_level(&self) -> &str {
        self.log_level.as_deref().unwrap_or(DEFAULT_LOG_LEVEL)
    }
}

/// Helper function to get default config directory
pub fn get_default_config_dir(app_name: &str) -> ChatResult<PathBuf> {
    let home_dir = dirs::home_dir().ok_or_else(|| {
        ChatError::ConfigError("Could not determine home directory".to_string())
    })?;

    Ok(home_dir.join(".config").join(app_name))
}

/// Helper function to get default config file path
pub fn get_default_config_file(app_name: &str) -> ChatResult<PathBuf> {
    let config_dir = get_default_config_dir(app_name)?;
    Ok(config_dir.join("config.toml"))
}
