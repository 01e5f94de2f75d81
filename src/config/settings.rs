use anyhow::Result;
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "http://localhost:5000/api";
pub const DEFAULT_TIMEOUT_MS: u64 = 20_000;
pub const DEFAULT_FALLBACK_REPLY: &str =
    "I'm having trouble processing your request right now. Please try again.";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub backend: BackendConfig,
    pub session: SessionConfig,
    pub conversation: ConversationConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// API root, including the `/api` prefix.
    pub api_url: String,
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Attach `session_id` to every request.
    pub scoped: bool,
    pub storage_dir: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationConfig {
    pub channel_buffer_size: usize,
    pub fallback_reply: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl Settings {
    /// Defaults, then `config/{CONFIG_ENV}`, then `APP__*` variables, then `RAG_API_URL`.
    pub fn new() -> Result<Self, ConfigError> {
        let config_env = env::var("CONFIG_ENV").unwrap_or_else(|_| "default".to_string());

        let config = Self::defaults()?
            .add_source(File::with_name(&format!("config/{}", config_env)).required(false))
            .add_source(Environment::with_prefix("APP").separator("__"))
            .set_override_option("backend.api_url", env::var("RAG_API_URL").ok())?
            .build()?;

        config.try_deserialize()
    }

    /// Built-in defaults only, ignoring files and the environment.
    pub fn from_defaults() -> Result<Self, ConfigError> {
        Self::defaults()?.build()?.try_deserialize()
    }

    fn defaults() -> Result<config::ConfigBuilder<config::builder::DefaultState>, ConfigError> {
        Config::builder()
            .set_default("backend.api_url", DEFAULT_API_URL)?
            .set_default("backend.timeout_ms", DEFAULT_TIMEOUT_MS)?
            .set_default("session.scoped", true)?
            .set_default("session.storage_dir", "./.ragchat")?
            .set_default("conversation.channel_buffer_size", 32)?
            .set_default("conversation.fallback_reply", DEFAULT_FALLBACK_REPLY)?
            .set_default("logging.level", "info")
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.backend.timeout_ms)
    }

    pub fn storage_dir(&self) -> PathBuf {
        PathBuf::from(&self.session.storage_dir)
    }
}
