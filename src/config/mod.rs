mod settings;

pub use settings::{
    BackendConfig, ConversationConfig, LoggingConfig, SessionConfig, Settings, DEFAULT_API_URL,
    DEFAULT_FALLBACK_REPLY, DEFAULT_TIMEOUT_MS,
};
