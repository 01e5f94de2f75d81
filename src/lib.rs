//! ragchat - session client and conversation state for a RAG Assistant backend
//!
//! The backend does the retrieval work. This crate talks to it over its
//! REST API (`core`), keeps the per-user session identifier
//! (`storage`), and owns the chat transcript and document list
//! (`conversation`).

mod config;
pub mod conversation;
pub mod core;
pub mod storage;
pub mod utils;

pub mod cli;

pub use crate::config::{Settings, DEFAULT_API_URL, DEFAULT_FALLBACK_REPLY};
pub use crate::conversation::{ConversationHandle, ConversationOptions, ConversationState};
pub use crate::core::{BackendApi, ClientConfig, ClientError, SessionClient, UploadFile};

use anyhow::Result;
use std::sync::Arc;
use crate::storage::{LocalStorage, SessionIdentity};

/// Build the session client described by `settings`.
///
/// When session scoping is on, the identifier is read from `storage`, or
/// created and stored there on first use.
pub async fn connect(settings: &Settings, storage: Arc<dyn LocalStorage>) -> Result<SessionClient> {
    let session_id = if settings.session.scoped {
        Some(SessionIdentity::new(storage).get_or_create().await?)
    } else {
        None
    };

    tracing::info!(
        "Connecting to {} (session: {})",
        settings.backend.api_url,
        session_id.as_deref().unwrap_or("implicit")
    );

    Ok(SessionClient::new(ClientConfig::from_settings(
        settings, session_id,
    )))
}
