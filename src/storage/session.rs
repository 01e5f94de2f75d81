//! Session Identity
//!
//! The session identifier is created the first time it is asked for,
//! persisted through `LocalStorage`, and only replaced after an explicit reset.

use super::LocalStorage;
use anyhow::Result;
use std::sync::Arc;

pub const SESSION_STORAGE_KEY: &str = "rag_session_id";

const RANDOM_SUFFIX_LEN: usize = 9;

pub struct SessionIdentity {
    storage: Arc<dyn LocalStorage>,
}

impl SessionIdentity {
    pub fn new(storage: Arc<dyn LocalStorage>) -> Self {
        Self { storage }
    }

    /// Stored identifier, without creating one.
    pub async fn current(&self) -> Result<Option<String>> {
        self.storage.get(SESSION_STORAGE_KEY).await
    }

    pub async fn get_or_create(&self) -> Result<String> {
        if let Some(existing) = self.current().await? {
            return Ok(existing);
        }

        let session_id = generate_session_id();
        self.storage.set(SESSION_STORAGE_KEY, &session_id).await?;
        tracing::info!("[SessionIdentity] Created session '{}'", session_id);

        Ok(session_id)
    }

    /// Forget the stored identifier; the next `get_or_create` starts a new session.
    pub async fn reset(&self) -> Result<()> {
        self.storage.remove(SESSION_STORAGE_KEY).await?;
        tracing::info!("[SessionIdentity] Session identifier removed");
        Ok(())
    }
}

/// `session_<unix millis>_<9 lowercase alphanumerics>`
pub fn generate_session_id() -> String {
    let millis = chrono::Utc::now().timestamp_millis();
    let suffix: String = uuid::Uuid::new_v4()
        .simple()
        .to_string()
        .chars()
        .take(RANDOM_SUFFIX_LEN)
        .collect();

    format!("session_{}_{}", millis, suffix)
}
