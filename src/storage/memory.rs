//! In-Memory Local Storage
//!
//! Values are lost when the process exits. Used by tests and by
//! `--ephemeral` runs.

use super::LocalStorage;
use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

pub struct InMemoryStorage {
    values: Arc<RwLock<HashMap<String, String>>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self {
            values: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl Default for InMemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LocalStorage for InMemoryStorage {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let values = self.values.read().await;
        Ok(values.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut values = self.values.write().await;
        values.insert(key.to_string(), value.to_string());
        tracing::debug!("[InMemoryStorage] Stored '{}'", key);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let mut values = self.values.write().await;
        values.remove(key);
        tracing::debug!("[InMemoryStorage] Removed '{}'", key);
        Ok(())
    }

    async fn contains(&self, key: &str) -> Result<bool> {
        let values = self.values.read().await;
        Ok(values.contains_key(key))
    }
}
