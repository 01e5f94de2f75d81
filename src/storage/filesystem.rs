//! File System Local Storage
//!
//! Information Hiding:
//! - File layout and JSON encoding hidden from users
//! - Directory creation handled on construction

use super::LocalStorage;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::PathBuf;
use tokio::fs;

/// One JSON file per key: `{base_path}/{key}.json`
pub struct FileSystemStorage {
    base_path: PathBuf,
}

impl FileSystemStorage {
    pub async fn new(base_path: PathBuf) -> Result<Self> {
        fs::create_dir_all(&base_path)
            .await
            .context("Failed to create storage directory")?;

        Ok(Self { base_path })
    }

    fn key_path(&self, key: &str) -> PathBuf {
        self.base_path.join(format!("{}.json", key))
    }
}

#[async_trait]
impl LocalStorage for FileSystemStorage {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.key_path(key);

        if !path.exists() {
            tracing::debug!("[FileSystemStorage] Key '{}' does not exist", key);
            return Ok(None);
        }

        let json = fs::read_to_string(&path)
            .await
            .context(format!("Failed to read storage file: {:?}", path))?;

        let value: String =
            serde_json::from_str(&json).context("Failed to deserialize stored value")?;

        Ok(Some(value))
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let path = self.key_path(key);
        let json = serde_json::to_string(value).context("Failed to serialize value")?;

        fs::write(&path, json)
            .await
            .context(format!("Failed to write storage file: {:?}", path))?;

        tracing::debug!("[FileSystemStorage] Stored '{}' at {:?}", key, path);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let path = self.key_path(key);

        if path.exists() {
            fs::remove_file(&path)
                .await
                .context(format!("Failed to delete storage file: {:?}", path))?;
            tracing::debug!("[FileSystemStorage] Removed '{}' at {:?}", key, path);
        }

        Ok(())
    }

    async fn contains(&self, key: &str) -> Result<bool> {
        Ok(self.key_path(key).exists())
    }
}
