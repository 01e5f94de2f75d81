//! Client-Local Storage Abstraction
//!
//! Information Hiding:
//! - Where persisted values live (memory, files) is hidden behind the trait
//! - The session identifier is the only value this crate persists

use anyhow::Result;
use async_trait::async_trait;

pub mod filesystem;
pub mod memory;
pub mod session;

pub use filesystem::FileSystemStorage;
pub use memory::InMemoryStorage;
pub use session::{SessionIdentity, SESSION_STORAGE_KEY};

/// Durable string values under fixed keys
#[async_trait]
pub trait LocalStorage: Send + Sync {
    /// Returns `None` when nothing is stored under `key`
    async fn get(&self, key: &str) -> Result<Option<String>>;

    async fn set(&self, key: &str, value: &str) -> Result<()>;

    async fn remove(&self, key: &str) -> Result<()>;

    async fn contains(&self, key: &str) -> Result<bool> {
        Ok(self.get(key).await?.is_some())
    }
}
