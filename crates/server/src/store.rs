//! Local record of the images the demo has uploaded or claimed.

use async_trait::async_trait;
use ospry_client::Metadata;
use thiserror::Error;
use tokio::sync::RwLock;

/// Errors raised by a [`MetadataStore`] backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backend failed to complete the operation.
    #[error("store backend error: {0}")]
    Backend(String),
}

/// Storage for image metadata snapshots.
///
/// Entries are kept in insertion order and duplicates by id are allowed;
/// [`delete`](MetadataStore::delete) removes all of them.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Append a metadata snapshot.
    async fn insert(&self, metadata: Metadata) -> Result<(), StoreError>;

    /// Remove every entry with the given id. Returns `true` if any matched.
    async fn delete(&self, id: &str) -> Result<bool, StoreError>;

    /// Snapshot of all entries in insertion order.
    async fn list(&self) -> Result<Vec<Metadata>, StoreError>;
}

/// In-memory [`MetadataStore`]. Contents are lost on restart.
#[derive(Debug, Default)]
pub struct MemoryMetadataStore {
    entries: RwLock<Vec<Metadata>>,
}

impl MemoryMetadataStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MetadataStore for MemoryMetadataStore {
    async fn insert(&self, metadata: Metadata) -> Result<(), StoreError> {
        self.entries.write().await.push(metadata);
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<bool, StoreError> {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|m| m.id != id);
        Ok(entries.len() != before)
    }

    async fn list(&self) -> Result<Vec<Metadata>, StoreError> {
        Ok(self.entries.read().await.clone())
    }
}
