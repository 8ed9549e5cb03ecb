//! Persistence of classified articles.
//!
//! Each insert is an independent, self-contained record: there is no
//! uniqueness constraint, so concurrent coordinators may insert without
//! further coordination and repeated runs may store the same URL twice.

pub mod memory;
pub mod sqlite;

use crate::config::{StorageBackend, StorageConfig};
use crate::error::Result;
use crate::models::{ClassifiedArticle, StoredArticle};
use async_trait::async_trait;
use std::sync::Arc;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

#[async_trait]
pub trait ArticleStore: Send + Sync {
    /// Store one article.
    async fn insert(&self, article: &ClassifiedArticle) -> Result<()>;

    /// All articles stored for `ticker`, oldest first.
    async fn by_ticker(&self, ticker: &str) -> Result<Vec<StoredArticle>>;
}

/// Open the backend selected in the configuration.
pub async fn open_store(config: &StorageConfig) -> Result<Arc<dyn ArticleStore>> {
    match config.backend {
        StorageBackend::Sqlite => Ok(Arc::new(SqliteStore::connect(&config.database_url).await?)),
        StorageBackend::Memory => Ok(Arc::new(MemoryStore::new())),
    }
}
