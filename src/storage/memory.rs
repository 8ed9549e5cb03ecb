use super::ArticleStore;
use crate::error::Result;
use crate::models::{ClassifiedArticle, StoredArticle};
use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

/// Process-local store, used for dry runs and tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    articles: RwLock<Vec<StoredArticle>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.articles.read().await.len()
    }
}

#[async_trait]
impl ArticleStore for MemoryStore {
    async fn insert(&self, article: &ClassifiedArticle) -> Result<()> {
        let mut articles = self.articles.write().await;
        let id = articles.len() as i64 + 1;
        articles.push(StoredArticle {
            id,
            ticker: article.ticker.clone(),
            url: article.url.clone(),
            content: article.content.clone(),
            ingested_at: Utc::now(),
        });
        Ok(())
    }

    async fn by_ticker(&self, ticker: &str) -> Result<Vec<StoredArticle>> {
        let articles = self.articles.read().await;
        Ok(articles
            .iter()
            .filter(|a| a.ticker == ticker)
            .cloned()
            .collect())
    }
}
