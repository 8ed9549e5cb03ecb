use super::ArticleStore;
use crate::error::Result;
use crate::models::{ClassifiedArticle, StoredArticle};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Row;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use tracing::{info, instrument};

const MIGRATIONS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS articles (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        ticker TEXT NOT NULL,
        url TEXT NOT NULL,
        content TEXT NOT NULL,
        ingested_at TEXT NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_articles_ticker ON articles (ticker)",
];

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Connect to (and create if missing) the database at `database_url`,
    /// e.g. `sqlite:articles.db`.
    #[instrument(level = "info")]
    pub async fn connect(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        for migration in MIGRATIONS {
            sqlx::query(migration).execute(&pool).await?;
        }
        info!("Article database ready");

        Ok(Self { pool })
    }
}

#[async_trait]
impl ArticleStore for SqliteStore {
    async fn insert(&self, article: &ClassifiedArticle) -> Result<()> {
        sqlx::query(
            "INSERT INTO articles (ticker, url, content, ingested_at) VALUES (?, ?, ?, ?)",
        )
        .bind(&article.ticker)
        .bind(&article.url)
        .bind(&article.content)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn by_ticker(&self, ticker: &str) -> Result<Vec<StoredArticle>> {
        let rows = sqlx::query(
            "SELECT id, ticker, url, content, ingested_at FROM articles WHERE ticker = ? ORDER BY id",
        )
        .bind(ticker)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| -> Result<StoredArticle> {
                Ok(StoredArticle {
                    id: row.try_get("id")?,
                    ticker: row.try_get("ticker")?,
                    url: row.try_get("url")?,
                    content: row.try_get("content")?,
                    ingested_at: row.try_get::<DateTime<Utc>, _>("ingested_at")?,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::future::join_all;
    use tempfile::tempdir;

    fn article(url: &str) -> ClassifiedArticle {
        ClassifiedArticle {
            ticker: "MSFT".to_string(),
            url: url.to_string(),
            content: "Large language model revenue grows.".to_string(),
        }
    }

    async fn store_in(dir: &tempfile::TempDir) -> SqliteStore {
        let url = format!("sqlite:{}", dir.path().join("articles.db").display());
        SqliteStore::connect(&url).await.unwrap()
    }

    #[tokio::test]
    async fn test_insert_and_read_back() {
        let dir = tempdir().unwrap();
        let store = store_in(&dir).await;

        store.insert(&article("https://example.com/1")).await.unwrap();
        store.insert(&article("https://example.com/1")).await.unwrap();

        let stored = store.by_ticker("MSFT").await.unwrap();
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[0].url, "https://example.com/1");
        assert_eq!(stored[0].content, "Large language model revenue grows.");
        assert!(stored[0].id < stored[1].id);
        assert!(store.by_ticker("AAPL").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_inserts() {
        let dir = tempdir().unwrap();
        let store = store_in(&dir).await;

        let urls: Vec<String> = (0..8).map(|i| format!("https://example.com/{i}")).collect();
        let articles: Vec<ClassifiedArticle> = urls.iter().map(|u| article(u)).collect();
        let results = join_all(articles.iter().map(|a| store.insert(a))).await;

        assert!(results.iter().all(|r| r.is_ok()));
        assert_eq!(store.by_ticker("MSFT").await.unwrap().len(), 8);
    }

    #[tokio::test]
    async fn test_reopen_keeps_rows() {
        let dir = tempdir().unwrap();
        store_in(&dir)
            .await
            .insert(&article("https://example.com/x"))
            .await
            .unwrap();
        let reopened = store_in(&dir).await;
        assert_eq!(reopened.by_ticker("MSFT").await.unwrap().len(), 1);
    }
}
