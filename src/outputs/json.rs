//! JSON listing of stored articles.
//!
//! Used by the `articles` subcommand. Output is a pretty-printed array of
//! stored articles, oldest first:
//!
//! ```text
//! [
//!   {
//!     "id": 1,
//!     "ticker": "NVDA",
//!     "url": "https://finance.yahoo.com/news/...",
//!     "content": "...",
//!     "ingested_at": "2025-10-14T12:00:00Z"
//!   }
//! ]
//! ```

use crate::error::Result;
use crate::models::StoredArticle;
use std::path::Path;
use tokio::fs;
use tokio::io::{self, AsyncWriteExt};
use tracing::{info, instrument};

/// Keep the articles whose content contains `query`, ignoring case.
pub fn filter_articles(articles: Vec<StoredArticle>, query: Option<&str>) -> Vec<StoredArticle> {
    let Some(query) = query.map(str::to_lowercase).filter(|q| !q.trim().is_empty()) else {
        return articles;
    };
    articles
        .into_iter()
        .filter(|a| a.content.to_lowercase().contains(&query))
        .collect()
}

/// Write `articles` as pretty JSON to `output`, or to stdout when `None`.
#[instrument(level = "info", skip_all, fields(count = articles.len()))]
pub async fn write_articles(articles: &[StoredArticle], output: Option<&Path>) -> Result<()> {
    let mut json = serde_json::to_string_pretty(articles)?;
    json.push('\n');

    match output {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent).await?;
            }
            fs::write(path, json).await?;
            info!(path = %path.display(), "Wrote article listing");
        }
        None => {
            let mut stdout = io::stdout();
            stdout.write_all(json.as_bytes()).await?;
            stdout.flush().await?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tempfile::tempdir;

    fn stored(id: i64, content: &str) -> StoredArticle {
        StoredArticle {
            id,
            ticker: "NVDA".to_string(),
            url: format!("https://example.com/{id}"),
            content: content.to_string(),
            ingested_at: Utc::now(),
        }
    }

    #[test]
    fn test_filter_is_case_insensitive() {
        let articles = vec![
            stored(1, "Nvidia sells more AI CHIPS"),
            stored(2, "Deep learning at the edge"),
        ];
        let hits = filter_articles(articles, Some("chips"));
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, 1);
    }

    #[test]
    fn test_blank_query_keeps_everything() {
        let articles = vec![stored(1, "a"), stored(2, "b")];
        assert_eq!(filter_articles(articles.clone(), None).len(), 2);
        assert_eq!(filter_articles(articles, Some("  ")).len(), 2);
    }

    #[tokio::test]
    async fn test_write_articles_to_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("listing/nvda.json");
        write_articles(&[stored(7, "LLM demand")], Some(&path))
            .await
            .unwrap();

        let raw = tokio::fs::read_to_string(&path).await.unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value[0]["id"], 7);
        assert_eq!(value[0]["content"], "LLM demand");
    }
}
