//! Data models that flow through the ingestion pipeline.
//!
//! Records move strictly downstream:
//! - [`ArticleCandidate`]: a ticker and URL nominated by the news source
//! - [`RenderedPage`]: the HTML the renderer produced for one candidate
//! - [`TextFragment`]: one visible text node pulled out of a rendered page
//! - [`AssembledDocument`]: the joined, boilerplate-trimmed page text
//! - [`ClassifiedArticle`]: an AI-relevant document ready to be persisted
//! - [`StoredArticle`]: a persisted article as returned by queries
//!
//! Only [`AssembledDocument`] crosses a process boundary (it is the record
//! type of the transfer artifact), and only [`ClassifiedArticle`] is written
//! to the store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A ticker + URL pair nominated for scraping, not yet rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleCandidate {
    /// Upper-cased ticker symbol, e.g. `AAPL`.
    pub ticker: String,
    /// Absolute article URL.
    pub url: String,
}

impl ArticleCandidate {
    pub fn new(ticker: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            ticker: ticker.into(),
            url: url.into(),
        }
    }
}

/// One entry of a news feed. Only `link` feeds the pipeline.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewsItem {
    pub title: String,
    pub link: String,
}

/// Fully rendered HTML for one URL. Discarded after extraction.
#[derive(Debug, Clone)]
pub struct RenderedPage {
    pub url: String,
    pub raw_html: String,
}

/// A unit of visible text, before noise filtering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextFragment {
    pub text: String,
}

impl TextFragment {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// The joined and trimmed text of one rendered page.
///
/// Serialized as `{"url": ..., "text": ...}`, which is exactly the record
/// layout of the transfer artifact written by the crawl worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssembledDocument {
    pub url: String,
    pub text: String,
}

/// An assembled document that passed AI-relevance classification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifiedArticle {
    pub ticker: String,
    pub url: String,
    pub content: String,
}

/// A persisted article as read back from a store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredArticle {
    pub id: i64,
    pub ticker: String,
    pub url: String,
    pub content: String,
    pub ingested_at: DateTime<Utc>,
}
