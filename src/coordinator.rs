//! Batch ingestion: candidates in, persisted articles out.
//!
//! The coordinator hands a batch of URLs to a [`CrawlWorker`], collects the
//! transfer artifact, classifies each document and writes the relevant ones
//! to the [`ArticleStore`]. Every failure below this level is logged and
//! counted; [`Coordinator::ingest_batch`] only ever returns a count.

use crate::models::{ArticleCandidate, ClassifiedArticle};
use crate::storage::ArticleStore;
use crate::text::classify::RelevanceClassifier;
use crate::utils::truncate_for_log;
use crate::worker::{CrawlWorker, clear_stale_artifact, take_artifact};
use itertools::Itertools;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

/// Per-batch outcome counts.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BatchReport {
    pub requested: usize,
    pub assembled: usize,
    pub empty: usize,
    pub irrelevant: usize,
    pub persisted: usize,
    pub store_failures: usize,
}

impl BatchReport {
    /// URLs that never made it into the artifact.
    pub fn failed_renders(&self) -> usize {
        self.requested.saturating_sub(self.assembled)
    }
}

pub struct Coordinator<W> {
    worker: W,
    classifier: RelevanceClassifier,
    store: Arc<dyn ArticleStore>,
    artifact_path: PathBuf,
}

impl<W: CrawlWorker> Coordinator<W> {
    pub fn new(
        worker: W,
        classifier: RelevanceClassifier,
        store: Arc<dyn ArticleStore>,
        artifact_path: PathBuf,
    ) -> Self {
        Self {
            worker,
            classifier,
            store,
            artifact_path,
        }
    }

    #[cfg(test)]
    pub fn worker(&self) -> &W {
        &self.worker
    }

    /// Ingest one batch for `ticker` and return the number of persisted
    /// articles.
    pub async fn ingest_batch(&self, ticker: &str, candidates: &[ArticleCandidate]) -> usize {
        self.ingest(ticker, candidates).await.persisted
    }

    /// Same as [`ingest_batch`](Self::ingest_batch), with the full report.
    #[instrument(level = "info", skip_all, fields(%ticker, candidates = candidates.len()))]
    pub async fn ingest(&self, ticker: &str, candidates: &[ArticleCandidate]) -> BatchReport {
        let urls: Vec<String> = candidates
            .iter()
            .map(|c| c.url.trim())
            .filter(|u| !u.is_empty())
            .unique()
            .map(str::to_string)
            .collect();

        let mut report = BatchReport {
            requested: urls.len(),
            ..BatchReport::default()
        };
        if urls.is_empty() {
            info!("No candidate URLs; skipping batch");
            return report;
        }

        match clear_stale_artifact(&self.artifact_path).await {
            Ok(true) => warn!(path = %self.artifact_path.display(), "Removed stale transfer artifact"),
            Ok(false) => {}
            Err(e) => warn!(error = %e, "Could not remove stale transfer artifact"),
        }

        if let Err(e) = self.worker.crawl(&urls, &self.artifact_path).await {
            error!(error = %e, "Crawl worker failed");
        }

        let documents = match take_artifact(&self.artifact_path).await {
            Ok(documents) => documents,
            Err(e) => {
                error!(error = %e, "No usable transfer artifact; batch yields nothing");
                return report;
            }
        };
        report.assembled = documents.len();

        for document in documents {
            if document.text.trim().is_empty() {
                debug!(url = %document.url, "Empty document dropped");
                report.empty += 1;
                continue;
            }
            let Some(keyword) = self.classifier.matched_keyword(&document.text) else {
                debug!(url = %document.url, "Not AI-related; discarded");
                report.irrelevant += 1;
                continue;
            };
            debug!(
                url = %document.url,
                %keyword,
                preview = %truncate_for_log(&document.text, 160),
                "AI-related article"
            );

            let article = ClassifiedArticle {
                ticker: ticker.to_string(),
                url: document.url,
                content: document.text,
            };
            match self.store.insert(&article).await {
                Ok(()) => {
                    info!(url = %article.url, "Persisted article");
                    report.persisted += 1;
                }
                Err(e) => {
                    error!(url = %article.url, error = %e, "Failed to persist article");
                    report.store_failures += 1;
                }
            }
        }

        info!(
            persisted = report.persisted,
            irrelevant = report.irrelevant,
            empty = report.empty,
            store_failures = report.store_failures,
            failed_renders = report.failed_renders(),
            "Batch complete"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{PipelineError, Result};
    use crate::models::StoredArticle;
    use crate::render::fake::StaticRenderer;
    use crate::storage::MemoryStore;
    use crate::text::PageProcessor;
    use crate::worker::InProcessWorker;
    use async_trait::async_trait;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::{TempDir, tempdir};

    const ARTICLE_URL: &str = "https://finance.example.com/news/a";

    fn page(first: &str) -> String {
        format!(
            "<html><body><p>{first}</p><div>function(){{ var x=1; }}</div><span>ok</span></body></html>"
        )
    }

    fn coordinator(
        renderer: StaticRenderer,
        store: Arc<dyn ArticleStore>,
        dir: &TempDir,
    ) -> Coordinator<InProcessWorker<StaticRenderer>> {
        Coordinator::new(
            InProcessWorker::new(renderer, PageProcessor::default()),
            RelevanceClassifier::default(),
            store,
            dir.path().join("output.json"),
        )
    }

    #[derive(Default)]
    struct CountingWorker {
        calls: AtomicUsize,
    }

    impl CrawlWorker for CountingWorker {
        async fn crawl(&self, _urls: &[String], _artifact: &Path) -> Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(PipelineError::Worker("crashed before writing".to_string()))
        }
    }

    struct BrokenStore;

    #[async_trait]
    impl ArticleStore for BrokenStore {
        async fn insert(&self, _article: &ClassifiedArticle) -> Result<()> {
            Err(PipelineError::Persistence("database is locked".to_string()))
        }

        async fn by_ticker(&self, _ticker: &str) -> Result<Vec<StoredArticle>> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn test_relevant_article_is_persisted() {
        let dir = tempdir().unwrap();
        let store = Arc::new(MemoryStore::new());
        let renderer =
            StaticRenderer::new().with_page(ARTICLE_URL, &page("Generative AI is transforming finance."));
        let coordinator = coordinator(renderer, store.clone(), &dir);

        let persisted = coordinator
            .ingest_batch("AAPL", &[ArticleCandidate::new("AAPL", ARTICLE_URL)])
            .await;

        assert_eq!(persisted, 1);
        let stored = store.by_ticker("AAPL").await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].url, ARTICLE_URL);
        assert_eq!(stored[0].content, "Generative AI is transforming finance.");
        assert!(!dir.path().join("output.json").exists());
    }

    #[tokio::test]
    async fn test_irrelevant_article_is_discarded() {
        let dir = tempdir().unwrap();
        let store = Arc::new(MemoryStore::new());
        let renderer =
            StaticRenderer::new().with_page(ARTICLE_URL, &page("Quarterly earnings beat expectations."));
        let coordinator = coordinator(renderer, store.clone(), &dir);

        let report = coordinator
            .ingest("AAPL", &[ArticleCandidate::new("AAPL", ARTICLE_URL)])
            .await;

        assert_eq!(report.persisted, 0);
        assert_eq!(report.irrelevant, 1);
        assert_eq!(store.len().await, 0);
    }

    #[tokio::test]
    async fn test_empty_batch_skips_worker() {
        let dir = tempdir().unwrap();
        let coordinator = Coordinator::new(
            CountingWorker::default(),
            RelevanceClassifier::default(),
            Arc::new(MemoryStore::new()),
            dir.path().join("output.json"),
        );

        assert_eq!(coordinator.ingest_batch("MSFT", &[]).await, 0);
        assert_eq!(coordinator.worker().calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_worker_failure_without_artifact_yields_zero() {
        let dir = tempdir().unwrap();
        let coordinator = Coordinator::new(
            CountingWorker::default(),
            RelevanceClassifier::default(),
            Arc::new(MemoryStore::new()),
            dir.path().join("output.json"),
        );

        let persisted = coordinator
            .ingest_batch("MSFT", &[ArticleCandidate::new("MSFT", ARTICLE_URL)])
            .await;
        assert_eq!(persisted, 0);
        assert_eq!(coordinator.worker().calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_all_renders_failing() {
        let dir = tempdir().unwrap();
        let store = Arc::new(MemoryStore::new());
        let coordinator = coordinator(StaticRenderer::new(), store.clone(), &dir);

        let candidates = [
            ArticleCandidate::new("NVDA", "https://a.example.com/1"),
            ArticleCandidate::new("NVDA", "https://a.example.com/2"),
        ];
        let report = coordinator.ingest("NVDA", &candidates).await;

        assert_eq!(report.persisted, 0);
        assert_eq!(report.failed_renders(), 2);
        assert_eq!(store.len().await, 0);
    }

    #[tokio::test]
    async fn test_duplicate_urls_render_once() {
        let dir = tempdir().unwrap();
        let store = Arc::new(MemoryStore::new());
        let renderer = StaticRenderer::new().with_page(ARTICLE_URL, &page("Machine learning lifts margins."));
        let coordinator = coordinator(renderer, store.clone(), &dir);

        let candidates = [
            ArticleCandidate::new("AAPL", ARTICLE_URL),
            ArticleCandidate::new("AAPL", ARTICLE_URL),
        ];
        assert_eq!(coordinator.ingest_batch("AAPL", &candidates).await, 1);
        assert_eq!(coordinator.worker().renderer().calls(), 1);
    }

    #[tokio::test]
    async fn test_store_failure_is_contained() {
        let dir = tempdir().unwrap();
        let renderer = StaticRenderer::new().with_page(ARTICLE_URL, &page("Deep learning demand grows."));
        let coordinator = coordinator(renderer, Arc::new(BrokenStore), &dir);

        let report = coordinator
            .ingest("AAPL", &[ArticleCandidate::new("AAPL", ARTICLE_URL)])
            .await;
        assert_eq!(report.persisted, 0);
        assert_eq!(report.store_failures, 1);
    }

    #[tokio::test]
    async fn test_stale_artifact_is_not_ingested() {
        let dir = tempdir().unwrap();
        let artifact = dir.path().join("output.json");
        tokio::fs::write(
            &artifact,
            br#"[{"url": "https://stale", "text": "Old generative AI story"}]"#,
        )
        .await
        .unwrap();
        let coordinator = Coordinator::new(
            CountingWorker::default(),
            RelevanceClassifier::default(),
            Arc::new(MemoryStore::new()),
            artifact.clone(),
        );

        let persisted = coordinator
            .ingest_batch("AAPL", &[ArticleCandidate::new("AAPL", ARTICLE_URL)])
            .await;
        assert_eq!(persisted, 0);
        assert!(!artifact.exists());
    }
}
