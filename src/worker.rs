//! The isolated crawl step.
//!
//! Rendering and text processing for a whole batch run in a separate worker
//! so that a misbehaving page or a wedged renderer cannot take the
//! coordinator down with it. The exchange is deliberately simple:
//!
//! 1. The coordinator starts the worker with a [`WorkerRequest`] (config,
//!    URLs, artifact path) and blocks until it exits or times out.
//! 2. The worker renders and assembles every URL it can, writes the results
//!    as a JSON array of `{url, text}` to the transfer artifact, and exits.
//! 3. The coordinator reads the artifact and deletes it ([`take_artifact`]).
//!
//! The artifact lives at one well-known path. Batches are serialized, so only
//! one worker writes it at a time; running batches in parallel would need a
//! unique artifact path per batch.

use crate::config::{PipelineConfig, WorkerConfig};
use crate::error::{PipelineError, Result};
use crate::models::AssembledDocument;
use crate::render::{Renderer, build_renderer};
use crate::text::PageProcessor;
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::fs;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, Command};
use tokio::time::{Instant, timeout};
use tracing::{debug, error, info, instrument, warn};

/// What a worker process receives on stdin.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerRequest {
    pub config: PipelineConfig,
    pub urls: Vec<String>,
    pub artifact: PathBuf,
}

/// Runs the crawl for one batch and leaves its results in the artifact.
pub trait CrawlWorker {
    async fn crawl(&self, urls: &[String], artifact: &Path) -> Result<()>;
}

/// Time left between the crawl deadline and the parent's kill timeout, for
/// writing the artifact.
const ARTIFACT_GRACE: Duration = Duration::from_secs(10);

/// Time limits for one crawl. `None` means unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CrawlBudget {
    /// Per URL, retries included.
    pub per_url: Option<Duration>,
    /// For the whole batch. URLs not started by then are skipped.
    pub total: Option<Duration>,
}

impl CrawlBudget {
    /// Budget for a worker the parent kills after `timeout_secs`: the crawl
    /// stops early enough to still write its artifact.
    pub fn from_config(config: &WorkerConfig) -> Self {
        let total = Duration::from_secs(config.timeout_secs);
        Self {
            per_url: Some(Duration::from_secs(config.url_timeout_secs)),
            total: Some(total.saturating_sub(ARTIFACT_GRACE.min(total / 2))),
        }
    }
}

/// Render and assemble `urls` in order. Failed or slow URLs are logged and
/// skipped, pages holding only noise yield nothing.
#[instrument(level = "info", skip_all, fields(urls = urls.len()))]
pub async fn crawl_urls<R: Renderer>(
    renderer: &R,
    processor: &PageProcessor,
    urls: &[String],
    budget: CrawlBudget,
) -> Vec<AssembledDocument> {
    let deadline = budget.total.map(|total| Instant::now() + total);

    let documents: Vec<AssembledDocument> = stream::iter(urls)
        .then(|url| async move {
            let limit = match deadline {
                Some(deadline) => {
                    let left = deadline.saturating_duration_since(Instant::now());
                    if left.is_zero() {
                        warn!(%url, "Crawl deadline passed; skipping URL");
                        return None;
                    }
                    Some(budget.per_url.map_or(left, |per_url| per_url.min(left)))
                }
                None => budget.per_url,
            };
            let rendered = match limit {
                Some(limit) => match timeout(limit, renderer.render(url)).await {
                    Ok(rendered) => rendered,
                    Err(_) => {
                        warn!(%url, ?limit, "Render exceeded its time budget; skipping URL");
                        return None;
                    }
                },
                None => renderer.render(url).await,
            };
            let page = match rendered {
                Ok(page) => page,
                Err(e) => {
                    warn!(%url, error = %e, "Render failed; skipping URL");
                    return None;
                }
            };
            match catch_unwind(AssertUnwindSafe(|| processor.process(&page))) {
                Ok(document) => document,
                Err(_) => {
                    error!(%url, "Text processing panicked; skipping URL");
                    None
                }
            }
        })
        .filter_map(std::future::ready)
        .collect()
        .await;

    info!(
        requested = urls.len(),
        assembled = documents.len(),
        "Crawl finished"
    );
    documents
}

/// Write the artifact through a temporary file so readers never see a
/// partial array.
pub async fn write_artifact(path: &Path, documents: &[AssembledDocument]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await?;
    }
    let partial = partial_path(path);
    fs::write(&partial, serde_json::to_vec(documents)?).await?;
    fs::rename(&partial, path).await?;
    debug!(path = %path.display(), count = documents.len(), "Wrote transfer artifact");
    Ok(())
}

/// Read the artifact and delete it. The file is removed before it is parsed,
/// so a corrupt artifact is never picked up twice.
pub async fn take_artifact(path: &Path) -> Result<Vec<AssembledDocument>> {
    let raw = match fs::read(path).await {
        Ok(raw) => raw,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(PipelineError::ArtifactMissing(path.to_path_buf()));
        }
        Err(e) => return Err(e.into()),
    };
    fs::remove_file(path).await?;
    Ok(serde_json::from_slice(&raw)?)
}

fn partial_path(path: &Path) -> PathBuf {
    path.with_extension("partial")
}

/// Remove an artifact, and any half-written temporary file, left behind by
/// an earlier, interrupted batch. Returns whether an artifact was removed.
pub async fn clear_stale_artifact(path: &Path) -> Result<bool> {
    if remove_if_present(&partial_path(path)).await? {
        debug!(path = %path.display(), "Removed partial transfer artifact");
    }
    remove_if_present(path).await
}

async fn remove_if_present(path: &Path) -> Result<bool> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}

/// Crawls in the calling process.
pub struct InProcessWorker<R> {
    renderer: R,
    processor: PageProcessor,
    budget: CrawlBudget,
}

impl<R: Renderer> InProcessWorker<R> {
    pub fn new(renderer: R, processor: PageProcessor) -> Self {
        Self {
            renderer,
            processor,
            budget: CrawlBudget::default(),
        }
    }

    pub fn with_budget(mut self, budget: CrawlBudget) -> Self {
        self.budget = budget;
        self
    }

    #[cfg(test)]
    pub fn renderer(&self) -> &R {
        &self.renderer
    }
}

impl<R: Renderer> CrawlWorker for InProcessWorker<R> {
    async fn crawl(&self, urls: &[String], artifact: &Path) -> Result<()> {
        let documents = crawl_urls(&self.renderer, &self.processor, urls, self.budget).await;
        write_artifact(artifact, &documents).await
    }
}

/// Crawls in a child process: by default this same binary, started with
/// the hidden `crawl` subcommand.
#[derive(Debug, Clone)]
pub struct ProcessWorker {
    program: PathBuf,
    args: Vec<String>,
    config: PipelineConfig,
    timeout: Duration,
}

impl ProcessWorker {
    pub fn new(program: PathBuf, config: PipelineConfig) -> Self {
        let timeout = Duration::from_secs(config.worker.timeout_secs);
        Self {
            program,
            args: vec!["crawl".to_string()],
            config,
            timeout,
        }
    }

    /// A worker that re-executes the running binary.
    pub fn current_exe(config: PipelineConfig) -> Result<Self> {
        Ok(Self::new(std::env::current_exe()?, config))
    }

    #[cfg(test)]
    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    #[cfg(test)]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl CrawlWorker for ProcessWorker {
    #[instrument(level = "info", skip_all, fields(urls = urls.len(), program = %self.program.display()))]
    async fn crawl(&self, urls: &[String], artifact: &Path) -> Result<()> {
        let request = WorkerRequest {
            config: self.config.clone(),
            urls: urls.to_vec(),
            artifact: artifact.to_path_buf(),
        };
        let payload = serde_json::to_vec(&request)?;

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()?;
        info!(pid = child.id(), "Crawl worker started");

        let waited = timeout(self.timeout, feed_and_wait(&mut child, &payload)).await;
        match waited {
            Ok(status) => {
                let status = status?;
                if status.success() {
                    info!("Crawl worker finished");
                    Ok(())
                } else {
                    Err(PipelineError::Worker(format!("worker exited with {status}")))
                }
            }
            Err(_) => {
                warn!(timeout = ?self.timeout, "Crawl worker timed out; killing it");
                if let Err(e) = child.kill().await {
                    warn!(error = %e, "Failed to kill crawl worker");
                }
                Err(PipelineError::Worker(format!(
                    "worker timed out after {:?}",
                    self.timeout
                )))
            }
        }
    }
}

/// Send the request on the child's stdin and wait for it to exit. A child
/// that exits without reading its input is reported through its status.
async fn feed_and_wait(child: &mut Child, payload: &[u8]) -> std::io::Result<ExitStatus> {
    if let Some(mut stdin) = child.stdin.take() {
        let fed = match stdin.write_all(payload).await {
            Ok(()) => stdin.shutdown().await,
            Err(e) => Err(e),
        };
        match fed {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::BrokenPipe => {
                debug!("Crawl worker closed stdin early");
            }
            Err(e) => return Err(e),
        }
    }
    child.wait().await
}

/// Parse the request a parent process sent on `reader`.
pub async fn read_request<T: AsyncRead + Unpin>(reader: &mut T) -> Result<WorkerRequest> {
    let mut raw = String::new();
    reader.read_to_string(&mut raw).await?;
    Ok(serde_json::from_str(&raw)?)
}

/// Entry point of a worker process: crawl the requested URLs and write the
/// artifact. Returns the number of documents written.
#[instrument(level = "info", skip_all, fields(urls = request.urls.len(), artifact = %request.artifact.display()))]
pub async fn serve_request(request: WorkerRequest) -> Result<usize> {
    request.config.validate()?;
    let renderer = build_renderer(&request.config.renderer)?;
    let processor = PageProcessor::new(&request.config);

    let budget = CrawlBudget::from_config(&request.config.worker);
    let documents = crawl_urls(&renderer, &processor, &request.urls, budget).await;
    write_artifact(&request.artifact, &documents).await?;
    Ok(documents.len())
}
