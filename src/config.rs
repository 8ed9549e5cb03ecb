//! Pipeline configuration.
//!
//! Every tunable of the pipeline lives in [`PipelineConfig`] and is handed to
//! components when they are built; nothing below `main` reads the
//! environment. The struct can be loaded from a YAML file, every section and
//! field is optional, and missing values fall back to the defaults documented
//! on each field.
//!
//! # Example
//!
//! ```yaml
//! renderer:
//!   endpoint: http://splash:8050
//!   wait_seconds: 3
//! assembler:
//!   head_anchor: "Bid Wealth Invest ETF Report Streaming"
//!   tail_anchor: "View comments"
//! runner:
//!   tickers: [AAPL, MSFT, NVDA]
//! ```

use crate::error::{PipelineError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, instrument};

/// Browser-like identifier sent with render requests and robots.txt fetches.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36 Mediapartners-Google";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub renderer: RendererConfig,
    pub noise: NoiseConfig,
    pub assembler: AssemblerConfig,
    pub classifier: ClassifierConfig,
    pub worker: WorkerConfig,
    pub news: NewsConfig,
    pub runner: RunnerConfig,
    pub storage: StorageConfig,
}

/// Settings for the Splash-compatible rendering service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    /// Base URL of the rendering service. Default `http://localhost:8050`.
    pub endpoint: String,
    /// Seconds the renderer waits after page load before capturing HTML. Default 2.
    pub wait_seconds: f64,
    /// Render timeout passed to the service, in seconds. Default 30.
    pub timeout_secs: u64,
    /// Client identifier. Default [`DEFAULT_USER_AGENT`].
    pub user_agent: String,
    /// Skip URLs the target site's robots.txt disallows. Default true.
    pub obey_robots: bool,
    /// Extra attempts for transient render failures. Default 2.
    pub max_retries: usize,
    /// First backoff delay in milliseconds; doubles per attempt. Default 1000.
    pub retry_base_delay_ms: u64,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8050".to_string(),
            wait_seconds: 2.0,
            timeout_secs: 30,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            obey_robots: true,
            max_retries: 2,
            retry_base_delay_ms: 1000,
        }
    }
}

/// Thresholds of the length and symbol-density noise rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoiseConfig {
    /// Fragments shorter than this many characters are noise. Default 5.
    pub min_length: usize,
    /// Fragments whose alphanumeric share is below this are noise. Default 0.5.
    pub min_alnum_ratio: f64,
}

impl Default for NoiseConfig {
    fn default() -> Self {
        Self {
            min_length: 5,
            min_alnum_ratio: 0.5,
        }
    }
}

/// Anchor phrases bounding the article body inside the joined page text.
///
/// The defaults match the Yahoo Finance article template. On sites without
/// these phrases trimming is a no-op and the whole page text is kept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssemblerConfig {
    pub head_anchor: Option<String>,
    pub tail_anchor: Option<String>,
}

impl Default for AssemblerConfig {
    fn default() -> Self {
        Self {
            head_anchor: Some("Bid Wealth Invest ETF Report Streaming".to_string()),
            tail_anchor: Some("View comments".to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Case-insensitive substrings that make a document AI-relevant.
    pub keywords: Vec<String>,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            keywords: [
                "artificial intelligence",
                "machine learning",
                "deep learning",
                "neural network",
                "ai technology",
                "generative ai",
                "llm",
                "large language model",
            ]
            .iter()
            .map(|k| k.to_string())
            .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Well-known path of the transfer artifact. Default `output.json`.
    pub artifact_path: PathBuf,
    /// Upper bound on one worker run, in seconds. Default 900, which covers
    /// `news.max_items` URLs at the full per-URL budget.
    pub timeout_secs: u64,
    /// Time one URL may take, retries included, in seconds. Default 45.
    pub url_timeout_secs: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            artifact_path: PathBuf::from("output.json"),
            timeout_secs: 900,
            url_timeout_secs: 45,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NewsConfig {
    /// Feed URL template; `{ticker}` is replaced by the URL-encoded symbol.
    pub feed_url: String,
    /// Maximum number of feed items turned into candidates. Default 20.
    pub max_items: usize,
}

impl Default for NewsConfig {
    fn default() -> Self {
        Self {
            feed_url: "https://feeds.finance.yahoo.com/rss/2.0/headline?s={ticker}&region=US&lang=en-US"
                .to_string(),
            max_items: 20,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Tickers processed on every run. Default `AAPL`, `MSFT`.
    pub tickers: Vec<String>,
    /// Pause between two tickers, in seconds. Default 5.
    pub inter_ticker_delay_secs: u64,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            tickers: vec!["AAPL".to_string(), "MSFT".to_string()],
            inter_ticker_delay_secs: 5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Sqlite,
    Memory,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// sqlx connection string. Default `sqlite:articles.db`.
    pub database_url: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Sqlite,
            database_url: "sqlite:articles.db".to_string(),
        }
    }
}

impl PipelineConfig {
    /// Load the configuration from a YAML file, or the defaults when no path is given.
    #[instrument(level = "info")]
    pub async fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            info!("No config file given; using defaults");
            return Ok(Self::default());
        };
        let raw = tokio::fs::read_to_string(path).await?;
        let config = Self::from_yaml(&raw)?;
        info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    pub fn from_yaml(raw: &str) -> Result<Self> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(raw)?)
    }

    /// Reject settings that would make every page noise or nothing relevant.
    pub fn validate(&self) -> Result<()> {
        if self.classifier.keywords.iter().all(|k| k.trim().is_empty()) {
            return Err(PipelineError::Config(
                "classifier.keywords must contain at least one keyword".to_string(),
            ));
        }
        if !(self.noise.min_alnum_ratio > 0.0 && self.noise.min_alnum_ratio <= 1.0) {
            return Err(PipelineError::Config(format!(
                "noise.min_alnum_ratio must be in (0, 1], got {}",
                self.noise.min_alnum_ratio
            )));
        }
        if self.renderer.wait_seconds < 0.0 {
            return Err(PipelineError::Config(
                "renderer.wait_seconds must not be negative".to_string(),
            ));
        }
        if self.worker.url_timeout_secs == 0 || self.worker.timeout_secs == 0 {
            return Err(PipelineError::Config(
                "worker timeouts must be positive".to_string(),
            ));
        }
        if self.worker.artifact_path.as_os_str().is_empty() {
            return Err(PipelineError::Config(
                "worker.artifact_path must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Normalize a list of ticker symbols: trim, upper-case, drop blanks.
pub fn normalize_tickers<I, S>(raw: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    raw.into_iter()
        .map(|t| t.as_ref().trim().to_uppercase())
        .filter(|t| !t.is_empty())
        .collect()
}
