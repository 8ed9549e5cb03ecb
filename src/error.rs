//! Error taxonomy for the ingestion pipeline.
//!
//! Most of these errors never leave the unit they happen in: render failures
//! are per URL, persistence failures are per article, and a missing transfer
//! artifact turns a batch into a zero count. They are still typed so that the
//! retry decorator and the logs can tell them apart.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("render request for {url} failed: {source}")]
    RenderRequest {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("renderer returned status {status} for {url}: {message}")]
    RenderStatus {
        url: String,
        status: u16,
        message: String,
    },

    #[error("{url} is disallowed by robots.txt")]
    Disallowed { url: String },

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("transfer artifact missing at {}", .0.display())]
    ArtifactMissing(PathBuf),

    #[error("crawl worker failed: {0}")]
    Worker(String),

    #[error("persistence error: {0}")]
    Persistence(String),

    #[error("news source error: {0}")]
    Source(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl PipelineError {
    /// Whether a render attempt that failed this way is worth repeating.
    ///
    /// Transport failures, rate limiting and server-side errors (Splash answers
    /// 504 when its own render timeout fires) are transient. Robots exclusions
    /// and client errors are not.
    pub fn is_transient(&self) -> bool {
        match self {
            PipelineError::RenderRequest { .. } | PipelineError::Http(_) => true,
            PipelineError::RenderStatus { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

impl From<sqlx::Error> for PipelineError {
    fn from(err: sqlx::Error) -> Self {
        PipelineError::Persistence(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
