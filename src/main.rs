//! # Ticker AI News
//!
//! An ingestion pipeline that collects news about stock tickers, renders each
//! article in a headless browser, pulls out the readable text and keeps the
//! articles that talk about artificial intelligence.
//!
//! ## Features
//!
//! - Headline discovery per ticker from the Yahoo Finance RSS feed
//! - JavaScript rendering through a Splash-compatible service, honoring robots.txt
//! - Visible-text extraction with heuristic noise filtering and boilerplate trimming
//! - Keyword-based AI-relevance classification
//! - Persistence to SQLite (or memory for dry runs)
//! - One-shot or daily scheduled runs
//!
//! ## Usage
//!
//! ```sh
//! ticker_ai_news run --tickers "AAPL, MSFT"
//! ticker_ai_news articles --ticker AAPL --query "machine learning"
//! ```
//!
//! ## Architecture
//!
//! 1. **Discovery**: the news source lists candidate article URLs per ticker
//! 2. **Crawl**: a worker process renders and assembles every URL of the batch
//!    and hands the results back through a JSON transfer artifact
//! 3. **Classification**: the coordinator keeps AI-related documents
//! 4. **Persistence**: each relevant article is stored as its own record

use clap::Parser;
use std::error::Error;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod cli;
mod config;
mod coordinator;
mod error;
mod models;
mod outputs;
mod render;
mod runner;
mod sources;
mod storage;
mod text;
mod utils;
mod worker;

use cli::{ArticlesArgs, Cli, Command, RunArgs, RunMode};
use config::{PipelineConfig, StorageBackend, normalize_tickers};
use coordinator::Coordinator;
use error::PipelineError;
use render::build_renderer;
use runner::{PeriodicRunner, startup_time_of_day};
use sources::YahooFinanceSource;
use storage::{ArticleStore, open_store};
use text::PageProcessor;
use text::classify::RelevanceClassifier;
use utils::{ensure_parent_writable, sqlite_file};
use worker::{CrawlBudget, CrawlWorker, InProcessWorker, ProcessWorker};

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    // stderr, so `articles` output stays clean and worker children share the stream
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    let args = Cli::parse();
    debug!(?args, "Parsed CLI arguments");

    match args.command {
        Command::Crawl => {
            let request = worker::read_request(&mut tokio::io::stdin()).await?;
            let written = worker::serve_request(request).await?;
            info!(written, "Crawl worker done");
        }
        Command::Run(run_args) => {
            info!("ticker_ai_news starting up");
            let mut config = PipelineConfig::load(args.config.as_deref()).await?;
            run_args.apply(&mut config);
            run(config, run_args).await?;
        }
        Command::Articles(articles_args) => {
            let mut config = PipelineConfig::load(args.config.as_deref()).await?;
            articles_args.apply(&mut config);
            list_articles(config, articles_args).await?;
        }
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );
    Ok(())
}

/// Startup checks, then hand over to the runner with the selected worker.
async fn run(config: PipelineConfig, args: RunArgs) -> Result<(), Box<dyn Error>> {
    config.validate()?;
    if config.runner.tickers.is_empty() {
        return Err(PipelineError::Config("no tickers configured".to_string()).into());
    }
    info!(tickers = ?config.runner.tickers, mode = ?args.mode, "Configuration ready");

    // Early checks: the artifact and database directories must be writable
    ensure_parent_writable(&config.worker.artifact_path).await?;
    if config.storage.backend == StorageBackend::Sqlite {
        if let Some(db_file) = sqlite_file(&config.storage.database_url) {
            ensure_parent_writable(db_file).await?;
        }
    }

    let store = open_store(&config.storage).await?;
    let source = YahooFinanceSource::new(&config.news)?;

    if args.in_process {
        let worker = InProcessWorker::new(build_renderer(&config.renderer)?, PageProcessor::new(&config))
            .with_budget(CrawlBudget::from_config(&config.worker));
        drive(&config, &args, source, worker, store).await;
    } else {
        let worker = ProcessWorker::current_exe(config.clone())?;
        drive(&config, &args, source, worker, store).await;
    }
    Ok(())
}

async fn drive<W: CrawlWorker>(
    config: &PipelineConfig,
    args: &RunArgs,
    source: YahooFinanceSource,
    worker: W,
    store: Arc<dyn ArticleStore>,
) {
    let coordinator = Coordinator::new(
        worker,
        RelevanceClassifier::new(&config.classifier),
        store,
        config.worker.artifact_path.clone(),
    );
    let runner = PeriodicRunner::new(
        source,
        coordinator,
        config.runner.tickers.clone(),
        Duration::from_secs(config.runner.inter_ticker_delay_secs),
    );

    match args.mode {
        RunMode::Once => {
            runner.run_once().await;
        }
        RunMode::Schedule => {
            let at = args.at.unwrap_or_else(startup_time_of_day);
            info!(%at, "Scheduling daily runs");
            runner.run_scheduled(at).await;
        }
    }
}

async fn list_articles(config: PipelineConfig, args: ArticlesArgs) -> Result<(), Box<dyn Error>> {
    let Some(ticker) = normalize_tickers([args.ticker.as_str()]).pop() else {
        return Err(PipelineError::Config("ticker must not be empty".to_string()).into());
    };
    let store = open_store(&config.storage).await?;
    let articles = store.by_ticker(&ticker).await?;
    let articles = outputs::json::filter_articles(articles, args.query.as_deref());
    info!(%ticker, count = articles.len(), "Listing stored articles");
    outputs::json::write_articles(&articles, args.output.as_deref()).await?;
    Ok(())
}
