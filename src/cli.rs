//! Command-line interface definitions for Ticker AI News.
//!
//! This module defines the CLI arguments and options using the `clap` crate.
//! Most options can also be provided via environment variables; values given
//! here override the YAML configuration file.

use crate::config::{PipelineConfig, StorageBackend, normalize_tickers};
use crate::runner::parse_time_of_day;
use chrono::NaiveTime;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Command-line arguments for the Ticker AI News application.
///
/// # Examples
///
/// ```sh
/// # One pass over the default tickers
/// ticker_ai_news run
///
/// # Daily at 07:30 for two tickers, custom Splash instance
/// ticker_ai_news run --tickers NVDA,AMD --mode schedule --at 07:30 \
///     --splash-url http://splash:8050
///
/// # What has been stored for NVDA mentioning "chips"
/// ticker_ai_news articles --ticker NVDA --query chips
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Optional path to a YAML config file
    #[arg(short, long, global = true, env = "TICKER_AI_NEWS_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Scrape, classify and store news for the configured tickers
    Run(RunArgs),
    /// Print stored articles for a ticker as JSON
    Articles(ArticlesArgs),
    /// Worker entry point: reads a crawl request on stdin
    #[command(hide = true)]
    Crawl,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Default, ValueEnum)]
pub enum RunMode {
    /// A single pass, then exit
    #[default]
    Once,
    /// A pass now, then one every day
    Schedule,
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Comma-separated ticker symbols, e.g. "AAPL, MSFT"
    #[arg(long, env = "TICKERS")]
    pub tickers: Option<String>,

    /// Run once or keep running on a daily schedule
    #[arg(long, env = "MODE", value_enum, ignore_case = true, default_value_t = RunMode::Once)]
    pub mode: RunMode,

    /// Daily run time (HH:MM, local). Defaults to the startup time
    #[arg(long, value_parser = parse_at)]
    pub at: Option<NaiveTime>,

    /// Base URL of the Splash rendering service
    #[arg(long, env = "SPLASH_URL")]
    pub splash_url: Option<String>,

    /// Database connection string, e.g. sqlite:articles.db
    #[arg(long, env = "DATABASE_URL")]
    pub database: Option<String>,

    /// Crawl inside this process instead of a child worker
    #[arg(long)]
    pub in_process: bool,
}

#[derive(Args, Debug)]
pub struct ArticlesArgs {
    /// Ticker symbol to list
    #[arg(short, long)]
    pub ticker: String,

    /// Case-insensitive substring the content must contain
    #[arg(short, long)]
    pub query: Option<String>,

    /// Write JSON here instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Database connection string, e.g. sqlite:articles.db
    #[arg(long, env = "DATABASE_URL")]
    pub database: Option<String>,
}

impl RunArgs {
    /// Overlay the flags (or their environment variables) on `config`.
    pub fn apply(&self, config: &mut PipelineConfig) {
        if let Some(tickers) = &self.tickers {
            config.runner.tickers = normalize_tickers(tickers.split(','));
        }
        if let Some(endpoint) = &self.splash_url {
            config.renderer.endpoint = endpoint.clone();
        }
        if let Some(database) = &self.database {
            config.storage.backend = StorageBackend::Sqlite;
            config.storage.database_url = database.clone();
        }
    }
}

impl ArticlesArgs {
    pub fn apply(&self, config: &mut PipelineConfig) {
        if let Some(database) = &self.database {
            config.storage.backend = StorageBackend::Sqlite;
            config.storage.database_url = database.clone();
        }
    }
}

fn parse_at(raw: &str) -> Result<NaiveTime, String> {
    parse_time_of_day(raw).ok_or_else(|| format!("expected HH:MM, got {raw:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_defaults() {
        let cli = Cli::parse_from(["ticker_ai_news", "run"]);
        let Command::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.mode, RunMode::Once);
        assert!(args.at.is_none());
        assert!(!args.in_process);
        assert!(cli.config.is_none());
    }

    #[test]
    fn test_run_all_flags() {
        let cli = Cli::parse_from([
            "ticker_ai_news",
            "--config",
            "/etc/tan.yaml",
            "run",
            "--tickers",
            "nvda, amd",
            "--mode",
            "schedule",
            "--at",
            "07:30",
            "--splash-url",
            "http://splash:8050",
            "--database",
            "sqlite:/tmp/a.db",
            "--in-process",
        ]);
        assert_eq!(cli.config, Some(PathBuf::from("/etc/tan.yaml")));
        let Command::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.tickers.as_deref(), Some("nvda, amd"));
        assert_eq!(args.mode, RunMode::Schedule);
        assert_eq!(args.at, NaiveTime::from_hms_opt(7, 30, 0));
        assert_eq!(args.splash_url.as_deref(), Some("http://splash:8050"));
        assert_eq!(args.database.as_deref(), Some("sqlite:/tmp/a.db"));
        assert!(args.in_process);
    }

    #[test]
    fn test_run_flags_override_config() {
        let cli = Cli::parse_from([
            "ticker_ai_news",
            "run",
            "--tickers",
            " nvda, ,amd ",
            "--splash-url",
            "http://render:8050",
            "--database",
            "sqlite:/data/a.db",
        ]);
        let Command::Run(args) = cli.command else {
            panic!("expected run");
        };
        let mut config = PipelineConfig::default();
        config.storage.backend = StorageBackend::Memory;
        args.apply(&mut config);

        assert_eq!(config.runner.tickers, vec!["NVDA", "AMD"]);
        assert_eq!(config.renderer.endpoint, "http://render:8050");
        assert_eq!(config.storage.backend, StorageBackend::Sqlite);
        assert_eq!(config.storage.database_url, "sqlite:/data/a.db");
    }

    #[test]
    fn test_mode_ignores_case() {
        let cli = Cli::parse_from(["ticker_ai_news", "run", "--mode", "Schedule"]);
        let Command::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.mode, RunMode::Schedule);
        assert!(Cli::try_parse_from(["ticker_ai_news", "run", "--mode", "ONCE"]).is_ok());
    }

    #[test]
    fn test_bad_time_is_rejected() {
        assert!(Cli::try_parse_from(["ticker_ai_news", "run", "--at", "7pm"]).is_err());
    }

    #[test]
    fn test_articles_short_flags() {
        let cli = Cli::parse_from([
            "ticker_ai_news",
            "articles",
            "-t",
            "AAPL",
            "-q",
            "llm",
            "-o",
            "/tmp/out.json",
            "-c",
            "cfg.yaml",
        ]);
        assert_eq!(cli.config, Some(PathBuf::from("cfg.yaml")));
        let Command::Articles(args) = cli.command else {
            panic!("expected articles");
        };
        assert_eq!(args.ticker, "AAPL");
        assert_eq!(args.query.as_deref(), Some("llm"));
        assert_eq!(args.output, Some(PathBuf::from("/tmp/out.json")));
    }

    #[test]
    fn test_hidden_crawl_subcommand() {
        let cli = Cli::parse_from(["ticker_ai_news", "crawl"]);
        assert!(matches!(cli.command, Command::Crawl));
    }
}
