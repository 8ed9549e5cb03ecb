//! Periodic driver: ticker list → news source → coordinator.
//!
//! Tickers are processed one after another with a fixed pause in between,
//! so at most one batch (and one worker) is in flight at any time.

use crate::coordinator::Coordinator;
use crate::sources::NewsSource;
use crate::worker::CrawlWorker;
use chrono::{Duration as ChronoDuration, Local, NaiveDateTime, NaiveTime, Timelike};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{error, info, instrument, warn};

pub struct PeriodicRunner<S, W> {
    source: S,
    coordinator: Coordinator<W>,
    tickers: Vec<String>,
    delay: Duration,
}

impl<S: NewsSource, W: CrawlWorker> PeriodicRunner<S, W> {
    pub fn new(source: S, coordinator: Coordinator<W>, tickers: Vec<String>, delay: Duration) -> Self {
        Self {
            source,
            coordinator,
            tickers,
            delay,
        }
    }

    /// Process every ticker once. Returns the number of persisted articles.
    #[instrument(level = "info", skip_all, fields(tickers = self.tickers.len()))]
    pub async fn run_once(&self) -> usize {
        let mut persisted = 0;
        for (i, ticker) in self.tickers.iter().enumerate() {
            if i > 0 && !self.delay.is_zero() {
                sleep(self.delay).await;
            }
            info!(%ticker, "Fetching news");
            let candidates = match self.source.candidates(ticker).await {
                Ok(candidates) => candidates,
                Err(e) => {
                    error!(%ticker, error = %e, "News fetch failed; skipping ticker");
                    continue;
                }
            };
            if candidates.is_empty() {
                warn!(%ticker, "No news data found");
                continue;
            }
            persisted += self.coordinator.ingest_batch(ticker, &candidates).await;
        }
        info!(persisted, "Run complete");
        persisted
    }

    /// Run once now, then every day at `at` (local time) until Ctrl-C.
    pub async fn run_scheduled(&self, at: NaiveTime) {
        self.run_once().await;
        loop {
            let now = Local::now().naive_local();
            let next = next_run_after(now, at);
            let wait = (next - now).to_std().unwrap_or_default();
            info!(next_run = %next, "Waiting for next scheduled run");

            tokio::select! {
                _ = sleep(wait) => {
                    self.run_once().await;
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("Interrupted; stopping scheduler");
                    break;
                }
            }
        }
    }
}

/// The first moment strictly after `now` whose time of day is `at`.
pub fn next_run_after(now: NaiveDateTime, at: NaiveTime) -> NaiveDateTime {
    let today = now.date().and_time(at);
    if today > now {
        today
    } else {
        today + ChronoDuration::days(1)
    }
}

/// Parse an `HH:MM` time of day.
pub fn parse_time_of_day(raw: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(raw.trim(), "%H:%M").ok()
}

/// The current local time, truncated to the minute.
pub fn startup_time_of_day() -> NaiveTime {
    let now = Local::now().time();
    NaiveTime::from_hms_opt(now.hour(), now.minute(), 0).unwrap_or(now)
}
