//! Yahoo Finance headline feed.
//!
//! Yahoo publishes a per-symbol RSS 2.0 feed of recent headlines. Each
//! `<item>` carries a `<title>` and a `<link>` to the article page, which is
//! rendered later by the crawl worker.
//!
//! # URL Pattern
//!
//! `https://feeds.finance.yahoo.com/rss/2.0/headline?s=AAPL&region=US&lang=en-US`

use super::NewsSource;
use crate::config::{DEFAULT_USER_AGENT, NewsConfig};
use crate::error::{PipelineError, Result};
use crate::models::{ArticleCandidate, NewsItem};
use quick_xml::Reader;
use quick_xml::escape::resolve_predefined_entity;
use quick_xml::events::Event;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

pub struct YahooFinanceSource {
    client: reqwest::Client,
    feed_url: String,
    max_items: usize,
}

impl YahooFinanceSource {
    pub fn new(config: &NewsConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(DEFAULT_USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            client,
            feed_url: config.feed_url.clone(),
            max_items: config.max_items,
        })
    }

    /// The feed URL for `ticker`.
    pub fn feed_url_for(&self, ticker: &str) -> String {
        self.feed_url
            .replace("{ticker}", &urlencoding::encode(ticker))
    }
}

impl NewsSource for YahooFinanceSource {
    #[instrument(level = "info", skip(self))]
    async fn candidates(&self, ticker: &str) -> Result<Vec<ArticleCandidate>> {
        let url = self.feed_url_for(ticker);
        let xml = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let items = parse_feed(&xml)?;
        let candidates: Vec<ArticleCandidate> = items
            .into_iter()
            .filter(|item| {
                let keep = item.link.starts_with("http");
                if !keep {
                    warn!(title = %item.title, link = %item.link, "Skipping feed item without usable link");
                }
                keep
            })
            .take(self.max_items)
            .map(|item| {
                debug!(title = %item.title, link = %item.link, "Feed item");
                ArticleCandidate::new(ticker, item.link)
            })
            .collect();

        info!(count = candidates.len(), source = %url, "Indexed Yahoo Finance headlines");
        Ok(candidates)
    }
}

#[derive(Clone, Copy, PartialEq)]
enum Field {
    Title,
    Link,
}

fn xml_error(e: impl std::fmt::Display) -> PipelineError {
    PipelineError::Source(format!("malformed feed: {e}"))
}

/// Parse the `<item>` entries of an RSS 2.0 document.
///
/// Text, CDATA and entity references inside `<title>`/`<link>` are
/// concatenated, then trimmed when the element closes. Channel-level titles
/// and links are ignored.
pub fn parse_feed(xml: &str) -> Result<Vec<NewsItem>> {
    let mut reader = Reader::from_str(xml);
    let mut items = Vec::new();
    let mut current: Option<NewsItem> = None;
    let mut field: Option<Field> = None;
    let mut text = String::new();

    loop {
        match reader.read_event().map_err(xml_error)? {
            Event::Start(e) => match e.name().as_ref() {
                b"item" => current = Some(NewsItem::default()),
                b"title" if current.is_some() => {
                    field = Some(Field::Title);
                    text.clear();
                }
                b"link" if current.is_some() => {
                    field = Some(Field::Link);
                    text.clear();
                }
                _ => {}
            },
            Event::Text(e) if field.is_some() => {
                text.push_str(&e.decode().map_err(xml_error)?);
            }
            Event::CData(e) if field.is_some() => {
                text.push_str(&e.decode().map_err(xml_error)?);
            }
            Event::GeneralRef(e) if field.is_some() => {
                if let Some(ch) = e.resolve_char_ref().map_err(xml_error)? {
                    text.push(ch);
                } else {
                    let name = e.decode().map_err(xml_error)?;
                    match resolve_predefined_entity(&name) {
                        Some(resolved) => text.push_str(resolved),
                        None => {
                            text.push('&');
                            text.push_str(&name);
                            text.push(';');
                        }
                    }
                }
            }
            Event::End(e) => match e.name().as_ref() {
                b"title" | b"link" => {
                    if let (Some(item), Some(which)) = (current.as_mut(), field.take()) {
                        let value = text.trim().to_string();
                        match which {
                            Field::Title => item.title = value,
                            Field::Link => item.link = value,
                        }
                    }
                }
                b"item" => {
                    if let Some(item) = current.take() {
                        items.push(item);
                    }
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(items)
}
