//! News metadata sources.
//!
//! A source turns a ticker symbol into article candidates. Only the article
//! link is consumed downstream; titles are kept for logging.
//!
//! | Source | Module | Method |
//! |--------|--------|--------|
//! | Yahoo Finance | [`yahoo`] | Headline RSS feed |

pub mod yahoo;

use crate::error::Result;
use crate::models::ArticleCandidate;

pub use yahoo::YahooFinanceSource;

pub trait NewsSource {
    /// Current news candidates for `ticker`. An empty list is not an error.
    async fn candidates(&self, ticker: &str) -> Result<Vec<ArticleCandidate>>;
}
