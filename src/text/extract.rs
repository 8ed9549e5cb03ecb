//! Visible text extraction from rendered HTML.

use crate::models::TextFragment;
use once_cell::sync::Lazy;
use scraper::{Html, Selector};

static BODY: Lazy<Selector> = Lazy::new(|| Selector::parse("body").expect("body selector is valid"));

/// Elements whose text never reaches the reader.
const HIDDEN_ELEMENTS: &[&str] = &["script", "style", "noscript", "template"];

/// A parsed page from which visible text fragments can be read any number of times.
///
/// Parsing never fails: the HTML5 parser recovers from malformed markup, and
/// an empty document simply has no fragments.
pub struct ExtractedPage {
    document: Html,
}

impl ExtractedPage {
    pub fn parse(raw_html: &str) -> Self {
        Self {
            document: Html::parse_document(raw_html),
        }
    }

    /// Text nodes under `<body>` in document order, skipping hidden elements
    /// and whitespace-only nodes. Each call starts a fresh walk.
    pub fn fragments(&self) -> impl Iterator<Item = TextFragment> + '_ {
        self.document
            .select(&BODY)
            .take(1)
            .flat_map(|body| body.descendants())
            .filter_map(|node| {
                let text = node.value().as_text()?;
                if text.trim().is_empty() {
                    return None;
                }
                let hidden = node.ancestors().any(|ancestor| {
                    ancestor
                        .value()
                        .as_element()
                        .is_some_and(|el| HIDDEN_ELEMENTS.contains(&el.name()))
                });
                (!hidden).then(|| TextFragment::new(&**text))
            })
    }
}
