//! Joining surviving fragments and trimming template boilerplate.

use crate::config::AssemblerConfig;
use crate::models::{AssembledDocument, TextFragment};
use tracing::debug;

#[derive(Debug, Clone, Default)]
pub struct ContentAssembler {
    head_anchor: Option<String>,
    tail_anchor: Option<String>,
}

impl ContentAssembler {
    /// Empty anchors are treated as unset.
    pub fn new(config: &AssemblerConfig) -> Self {
        let non_empty = |anchor: &Option<String>| anchor.clone().filter(|a| !a.is_empty());
        Self {
            head_anchor: non_empty(&config.head_anchor),
            tail_anchor: non_empty(&config.tail_anchor),
        }
    }

    pub fn assemble<I>(&self, url: &str, fragments: I) -> AssembledDocument
    where
        I: IntoIterator<Item = TextFragment>,
    {
        let joined = join_fragments(fragments);
        let text = self.trim_boilerplate(&joined);
        if text.len() == joined.len() {
            debug!(%url, "No boilerplate anchors found; keeping full page text");
        }
        AssembledDocument {
            url: url.to_string(),
            text: text.to_string(),
        }
    }

    /// Keep what follows the last head anchor, then what precedes the first
    /// tail anchor. A missing anchor leaves that side untouched.
    pub fn trim_boilerplate<'a>(&self, text: &'a str) -> &'a str {
        let mut body = text;
        if let Some(head) = &self.head_anchor {
            if let Some(pos) = body.rfind(head.as_str()) {
                body = &body[pos + head.len()..];
            }
        }
        if let Some(tail) = &self.tail_anchor {
            if let Some(pos) = body.find(tail.as_str()) {
                body = &body[..pos];
            }
        }
        body.trim()
    }
}

/// Trim every fragment and join the non-empty ones with single spaces.
pub fn join_fragments<I>(fragments: I) -> String
where
    I: IntoIterator<Item = TextFragment>,
{
    let mut joined = String::new();
    for fragment in fragments {
        let text = fragment.text.trim();
        if text.is_empty() {
            continue;
        }
        if !joined.is_empty() {
            joined.push(' ');
        }
        joined.push_str(text);
    }
    joined
}
