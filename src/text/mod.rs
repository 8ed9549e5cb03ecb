//! Text processing for rendered pages.
//!
//! A rendered page goes through three stages before classification:
//!
//! 1. [`extract`]: visible text nodes under `<body>`, in document order
//! 2. [`noise`]: each fragment is tested against independent noise rules
//! 3. [`assemble`]: survivors are joined and the site template is trimmed
//!
//! [`classify`] then decides whether the assembled text is AI-relevant. It is
//! applied by the coordinator, not here, so that the crawl worker only ever
//! deals with page text.

pub mod assemble;
pub mod classify;
pub mod extract;
pub mod noise;

use crate::config::PipelineConfig;
use crate::models::{AssembledDocument, RenderedPage};
use assemble::ContentAssembler;
use extract::ExtractedPage;
use noise::NoiseFilter;
use tracing::debug;

/// Extract → filter → assemble for one page.
#[derive(Debug, Clone, Default)]
pub struct PageProcessor {
    noise: NoiseFilter,
    assembler: ContentAssembler,
}

impl PageProcessor {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            noise: NoiseFilter::new(config.noise.clone()),
            assembler: ContentAssembler::new(&config.assembler),
        }
    }

    /// Returns `None` when nothing but noise survives.
    pub fn process(&self, page: &RenderedPage) -> Option<AssembledDocument> {
        let extracted = ExtractedPage::parse(&page.raw_html);
        let mut dropped = 0usize;
        let kept = extracted.fragments().filter(|fragment| {
            match self.noise.matched_rule(&fragment.text) {
                Some(rule) => {
                    dropped += 1;
                    debug!(url = %page.url, rule, fragment = %fragment.text.trim(), "Dropped noise fragment");
                    false
                }
                None => true,
            }
        });
        let document = self.assembler.assemble(&page.url, kept);
        debug!(url = %page.url, dropped, bytes = document.text.len(), "Assembled page");

        if document.text.is_empty() {
            debug!(url = %page.url, "Page held only noise");
            return None;
        }
        Some(document)
    }
}
