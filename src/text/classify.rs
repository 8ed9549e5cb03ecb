//! Keyword-based AI-relevance classification.

use crate::config::ClassifierConfig;

/// Case-insensitive substring match against a fixed vocabulary.
///
/// Matching is deliberately permissive: `llm` also matches inside longer
/// words, and there is no scoring beyond presence.
#[derive(Debug, Clone)]
pub struct RelevanceClassifier {
    keywords: Vec<String>,
}

impl RelevanceClassifier {
    pub fn new(config: &ClassifierConfig) -> Self {
        Self {
            keywords: config
                .keywords
                .iter()
                .map(|k| k.trim().to_lowercase())
                .filter(|k| !k.is_empty())
                .collect(),
        }
    }

    /// The first keyword found in `text`.
    pub fn matched_keyword(&self, text: &str) -> Option<&str> {
        let lowered = text.to_lowercase();
        self.keywords
            .iter()
            .find(|keyword| lowered.contains(keyword.as_str()))
            .map(String::as_str)
    }

    #[cfg(test)]
    pub fn is_relevant(&self, text: &str) -> bool {
        self.matched_keyword(text).is_some()
    }
}

impl Default for RelevanceClassifier {
    fn default() -> Self {
        Self::new(&ClassifierConfig::default())
    }
}
