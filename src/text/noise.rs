//! Fragment-level noise rules.
//!
//! A fragment is noise when any single rule matches. Rules are plain
//! functions collected in [`RULES`]; adding or removing one does not touch
//! the others. The rule set prefers precision: keeping some junk is
//! acceptable, dropping article prose is not.

use crate::config::NoiseConfig;
use once_cell::sync::Lazy;
use regex::Regex;

static SCRIPT_IDIOM: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(window\.|document\.|function\(|var\s|let\s|const\s)")
        .expect("script idiom pattern is valid")
});
static BRACED_SPAN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{.*?\}").expect("braced span pattern is valid"));
static PARENTHESIZED_SPAN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\(.*?\)").expect("parenthesized span pattern is valid"));
static OPERATOR_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[=:]{2,}").expect("operator run pattern is valid"));

/// A named noise predicate.
pub type Rule = (&'static str, fn(&str, &NoiseConfig) -> bool);

/// Every rule, in the order they are tried.
pub const RULES: &[Rule] = &[
    ("script_idiom", script_idiom),
    ("braced_span", braced_span),
    ("parenthesized_span", parenthesized_span),
    ("semicolon", semicolon),
    ("operator_run", operator_run),
    ("too_short", too_short),
    ("low_alnum_ratio", low_alnum_ratio),
];

/// `window.`, `document.`, `function(`, `var `, `let `, `const `.
pub fn script_idiom(text: &str, _: &NoiseConfig) -> bool {
    SCRIPT_IDIOM.is_match(text)
}

/// Inline JSON or object literals.
pub fn braced_span(text: &str, _: &NoiseConfig) -> bool {
    BRACED_SPAN.is_match(text)
}

/// Inline calls. Also catches prose asides in parentheses, which is the
/// known false-positive cost of this rule.
pub fn parenthesized_span(text: &str, _: &NoiseConfig) -> bool {
    PARENTHESIZED_SPAN.is_match(text)
}

pub fn semicolon(text: &str, _: &NoiseConfig) -> bool {
    text.contains(';')
}

/// `==`, `:=`, `::` and longer runs.
pub fn operator_run(text: &str, _: &NoiseConfig) -> bool {
    OPERATOR_RUN.is_match(text)
}

pub fn too_short(text: &str, config: &NoiseConfig) -> bool {
    text.chars().count() < config.min_length
}

pub fn low_alnum_ratio(text: &str, config: &NoiseConfig) -> bool {
    let total = text.chars().count();
    if total == 0 {
        return true;
    }
    let alnum = text.chars().filter(|c| c.is_alphanumeric()).count();
    (alnum as f64 / total as f64) < config.min_alnum_ratio
}

/// Applies [`RULES`] to trimmed fragment text.
#[derive(Debug, Clone, Default)]
pub struct NoiseFilter {
    config: NoiseConfig,
}

impl NoiseFilter {
    pub fn new(config: NoiseConfig) -> Self {
        Self { config }
    }

    /// Name of the first rule that classifies `text` as noise, if any.
    pub fn matched_rule(&self, text: &str) -> Option<&'static str> {
        let text = text.trim();
        RULES
            .iter()
            .find(|(_, rule)| rule(text, &self.config))
            .map(|(name, _)| *name)
    }

    #[cfg(test)]
    pub fn is_noise(&self, text: &str) -> bool {
        self.matched_rule(text).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> NoiseConfig {
        NoiseConfig::default()
    }

    /// The rules that fire for `text`, to check that each one alone is enough.
    fn firing(text: &str) -> Vec<&'static str> {
        RULES
            .iter()
            .filter(|(_, rule)| rule(text, &config()))
            .map(|(name, _)| *name)
            .collect()
    }

    #[test]
    fn test_script_idiom_alone() {
        assert_eq!(firing("window.location was set by the page"), vec!["script_idiom"]);
        assert_eq!(firing("Document.cookie holds the session"), vec!["script_idiom"]);
        assert_eq!(firing("var tracking enabled here"), vec!["script_idiom"]);
        assert_eq!(firing("const answer matters here"), vec!["script_idiom"]);
    }

    #[test]
    fn test_braced_span_alone() {
        assert_eq!(firing("payload {key} follows"), vec!["braced_span"]);
    }

    #[test]
    fn test_parenthesized_span_alone() {
        assert_eq!(firing("Apple Inc (AAPL) shares rose"), vec!["parenthesized_span"]);
    }

    #[test]
    fn test_semicolon_alone() {
        assert_eq!(firing("Shares rose; analysts cheered"), vec!["semicolon"]);
    }

    #[test]
    fn test_operator_run_alone() {
        assert_eq!(firing("status == ready now"), vec!["operator_run"]);
        assert_eq!(firing("value := next item"), vec!["operator_run"]);
    }

    #[test]
    fn test_too_short_alone() {
        assert_eq!(firing("Apple"), Vec::<&str>::new());
        assert_eq!(firing("News"), vec!["too_short"]);
    }

    #[test]
    fn test_low_alnum_ratio_alone() {
        assert_eq!(firing("-- -- ab -- --"), vec!["low_alnum_ratio"]);
    }

    #[test]
    fn test_ratio_threshold_is_strict() {
        // 4 alphanumerics out of 8 characters is exactly the threshold.
        assert!(!low_alnum_ratio("ab-- cd-", &config()));
        assert!(low_alnum_ratio("ab--- c-", &config()));
    }

    #[test]
    fn test_prose_is_content() {
        let filter = NoiseFilter::default();
        assert!(!filter.is_noise("Generative AI is transforming finance."));
        assert!(!filter.is_noise("Quarterly earnings beat expectations."));
        assert!(!filter.is_noise("  Nvidia shares climbed 4% in early trading.  "));
    }

    #[test]
    fn test_script_fragment_is_noise() {
        let filter = NoiseFilter::default();
        assert_eq!(
            filter.matched_rule("function(){ var x=1; }"),
            Some("script_idiom")
        );
        assert_eq!(filter.matched_rule("ok"), Some("too_short"));
    }

    #[test]
    fn test_filter_trims_before_length_check() {
        let filter = NoiseFilter::default();
        assert!(filter.is_noise("   abc    "));
    }

    #[test]
    fn test_custom_thresholds() {
        let filter = NoiseFilter::new(NoiseConfig {
            min_length: 2,
            min_alnum_ratio: 0.1,
        });
        assert!(!filter.is_noise("ok"));
        assert!(!filter.is_noise("a -- --"));
    }
}
