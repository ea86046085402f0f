//! Removal of vendor citation markup from assistant replies.
//!
//! The assistant annotates file-search answers with tags such as
//! `【12:3†source】`. Those are meaningless to the web client and are
//! stripped before a reply leaves the relay. Everything else in the text is
//! preserved byte-for-byte; whitespace around a removed tag is left alone.

use std::sync::LazyLock;

use regex::Regex;
use tracing::trace;

use crate::error::Result;

/// Bracketed `<digits>:<digits>†source` file-search citation.
pub const SOURCE_CITATION_PATTERN: &str = r"【\d+:\d+†source】";

#[allow(clippy::expect_used)]
static SOURCE_CITATION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(SOURCE_CITATION_PATTERN).expect("static regex is valid"));

/// An ordered set of removal rules applied to reply text.
#[derive(Debug, Clone)]
pub struct CitationSanitizer {
    rules: Vec<Regex>,
}

impl Default for CitationSanitizer {
    fn default() -> Self {
        Self {
            rules: vec![SOURCE_CITATION_RE.clone()],
        }
    }
}

impl CitationSanitizer {
    /// Add a removal rule.
    pub fn with_rule(mut self, pattern: &str) -> Result<Self> {
        self.rules.push(Regex::new(pattern)?);
        Ok(self)
    }

    /// Number of configured rules.
    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// Remove every match of every rule from `text`.
    ///
    /// Runs to a fixed point, so a tag that only appears once an inner tag
    /// has been removed is stripped too and the result is idempotent.
    pub fn sanitize(&self, text: &str) -> String {
        let mut current = text.to_string();
        loop {
            let mut changed = false;
            for rule in &self.rules {
                if rule.is_match(&current) {
                    current = rule.replace_all(&current, "").into_owned();
                    changed = true;
                }
            }
            if !changed {
                if current.len() != text.len() {
                    trace!(removed_bytes = text.len() - current.len(), "Stripped citation tags");
                }
                return current;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strip_citations(text: &str) -> String {
        CitationSanitizer::default().sanitize(text)
    }

    #[test]
    fn removes_single_tag() {
        assert_eq!(strip_citations("Hi there【1:0†source】!"), "Hi there!");
    }

    #[test]
    fn removes_multiple_tags_and_keeps_whitespace() {
        let text = "First 【12:3†source】point.\n\nSecond  【4:17†source】 point【0:0†source】";
        assert_eq!(strip_citations(text), "First point.\n\nSecond   point");
    }

    #[test]
    fn text_without_tags_is_unchanged() {
        let text = "안녕하세요! Plain text with [1:2] and 【not a tag】.";
        assert_eq!(strip_citations(text), text);
    }

    #[test]
    fn malformed_tags_are_kept() {
        for text in [
            "【1†source】",
            "【a:1†source】",
            "【1:2†sources】",
            "[1:2†source]",
            "【1:2source】",
        ] {
            assert_eq!(strip_citations(text), text, "should keep {text}");
        }
    }

    #[test]
    fn empty_input() {
        assert_eq!(strip_citations(""), "");
    }

    #[test]
    fn nested_tags_are_stripped_to_fixed_point() {
        let text = "a【1:【2:3†source】0†source】b";
        assert_eq!(strip_citations(text), "ab");
    }

    #[test]
    fn sanitizing_is_idempotent() {
        let samples = [
            "Hi there【1:0†source】!",
            "no tags",
            "x【1:【2:3†source】0†source】y【9:9†source】",
        ];
        let sanitizer = CitationSanitizer::default();
        for sample in samples {
            let once = sanitizer.sanitize(sample);
            assert_eq!(sanitizer.sanitize(&once), once);
        }
    }

    #[test]
    fn extra_rules_extend_removal() {
        let sanitizer = CitationSanitizer::default()
            .with_rule(r"\[\^\d+\]")
            .unwrap();
        assert_eq!(sanitizer.rule_count(), 2);
        assert_eq!(
            sanitizer.sanitize("fact[^1] and more【3:1†source】."),
            "fact and more."
        );
    }

    #[test]
    fn invalid_rule_is_rejected() {
        let err = CitationSanitizer::default().with_rule("(").unwrap_err();
        assert!(matches!(err, crate::Error::Pattern(_)));
    }
}
