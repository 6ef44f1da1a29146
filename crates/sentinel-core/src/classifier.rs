//! Severity classification
//!
//! Pure and deterministic: a classification depends only on the message,
//! the file name and the configured patterns, never on session state.

use crate::config::PatternConfig;
use crate::description::ErrorDescription;
use crate::error::ConfigError;
use crate::keywords::KeywordSet;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Severity of a detected failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Reported only after the grace period, with the normal debounce window
    Normal,
    /// Bypasses the grace period and uses the short debounce window
    Critical,
}

impl Severity {
    /// Whether this is [`Severity::Critical`]
    #[inline]
    #[must_use]
    pub fn is_critical(self) -> bool {
        matches!(self, Self::Critical)
    }
}

static DEFAULT_CLASSIFIER: Lazy<Classifier> = Lazy::new(|| {
    Classifier::new(&PatternConfig::default()).expect("default patterns are valid regexes")
});

/// Classify with the default patterns
#[must_use]
pub fn is_critical(message: &str, filename: Option<&str>) -> bool {
    DEFAULT_CLASSIFIER.is_critical(message, filename)
}

/// Compiled classification rules
#[derive(Debug, Clone)]
pub struct Classifier {
    server_error: Regex,
    entry_point: Regex,
    build_failure: KeywordSet,
    syntax_error: KeywordSet,
    missing_module: KeywordSet,
    fetch_failure: KeywordSet,
    source_extensions: Vec<String>,
    network_signatures: KeywordSet,
}

impl Classifier {
    /// Compile rules from patterns
    ///
    /// # Errors
    /// - `ConfigError::Pattern` if a regex field does not compile
    pub fn new(patterns: &PatternConfig) -> Result<Self, ConfigError> {
        let server_error = Regex::new(&patterns.server_error_pattern)
            .map_err(|e| ConfigError::pattern("server_error_pattern", e))?;
        let entry_point = Regex::new(&patterns.entry_point_pattern)
            .map_err(|e| ConfigError::pattern("entry_point_pattern", e))?;

        Ok(Self {
            server_error,
            entry_point,
            build_failure: patterns.build_failure.clone(),
            syntax_error: patterns.syntax_error.clone(),
            missing_module: patterns.missing_module.clone(),
            fetch_failure: patterns.fetch_failure.clone(),
            source_extensions: patterns
                .source_extensions
                .iter()
                .map(|e| e.to_lowercase())
                .collect(),
            network_signatures: patterns.network_signatures.clone(),
        })
    }

    /// Classify a raw message and optional file name
    #[must_use]
    pub fn classify(&self, message: &str, filename: Option<&str>) -> Severity {
        if self.is_critical(message, filename) {
            Severity::Critical
        } else {
            Severity::Normal
        }
    }

    /// Classify a built description by its raw message and source file
    #[inline]
    #[must_use]
    pub fn classify_description(&self, description: &ErrorDescription) -> Severity {
        self.classify(description.raw_message(), description.source_file())
    }

    /// Whether a message/file pair is critical
    #[must_use]
    pub fn is_critical(&self, message: &str, filename: Option<&str>) -> bool {
        let filename = filename.unwrap_or_default();

        self.server_error.is_match(message)
            || (!filename.is_empty() && self.entry_point.is_match(filename))
            || self.build_failure.matches(message)
            || self.syntax_error.matches(message)
            || self.missing_module.matches(message)
            || (self.fetch_failure.matches(message) && self.is_source_module(filename))
    }

    /// Whether a message looks like a build or network failure
    ///
    /// HTTP 500 is matched as a whole word, as in [`Classifier::is_critical`].
    #[must_use]
    pub fn is_network_failure(&self, message: &str) -> bool {
        self.server_error.is_match(message) || self.network_signatures.matches(message)
    }

    fn is_source_module(&self, filename: &str) -> bool {
        let path = filename
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .to_lowercase();
        self.source_extensions.iter().any(|ext| path.ends_with(ext.as_str()))
    }
}

impl Default for Classifier {
    fn default() -> Self {
        DEFAULT_CLASSIFIER.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_errors_are_critical() {
        assert!(is_critical("GET /api/plan 500", None));
        assert!(is_critical("Internal Server Error", None));
        assert!(!is_critical("took 1500ms", None));
    }

    #[test]
    fn entry_point_files_are_critical() {
        assert!(is_critical("x is not a function", Some("http://localhost:5173/src/main.tsx")));
        assert!(is_critical("boom", Some("/src/App.tsx?t=1699")));
        assert!(is_critical("boom", Some("index.js")));
        assert!(!is_critical("boom", Some("/src/components/Domain.tsx")));
        assert!(!is_critical("boom", Some("/src/remain.tsx")));
    }

    #[test]
    fn build_syntax_and_module_failures_are_critical() {
        assert!(is_critical("[plugin:vite] Build failed with 1 error", None));
        assert!(is_critical("Failed to compile.", None));
        assert!(is_critical("SyntaxError: Unexpected token '<'", None));
        assert!(is_critical("Module not found: Can't resolve './Plan'", None));
        assert!(is_critical("Failed to resolve import \"x\" from \"src/a.ts\"", None));
    }

    #[test]
    fn fetch_failure_needs_source_module() {
        assert!(is_critical("TypeError: Failed to fetch", Some("/src/api/client.ts")));
        assert!(is_critical("Failed to fetch dynamically imported module", Some("/src/pages/Plan.tsx?import")));
        assert!(!is_critical("TypeError: Failed to fetch", None));
        assert!(!is_critical("TypeError: Failed to fetch", Some("/assets/logo.png")));
    }

    #[test]
    fn ordinary_errors_are_normal() {
        let classifier = Classifier::default();
        assert_eq!(
            classifier.classify("TypeError: cannot read properties of undefined", Some("/src/components/Card.tsx")),
            Severity::Normal
        );
    }

    #[test]
    fn classify_description_uses_raw_message_and_file() {
        let desc = ErrorDescription::builder(
            crate::ErrorSource::UncaughtException,
            "Module not found",
            "Module not found",
        )
        .with_location(Some("/src/main.tsx"), Some(1), Some(1))
        .build();
        assert_eq!(Classifier::default().classify_description(&desc), Severity::Critical);
    }

    #[test]
    fn network_failures_match_500_as_a_word() {
        let classifier = Classifier::default();
        assert!(classifier.is_network_failure("Request failed with status code 500"));
        assert!(classifier.is_network_failure("Internal Server Error"));
        assert!(classifier.is_network_failure("net::ERR_CONNECTION_REFUSED"));
        assert!(!classifier.is_network_failure("Request timed out after 1500 ms"));
        assert!(!classifier.is_network_failure("quota exceeded"));
    }

    #[test]
    fn configured_keywords_replace_defaults() {
        let mut patterns = PatternConfig::default();
        patterns.syntax_error = KeywordSet::new(["parse failure"]);
        let classifier = Classifier::new(&patterns).unwrap();

        assert!(classifier.is_critical("Parse failure at 1:1", None));
        assert!(!classifier.is_critical("SyntaxError: bad", None));
    }
}
