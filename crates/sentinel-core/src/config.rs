//! Agent configuration
//!
//! Timing and limit defaults (3000 ms grace, 1500/500 ms debounce, five
//! reports, 100-character fingerprints) are carried over unchanged and have
//! never been tuned against real traffic.

use crate::classifier::{Classifier, Severity};
use crate::error::ConfigError;
use crate::keywords::KeywordSet;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Agent configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Startup window during which normal errors are suppressed, in milliseconds
    pub grace_period_ms: u64,
    /// Debounce window for normal errors, in milliseconds
    pub debounce_ms: u64,
    /// Debounce window for critical errors, in milliseconds
    pub critical_debounce_ms: u64,
    /// Maximum `copy-error` reports per session
    pub max_reports: usize,
    /// Number of leading characters of the formatted text used as fingerprint
    pub fingerprint_len: usize,
    /// Keyword lists and patterns
    pub patterns: PatternConfig,
}

impl AgentConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and validate a TOML document
    ///
    /// Missing keys fall back to their defaults.
    ///
    /// # Errors
    /// - `ConfigError::Parse` if the document is not valid TOML
    /// - `ConfigError::Invalid` / `ConfigError::Pattern` if validation fails
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Check semantic constraints
    ///
    /// # Errors
    /// Returns the first violated constraint.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.fingerprint_len == 0 {
            return Err(ConfigError::Invalid(
                "fingerprint_len must be positive".to_string(),
            ));
        }
        if self.critical_debounce_ms > self.debounce_ms {
            return Err(ConfigError::Invalid(format!(
                "critical_debounce_ms ({}) exceeds debounce_ms ({})",
                self.critical_debounce_ms, self.debounce_ms
            )));
        }
        Classifier::new(&self.patterns).map(|_| ())
    }

    /// With grace period
    #[inline]
    #[must_use]
    pub fn with_grace_period(mut self, grace: Duration) -> Self {
        self.grace_period_ms = duration_ms(grace);
        self
    }

    /// With debounce windows
    #[inline]
    #[must_use]
    pub fn with_debounce(mut self, normal: Duration, critical: Duration) -> Self {
        self.debounce_ms = duration_ms(normal);
        self.critical_debounce_ms = duration_ms(critical);
        self
    }

    /// With report cap
    #[inline]
    #[must_use]
    pub fn with_max_reports(mut self, max: usize) -> Self {
        self.max_reports = max;
        self
    }

    /// With fingerprint length
    #[inline]
    #[must_use]
    pub fn with_fingerprint_len(mut self, len: usize) -> Self {
        self.fingerprint_len = len;
        self
    }

    /// With patterns
    #[inline]
    #[must_use]
    pub fn with_patterns(mut self, patterns: PatternConfig) -> Self {
        self.patterns = patterns;
        self
    }

    /// Grace period as a duration
    #[inline]
    #[must_use]
    pub fn grace_period(&self) -> Duration {
        Duration::from_millis(self.grace_period_ms)
    }

    /// Debounce window for an error of the given severity
    #[inline]
    #[must_use]
    pub fn debounce_window(&self, severity: Severity) -> Duration {
        match severity {
            Severity::Critical => Duration::from_millis(self.critical_debounce_ms),
            Severity::Normal => Duration::from_millis(self.debounce_ms),
        }
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            grace_period_ms: 3000,
            debounce_ms: 1500,
            critical_debounce_ms: 500,
            max_reports: 5,
            fingerprint_len: 100,
            patterns: PatternConfig::default(),
        }
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Keyword lists and patterns used for classification and filtering
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatternConfig {
    /// Regex matching HTTP 500 mentions
    pub server_error_pattern: String,
    /// Regex matching application entry-point file names
    pub entry_point_pattern: String,
    /// Build or compilation failure mentions
    pub build_failure: KeywordSet,
    /// Syntax error mentions
    pub syntax_error: KeywordSet,
    /// Missing module mentions
    pub missing_module: KeywordSet,
    /// Generic fetch failure mentions (critical only from a source module)
    pub fetch_failure: KeywordSet,
    /// Source-module file extensions
    pub source_extensions: Vec<String>,
    /// Signatures that mark a rejection as a build/network failure, on top
    /// of `server_error_pattern`
    pub network_signatures: KeywordSet,
    /// Log lines forwarded into the pipeline must contain one of these
    pub log_error_keywords: KeywordSet,
    /// Development tooling chatter never forwarded
    pub log_benign_keywords: KeywordSet,
    /// Named error types preferred when picking a representative
    pub representative_keywords: KeywordSet,
    /// Document markers for an invalid or expired session
    pub auth_markers: KeywordSet,
}

impl Default for PatternConfig {
    fn default() -> Self {
        Self {
            server_error_pattern: r"(?i)\b500\b|internal server error".to_string(),
            entry_point_pattern: r"(?i)(^|[/\\])(main|index|app)\.[jt]sx?([?#].*)?$".to_string(),
            build_failure: KeywordSet::new([
                "build failed",
                "failed to compile",
                "compilation failed",
                "compile error",
            ]),
            syntax_error: KeywordSet::new(["syntaxerror", "syntax error"]),
            missing_module: KeywordSet::new([
                "module not found",
                "cannot find module",
                "failed to resolve module",
                "failed to resolve import",
            ]),
            fetch_failure: KeywordSet::new(["failed to fetch"]),
            source_extensions: [".ts", ".tsx", ".js", ".jsx", ".mjs"]
                .into_iter()
                .map(String::from)
                .collect(),
            network_signatures: KeywordSet::new([
                "failed to fetch",
                "networkerror",
                "net::err_",
                "aborted",
                "load failed",
            ]),
            log_error_keywords: KeywordSet::new([
                "error",
                "failed",
                "500",
                "uncaught",
                "typeerror",
                "referenceerror",
                "syntaxerror",
                "rangeerror",
            ]),
            log_benign_keywords: KeywordSet::new([
                "[vite]",
                "[hmr]",
                "websocket",
                "hot update",
                "[webpack-dev-server]",
                "socket connection",
            ]),
            representative_keywords: KeywordSet::new([
                "typeerror",
                "referenceerror",
                "syntaxerror",
                "build failed",
            ]),
            auth_markers: KeywordSet::new(["invalid token", "invalid_token", "access denied"]),
        }
    }
}
