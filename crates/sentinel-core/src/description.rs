//! Normalized failure descriptions and their fingerprints

use serde::{Deserialize, Serialize};
use std::fmt;

/// First line of every formatted report
pub const BANNER: &str = "Runtime error in preview";

/// Failure taxonomy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorSource {
    /// Script, stylesheet or image failed to load
    ResourceLoad,
    /// Uncaught synchronous exception
    UncaughtException,
    /// Unhandled asynchronous rejection
    UnhandledRejection,
    /// Error-level diagnostic log emitted by library code
    ConsoleError,
    /// Invalid or expired session access
    Authorization,
}

impl ErrorSource {
    /// Whether this source bypasses the throttled pipeline
    #[inline]
    #[must_use]
    pub fn is_immediate(self) -> bool {
        matches!(self, Self::Authorization)
    }
}

impl fmt::Display for ErrorSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ResourceLoad => write!(f, "resource_load"),
            Self::UncaughtException => write!(f, "uncaught_exception"),
            Self::UnhandledRejection => write!(f, "unhandled_rejection"),
            Self::ConsoleError => write!(f, "console_error"),
            Self::Authorization => write!(f, "authorization"),
        }
    }
}

/// One detected failure, formatted for a human reader
///
/// Built once through [`DescriptionBuilder`] and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDescription {
    text: String,
    source_file: Option<String>,
    line: Option<u32>,
    column: Option<u32>,
    stack: Option<String>,
    raw_message: String,
    source: ErrorSource,
}

impl ErrorDescription {
    /// Start building a description
    ///
    /// `headline` is the human-facing summary line; `raw_message` is the
    /// message the classifier inspects.
    #[must_use]
    pub fn builder(
        source: ErrorSource,
        headline: impl Into<String>,
        raw_message: impl Into<String>,
    ) -> DescriptionBuilder {
        DescriptionBuilder {
            source,
            headline: headline.into(),
            raw_message: raw_message.into(),
            source_file: None,
            line: None,
            column: None,
            stack: None,
        }
    }

    /// Fully formatted text
    #[inline]
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// File the failure originated from
    #[inline]
    #[must_use]
    pub fn source_file(&self) -> Option<&str> {
        self.source_file.as_deref()
    }

    /// Line number
    #[inline]
    #[must_use]
    pub fn line(&self) -> Option<u32> {
        self.line
    }

    /// Column number
    #[inline]
    #[must_use]
    pub fn column(&self) -> Option<u32> {
        self.column
    }

    /// Stack trace
    #[inline]
    #[must_use]
    pub fn stack(&self) -> Option<&str> {
        self.stack.as_deref()
    }

    /// Message as received, before formatting
    #[inline]
    #[must_use]
    pub fn raw_message(&self) -> &str {
        &self.raw_message
    }

    /// Taxonomy tag
    #[inline]
    #[must_use]
    pub fn source(&self) -> ErrorSource {
        self.source
    }

    /// Dedup key of this description
    #[inline]
    #[must_use]
    pub fn fingerprint(&self, len: usize) -> Fingerprint {
        Fingerprint::of(&self.text, len)
    }
}

/// Builder for [`ErrorDescription`]
#[derive(Debug, Clone)]
pub struct DescriptionBuilder {
    source: ErrorSource,
    headline: String,
    raw_message: String,
    source_file: Option<String>,
    line: Option<u32>,
    column: Option<u32>,
    stack: Option<String>,
}

impl DescriptionBuilder {
    /// With source location; an empty file name is ignored
    #[must_use]
    pub fn with_location(
        mut self,
        file: Option<impl Into<String>>,
        line: Option<u32>,
        column: Option<u32>,
    ) -> Self {
        let file: Option<String> = file.map(Into::into);
        self.source_file = file.filter(|f| !f.trim().is_empty());
        self.line = line;
        self.column = column;
        self
    }

    /// With stack trace; a blank stack is ignored
    #[must_use]
    pub fn with_stack(mut self, stack: Option<impl Into<String>>) -> Self {
        let stack: Option<String> = stack.map(Into::into);
        self.stack = stack.filter(|s| !s.trim().is_empty());
        self
    }

    /// Format the text and freeze the description
    #[must_use]
    pub fn build(self) -> ErrorDescription {
        let mut text = format!("{BANNER}\n{}", self.headline);

        if let Some(file) = &self.source_file {
            text.push_str("\nSource: ");
            text.push_str(file);
            if let Some(line) = self.line {
                text.push_str(&format!(":{line}"));
                if let Some(column) = self.column {
                    text.push_str(&format!(":{column}"));
                }
            }
        }

        if let Some(stack) = &self.stack {
            text.push_str("\nStack:\n");
            text.push_str(stack.trim_end());
        }

        ErrorDescription {
            text,
            source_file: self.source_file,
            line: self.line,
            column: self.column,
            stack: self.stack,
            raw_message: self.raw_message,
            source: self.source,
        }
    }
}

/// Prefix-based equality key for deduplication
///
/// Two descriptions whose formatted text shares the first `len` characters
/// are the same failure for reporting purposes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// First `len` characters of `text`
    #[must_use]
    pub fn of(text: &str, len: usize) -> Self {
        Self(text.chars().take(len).collect())
    }

    /// Fingerprint as a string slice
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for Fingerprint {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.escape_debug())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn formats_banner_location_and_stack() {
        let desc = ErrorDescription::builder(
            ErrorSource::UncaughtException,
            "TypeError: x is undefined",
            "TypeError: x is undefined",
        )
        .with_location(Some("src/App.tsx"), Some(12), Some(7))
        .with_stack(Some("at render (App.tsx:12:7)\n"))
        .build();

        assert_eq!(
            desc.text(),
            "Runtime error in preview\nTypeError: x is undefined\nSource: src/App.tsx:12:7\nStack:\nat render (App.tsx:12:7)"
        );
        assert_eq!(desc.source_file(), Some("src/App.tsx"));
        assert_eq!(desc.line(), Some(12));
    }

    #[test]
    fn omits_missing_parts() {
        let desc = ErrorDescription::builder(ErrorSource::ConsoleError, "Console error: boom", "boom")
            .with_location(Some(""), None, None)
            .with_stack(Some("   "))
            .build();

        assert_eq!(desc.text(), "Runtime error in preview\nConsole error: boom");
        assert_eq!(desc.source_file(), None);
        assert_eq!(desc.stack(), None);
    }

    #[test]
    fn column_requires_line() {
        let desc = ErrorDescription::builder(ErrorSource::UncaughtException, "boom", "boom")
            .with_location(Some("a.js"), None, Some(3))
            .build();
        assert!(desc.text().ends_with("Source: a.js"));
    }

    #[test]
    fn fingerprint_counts_characters_not_bytes() {
        let fp = Fingerprint::of("ééééé", 3);
        assert_eq!(fp.as_str(), "ééé");
    }

    #[test]
    fn fingerprint_of_short_text_is_whole_text() {
        assert_eq!(Fingerprint::of("short", 100).as_str(), "short");
    }

    #[test]
    fn authorization_is_the_only_immediate_source() {
        assert!(ErrorSource::Authorization.is_immediate());
        assert!(!ErrorSource::ConsoleError.is_immediate());
        assert!(!ErrorSource::ResourceLoad.is_immediate());
    }
}
