//! Error source listeners
//!
//! Each listener turns one kind of browser-side input into an
//! [`ErrorDescription`](sentinel_core::ErrorDescription):
//!
//! - [`resource`]: window `error` events (capture phase)
//! - [`rejection`]: `unhandledrejection` events
//! - [`console`]: the error-level log sink decorator
//! - [`document`]: the authorization-failure marker scan
//!
//! The functions here are pure normalizers; wiring them to the pipeline is
//! done by [`DiagnosticAgent`](crate::DiagnosticAgent).

pub mod console;
pub mod document;
pub mod rejection;
pub mod resource;

use serde::{Deserialize, Serialize};

pub use console::{ErrorSink, FnSink, InterceptingSink, LogArg, TracingSink};
pub use document::{DocumentScanner, ScanPhase};
pub use rejection::RejectionReason;
pub use resource::{ErrorEvent, FailedElement};

/// Error-shaped value (`name`, `message`, `stack`)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ErrorLike {
    /// Error class name, e.g. `TypeError`
    pub name: Option<String>,
    /// Error message
    pub message: Option<String>,
    /// Stack trace
    pub stack: Option<String>,
}

impl ErrorLike {
    /// Error with a message
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::default()
        }
    }

    /// With class name
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// With stack trace
    #[must_use]
    pub fn with_stack(mut self, stack: impl Into<String>) -> Self {
        self.stack = Some(stack.into());
        self
    }

    /// Best available one-line message
    ///
    /// `name: message` when both are present; otherwise the message, the
    /// first stack line, the name, or `Error`.
    #[must_use]
    pub fn summary(&self) -> String {
        let message = non_blank(self.message.as_deref());
        let name = non_blank(self.name.as_deref());
        match (name, message) {
            (Some(name), Some(message)) if !message.starts_with(name) => {
                format!("{name}: {message}")
            }
            (_, Some(message)) => message.to_string(),
            (name, None) => non_blank(self.stack.as_deref())
                .and_then(|s| s.lines().next())
                .or(name)
                .unwrap_or("Error")
                .to_string(),
        }
    }
}

/// `Some(s)` unless `s` is missing or whitespace
pub(crate) fn non_blank(s: Option<&str>) -> Option<&str> {
    s.map(str::trim).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_prefers_name_and_message() {
        let err = ErrorLike::new("x is undefined").with_name("TypeError");
        assert_eq!(err.summary(), "TypeError: x is undefined");
    }

    #[test]
    fn summary_does_not_repeat_name() {
        let err = ErrorLike::new("TypeError: x is undefined").with_name("TypeError");
        assert_eq!(err.summary(), "TypeError: x is undefined");
    }

    #[test]
    fn summary_falls_back_to_stack_then_name() {
        let err = ErrorLike::default().with_stack("RangeError: too deep\n  at f (a.js:1:1)");
        assert_eq!(err.summary(), "RangeError: too deep");
        assert_eq!(ErrorLike::default().with_name("AbortError").summary(), "AbortError");
        assert_eq!(ErrorLike::default().summary(), "Error");
    }
}
