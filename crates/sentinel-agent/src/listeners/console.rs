//! Error-level log sink decorator
//!
//! The page's error-level sink is wrapped explicitly at startup with
//! [`DiagnosticAgent::decorate_error_sink`](crate::DiagnosticAgent::decorate_error_sink).
//! Every call reaches the original sink first; matching lines are then
//! pushed into the pipeline.

use super::ErrorLike;
use crate::agent::DiagnosticAgent;
use sentinel_core::{ErrorDescription, ErrorSource, PatternConfig};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Keys that make an object count as an error
const ERROR_KEYS: [&str; 3] = ["name", "message", "stack"];

/// One argument passed to the error-level log call
///
/// Objects become [`LogArg::Error`] only when they carry a non-null `name`,
/// `message` or `stack`; anything else is kept as a plain value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum LogArg {
    /// Plain string
    Text(String),
    /// Error object
    Error(ErrorLike),
    /// Any other value
    Value(Value),
}

impl LogArg {
    /// Rendering used when joining arguments into one line
    #[must_use]
    pub fn render(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Error(error) => error.summary(),
            Self::Value(Value::String(s)) => s.clone(),
            Self::Value(value) => value.to_string(),
        }
    }
}

impl From<Value> for LogArg {
    fn from(value: Value) -> Self {
        let error_shaped = value.as_object().is_some_and(|object| {
            ERROR_KEYS
                .iter()
                .any(|key| object.get(*key).is_some_and(|v| !v.is_null()))
        });
        if error_shaped {
            if let Ok(error) = ErrorLike::deserialize(&value) {
                return Self::Error(error);
            }
        }
        match value {
            Value::String(text) => Self::Text(text),
            other => Self::Value(other),
        }
    }
}

impl<'de> Deserialize<'de> for LogArg {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Value::deserialize(deserializer).map(Self::from)
    }
}

impl From<&str> for LogArg {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<ErrorLike> for LogArg {
    fn from(error: ErrorLike) -> Self {
        Self::Error(error)
    }
}

/// Error-level log destination
pub trait ErrorSink: Send + Sync {
    /// Emit one error-level log call
    fn error(&self, args: &[LogArg]);
}

/// Adapter turning a closure into an [`ErrorSink`]
pub struct FnSink<F>(pub F);

impl<F> ErrorSink for FnSink<F>
where
    F: Fn(&[LogArg]) + Send + Sync,
{
    fn error(&self, args: &[LogArg]) {
        (self.0)(args);
    }
}

/// Sink writing to `tracing` at error level
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl ErrorSink for TracingSink {
    fn error(&self, args: &[LogArg]) {
        tracing::error!(target: "preview.console", "{}", join_args(args));
    }
}

/// Sink that forwards to the original sink, then feeds the agent
pub struct InterceptingSink<S> {
    original: S,
    agent: DiagnosticAgent,
}

impl<S: ErrorSink> InterceptingSink<S> {
    pub(crate) fn new(original: S, agent: DiagnosticAgent) -> Self {
        Self { original, agent }
    }

    /// Wrapped sink
    #[inline]
    #[must_use]
    pub fn original(&self) -> &S {
        &self.original
    }
}

impl<S: ErrorSink> ErrorSink for InterceptingSink<S> {
    fn error(&self, args: &[LogArg]) {
        self.original.error(args);
        self.agent.on_console_error(args);
    }
}

/// Join arguments with single spaces
#[must_use]
pub fn join_args(args: &[LogArg]) -> String {
    args.iter().map(LogArg::render).collect::<Vec<_>>().join(" ")
}

/// Normalize a log call, or `None` if it should not be reported
///
/// Tooling chatter is filtered before the error-keyword check.
#[must_use]
pub fn describe(args: &[LogArg], patterns: &PatternConfig) -> Option<ErrorDescription> {
    let line = join_args(args);
    if line.trim().is_empty() || patterns.log_benign_keywords.matches(&line) {
        return None;
    }
    if !patterns.log_error_keywords.matches(&line) {
        return None;
    }

    let stack = args.iter().find_map(|arg| match arg {
        LogArg::Error(error) => error.stack.clone(),
        _ => None,
    });

    Some(
        ErrorDescription::builder(ErrorSource::ConsoleError, format!("Console error: {line}"), line)
            .with_stack(stack)
            .build(),
    )
}
