//! Window `error` events: uncaught exceptions and resource load failures

use super::{non_blank, ErrorLike};
use sentinel_core::{ErrorDescription, ErrorSource};
use serde::{Deserialize, Serialize};

/// Element whose load failed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "element", rename_all = "snake_case")]
pub enum FailedElement {
    /// `<script src>`
    Script {
        /// Script URL
        src: Option<String>,
    },
    /// `<link rel="stylesheet" href>`
    Stylesheet {
        /// Stylesheet URL
        href: Option<String>,
    },
    /// `<img src>`
    Image {
        /// Image URL
        src: Option<String>,
    },
    /// Anything else
    Other {
        /// Tag name
        tag: String,
    },
}

impl FailedElement {
    /// URL of the failed resource
    #[must_use]
    pub fn url(&self) -> Option<&str> {
        match self {
            Self::Script { src } | Self::Image { src } => non_blank(src.as_deref()),
            Self::Stylesheet { href } => non_blank(href.as_deref()),
            Self::Other { .. } => None,
        }
    }

    fn kind(&self) -> Option<&'static str> {
        match self {
            Self::Script { .. } => Some("script"),
            Self::Stylesheet { .. } => Some("stylesheet"),
            Self::Image { .. } => Some("image"),
            Self::Other { .. } => None,
        }
    }
}

/// Fields of a window `error` event
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ErrorEvent {
    /// Event message
    pub message: Option<String>,
    /// Script that raised the error
    pub filename: Option<String>,
    /// Line number
    pub line: Option<u32>,
    /// Column number
    pub column: Option<u32>,
    /// Nested error object
    pub error: Option<ErrorLike>,
    /// Element whose load failed (resource errors carry no message)
    pub target: Option<FailedElement>,
}

impl ErrorEvent {
    /// Uncaught exception event
    #[must_use]
    pub fn exception(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::default()
        }
    }

    /// Resource load failure event
    #[must_use]
    pub fn resource(target: FailedElement) -> Self {
        Self {
            target: Some(target),
            ..Self::default()
        }
    }

    /// With source location
    #[must_use]
    pub fn at(mut self, filename: impl Into<String>, line: u32, column: u32) -> Self {
        self.filename = Some(filename.into());
        self.line = Some(line);
        self.column = Some(column);
        self
    }

    /// With nested error
    #[must_use]
    pub fn with_error(mut self, error: ErrorLike) -> Self {
        self.error = Some(error);
        self
    }
}

/// Normalize an `error` event
///
/// An event with a message (or a nested error) is an uncaught exception.
/// Without one, the failing element decides the message; when nothing is
/// derivable the description reads `Unknown loading error`.
#[must_use]
pub fn describe(event: &ErrorEvent) -> ErrorDescription {
    let message = non_blank(event.message.as_deref())
        .map(str::to_string)
        .or_else(|| {
            event
                .error
                .as_ref()
                .filter(|e| e.message.is_some() || e.name.is_some())
                .map(ErrorLike::summary)
        });
    let stack = event.error.as_ref().and_then(|e| e.stack.clone());

    if let Some(message) = message {
        return ErrorDescription::builder(ErrorSource::UncaughtException, message.clone(), message)
            .with_location(event.filename.clone(), event.line, event.column)
            .with_stack(stack)
            .build();
    }

    let target = event.target.as_ref();
    let url = target.and_then(FailedElement::url);
    let message = match (target.and_then(FailedElement::kind), url) {
        (Some(kind), Some(url)) => format!("Failed to load {kind}: {url}"),
        (Some(kind), None) => format!("Failed to load {kind}"),
        (None, _) => "Unknown loading error".to_string(),
    };
    let file = url
        .map(str::to_string)
        .or_else(|| event.filename.clone());

    ErrorDescription::builder(ErrorSource::ResourceLoad, message.clone(), message)
        .with_location(file, event.line, event.column)
        .with_stack(stack)
        .build()
}
