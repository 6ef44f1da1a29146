//! Error types for the sentinel core
//!
//! Provides error handling for:
//! - Configuration loading and validation
//! - Host frame delivery

/// Errors raised while loading or validating an [`AgentConfig`](crate::AgentConfig)
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML document could not be parsed
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A pattern field is not a valid regular expression
    #[error("invalid pattern in '{field}': {source}")]
    Pattern {
        field: &'static str,
        #[source]
        source: regex::Error,
    },

    /// Semantic validation failed
    #[error("invalid config: {0}")]
    Invalid(String),
}

impl ConfigError {
    /// Create pattern error for field
    pub fn pattern(field: &'static str, source: regex::Error) -> Self {
        Self::Pattern { field, source }
    }
}

/// Errors raised while handing a message to the host frame
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The host frame went away between the presence check and the send
    #[error("host frame detached")]
    HostDetached,

    /// Receiving side of an in-process channel was dropped
    #[error("host channel closed")]
    ChannelClosed,

    /// Message could not be serialized
    #[error("serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Underlying writer failed
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
