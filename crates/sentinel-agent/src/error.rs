//! Error types for the agent crate
//!
//! Listener entry points never fail; only setup and replay return errors.

use std::path::PathBuf;

pub use sentinel_core::{ConfigError, TransportError};

/// Errors starting a [`DiagnosticAgent`](crate::DiagnosticAgent)
#[derive(Debug, thiserror::Error)]
pub enum StartError {
    /// Configuration failed validation
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// No tokio runtime to drive the timers
    #[error("agent must be started inside a tokio runtime")]
    NoRuntime,
}

/// Errors while loading or parsing an event script
#[derive(Debug, thiserror::Error)]
pub enum ReplayError {
    /// Script file could not be read
    #[error("io error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A line is not a valid script step
    #[error("invalid script step on line {line}: {source}")]
    Parse {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}

impl ReplayError {
    /// Create IO error for path
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_error_wraps_config() {
        let err = StartError::from(ConfigError::Invalid("fingerprint_len must be positive".into()));
        assert!(err.to_string().contains("fingerprint_len"));
    }

    #[test]
    fn parse_error_names_line() {
        let source = serde_json::from_str::<u32>("x").unwrap_err();
        let err = ReplayError::Parse { line: 4, source };
        assert!(err.to_string().starts_with("invalid script step on line 4"));
    }
}
