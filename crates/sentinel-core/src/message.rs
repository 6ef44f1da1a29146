//! Cross-frame message contract
//!
//! ```text
//! { "type": "copy-error",    "text": "..." }
//! { "type": "invalid-token", "code": "INVALID_TOKEN", "text": "..." }
//! ```

use serde::{Deserialize, Serialize};

/// Machine-readable code carried by authorization failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AuthFailureCode {
    /// Access token rejected or expired
    #[serde(rename = "INVALID_TOKEN")]
    InvalidToken,
}

/// Message posted to the host frame
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum HostMessage {
    /// Human-readable failure report
    #[serde(rename = "copy-error")]
    CopyError {
        /// Fully formatted description
        text: String,
    },
    /// Invalid or expired session access
    #[serde(rename = "invalid-token")]
    InvalidToken {
        /// Always [`AuthFailureCode::InvalidToken`]
        code: AuthFailureCode,
        /// Fully formatted description
        text: String,
    },
}

impl HostMessage {
    /// `copy-error` message
    #[inline]
    #[must_use]
    pub fn copy_error(text: impl Into<String>) -> Self {
        Self::CopyError { text: text.into() }
    }

    /// `invalid-token` message
    #[inline]
    #[must_use]
    pub fn invalid_token(text: impl Into<String>) -> Self {
        Self::InvalidToken {
            code: AuthFailureCode::InvalidToken,
            text: text.into(),
        }
    }

    /// Wire name of the message type
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::CopyError { .. } => "copy-error",
            Self::InvalidToken { .. } => "invalid-token",
        }
    }

    /// Carried text
    #[must_use]
    pub fn text(&self) -> &str {
        match self {
            Self::CopyError { text } | Self::InvalidToken { text, .. } => text,
        }
    }
}
