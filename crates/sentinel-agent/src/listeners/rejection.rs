//! `unhandledrejection` events

use super::{non_blank, ErrorLike};
use sentinel_core::{Classifier, ErrorDescription, ErrorSource};
use serde::{Deserialize, Serialize};

/// Prefix marking rejections that look like build or network failures
pub const NETWORK_PREFIX: &str = "Build/network error: ";

/// Rejection reason
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum RejectionReason {
    /// `reject("...")`
    Text(String),
    /// `reject(new Error(...))` or anything with `message`/`stack`
    ErrorLike(ErrorLike),
    /// Any other value, already converted to its string form
    Other(String),
}

impl RejectionReason {
    /// Message and stack carried by the reason
    #[must_use]
    pub fn message_and_stack(&self) -> (String, Option<String>) {
        match self {
            Self::Text(text) => (text.clone(), None),
            Self::ErrorLike(error) => (error.summary(), error.stack.clone()),
            Self::Other(repr) => (
                non_blank(Some(repr)).unwrap_or("undefined").to_string(),
                None,
            ),
        }
    }
}

impl From<&str> for RejectionReason {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<ErrorLike> for RejectionReason {
    fn from(error: ErrorLike) -> Self {
        Self::ErrorLike(error)
    }
}

/// Normalize a rejection reason
///
/// Messages the classifier sees as build or network failures are prefixed
/// with [`NETWORK_PREFIX`].
#[must_use]
pub fn describe(reason: &RejectionReason, classifier: &Classifier) -> ErrorDescription {
    let (message, stack) = reason.message_and_stack();
    let message = if classifier.is_network_failure(&message) {
        format!("{NETWORK_PREFIX}{message}")
    } else {
        message
    };

    ErrorDescription::builder(
        ErrorSource::UnhandledRejection,
        format!("Unhandled promise rejection: {message}"),
        message,
    )
    .with_stack(stack)
    .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> Classifier {
        Classifier::default()
    }

    #[test]
    fn string_reason_used_directly() {
        let desc = describe(&"quota exceeded".into(), &classifier());
        assert_eq!(desc.raw_message(), "quota exceeded");
        assert!(desc.text().contains("Unhandled promise rejection: quota exceeded"));
    }

    #[test]
    fn error_reason_keeps_stack() {
        let reason = RejectionReason::from(
            ErrorLike::new("plan.days is undefined")
                .with_name("TypeError")
                .with_stack("TypeError: plan.days is undefined\n  at load (plan.ts:9:3)"),
        );
        let desc = describe(&reason, &classifier());
        assert_eq!(desc.raw_message(), "TypeError: plan.days is undefined");
        assert_eq!(desc.stack().map(|s| s.contains("plan.ts:9:3")), Some(true));
    }

    #[test]
    fn other_reason_uses_string_form() {
        let desc = describe(&RejectionReason::Other("[object Object]".into()), &classifier());
        assert_eq!(desc.raw_message(), "[object Object]");

        let desc = describe(&RejectionReason::Other(String::new()), &classifier());
        assert_eq!(desc.raw_message(), "undefined");
    }

    #[test]
    fn network_failures_are_prefixed() {
        for message in [
            "TypeError: Failed to fetch",
            "Request failed with status code 500",
            "NetworkError when attempting to fetch resource.",
            "net::ERR_CONNECTION_REFUSED",
            "The user aborted a request.",
        ] {
            let desc = describe(&message.into(), &classifier());
            assert!(
                desc.raw_message().starts_with(NETWORK_PREFIX),
                "{message} should be prefixed"
            );
        }
    }

    #[test]
    fn numbers_containing_500_are_not_network_failures() {
        let desc = describe(&"Request timed out after 1500 ms".into(), &classifier());
        assert_eq!(desc.raw_message(), "Request timed out after 1500 ms");
    }

    #[test]
    fn reason_wire_shape() {
        let reason: RejectionReason =
            serde_json::from_str(r#"{"kind":"error_like","value":{"message":"boom"}}"#).unwrap();
        assert_eq!(reason, RejectionReason::ErrorLike(ErrorLike::new("boom")));
    }
}
