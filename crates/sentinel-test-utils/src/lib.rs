//! Testing utilities for the preview sentinel workspace
//!
//! Shared test helpers, fixtures, and assertions.

#![allow(missing_docs)]

use parking_lot::Mutex;
use sentinel_core::{ErrorDescription, ErrorSource, HostMessage, Transport, TransportError};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Debug, Default)]
struct Recorded {
    messages: Mutex<Vec<HostMessage>>,
    detached: AtomicBool,
    failures_left: AtomicUsize,
}

/// Transport that records every posted message
///
/// Clones share the same recording, so a test keeps one clone and hands
/// another to the agent.
#[derive(Debug, Clone, Default)]
pub struct RecordingTransport {
    inner: Arc<Recorded>,
}

impl RecordingTransport {
    /// Recorder with a host frame attached
    pub fn new() -> Self {
        Self::default()
    }

    /// Recorder behaving like a top-level page
    pub fn top_level() -> Self {
        let recorder = Self::default();
        recorder.detach();
        recorder
    }

    pub fn detach(&self) {
        self.inner.detached.store(true, Ordering::SeqCst);
    }

    pub fn attach(&self) {
        self.inner.detached.store(false, Ordering::SeqCst);
    }

    /// Make the next `n` posts fail
    pub fn fail_next(&self, n: usize) {
        self.inner.failures_left.store(n, Ordering::SeqCst);
    }

    pub fn messages(&self) -> Vec<HostMessage> {
        self.inner.messages.lock().clone()
    }

    /// Texts of all `copy-error` messages
    pub fn copy_errors(&self) -> Vec<String> {
        self.messages()
            .into_iter()
            .filter_map(|m| match m {
                HostMessage::CopyError { text } => Some(text),
                HostMessage::InvalidToken { .. } => None,
            })
            .collect()
    }

    /// Texts of all `invalid-token` messages
    pub fn invalid_tokens(&self) -> Vec<String> {
        self.messages()
            .into_iter()
            .filter_map(|m| match m {
                HostMessage::InvalidToken { text, .. } => Some(text),
                HostMessage::CopyError { .. } => None,
            })
            .collect()
    }
}

impl Transport for RecordingTransport {
    fn has_host(&self) -> bool {
        !self.inner.detached.load(Ordering::SeqCst)
    }

    fn post(&self, message: &HostMessage) -> Result<(), TransportError> {
        let failing = self
            .inner
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(TransportError::HostDetached);
        }
        self.inner.messages.lock().push(message.clone());
        Ok(())
    }
}

pub fn uncaught(message: &str) -> ErrorDescription {
    ErrorDescription::builder(ErrorSource::UncaughtException, message, message).build()
}

pub fn uncaught_at(message: &str, file: &str, line: u32) -> ErrorDescription {
    ErrorDescription::builder(ErrorSource::UncaughtException, message, message)
        .with_location(Some(file), Some(line), Some(1))
        .build()
}

/// Install a test subscriber once; later calls are no-ops
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter(tracing_subscriber::EnvFilter::new("debug"))
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recorder_fails_requested_number_of_posts() {
        let recorder = RecordingTransport::new();
        recorder.fail_next(1);
        assert!(recorder.post(&HostMessage::copy_error("a")).is_err());
        assert!(recorder.post(&HostMessage::copy_error("b")).is_ok());
        assert_eq!(recorder.copy_errors(), vec!["b".to_string()]);
    }

    #[test]
    fn clones_share_recording() {
        let recorder = RecordingTransport::top_level();
        let handed_out = recorder.clone();
        assert!(!handed_out.has_host());
        recorder.attach();
        assert!(handed_out.has_host());
    }
}
