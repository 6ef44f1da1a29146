//! Diagnostic agent for one page load
//!
//! A [`DiagnosticAgent`] owns the session, the grace timer and the debounce
//! timer. All session mutation goes through a single lock, so listener calls
//! and timer expiries are serialized the way browser callbacks are. The lock
//! is released while a message is posted to the host, so a transport that
//! logs back into the page cannot stall the listeners.
//!
//! Timer tasks only hold a weak reference to the agent. Dropping the last
//! handle (or calling [`DiagnosticAgent::dispose`]) cancels them.

use crate::error::StartError;
use crate::listeners::{
    console, document, rejection, resource, DocumentScanner, ErrorEvent, ErrorSink,
    InterceptingSink, LogArg, RejectionReason, ScanPhase,
};
use crate::timer::ScheduledTimer;
use parking_lot::Mutex;
use sentinel_core::{
    deliver, Admission, AgentConfig, Classifier, Delivery, ErrorDescription, FlushOutcome,
    HostMessage, SessionId, SessionState, SessionStats, TimerGeneration, Transport,
};
use std::fmt;
use std::sync::{Arc, Weak};
use tokio::runtime::Handle;

struct Inner {
    session: SessionState,
    debounce: Option<ScheduledTimer>,
    grace: Option<ScheduledTimer>,
    scanner: DocumentScanner,
}

struct Shared {
    session_id: SessionId,
    config: AgentConfig,
    classifier: Classifier,
    transport: Box<dyn Transport>,
    runtime: Handle,
    inner: Mutex<Inner>,
    /// Held across a whole flush so the ledger and cap see every earlier send.
    flushing: Mutex<()>,
}

/// In-page diagnostic agent
///
/// Cheap to clone; clones share one session.
#[derive(Clone)]
pub struct DiagnosticAgent {
    shared: Arc<Shared>,
}

impl fmt::Debug for DiagnosticAgent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiagnosticAgent")
            .field("session_id", &self.shared.session_id)
            .field("config", &self.shared.config)
            .finish_non_exhaustive()
    }
}

impl DiagnosticAgent {
    /// Validate `config`, open a session and start the grace timer
    ///
    /// # Errors
    /// - `StartError::Config` if the configuration is invalid
    /// - `StartError::NoRuntime` if called outside a tokio runtime
    pub fn start<T>(config: AgentConfig, transport: T) -> Result<Self, StartError>
    where
        T: Transport + 'static,
    {
        config.validate()?;
        let classifier = Classifier::new(&config.patterns)?;
        let runtime = Handle::try_current().map_err(|_| StartError::NoRuntime)?;

        let session = SessionState::new(&config);
        let session_id = session.id();
        let grace_period = config.grace_period();

        let shared = Arc::new(Shared {
            session_id,
            config,
            classifier,
            transport: Box::new(transport),
            runtime,
            inner: Mutex::new(Inner {
                session,
                debounce: None,
                grace: None,
                scanner: DocumentScanner::new(),
            }),
            flushing: Mutex::new(()),
        });

        let weak = Arc::downgrade(&shared);
        let grace = ScheduledTimer::spawn_on(&shared.runtime, grace_period, move || {
            if let Some(agent) = Self::upgrade(&weak) {
                agent.grace_expired();
            }
        });
        shared.inner.lock().grace = Some(grace);

        tracing::info!(
            session = %session_id,
            grace = ?grace_period,
            "Diagnostic agent started"
        );
        Ok(Self { shared })
    }

    fn upgrade(weak: &Weak<Shared>) -> Option<Self> {
        weak.upgrade().map(|shared| Self { shared })
    }

    /// Session identity
    #[inline]
    #[must_use]
    pub fn session_id(&self) -> SessionId {
        self.shared.session_id
    }

    /// Active configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &AgentConfig {
        &self.shared.config
    }

    /// Pipeline entry point
    ///
    /// Authorization failures take the immediate path; everything else is
    /// classified and run through gate, dedup and the accumulator.
    pub fn report(&self, description: ErrorDescription) {
        if description.source().is_immediate() {
            self.send_invalid_token(&description);
            return;
        }

        let severity = self.shared.classifier.classify_description(&description);
        let source = description.source();
        let mut inner = self.shared.inner.lock();

        match inner.session.admit(description, severity) {
            Admission::Queued {
                generation,
                window,
                severity,
            } => {
                if let Some(previous) = inner.debounce.take() {
                    previous.cancel();
                }
                let weak = Arc::downgrade(&self.shared);
                inner.debounce = Some(ScheduledTimer::spawn_on(
                    &self.shared.runtime,
                    window,
                    move || {
                        if let Some(agent) = Self::upgrade(&weak) {
                            agent.flush(generation);
                        }
                    },
                ));
                tracing::debug!(
                    session = %self.shared.session_id,
                    %source,
                    ?severity,
                    timer = %generation,
                    ?window,
                    "Error queued"
                );
            }
            Admission::Dropped(reason) => {
                tracing::debug!(
                    session = %self.shared.session_id,
                    %source,
                    ?severity,
                    ?reason,
                    "Error dropped"
                );
            }
        }
    }

    /// Window `error` event (capture phase)
    pub fn on_error_event(&self, event: &ErrorEvent) {
        self.report(resource::describe(event));
    }

    /// `unhandledrejection` event
    pub fn on_unhandled_rejection(&self, reason: &RejectionReason) {
        self.report(rejection::describe(reason, &self.shared.classifier));
    }

    /// One error-level log call, after it reached the original sink
    pub fn on_console_error(&self, args: &[LogArg]) {
        if let Some(description) = console::describe(args, &self.shared.config.patterns) {
            self.report(description);
        }
    }

    /// Wrap the page's error-level sink so its calls also feed this agent
    #[must_use]
    pub fn decorate_error_sink<S: ErrorSink>(&self, sink: S) -> InterceptingSink<S> {
        InterceptingSink::new(sink, self.clone())
    }

    /// Scan rendered document text for an authorization-failure marker
    ///
    /// Each phase is scanned at most once. Returns whether a marker was
    /// found by this call.
    pub fn scan_document(&self, text: &str, phase: ScanPhase) -> bool {
        {
            let mut inner = self.shared.inner.lock();
            if inner.session.is_disposed() || !inner.scanner.begin(phase) {
                return false;
            }
        }

        match document::scan(text, &self.shared.config.patterns.auth_markers) {
            Some(description) => {
                self.send_invalid_token(&description);
                true
            }
            None => false,
        }
    }

    /// Immediate path: ignores gate, dedup, batching and the cap
    fn send_invalid_token(&self, description: &ErrorDescription) {
        if self.shared.inner.lock().session.is_disposed() {
            return;
        }

        let message = HostMessage::invalid_token(description.text());
        let delivery = deliver(self.shared.transport.as_ref(), &message);
        let mut inner = self.shared.inner.lock();
        match delivery {
            Delivery::Sent => {
                inner.session.record_authorization_report();
                tracing::warn!(
                    session = %self.shared.session_id,
                    "Authorization failure reported to host"
                );
            }
            Delivery::NoHost => {
                tracing::debug!(
                    session = %self.shared.session_id,
                    "No host frame; authorization failure not sent"
                );
            }
            Delivery::Failed(e) => {
                inner.session.record_transport_failure();
                tracing::warn!(session = %self.shared.session_id, "Failed to post invalid-token: {}", e);
            }
        }
    }

    /// Relay a user-requested copy of `text` as `copy-error`
    ///
    /// Bypasses gate, batching and the cap, and does not mark anything as
    /// reported. Returns whether the host received it.
    pub fn request_manual_copy(&self, text: &str) -> bool {
        if self.shared.inner.lock().session.is_disposed() {
            return false;
        }

        let delivery = deliver(self.shared.transport.as_ref(), &HostMessage::copy_error(text));
        let mut inner = self.shared.inner.lock();
        match delivery {
            Delivery::Sent => {
                inner.session.record_manual_copy();
                true
            }
            Delivery::NoHost => false,
            Delivery::Failed(e) => {
                inner.session.record_transport_failure();
                tracing::warn!(session = %self.shared.session_id, "Failed to post manual copy: {}", e);
                false
            }
        }
    }

    fn flush(&self, generation: TimerGeneration) {
        let _flushing = self.shared.flushing.lock();

        let (report, batch_size) = {
            let mut inner = self.shared.inner.lock();
            match inner.session.expire(generation) {
                FlushOutcome::Stale => {
                    tracing::trace!(timer = %generation, "Stale debounce expiry ignored");
                    return;
                }
                FlushOutcome::Ready { report, batch_size } => {
                    if let Some(timer) = inner.debounce.take() {
                        timer.disarm();
                    }
                    (report, batch_size)
                }
                FlushOutcome::Blocked { reason, dropped } => {
                    if let Some(timer) = inner.debounce.take() {
                        timer.disarm();
                    }
                    tracing::debug!(
                        session = %self.shared.session_id,
                        ?reason,
                        dropped,
                        "Batch dropped"
                    );
                    return;
                }
            }
        };

        let message = HostMessage::copy_error(report.description.text());
        let delivery = deliver(self.shared.transport.as_ref(), &message);

        let mut inner = self.shared.inner.lock();
        match delivery {
            Delivery::Sent => {
                inner.session.record_sent(report.fingerprint);
                tracing::info!(
                    session = %self.shared.session_id,
                    batch_size,
                    reported = inner.session.reported_count(),
                    "Error report sent"
                );
            }
            Delivery::NoHost => {
                tracing::debug!(
                    session = %self.shared.session_id,
                    batch_size,
                    "No host frame; report not sent"
                );
            }
            Delivery::Failed(e) => {
                inner.session.record_transport_failure();
                tracing::warn!(
                    session = %self.shared.session_id,
                    "Failed to post error report: {}",
                    e
                );
            }
        }
    }

    fn grace_expired(&self) {
        let mut inner = self.shared.inner.lock();
        if let Some(timer) = inner.grace.take() {
            timer.disarm();
        }
        if inner.session.end_grace() {
            tracing::info!(session = %self.shared.session_id, "Grace period over");
        }
    }

    /// End the grace period now instead of waiting for the timer
    pub fn end_grace(&self) {
        let mut inner = self.shared.inner.lock();
        if let Some(timer) = inner.grace.take() {
            timer.cancel();
        }
        if inner.session.end_grace() {
            tracing::info!(session = %self.shared.session_id, "Grace period ended early");
        }
    }

    /// Whether the grace period is still running
    #[must_use]
    pub fn in_grace(&self) -> bool {
        self.shared.inner.lock().session.in_grace()
    }

    /// Cancel both timers, drop the queue and ignore all further input
    pub fn dispose(&self) {
        let mut inner = self.shared.inner.lock();
        if inner.session.is_disposed() {
            return;
        }
        let dropped = inner.session.dispose();
        if let Some(timer) = inner.debounce.take() {
            timer.cancel();
        }
        if let Some(timer) = inner.grace.take() {
            timer.cancel();
        }
        tracing::info!(session = %self.shared.session_id, dropped, "Diagnostic agent disposed");
    }

    /// Snapshot of the session
    #[must_use]
    pub fn stats(&self) -> SessionStats {
        self.shared.inner.lock().session.stats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sentinel_core::TransportError;
    use sentinel_test_utils::{uncaught, RecordingTransport};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::OnceLock;
    use std::time::Duration;

    /// Records whether the session lock was free during each post
    #[derive(Default)]
    struct LockCheckingTransport {
        agent: OnceLock<Weak<Shared>>,
        posts: AtomicUsize,
        locked_posts: AtomicUsize,
    }

    impl Transport for LockCheckingTransport {
        fn has_host(&self) -> bool {
            true
        }

        fn post(&self, _message: &HostMessage) -> Result<(), TransportError> {
            self.posts.fetch_add(1, Ordering::SeqCst);
            let lock_free = self
                .agent
                .get()
                .and_then(Weak::upgrade)
                .is_some_and(|shared| shared.inner.try_lock().is_some());
            if !lock_free {
                self.locked_posts.fetch_add(1, Ordering::SeqCst);
            }
            Ok(())
        }
    }

    #[test]
    fn start_outside_runtime_fails() {
        let result = DiagnosticAgent::start(AgentConfig::default(), RecordingTransport::new());
        assert!(matches!(result, Err(StartError::NoRuntime)));
    }

    #[tokio::test]
    async fn start_rejects_invalid_config() {
        let config = AgentConfig::default().with_fingerprint_len(0);
        let result = DiagnosticAgent::start(config, RecordingTransport::new());
        assert!(matches!(result, Err(StartError::Config(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn clones_share_one_session() {
        let recorder = RecordingTransport::new();
        let agent = DiagnosticAgent::start(AgentConfig::default(), recorder.clone()).unwrap();
        let clone = agent.clone();
        agent.end_grace();

        clone.report(uncaught("boom"));
        tokio::time::sleep(Duration::from_millis(1600)).await;

        assert_eq!(agent.stats().reported_count, 1);
        assert_eq!(clone.session_id(), agent.session_id());
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_last_handle_cancels_timers() {
        let recorder = RecordingTransport::new();
        let agent = DiagnosticAgent::start(AgentConfig::default(), recorder.clone()).unwrap();
        agent.end_grace();
        agent.report(uncaught("boom"));
        drop(agent);

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(recorder.messages().is_empty());
    }

    /// Host that logs an error back into the page on its first post
    #[derive(Default)]
    struct EchoTransport {
        agent: OnceLock<Weak<Shared>>,
        posts: AtomicUsize,
    }

    impl Transport for EchoTransport {
        fn has_host(&self) -> bool {
            true
        }

        fn post(&self, _message: &HostMessage) -> Result<(), TransportError> {
            if self.posts.fetch_add(1, Ordering::SeqCst) == 0 {
                if let Some(agent) = self.agent.get().and_then(DiagnosticAgent::upgrade) {
                    agent.on_console_error(&["Uncaught TypeError: host echo".into()]);
                }
            }
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn session_lock_is_released_while_posting() {
        let transport = Arc::new(LockCheckingTransport::default());
        let agent = DiagnosticAgent::start(AgentConfig::default(), Arc::clone(&transport)).unwrap();
        transport
            .agent
            .set(Arc::downgrade(&agent.shared))
            .unwrap_or_else(|_| panic!("agent already set"));

        agent.end_grace();
        agent.report(uncaught("Uncaught Error: boom"));
        tokio::time::sleep(Duration::from_millis(1600)).await;
        assert!(agent.scan_document("INVALID_TOKEN", ScanPhase::Loaded));
        assert!(agent.request_manual_copy("copy me"));

        assert_eq!(transport.posts.load(Ordering::SeqCst), 3);
        assert_eq!(transport.locked_posts.load(Ordering::SeqCst), 0);

        let stats = agent.stats();
        assert_eq!(stats.reported_count, 1);
        assert_eq!(stats.counters.authorization_reports, 1);
        assert_eq!(stats.counters.manual_copies, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn host_can_log_back_into_the_agent_while_posting() {
        let transport = Arc::new(EchoTransport::default());
        let agent = DiagnosticAgent::start(AgentConfig::default(), Arc::clone(&transport)).unwrap();
        transport
            .agent
            .set(Arc::downgrade(&agent.shared))
            .unwrap_or_else(|_| panic!("agent already set"));
        agent.end_grace();

        agent.report(uncaught("Uncaught Error: boom"));
        tokio::time::sleep(Duration::from_millis(1600)).await;
        let stats = agent.stats();
        assert_eq!(stats.reported_count, 1);
        assert_eq!(stats.pending, 1);

        tokio::time::sleep(Duration::from_millis(1600)).await;
        assert_eq!(agent.stats().reported_count, 2);
        assert_eq!(transport.posts.load(Ordering::SeqCst), 2);
    }
}
