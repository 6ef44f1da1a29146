//! Session state
//!
//! One [`SessionState`] lives for one page load. It ties the grace gate,
//! the accumulator, the rate limiter and the report ledger together and
//! keeps their invariants:
//!
//! - `reported_count == |reported_fingerprints|` (the count *is* the ledger size)
//! - the pending queue never holds two entries with one fingerprint
//! - a timer generation is armed iff the pending queue is non-empty

use crate::accumulator::{Accumulator, PendingReport, TimerGeneration};
use crate::classifier::Severity;
use crate::config::AgentConfig;
use crate::description::{ErrorDescription, Fingerprint};
use crate::gate::{GateDecision, GracePhase, GraceGate};
use crate::keywords::KeywordSet;
use crate::limiter::{RateLimiter, ReportLedger, SendBlocked};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use ulid::Ulid;

/// Identity of one agent session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Ulid);

impl SessionId {
    /// Generate new session ID
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Why an admitted-looking error never reached the queue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DropReason {
    /// Normal error during the grace period
    GracePeriod,
    /// Fingerprint already reported this session
    AlreadyReported,
    /// Fingerprint already waiting in the queue
    AlreadyQueued,
    /// Report cap reached
    RateLimited,
    /// Agent was disposed
    Disposed,
}

/// Result of [`SessionState::admit`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Queued; the driver must (re)arm the debounce timer
    Queued {
        /// Identity of the timer to arm; any previous timer is superseded
        generation: TimerGeneration,
        /// How long to wait
        window: Duration,
        /// Severity that selected the window
        severity: Severity,
    },
    /// Discarded
    Dropped(DropReason),
}

/// Result of [`SessionState::expire`]
#[derive(Debug, Clone)]
pub enum FlushOutcome {
    /// Expiry of a superseded or cancelled timer
    Stale,
    /// The driver should send this report, then call
    /// [`SessionState::record_sent`] on success
    Ready {
        /// Chosen representative
        report: PendingReport,
        /// Entries drained from the queue, including the representative
        batch_size: usize,
    },
    /// The batch was drained but nothing may be sent
    Blocked {
        /// Refusal reason
        reason: SendBlocked,
        /// Entries drained from the queue
        dropped: usize,
    },
}

/// Settings the session needs from [`AgentConfig`]
#[derive(Debug, Clone)]
struct SessionPolicy {
    fingerprint_len: usize,
    normal_window: Duration,
    critical_window: Duration,
    representative: KeywordSet,
    limiter: RateLimiter,
}

impl SessionPolicy {
    fn window(&self, severity: Severity) -> Duration {
        match severity {
            Severity::Critical => self.critical_window,
            Severity::Normal => self.normal_window,
        }
    }
}

/// Drop and delivery counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionCounters {
    /// Normal errors suppressed during grace
    pub suppressed_in_grace: u64,
    /// Errors discarded as already reported or already queued
    pub duplicates: u64,
    /// Errors or batches dropped because the cap was reached
    pub rate_limited: u64,
    /// `invalid-token` messages sent
    pub authorization_reports: u64,
    /// Manual copy requests relayed
    pub manual_copies: u64,
    /// Sends that failed in the transport
    pub transport_failures: u64,
}

/// Point-in-time view of a session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStats {
    /// Session identity
    pub session_id: SessionId,
    /// Wall-clock start
    pub started_at: DateTime<Utc>,
    /// Grace gate phase
    pub phase: GracePhase,
    /// Reports sent through the pipeline
    pub reported_count: usize,
    /// Configured cap
    pub max_reports: usize,
    /// Entries waiting for the debounce timer
    pub pending: usize,
    /// Whether the agent was disposed
    pub disposed: bool,
    /// Counters
    pub counters: SessionCounters,
}

/// Mutable per-page-load record
#[derive(Debug)]
pub struct SessionState {
    id: SessionId,
    started_at: DateTime<Utc>,
    policy: SessionPolicy,
    gate: GraceGate,
    accumulator: Accumulator,
    ledger: ReportLedger,
    counters: SessionCounters,
    disposed: bool,
}

impl SessionState {
    /// Fresh session in the grace phase
    #[must_use]
    pub fn new(config: &AgentConfig) -> Self {
        Self {
            id: SessionId::new(),
            started_at: Utc::now(),
            policy: SessionPolicy {
                fingerprint_len: config.fingerprint_len,
                normal_window: config.debounce_window(Severity::Normal),
                critical_window: config.debounce_window(Severity::Critical),
                representative: config.patterns.representative_keywords.clone(),
                limiter: RateLimiter::new(config.max_reports),
            },
            gate: GraceGate::new(),
            accumulator: Accumulator::new(),
            ledger: ReportLedger::new(),
            counters: SessionCounters::default(),
            disposed: false,
        }
    }

    /// Session identity
    #[inline]
    #[must_use]
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Wall-clock start
    #[inline]
    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Whether the grace period is still running
    #[inline]
    #[must_use]
    pub fn in_grace(&self) -> bool {
        self.gate.in_grace()
    }

    /// Whether the session was disposed
    #[inline]
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Reports sent through the pipeline
    #[inline]
    #[must_use]
    pub fn reported_count(&self) -> usize {
        self.ledger.len()
    }

    /// Already-reported fingerprints
    #[inline]
    #[must_use]
    pub fn ledger(&self) -> &ReportLedger {
        &self.ledger
    }

    /// Generation of the armed debounce timer
    #[inline]
    #[must_use]
    pub fn armed_timer(&self) -> Option<TimerGeneration> {
        self.accumulator.armed()
    }

    /// Dedup key for `description` under this session's policy
    #[inline]
    #[must_use]
    pub fn fingerprint(&self, description: &ErrorDescription) -> Fingerprint {
        description.fingerprint(self.policy.fingerprint_len)
    }

    /// End the grace period; `true` on the first call only
    pub fn end_grace(&mut self) -> bool {
        self.gate.expire()
    }

    /// Run an error through gate, cap and dedup, queueing it if it survives
    pub fn admit(&mut self, description: ErrorDescription, severity: Severity) -> Admission {
        if self.disposed {
            return Admission::Dropped(DropReason::Disposed);
        }
        if self.gate.admit(severity) == GateDecision::Suppress {
            self.counters.suppressed_in_grace += 1;
            return Admission::Dropped(DropReason::GracePeriod);
        }
        if self.policy.limiter.is_exhausted(self.ledger.len()) {
            self.counters.rate_limited += 1;
            return Admission::Dropped(DropReason::RateLimited);
        }

        let fingerprint = self.fingerprint(&description);
        if self.ledger.contains(&fingerprint) {
            self.counters.duplicates += 1;
            return Admission::Dropped(DropReason::AlreadyReported);
        }

        match self.accumulator.enqueue(PendingReport {
            description,
            fingerprint,
        }) {
            Some(generation) => Admission::Queued {
                generation,
                window: self.policy.window(severity),
                severity,
            },
            None => {
                self.counters.duplicates += 1;
                Admission::Dropped(DropReason::AlreadyQueued)
            }
        }
    }

    /// Handle expiry of the debounce timer `generation`
    pub fn expire(&mut self, generation: TimerGeneration) -> FlushOutcome {
        if self.disposed {
            return FlushOutcome::Stale;
        }
        let Some(batch) = self.accumulator.expire(generation) else {
            return FlushOutcome::Stale;
        };
        let batch_size = batch.len();
        let Some(report) = batch.into_representative(&self.policy.representative) else {
            return FlushOutcome::Stale;
        };

        match self.ledger.check(&self.policy.limiter, &report.fingerprint) {
            Ok(()) => FlushOutcome::Ready { report, batch_size },
            Err(reason) => {
                match reason {
                    SendBlocked::RateLimited => self.counters.rate_limited += 1,
                    SendBlocked::AlreadyReported => self.counters.duplicates += 1,
                }
                FlushOutcome::Blocked {
                    reason,
                    dropped: batch_size,
                }
            }
        }
    }

    /// Record a successful pipeline send
    pub fn record_sent(&mut self, fingerprint: Fingerprint) {
        self.ledger.record(fingerprint);
    }

    /// Record a failed transport send
    pub fn record_transport_failure(&mut self) {
        self.counters.transport_failures += 1;
    }

    /// Record an `invalid-token` send
    pub fn record_authorization_report(&mut self) {
        self.counters.authorization_reports += 1;
    }

    /// Record a relayed manual copy request
    pub fn record_manual_copy(&mut self) {
        self.counters.manual_copies += 1;
    }

    /// Clear the queue and refuse all further work
    ///
    /// Returns the number of pending entries dropped.
    pub fn dispose(&mut self) -> usize {
        self.disposed = true;
        self.accumulator.clear()
    }

    /// Snapshot for monitoring
    #[must_use]
    pub fn stats(&self) -> SessionStats {
        SessionStats {
            session_id: self.id,
            started_at: self.started_at,
            phase: self.gate.phase(),
            reported_count: self.ledger.len(),
            max_reports: self.policy.limiter.max_reports(),
            pending: self.accumulator.len(),
            disposed: self.disposed,
            counters: self.counters,
        }
    }
}
