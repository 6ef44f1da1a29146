//! Per-session report cap and the store of already-reported fingerprints

use crate::description::Fingerprint;
use indexmap::IndexSet;

/// Why a send was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendBlocked {
    /// The session has used up its reports
    RateLimited,
    /// This fingerprint was already reported
    AlreadyReported,
}

/// Caps the number of reports sent per session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimiter {
    max_reports: usize,
}

impl RateLimiter {
    /// Limiter allowing `max_reports` sends
    #[inline]
    #[must_use]
    pub fn new(max_reports: usize) -> Self {
        Self { max_reports }
    }

    /// Configured cap
    #[inline]
    #[must_use]
    pub fn max_reports(&self) -> usize {
        self.max_reports
    }

    /// Whether `sent` reports exhaust the cap
    #[inline]
    #[must_use]
    pub fn is_exhausted(&self, sent: usize) -> bool {
        sent >= self.max_reports
    }
}

/// Append-only set of reported fingerprints, in report order
#[derive(Debug, Clone, Default)]
pub struct ReportLedger {
    reported: IndexSet<Fingerprint>,
}

impl ReportLedger {
    /// Empty ledger
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `fingerprint` was reported
    #[inline]
    #[must_use]
    pub fn contains(&self, fingerprint: &Fingerprint) -> bool {
        self.reported.contains(fingerprint)
    }

    /// Record a successful send
    ///
    /// Returns `false` if the fingerprint was already present.
    pub fn record(&mut self, fingerprint: Fingerprint) -> bool {
        self.reported.insert(fingerprint)
    }

    /// Number of reported fingerprints
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.reported.len()
    }

    /// Whether nothing has been reported
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.reported.is_empty()
    }

    /// Reported fingerprints, oldest first
    pub fn iter(&self) -> impl Iterator<Item = &Fingerprint> {
        self.reported.iter()
    }

    /// Gate a send of `fingerprint` against `limiter` and this ledger
    ///
    /// # Errors
    /// - `SendBlocked::RateLimited` once the cap is reached
    /// - `SendBlocked::AlreadyReported` for a repeat
    pub fn check(&self, limiter: &RateLimiter, fingerprint: &Fingerprint) -> Result<(), SendBlocked> {
        if limiter.is_exhausted(self.len()) {
            return Err(SendBlocked::RateLimited);
        }
        if self.contains(fingerprint) {
            return Err(SendBlocked::AlreadyReported);
        }
        Ok(())
    }
}
