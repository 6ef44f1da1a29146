//! Dedup & debounce accumulator
//!
//! Collects admitted descriptions until the debounce timer fires, then hands
//! back a single representative. The accumulator does not own a clock: it
//! issues a [`TimerGeneration`] every time the timer must be re-armed and the
//! driver reports expiry with that generation. Expiries carrying an older
//! generation are stale and ignored.

use crate::description::{ErrorDescription, Fingerprint};
use crate::keywords::KeywordSet;
use std::collections::HashSet;
use std::fmt;

/// Identity of one armed debounce timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerGeneration(u64);

impl fmt::Display for TimerGeneration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Queued description with its precomputed fingerprint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingReport {
    /// The queued failure
    pub description: ErrorDescription,
    /// Its dedup key
    pub fingerprint: Fingerprint,
}

/// Contents of the queue at expiry
#[derive(Debug, Clone)]
pub struct Batch {
    entries: Vec<PendingReport>,
}

impl Batch {
    /// Number of queued entries
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the batch is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in arrival order
    #[inline]
    #[must_use]
    pub fn entries(&self) -> &[PendingReport] {
        &self.entries
    }

    /// Pick the entry to report
    ///
    /// The first entry whose text names an error type from `preferred` wins;
    /// otherwise the first entry in arrival order.
    #[must_use]
    pub fn into_representative(mut self, preferred: &KeywordSet) -> Option<PendingReport> {
        if self.entries.is_empty() {
            return None;
        }
        let index = self
            .entries
            .iter()
            .position(|p| preferred.matches(p.description.text()))
            .unwrap_or(0);
        Some(self.entries.swap_remove(index))
    }
}

/// Pending queue plus the identity of the armed timer
#[derive(Debug, Default)]
pub struct Accumulator {
    queue: Vec<PendingReport>,
    queued: HashSet<Fingerprint>,
    next_generation: u64,
    armed: Option<TimerGeneration>,
}

impl Accumulator {
    /// Empty accumulator with no armed timer
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a description with this fingerprint is already queued
    #[inline]
    #[must_use]
    pub fn contains(&self, fingerprint: &Fingerprint) -> bool {
        self.queued.contains(fingerprint)
    }

    /// Queue a description and re-arm the timer
    ///
    /// Returns the generation of the new timer, or `None` if an entry with
    /// the same fingerprint is already queued (in which case the timer is
    /// left untouched).
    pub fn enqueue(&mut self, report: PendingReport) -> Option<TimerGeneration> {
        if !self.queued.insert(report.fingerprint.clone()) {
            return None;
        }
        self.queue.push(report);

        self.next_generation += 1;
        let generation = TimerGeneration(self.next_generation);
        self.armed = Some(generation);
        Some(generation)
    }

    /// Handle expiry of the timer identified by `generation`
    ///
    /// Returns `None` for a stale generation. Otherwise drains the queue and
    /// disarms the timer.
    pub fn expire(&mut self, generation: TimerGeneration) -> Option<Batch> {
        if self.armed != Some(generation) {
            return None;
        }
        self.armed = None;
        self.queued.clear();
        Some(Batch {
            entries: std::mem::take(&mut self.queue),
        })
    }

    /// Drop everything queued and disarm
    ///
    /// Returns the number of dropped entries.
    pub fn clear(&mut self) -> usize {
        self.armed = None;
        self.queued.clear();
        let dropped = self.queue.len();
        self.queue.clear();
        dropped
    }

    /// Generation of the armed timer
    #[inline]
    #[must_use]
    pub fn armed(&self) -> Option<TimerGeneration> {
        self.armed
    }

    /// Number of queued entries
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Whether the queue is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::description::ErrorSource;

    fn pending(headline: &str) -> PendingReport {
        let description =
            ErrorDescription::builder(ErrorSource::ConsoleError, headline, headline).build();
        let fingerprint = description.fingerprint(100);
        PendingReport {
            description,
            fingerprint,
        }
    }

    fn preferred() -> KeywordSet {
        KeywordSet::new(["typeerror", "referenceerror", "syntaxerror", "build failed"])
    }

    #[test]
    fn armed_iff_queue_non_empty() {
        let mut acc = Accumulator::new();
        assert!(acc.armed().is_none());

        let generation = acc.enqueue(pending("a")).unwrap();
        assert_eq!(acc.armed(), Some(generation));
        assert_eq!(acc.len(), 1);

        let batch = acc.expire(generation).unwrap();
        assert_eq!(batch.len(), 1);
        assert!(acc.armed().is_none());
        assert!(acc.is_empty());
    }

    #[test]
    fn duplicate_fingerprint_is_rejected_without_rearming() {
        let mut acc = Accumulator::new();
        let first = acc.enqueue(pending("same")).unwrap();
        assert!(acc.enqueue(pending("same")).is_none());
        assert_eq!(acc.armed(), Some(first));
        assert_eq!(acc.len(), 1);
    }

    #[test]
    fn new_entry_replaces_timer_generation() {
        let mut acc = Accumulator::new();
        let first = acc.enqueue(pending("a")).unwrap();
        let second = acc.enqueue(pending("b")).unwrap();
        assert_ne!(first, second);

        assert!(acc.expire(first).is_none(), "stale expiry must be ignored");
        assert_eq!(acc.len(), 2);
        assert_eq!(acc.expire(second).unwrap().len(), 2);
    }

    #[test]
    fn representative_prefers_named_error_types() {
        let mut acc = Accumulator::new();
        acc.enqueue(pending("Failed to fetch /api/plan"));
        acc.enqueue(pending("Uncaught TypeError: plan.days is undefined"));
        let generation = acc.enqueue(pending("ReferenceError: x is not defined")).unwrap();

        let rep = acc.expire(generation).unwrap().into_representative(&preferred()).unwrap();
        assert!(rep.description.text().contains("TypeError"));
    }

    #[test]
    fn representative_falls_back_to_first_queued() {
        let mut acc = Accumulator::new();
        acc.enqueue(pending("first"));
        let generation = acc.enqueue(pending("second")).unwrap();

        let rep = acc.expire(generation).unwrap().into_representative(&preferred()).unwrap();
        assert!(rep.description.text().ends_with("first"));
    }

    #[test]
    fn clear_drops_queue_and_disarms() {
        let mut acc = Accumulator::new();
        let generation = acc.enqueue(pending("a")).unwrap();
        acc.enqueue(pending("b"));
        assert_eq!(acc.clear(), 2);
        assert!(acc.armed().is_none());
        assert!(acc.expire(generation).is_none());
        assert!(acc.enqueue(pending("a")).is_some());
    }
}
