//! Startup grace gate
//!
//! Two phases with a single, one-way transition:
//!
//! ```text
//! Grace ──(grace timer expires)──▶ Active
//! ```

use crate::classifier::Severity;
use serde::{Deserialize, Serialize};

/// Phase of the grace gate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GracePhase {
    /// Hosted application still starting; only critical errors pass
    Grace,
    /// Every error passes
    Active,
}

/// Outcome of passing an error through the gate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// Error continues into the accumulator
    Admit,
    /// Error is dropped: not queued, not counted
    Suppress,
}

/// Grace gate state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GraceGate {
    phase: GracePhase,
}

impl GraceGate {
    /// Gate starting in [`GracePhase::Grace`]
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            phase: GracePhase::Grace,
        }
    }

    /// Current phase
    #[inline]
    #[must_use]
    pub fn phase(&self) -> GracePhase {
        self.phase
    }

    /// Whether the gate is still in grace
    #[inline]
    #[must_use]
    pub fn in_grace(&self) -> bool {
        self.phase == GracePhase::Grace
    }

    /// End the grace period
    ///
    /// Returns `true` on the first call only.
    pub fn expire(&mut self) -> bool {
        let transitioned = self.in_grace();
        self.phase = GracePhase::Active;
        transitioned
    }

    /// Decide whether an error of `severity` passes
    #[must_use]
    pub fn admit(&self, severity: Severity) -> GateDecision {
        match (self.phase, severity) {
            (GracePhase::Grace, Severity::Normal) => GateDecision::Suppress,
            _ => GateDecision::Admit,
        }
    }
}

impl Default for GraceGate {
    fn default() -> Self {
        Self::new()
    }
}
