//! Preview Sentinel Core
//!
//! Runtime-free model of the in-page diagnostic agent: how failures are
//! described, classified, gated, deduplicated, batched and capped before a
//! report reaches the host frame.
//!
//! # Pipeline
//!
//! ```text
//! ErrorDescription → Classifier → GraceGate → dedup → Accumulator ─(timer)─▶ representative
//!                                                                              │
//!                                           Transport ◀── RateLimiter/ledger ◀─┘
//! ```
//!
//! The timers themselves live in `sentinel-agent`; this crate only hands out
//! [`TimerGeneration`]s and reacts to their expiry.
//!
//! # Example
//!
//! ```rust
//! use sentinel_core::prelude::*;
//!
//! let config = AgentConfig::default();
//! let classifier = Classifier::new(&config.patterns).unwrap();
//! let mut session = SessionState::new(&config);
//!
//! let desc = ErrorDescription::builder(
//!     ErrorSource::UncaughtException,
//!     "Module not found: './Plan'",
//!     "Module not found: './Plan'",
//! )
//! .build();
//! let severity = classifier.classify_description(&desc);
//!
//! if let Admission::Queued { generation, .. } = session.admit(desc, severity) {
//!     // ...after the debounce window elapses:
//!     if let FlushOutcome::Ready { report, .. } = session.expire(generation) {
//!         session.record_sent(report.fingerprint);
//!     }
//! }
//! assert_eq!(session.reported_count(), 1);
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

// Core modules
pub mod accumulator;
pub mod classifier;
pub mod config;
pub mod description;
pub mod error;
pub mod gate;
pub mod keywords;
pub mod limiter;
pub mod message;
pub mod session;
pub mod transport;

// Re-exports for convenience
pub use accumulator::{Accumulator, Batch, PendingReport, TimerGeneration};
pub use classifier::{is_critical, Classifier, Severity};
pub use config::{AgentConfig, PatternConfig};
pub use description::{DescriptionBuilder, ErrorDescription, ErrorSource, Fingerprint, BANNER};
pub use error::{ConfigError, TransportError};
pub use gate::{GateDecision, GracePhase, GraceGate};
pub use keywords::KeywordSet;
pub use limiter::{RateLimiter, ReportLedger, SendBlocked};
pub use message::{AuthFailureCode, HostMessage};
pub use session::{
    Admission, DropReason, FlushOutcome, SessionCounters, SessionId, SessionState, SessionStats,
};
pub use transport::{deliver, Delivery, Transport};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with the sentinel core
    pub use crate::{
        AgentConfig, Admission, Classifier, ErrorDescription, ErrorSource, Fingerprint,
        FlushOutcome, HostMessage, SessionState, Severity, Transport,
    };
}
