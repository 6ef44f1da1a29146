//! Preview Sentinel Agent
//!
//! Runs the [`sentinel_core`] pipeline against live input: listeners turn
//! browser events into descriptions, tokio timers drive the grace period and
//! the debounce window, and a [`Transport`](sentinel_core::Transport) carries
//! reports to the host frame.
//!
//! # Example
//!
//! ```rust
//! use sentinel_agent::prelude::*;
//! use sentinel_agent::transport::ChannelTransport;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let (transport, mut host) = ChannelTransport::new();
//! let agent = DiagnosticAgent::start(AgentConfig::default(), transport)?;
//!
//! agent.scan_document("{\"error\":\"INVALID_TOKEN\"}", ScanPhase::BodyReady);
//! assert_eq!(host.recv().await.map(|m| m.kind()), Some("invalid-token"));
//!
//! agent.dispose();
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod agent;
pub mod error;
pub mod listeners;
pub mod replay;
pub mod timer;
pub mod transport;

pub use agent::DiagnosticAgent;
pub use error::{ReplayError, StartError};
pub use listeners::{
    ErrorEvent, ErrorLike, ErrorSink, FailedElement, FnSink, InterceptingSink, LogArg,
    RejectionReason, ScanPhase, TracingSink,
};
pub use replay::{BrowserEvent, ScriptStep};
pub use timer::ScheduledTimer;
pub use transport::{ChannelTransport, JsonLinesTransport, NoHost};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for embedding the agent
    pub use crate::{DiagnosticAgent, ErrorEvent, ErrorLike, LogArg, RejectionReason, ScanPhase};
    pub use sentinel_core::prelude::*;
}
