//! Event-script replay
//!
//! A script is a JSON-lines file of timed browser events:
//!
//! ```text
//! {"at_ms": 0,    "kind": "error", "message": "Uncaught TypeError: x is undefined", "filename": "/src/Plan.tsx", "line": 4}
//! {"at_ms": 200,  "kind": "rejection", "reason": {"kind": "text", "value": "Failed to fetch"}}
//! {"at_ms": 400,  "kind": "console", "args": ["Request failed", {"status": 500}]}
//! {"at_ms": 3500, "kind": "document", "phase": "loaded", "text": "INVALID_TOKEN"}
//! {"at_ms": 4000, "kind": "copy", "text": "Runtime error in preview"}
//! ```
//!
//! Blank lines and lines starting with `#` or `//` are skipped. Steps run in
//! `at_ms` order, measured from agent start.

use crate::agent::DiagnosticAgent;
use crate::error::ReplayError;
use crate::listeners::{ErrorEvent, ErrorSink, LogArg, RejectionReason, ScanPhase, TracingSink};
use sentinel_core::SessionStats;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tokio::time::Instant;

/// One browser-side event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BrowserEvent {
    /// Window `error` event
    Error(ErrorEvent),
    /// `unhandledrejection` event
    Rejection {
        /// Rejection reason
        reason: RejectionReason,
    },
    /// Error-level log call
    Console {
        /// Log arguments
        args: Vec<LogArg>,
    },
    /// Document scan
    Document {
        /// Scan phase
        phase: ScanPhase,
        /// Rendered text
        text: String,
    },
    /// Manual copy request from the fallback surface
    Copy {
        /// Text to relay
        text: String,
    },
}

/// Event scheduled at an offset from agent start
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptStep {
    /// Offset in milliseconds
    pub at_ms: u64,
    /// The event
    #[serde(flatten)]
    pub event: BrowserEvent,
}

/// Parse a JSON-lines script
///
/// # Errors
/// `ReplayError::Parse` naming the first bad line (1-based).
pub fn parse_script(source: &str) -> Result<Vec<ScriptStep>, ReplayError> {
    let mut steps = Vec::new();
    for (index, line) in source.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with("//") {
            continue;
        }
        let step = serde_json::from_str(line).map_err(|source| ReplayError::Parse {
            line: index + 1,
            source,
        })?;
        steps.push(step);
    }
    steps.sort_by_key(|step: &ScriptStep| step.at_ms);
    Ok(steps)
}

/// Read and parse a script file
///
/// # Errors
/// `ReplayError::Io` if the file cannot be read, `ReplayError::Parse` if a
/// line is malformed.
pub fn load_script(path: impl AsRef<Path>) -> Result<Vec<ScriptStep>, ReplayError> {
    let path = path.as_ref();
    let source =
        std::fs::read_to_string(path).map_err(|e| ReplayError::io_error(path, e))?;
    parse_script(&source)
}

/// Feed one event to `agent`
///
/// Log calls go to `console`, which is expected to be a sink decorated by
/// [`DiagnosticAgent::decorate_error_sink`].
pub fn dispatch<S: ErrorSink>(agent: &DiagnosticAgent, console: &S, event: &BrowserEvent) {
    match event {
        BrowserEvent::Error(error) => agent.on_error_event(error),
        BrowserEvent::Rejection { reason } => agent.on_unhandled_rejection(reason),
        BrowserEvent::Console { args } => console.error(args),
        BrowserEvent::Document { phase, text } => {
            agent.scan_document(text, *phase);
        }
        BrowserEvent::Copy { text } => {
            agent.request_manual_copy(text);
        }
    }
}

/// Replay `steps` against `agent`, then wait `settle` for pending timers
///
/// Offsets are measured from the call, which should directly follow
/// [`DiagnosticAgent::start`]. Log calls reach a [`TracingSink`] decorated
/// by the agent.
pub async fn run_script(
    agent: &DiagnosticAgent,
    steps: &[ScriptStep],
    settle: Duration,
) -> SessionStats {
    let console = agent.decorate_error_sink(TracingSink);
    let origin = Instant::now();
    for step in steps {
        tokio::time::sleep_until(origin + Duration::from_millis(step.at_ms)).await;
        tracing::trace!(at_ms = step.at_ms, "Replaying step");
        dispatch(agent, &console, &step.event);
    }
    tokio::time::sleep(settle).await;
    agent.stats()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    const SCRIPT: &str = r#"
# startup
{"at_ms": 400, "kind": "console", "args": ["Request failed", {"status": 500}]}
{"at_ms": 0, "kind": "error", "message": "boom", "filename": "/src/Plan.tsx", "line": 4}
// auth
{"at_ms": 200, "kind": "document", "phase": "body_ready", "text": "INVALID_TOKEN"}
{"at_ms": 200, "kind": "rejection", "reason": {"kind": "text", "value": "Failed to fetch"}}
{"at_ms": 900, "kind": "copy", "text": "copied"}
"#;

    #[test]
    fn parses_and_orders_steps() {
        let steps = parse_script(SCRIPT).unwrap();
        let offsets: Vec<u64> = steps.iter().map(|s| s.at_ms).collect();
        assert_eq!(offsets, vec![0, 200, 200, 400, 900]);

        assert!(matches!(steps[0].event, BrowserEvent::Error(_)));
        assert!(matches!(
            steps[1].event,
            BrowserEvent::Document {
                phase: ScanPhase::BodyReady,
                ..
            }
        ));
        assert!(matches!(steps[2].event, BrowserEvent::Rejection { .. }));
    }

    #[test]
    fn bad_line_is_reported_with_its_number() {
        let err = parse_script("{\"at_ms\": 0, \"kind\": \"copy\", \"text\": \"ok\"}\n\nnot json\n")
            .unwrap_err();
        assert!(matches!(err, ReplayError::Parse { line: 3, .. }));
    }

    #[test]
    fn unknown_kind_is_rejected() {
        assert!(parse_script(r#"{"at_ms": 0, "kind": "teleport"}"#).is_err());
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SCRIPT.as_bytes()).unwrap();
        assert_eq!(load_script(file.path()).unwrap().len(), 5);
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_script(dir.path().join("absent.jsonl")).unwrap_err();
        assert!(matches!(err, ReplayError::Io { .. }));
    }
}
