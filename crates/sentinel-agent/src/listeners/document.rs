//! Authorization-failure marker scan
//!
//! The rendered document is scanned once when the body becomes available and
//! once more after load. A hit takes the immediate path.

use sentinel_core::{ErrorDescription, ErrorSource, KeywordSet};
use serde::{Deserialize, Serialize};

/// Moment a document scan runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanPhase {
    /// Body element became available
    BodyReady,
    /// Window `load` fired
    Loaded,
}

/// Tracks which phases have been scanned
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DocumentScanner {
    body_ready: bool,
    loaded: bool,
}

impl DocumentScanner {
    /// Scanner with no phase done
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `phase`; `false` if it was already scanned
    pub fn begin(&mut self, phase: ScanPhase) -> bool {
        let done = match phase {
            ScanPhase::BodyReady => &mut self.body_ready,
            ScanPhase::Loaded => &mut self.loaded,
        };
        !std::mem::replace(done, true)
    }

    /// Whether `phase` was scanned
    #[must_use]
    pub fn is_done(&self, phase: ScanPhase) -> bool {
        match phase {
            ScanPhase::BodyReady => self.body_ready,
            ScanPhase::Loaded => self.loaded,
        }
    }
}

/// Look for an authorization-failure marker in `text`
///
/// Matching is case-insensitive.
#[must_use]
pub fn scan(text: &str, markers: &KeywordSet) -> Option<ErrorDescription> {
    let marker = markers.find(text)?;
    let headline = format!("Authorization failure: page reports \"{marker}\"");
    Some(
        ErrorDescription::builder(ErrorSource::Authorization, headline, marker.to_string())
            .build(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use sentinel_core::PatternConfig;

    fn markers() -> KeywordSet {
        PatternConfig::default().auth_markers
    }

    #[test]
    fn finds_markers_in_any_case() {
        for body in [
            "{\"error\":\"INVALID_TOKEN\"}",
            "Invalid token. Please sign in again.",
            "403 Access Denied",
        ] {
            let desc = scan(body, &markers()).unwrap();
            assert_eq!(desc.source(), ErrorSource::Authorization);
        }
    }

    #[test]
    fn clean_documents_yield_nothing() {
        assert!(scan("<div id=\"root\"></div>", &markers()).is_none());
        assert!(scan("", &markers()).is_none());
    }

    #[test]
    fn headline_names_the_marker() {
        let desc = scan("INVALID_TOKEN", &markers()).unwrap();
        assert!(desc.text().contains("\"invalid_token\""));
    }

    #[test]
    fn each_phase_is_claimed_once() {
        let mut scanner = DocumentScanner::new();
        assert!(scanner.begin(ScanPhase::BodyReady));
        assert!(!scanner.begin(ScanPhase::BodyReady));
        assert!(!scanner.is_done(ScanPhase::Loaded));
        assert!(scanner.begin(ScanPhase::Loaded));
        assert!(scanner.is_done(ScanPhase::Loaded));
    }
}
