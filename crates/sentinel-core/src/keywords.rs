//! Case-insensitive keyword sets
//!
//! Every keyword list in [`PatternConfig`](crate::PatternConfig) is matched
//! as a lowercase substring.

use serde::{Deserialize, Serialize};

/// Lowercased substring set
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct KeywordSet(Vec<String>);

impl KeywordSet {
    /// Build a set, lowercasing and dropping empty keywords
    #[must_use]
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self(
            keywords
                .into_iter()
                .map(|k| k.as_ref().trim().to_lowercase())
                .filter(|k| !k.is_empty())
                .collect(),
        )
    }

    /// First keyword contained in `haystack`
    #[must_use]
    pub fn find(&self, haystack: &str) -> Option<&str> {
        let haystack = haystack.to_lowercase();
        self.0
            .iter()
            .find(|k| haystack.contains(k.as_str()))
            .map(String::as_str)
    }

    /// Whether any keyword is contained in `haystack`
    #[inline]
    #[must_use]
    pub fn matches(&self, haystack: &str) -> bool {
        self.find(haystack).is_some()
    }

    /// Number of keywords
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the set is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate keywords
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl From<Vec<String>> for KeywordSet {
    fn from(keywords: Vec<String>) -> Self {
        Self::new(keywords)
    }
}

impl From<KeywordSet> for Vec<String> {
    fn from(set: KeywordSet) -> Self {
        set.0
    }
}

impl<'a> FromIterator<&'a str> for KeywordSet {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        Self::new(iter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_ignoring_case() {
        let set: KeywordSet = ["TypeError", "build failed"].into_iter().collect();
        assert!(set.matches("Uncaught typeerror: x is undefined"));
        assert!(set.matches("BUILD FAILED in 3s"));
        assert!(!set.matches("all good"));
    }

    #[test]
    fn find_returns_first_listed_keyword() {
        let set: KeywordSet = ["invalid token", "access denied"].into_iter().collect();
        assert_eq!(set.find("Access Denied: Invalid Token"), Some("invalid token"));
    }

    #[test]
    fn empty_keywords_are_dropped() {
        let set = KeywordSet::new(["", "  ", "error"]);
        assert_eq!(set.len(), 1);
        assert!(!set.matches("   "));
    }
}
