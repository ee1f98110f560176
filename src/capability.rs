//! Keyword-driven capability tagging.
//!
//! The table is configuration data (see `config/defaults.yaml`); nothing here
//! knows what any capability means except the two role tags below.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// Role tag for files that look like a process entry point.
pub const ENTRY_POINT: &str = "entry-point";

/// Role tag for files that look like a long-running network service.
pub const SERVICE: &str = "service";

/// Returns `true` for the role tags, which describe how a file runs rather
/// than what it does.
#[must_use]
pub fn is_role(capability: &str) -> bool {
    capability == ENTRY_POINT || capability == SERVICE
}

/// Maps each capability to the keywords that imply it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CapabilityTable {
    rules: BTreeMap<String, Vec<String>>,
}

impl CapabilityTable {
    /// Builds a table from `(capability, keywords)` pairs. Keywords are lowercased.
    pub fn new<C, K>(rules: impl IntoIterator<Item = (C, Vec<K>)>) -> Self
    where
        C: Into<String>,
        K: Into<String>,
    {
        let rules = rules
            .into_iter()
            .map(|(cap, kws)| {
                let kws = kws.into_iter().map(|k| k.into().to_lowercase()).collect();
                (cap.into(), kws)
            })
            .collect();
        Self { rules }
    }

    /// Every capability the table can produce, sorted.
    pub fn capabilities(&self) -> impl Iterator<Item = &str> {
        self.rules.keys().map(String::as_str)
    }

    /// Tags `content` with every capability that has at least one keyword hit.
    ///
    /// Matching is a case-insensitive substring test, so unrelated words can
    /// trigger a tag. Callers treat the result as a hint.
    #[must_use]
    pub fn infer(&self, content: &str) -> BTreeSet<String> {
        let haystack = content.to_lowercase();
        self.rules
            .iter()
            .filter(|(_, keywords)| {
                keywords
                    .iter()
                    .any(|kw| !kw.is_empty() && haystack.contains(kw.as_str()))
            })
            .map(|(cap, _)| cap.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> CapabilityTable {
        CapabilityTable::new([
            ("authentication", vec!["login", "JWT"]),
            ("monitoring", vec!["/health"]),
            ("gaming", vec!["player"]),
        ])
    }

    #[test]
    fn infer_is_case_insensitive() {
        let caps = table().infer("def LOGIN(user): return Jwt.encode(user)");
        assert_eq!(caps.into_iter().collect::<Vec<_>>(), vec!["authentication"]);
    }

    #[test]
    fn a_file_may_carry_several_unrelated_tags() {
        let caps = table().infer("app.get('/health')  # counts players online");
        assert!(caps.contains("monitoring"));
        assert!(caps.contains("gaming"));
    }

    #[test]
    fn no_hits_means_no_tags() {
        assert!(table().infer("x = 1").is_empty());
    }

    #[test]
    fn role_tags_are_recognised() {
        assert!(is_role(ENTRY_POINT));
        assert!(is_role(SERVICE));
        assert!(!is_role("monitoring"));
    }
}
