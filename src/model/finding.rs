//! Detected structural anti-patterns.

use std::cmp::Reverse;
use std::fmt;

use serde::{Deserialize, Serialize};

/// How much a finding matters. Ordered `Info < Warn < Error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Worth knowing.
    Info,
    /// Probably a mistake.
    Warn,
    /// Makes the synthesized deployment unusable; fails the scan.
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        })
    }
}

/// Which rule produced a finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FindingKind {
    /// Too many process entry points.
    MultipleLaunchers,
    /// A capability implemented by more components than the threshold.
    DuplicateCapability,
    /// A required capability is implemented nowhere.
    MissingCapability,
    /// Two components bind the same port.
    PortConflict,
    /// An import edge was dropped to order service start-up.
    DependencyCycleBroken,
    /// Some files were only partially extracted.
    IncompleteExtraction,
}

impl fmt::Display for FindingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::MultipleLaunchers => "multiple-launchers",
            Self::DuplicateCapability => "duplicate-capability",
            Self::MissingCapability => "missing-capability",
            Self::PortConflict => "port-conflict",
            Self::DependencyCycleBroken => "dependency-cycle-broken",
            Self::IncompleteExtraction => "incomplete-extraction",
        })
    }
}

/// One detected anti-pattern with the components that evidence it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Finding {
    /// Producing rule.
    pub kind: FindingKind,
    /// Severity.
    pub severity: Severity,
    /// Component ids, sorted.
    pub evidence: Vec<String>,
    /// Human-readable explanation.
    pub message: String,
}

impl Finding {
    /// Builds a finding; evidence is sorted and deduplicated.
    pub fn new(
        kind: FindingKind,
        severity: Severity,
        evidence: impl IntoIterator<Item = String>,
        message: impl Into<String>,
    ) -> Self {
        let mut evidence: Vec<String> = evidence.into_iter().collect();
        evidence.sort();
        evidence.dedup();
        Self {
            kind,
            severity,
            evidence,
            message: message.into(),
        }
    }

    /// Canonical order: most severe first, then kind, evidence, message.
    #[must_use]
    pub fn sort_key(&self) -> (Reverse<Severity>, FindingKind, &[String], &str) {
        (Reverse(self.severity), self.kind, &self.evidence, &self.message)
    }
}

/// Sorts findings into canonical report order.
pub fn sort_findings(findings: &mut [Finding]) {
    findings.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evidence_is_sorted_and_unique() {
        let f = Finding::new(
            FindingKind::PortConflict,
            Severity::Error,
            ["b".to_string(), "a".to_string(), "b".to_string()],
            "port 80",
        );
        assert_eq!(f.evidence, vec!["a", "b"]);
    }

    #[test]
    fn sort_puts_errors_first() {
        let bare = |kind, severity| Finding::new(kind, severity, Vec::new(), "");
        let mut findings = vec![
            bare(FindingKind::DuplicateCapability, Severity::Info),
            bare(FindingKind::PortConflict, Severity::Error),
            bare(FindingKind::MissingCapability, Severity::Warn),
        ];
        sort_findings(&mut findings);
        let order: Vec<Severity> = findings.iter().map(|f| f.severity).collect();
        assert_eq!(order, vec![Severity::Error, Severity::Warn, Severity::Info]);
    }

    #[test]
    fn kind_serializes_kebab_case() {
        let json = serde_json::to_string(&FindingKind::MultipleLaunchers).unwrap();
        assert_eq!(json, "\"multiple-launchers\"");
        assert_eq!(FindingKind::MultipleLaunchers.to_string(), "multiple-launchers");
    }
}
