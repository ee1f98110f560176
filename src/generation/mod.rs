//! Generations: the complete, immutable output of one scan pass.

pub mod diff;
pub mod store;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{Component, Finding, Relationship, Severity, Topology};
use crate::scan::ScanStats;

pub use store::GenerationStore;

/// Everything one scan produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Generation {
    /// Generation id (a UUID in live runs).
    pub id: String,
    /// When the scan finished.
    pub created_at: DateTime<Utc>,
    /// Scan root as given on the command line.
    pub root: String,
    /// Scan counters.
    pub stats: ScanStats,
    /// Components sorted by id.
    pub components: Vec<Component>,
    /// Relationships sorted by `(kind, from, to)`.
    pub relationships: Vec<Relationship>,
    /// Findings in canonical order.
    pub findings: Vec<Finding>,
    /// Synthesized deployment.
    pub topology: Topology,
}

impl Generation {
    /// Returns `true` if any finding has `error` severity.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.findings.iter().any(|f| f.severity == Severity::Error)
    }

    /// Looks up a component by id.
    #[must_use]
    pub fn component(&self, id: &str) -> Option<&Component> {
        self.components.iter().find(|c| c.id == id)
    }

    /// Short listing entry for the generation index.
    #[must_use]
    pub fn entry(&self) -> GenerationEntry {
        GenerationEntry {
            id: self.id.clone(),
            created_at: self.created_at,
            root: self.root.clone(),
            components: self.components.len(),
            findings: self.findings.len(),
        }
    }
}

/// One line of `generations/index.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationEntry {
    /// Generation id.
    pub id: String,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Scan root.
    pub root: String,
    /// Component count.
    pub components: usize,
    /// Finding count.
    pub findings: usize,
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::Generation;
    use crate::model::{Component, Finding, Topology};
    use crate::scan::ScanStats;
    use chrono::{DateTime, Utc};

    pub(crate) fn generation(
        id: &str,
        components: Vec<Component>,
        findings: Vec<Finding>,
    ) -> Generation {
        Generation {
            id: id.to_string(),
            created_at: DateTime::parse_from_rfc3339("2025-06-15T10:00:00Z")
                .unwrap()
                .with_timezone(&Utc),
            root: "/src".into(),
            stats: ScanStats::default(),
            components,
            relationships: Vec::new(),
            findings,
            topology: Topology {
                valid: true,
                ..Topology::default()
            },
        }
    }
}
