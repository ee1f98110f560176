//! Directed or symmetric edges between components.

use serde::{Deserialize, Serialize};

use super::is_false;

/// What an edge asserts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RelationshipKind {
    /// `from` references a module that `to` appears to provide.
    Imports,
    /// Both ends mention the same port. Stored once per unordered pair.
    SharesPort,
    /// Both ends belong to an over-populated capability group.
    DuplicatesCapability,
}

impl RelationshipKind {
    /// Label used in summaries.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Imports => "imports",
            Self::SharesPort => "sharesPort",
            Self::DuplicatesCapability => "duplicatesCapability",
        }
    }

    /// Symmetric kinds are stored with `from < to`.
    #[must_use]
    pub fn is_symmetric(self) -> bool {
        !matches!(self, Self::Imports)
    }
}

/// An edge between two distinct components.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Relationship {
    /// Source component id.
    pub from: String,
    /// Target component id.
    pub to: String,
    /// Edge kind.
    pub kind: RelationshipKind,
    /// Heuristic confidence in (0, 1].
    pub confidence: f64,
    /// The import string or capability that produced the edge.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub via: Option<String>,
    /// The shared port, for `sharesPort` edges.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    /// One end binds the port and the other only connects to it.
    #[serde(default, skip_serializing_if = "is_false")]
    pub client_server: bool,
}

impl Relationship {
    /// Builds an edge, normalising symmetric kinds so `from < to`.
    ///
    /// Returns `None` for self-edges.
    #[must_use]
    pub fn new(from: &str, to: &str, kind: RelationshipKind, confidence: f64) -> Option<Self> {
        if from == to {
            return None;
        }
        let (from, to) = if kind.is_symmetric() && to < from {
            (to, from)
        } else {
            (from, to)
        };
        Some(Self {
            from: from.to_string(),
            to: to.to_string(),
            kind,
            confidence: confidence.clamp(f64::MIN_POSITIVE, 1.0),
            via: None,
            port: None,
            client_server: false,
        })
    }

    /// Attaches the import string or capability that produced the edge.
    #[must_use]
    pub fn via(mut self, via: impl Into<String>) -> Self {
        self.via = Some(via.into());
        self
    }

    /// Attaches the shared port.
    #[must_use]
    pub fn on_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Sort key giving the canonical report order.
    #[must_use]
    pub fn sort_key(&self) -> (RelationshipKind, &str, &str, Option<u16>, Option<&str>) {
        (self.kind, &self.from, &self.to, self.port, self.via.as_deref())
    }
}
