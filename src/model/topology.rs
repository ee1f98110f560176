//! Synthesized deployment plan.

use serde::{Deserialize, Serialize};

use super::is_false;

/// A component selected to run as a process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    /// Unique service name derived from the file stem.
    pub name: String,
    /// Component id.
    pub component: String,
    /// Component path relative to the scan root.
    pub path: String,
    /// Port assigned to the service.
    pub port: u16,
    /// Zero-based position in the start sequence.
    pub start_order: usize,
    /// Command line that launches the service.
    pub command: Vec<String>,
    /// Names of services that must start first.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,
}

/// Reverse-proxy rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Route {
    /// URL prefix, e.g. `/auth/login`.
    pub path_prefix: String,
    /// Name of the service receiving the traffic.
    pub target_service: String,
    /// Needs connection-upgrade headers.
    #[serde(default, skip_serializing_if = "is_false")]
    pub websocket: bool,
}

/// A port claimed by more than one service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortConflict {
    /// The contested port.
    pub port: u16,
    /// Names of the claiming services.
    pub services: Vec<String>,
    /// Ids of the claiming components.
    pub components: Vec<String>,
}

/// An import edge dropped to make the start order acyclic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrokenEdge {
    /// Importing service name.
    pub from: String,
    /// Imported service name.
    pub to: String,
    /// Confidence of the dropped edge.
    pub confidence: f64,
    /// Service names forming the cycle that was broken.
    pub cycle: Vec<String>,
}

/// Services, routes, and start order for one generation.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Topology {
    /// `false` whenever `conflicts` is non-empty.
    pub valid: bool,
    /// Services in start order.
    pub services: Vec<Service>,
    /// Proxy routes, sorted by prefix.
    pub routes: Vec<Route>,
    /// Ports claimed by two or more services.
    pub conflicts: Vec<PortConflict>,
    /// Edges removed while ordering start-up.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub broken_edges: Vec<BrokenEdge>,
}

impl Topology {
    /// Looks up a service by name.
    #[must_use]
    pub fn service(&self, name: &str) -> Option<&Service> {
        self.services.iter().find(|s| s.name == name)
    }
}
