//! Records produced by one scan pass: components, edges, findings, topology.

pub mod component;
pub mod finding;
pub mod relationship;
pub mod topology;

pub use component::{content_id, Component, Dialect};
pub use finding::{sort_findings, Finding, FindingKind, Severity};
pub use relationship::{Relationship, RelationshipKind};
pub use topology::{BrokenEdge, PortConflict, Route, Service, Topology};

#[allow(clippy::trivially_copy_pass_by_ref)]
pub(crate) fn is_false(value: &bool) -> bool {
    !*value
}
