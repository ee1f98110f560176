//! Diffing logic for generations.

use std::collections::{BTreeMap, BTreeSet};

use crate::generation::Generation;
use crate::model::{Component, Finding, FindingKind};

/// Differences between two generations.
#[derive(Debug, PartialEq)]
pub struct GenerationDiff {
    /// Old generation id.
    pub from: String,
    /// New generation id.
    pub to: String,
    /// Paths present in new but not old.
    pub added_components: Vec<String>,
    /// Paths present in old but not new.
    pub removed_components: Vec<String>,
    /// Paths whose content changed.
    pub changed_components: Vec<ComponentChange>,
    /// Findings only in new.
    pub added_findings: Vec<Finding>,
    /// Findings only in old.
    pub removed_findings: Vec<Finding>,
}

impl GenerationDiff {
    /// Returns `true` if the generations are equivalent.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.added_components.is_empty()
            && self.removed_components.is_empty()
            && self.changed_components.is_empty()
            && self.added_findings.is_empty()
            && self.removed_findings.is_empty()
    }
}

/// Describes changes within a single path.
#[derive(Debug, PartialEq)]
pub struct ComponentChange {
    /// Path of the component.
    pub path: String,
    /// Content id before.
    pub old_id: String,
    /// Content id after.
    pub new_id: String,
    /// Imports added.
    pub added_imports: Vec<String>,
    /// Imports removed.
    pub removed_imports: Vec<String>,
    /// Capabilities added.
    pub added_capabilities: Vec<String>,
    /// Capabilities removed.
    pub removed_capabilities: Vec<String>,
    /// Ports added.
    pub added_ports: Vec<u16>,
    /// Ports removed.
    pub removed_ports: Vec<u16>,
}

/// Compute differences between an old and new generation.
///
/// Components are matched by path (aliases included); findings by kind and
/// evidence, or by kind and message when they carry no evidence.
#[must_use]
pub fn diff_generations(old: &Generation, new: &Generation) -> GenerationDiff {
    let old_paths = by_path(&old.components);
    let new_paths = by_path(&new.components);

    let added_components = new_paths
        .keys()
        .filter(|p| !old_paths.contains_key(*p))
        .map(|p| (*p).to_string())
        .collect();
    let removed_components = old_paths
        .keys()
        .filter(|p| !new_paths.contains_key(*p))
        .map(|p| (*p).to_string())
        .collect();

    let changed_components = new_paths
        .iter()
        .filter_map(|(path, new_c)| {
            let old_c = old_paths.get(path)?;
            (old_c.id != new_c.id).then(|| diff_component(path, old_c, new_c))
        })
        .collect();

    let old_keys: BTreeSet<_> = old.findings.iter().map(finding_key).collect();
    let new_keys: BTreeSet<_> = new.findings.iter().map(finding_key).collect();
    let added_findings = new
        .findings
        .iter()
        .filter(|f| !old_keys.contains(&finding_key(f)))
        .cloned()
        .collect();
    let removed_findings = old
        .findings
        .iter()
        .filter(|f| !new_keys.contains(&finding_key(f)))
        .cloned()
        .collect();

    GenerationDiff {
        from: old.id.clone(),
        to: new.id.clone(),
        added_components,
        removed_components,
        changed_components,
        added_findings,
        removed_findings,
    }
}

fn by_path(components: &[Component]) -> BTreeMap<&str, &Component> {
    components
        .iter()
        .flat_map(|c| c.all_paths().map(move |p| (p, c)))
        .collect()
}

/// Evidence identifies a finding; without any, the message has to.
fn finding_key(f: &Finding) -> (FindingKind, &[String], &str) {
    let message = if f.evidence.is_empty() {
        f.message.as_str()
    } else {
        ""
    };
    (f.kind, &f.evidence, message)
}

fn diff_component(path: &str, old: &Component, new: &Component) -> ComponentChange {
    ComponentChange {
        path: path.to_string(),
        old_id: old.id.clone(),
        new_id: new.id.clone(),
        added_imports: missing_from(&new.imports, &old.imports),
        removed_imports: missing_from(&old.imports, &new.imports),
        added_capabilities: only_in(&new.capabilities, &old.capabilities),
        removed_capabilities: only_in(&old.capabilities, &new.capabilities),
        added_ports: only_in(&new.declared_ports, &old.declared_ports),
        removed_ports: only_in(&old.declared_ports, &new.declared_ports),
    }
}

fn missing_from(items: &[String], other: &[String]) -> Vec<String> {
    items
        .iter()
        .filter(|i| !other.contains(i))
        .cloned()
        .collect()
}

fn only_in<T: Ord + Clone>(set: &BTreeSet<T>, other: &BTreeSet<T>) -> Vec<T> {
    set.difference(other).cloned().collect()
}

/// Format a `GenerationDiff` for human-readable display.
#[must_use]
pub fn format_diff(diff: &GenerationDiff) -> String {
    if diff.is_empty() {
        return format!("No changes between {} and {}.", diff.from, diff.to);
    }

    let mut lines = vec![format!("Changes from {} to {}:", diff.from, diff.to)];

    if !diff.added_components.is_empty() {
        lines.push("Added components:".to_string());
        for p in &diff.added_components {
            lines.push(format!("  + {p}"));
        }
    }
    if !diff.removed_components.is_empty() {
        lines.push("Removed components:".to_string());
        for p in &diff.removed_components {
            lines.push(format!("  - {p}"));
        }
    }
    for change in &diff.changed_components {
        let (old_id, new_id) = (short(&change.old_id), short(&change.new_id));
        lines.push(format!("Changed: {} ({old_id} -> {new_id})", change.path));
        for i in &change.added_imports {
            lines.push(format!("  +import {i}"));
        }
        for i in &change.removed_imports {
            lines.push(format!("  -import {i}"));
        }
        for c in &change.added_capabilities {
            lines.push(format!("  +capability {c}"));
        }
        for c in &change.removed_capabilities {
            lines.push(format!("  -capability {c}"));
        }
        for p in &change.added_ports {
            lines.push(format!("  +port {p}"));
        }
        for p in &change.removed_ports {
            lines.push(format!("  -port {p}"));
        }
    }
    if !diff.added_findings.is_empty() {
        lines.push("New findings:".to_string());
        for f in &diff.added_findings {
            lines.push(format!("  + [{}] {}: {}", f.severity, f.kind, f.message));
        }
    }
    if !diff.removed_findings.is_empty() {
        lines.push("Resolved findings:".to_string());
        for f in &diff.removed_findings {
            lines.push(format!("  - [{}] {}: {}", f.severity, f.kind, f.message));
        }
    }

    lines.join("\n")
}

fn short(id: &str) -> &str {
    id.get(..12).unwrap_or(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::fixtures::generation;
    use crate::model::fixtures::component;
    use crate::model::Severity;
    use pretty_assertions::assert_eq;

    fn conflict(evidence: &[&str]) -> Finding {
        Finding::new(
            FindingKind::PortConflict,
            Severity::Error,
            evidence.iter().map(|s| (*s).to_string()),
            "port 8080",
        )
    }

    #[test]
    fn diff_detects_added_and_removed_components() {
        let before = vec![component("a.py", "a"), component("old.py", "o")];
        let after = vec![component("a.py", "a"), component("new.py", "n")];
        let old = generation("g1", before, Vec::new());
        let new = generation("g2", after, Vec::new());
        let d = diff_generations(&old, &new);
        assert_eq!(d.added_components, vec!["new.py"]);
        assert_eq!(d.removed_components, vec!["old.py"]);
        assert!(d.changed_components.is_empty());
    }

    #[test]
    fn diff_detects_changed_content() {
        let mut before = component("api.py", "v1");
        before.imports = vec!["db".into(), "cache".into()];
        before.declared_ports.insert(8000);
        let mut after = component("api.py", "v2");
        after.imports = vec!["db".into(), "auth".into()];
        after.capabilities.insert("authentication".into());
        after.declared_ports.insert(9000);

        let d = diff_generations(
            &generation("g1", vec![before], Vec::new()),
            &generation("g2", vec![after], Vec::new()),
        );
        assert_eq!(d.changed_components.len(), 1);
        let c = &d.changed_components[0];
        assert_eq!(c.path, "api.py");
        assert_eq!(c.added_imports, vec!["auth"]);
        assert_eq!(c.removed_imports, vec!["cache"]);
        assert_eq!(c.added_capabilities, vec!["authentication"]);
        assert_eq!(c.added_ports, vec![9000]);
        assert_eq!(c.removed_ports, vec![8000]);
    }

    #[test]
    fn findings_match_on_kind_and_evidence() {
        let findings = vec![conflict(&["a", "b"]), conflict(&["c", "d"])];
        let old = generation("g1", Vec::new(), findings);
        let mut reworded = conflict(&["a", "b"]);
        reworded.message = "port 8080 is bound by a.py, b.py".into();
        let new = generation("g2", Vec::new(), vec![reworded, conflict(&["e", "f"])]);

        let d = diff_generations(&old, &new);
        assert_eq!(d.added_findings, vec![conflict(&["e", "f"])]);
        assert_eq!(d.removed_findings, vec![conflict(&["c", "d"])]);
    }

    #[test]
    fn evidence_free_findings_match_on_message() {
        let missing = |capability: &str| {
            Finding::new(
                FindingKind::MissingCapability,
                Severity::Warn,
                Vec::new(),
                format!("capability '{capability}' is missing"),
            )
        };
        let old = generation("g1", Vec::new(), vec![missing("monitoring")]);
        let new = generation("g2", Vec::new(), vec![missing("authentication")]);

        let d = diff_generations(&old, &new);
        assert_eq!(d.added_findings, vec![missing("authentication")]);
        assert_eq!(d.removed_findings, vec![missing("monitoring")]);

        let again = generation("g3", Vec::new(), vec![missing("monitoring")]);
        assert!(diff_generations(&old, &again).is_empty());
    }

    #[test]
    fn diff_no_changes() {
        let g = generation("g1", vec![component("a.py", "a")], vec![conflict(&["a"])]);
        let d = diff_generations(&g, &g);
        assert!(d.is_empty());
        assert_eq!(format_diff(&d), "No changes between g1 and g1.");
    }

    #[test]
    fn format_diff_with_changes() {
        let old = generation("g1", vec![component("gone.py", "x")], Vec::new());
        let new = generation("g2", vec![component("new.py", "y")], vec![conflict(&["y"])]);
        let output = format_diff(&diff_generations(&old, &new));
        assert!(output.contains("+ new.py"));
        assert!(output.contains("- gone.py"));
        assert!(output.contains("+ [error] port-conflict: port 8080"));
    }
}
