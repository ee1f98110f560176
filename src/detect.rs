//! Anti-pattern rules over the store and the inferred relationships.
//!
//! Every rule is a pure function of its inputs; findings come back in
//! canonical order so two runs over the same tree compare equal.

use std::collections::{BTreeMap, BTreeSet};

use crate::capability::ENTRY_POINT;
use crate::config::ScanConfig;
use crate::infer::Inference;
use crate::model::{sort_findings, Finding, FindingKind, Severity};
use crate::store::MetadataStore;

/// Thresholds and required capabilities for [`detect`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectorConfig {
    /// More entry points than this trips `multiple-launchers`.
    pub launcher_threshold: usize,
    /// Capabilities that must be implemented somewhere.
    pub required_capabilities: Vec<String>,
}

impl From<&ScanConfig> for DetectorConfig {
    fn from(config: &ScanConfig) -> Self {
        Self {
            launcher_threshold: config.launcher_threshold,
            required_capabilities: config.required_capabilities.clone(),
        }
    }
}

/// Runs every rule and returns the findings in canonical order.
#[must_use]
pub fn detect(
    store: &MetadataStore,
    inference: &Inference,
    config: &DetectorConfig,
) -> Vec<Finding> {
    let mut findings = Vec::new();
    findings.extend(multiple_launchers(store, config.launcher_threshold));
    findings.extend(duplicate_capabilities(inference));
    findings.extend(missing_capabilities(store, &config.required_capabilities));
    findings.extend(port_conflicts(store));
    findings.extend(incomplete_extractions(store));
    sort_findings(&mut findings);
    findings
}

fn multiple_launchers(store: &MetadataStore, threshold: usize) -> Option<Finding> {
    let launchers: Vec<String> = store
        .with_capability(ENTRY_POINT)
        .map(|c| c.id.clone())
        .collect();
    (launchers.len() > threshold).then(|| {
        let count = launchers.len();
        Finding::new(
            FindingKind::MultipleLaunchers,
            Severity::Warn,
            launchers,
            format!(
                "{count} components look like process entry points (threshold {threshold})"
            ),
        )
    })
}

fn duplicate_capabilities(inference: &Inference) -> Vec<Finding> {
    inference
        .capability_groups
        .iter()
        .map(|(capability, members)| {
            Finding::new(
                FindingKind::DuplicateCapability,
                Severity::Info,
                members.iter().cloned(),
                format!(
                    "capability '{capability}' is implemented by {} components",
                    members.len()
                ),
            )
        })
        .collect()
}

fn missing_capabilities(store: &MetadataStore, required: &[String]) -> Vec<Finding> {
    let required: BTreeSet<&str> = required.iter().map(String::as_str).collect();
    required
        .into_iter()
        .filter(|capability| store.with_capability(capability).next().is_none())
        .map(|capability| {
            Finding::new(
                FindingKind::MissingCapability,
                Severity::Warn,
                Vec::new(),
                format!(
                    "no component implements required capability '{capability}'"
                ),
            )
        })
        .collect()
}

/// One finding per port bound by two or more components.
///
/// A client/server pair never lands here: one side of such a pair only
/// mentions the port and so is not listening on it.
fn port_conflicts(store: &MetadataStore) -> Vec<Finding> {
    let mut by_port: BTreeMap<u16, BTreeSet<&str>> = BTreeMap::new();
    for (port, _) in store.ports() {
        let listeners: BTreeSet<&str> = store.listening_on(port).map(|c| c.id.as_str()).collect();
        if listeners.len() > 1 {
            by_port.insert(port, listeners);
        }
    }

    by_port
        .into_iter()
        .map(|(port, ids)| {
            let paths: Vec<&str> = ids
                .iter()
                .filter_map(|id| store.get(id))
                .map(|c| c.path.as_str())
                .collect();
            Finding::new(
                FindingKind::PortConflict,
                Severity::Error,
                ids.into_iter().map(String::from),
                format!("port {port} is bound by {}", paths.join(", ")),
            )
        })
        .collect()
}

fn incomplete_extractions(store: &MetadataStore) -> Option<Finding> {
    let partial: Vec<&str> = store
        .query(|c| c.incomplete)
        .map(|c| c.path.as_str())
        .collect();
    if partial.is_empty() {
        return None;
    }
    let evidence = store.query(|c| c.incomplete).map(|c| c.id.clone());
    Some(Finding::new(
        FindingKind::IncompleteExtraction,
        Severity::Info,
        evidence,
        format!(
            "{} files were only partially extracted: {}",
            partial.len(),
            partial.join(", ")
        ),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infer::infer;
    use crate::model::fixtures::{component, service};
    use crate::model::Component;
    use pretty_assertions::assert_eq;

    fn config(threshold: usize, required: &[&str]) -> DetectorConfig {
        DetectorConfig {
            launcher_threshold: threshold,
            required_capabilities: required.iter().map(|s| (*s).to_string()).collect(),
        }
    }

    fn run(components: Vec<Component>, config: &DetectorConfig) -> Vec<Finding> {
        let store = MetadataStore::from_components(components);
        let inference = infer(&store, 2);
        detect(&store, &inference, config)
    }

    fn of_kind(findings: &[Finding], kind: FindingKind) -> Vec<&Finding> {
        findings.iter().filter(|f| f.kind == kind).collect()
    }

    #[test]
    fn four_launchers_over_threshold_three() {
        let comps = ["a.py", "b.py", "c.py", "d.py"]
            .iter()
            .map(|p| service(p, &[], &[ENTRY_POINT]))
            .collect();
        let findings = run(comps, &config(3, &[]));
        let launchers = of_kind(&findings, FindingKind::MultipleLaunchers);
        assert_eq!(launchers.len(), 1);
        assert_eq!(launchers[0].evidence.len(), 4);
        assert_eq!(launchers[0].severity, Severity::Warn);
    }

    #[test]
    fn three_launchers_is_fine() {
        let comps = ["a.py", "b.py", "c.py"]
            .iter()
            .map(|p| service(p, &[], &[ENTRY_POINT]))
            .collect();
        let findings = run(comps, &config(3, &[]));
        assert!(of_kind(&findings, FindingKind::MultipleLaunchers).is_empty());
    }

    #[test]
    fn missing_capability_has_no_evidence() {
        let comps = vec![service("a.py", &[], &["monitoring"])];
        let cfg = config(3, &["monitoring", "authentication", "authentication"]);
        let findings = run(comps, &cfg);
        let missing = of_kind(&findings, FindingKind::MissingCapability);
        assert_eq!(missing.len(), 1);
        assert!(missing[0].message.contains("authentication"));
        assert!(missing[0].evidence.is_empty());
    }

    #[test]
    fn two_listeners_conflict_client_does_not() {
        let a = service("a.py", &[8080], &[]);
        let b = service("b.py", &[8080], &[]);
        let mut client = component("client.js", "fetch");
        client.declared_ports.insert(8080);

        let findings = run(vec![a.clone(), b.clone(), client], &config(3, &[]));
        let conflicts = of_kind(&findings, FindingKind::PortConflict);
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].severity, Severity::Error);
        let mut expected = vec![a.id, b.id];
        expected.sort();
        assert_eq!(conflicts[0].evidence, expected);
        assert_eq!(findings[0].kind, FindingKind::PortConflict);
    }

    #[test]
    fn duplicate_capability_and_incomplete_are_informational() {
        let mut broken = component("broken.py", "x");
        broken.incomplete = true;
        let mut comps: Vec<Component> = ["a.py", "b.py", "c.py"]
            .iter()
            .map(|p| service(p, &[], &["persistence"]))
            .collect();
        comps.push(broken);

        let findings = run(comps, &config(3, &[]));
        let dup = of_kind(&findings, FindingKind::DuplicateCapability);
        assert_eq!(dup.len(), 1);
        assert_eq!(dup[0].evidence.len(), 3);
        let partial = of_kind(&findings, FindingKind::IncompleteExtraction);
        assert_eq!(partial.len(), 1);
        assert!(partial[0].message.contains("broken.py"));
    }

    #[test]
    fn detection_is_deterministic() {
        let build = || {
            vec![
                service("x.py", &[1, 2], &[ENTRY_POINT, "gaming"]),
                service("y.py", &[1], &[ENTRY_POINT, "gaming"]),
                service("z.py", &[2], &["gaming"]),
            ]
        };
        let cfg = config(1, &["monitoring"]);
        let reversed = build().into_iter().rev().collect();
        assert_eq!(run(build(), &cfg), run(reversed, &cfg));
    }
}
