//! Report emitter: structured JSON and a condensed text summary of a
//! generation.
//!
//! Both renderings are pure functions of the [`Generation`]; collections are
//! already in canonical order there, so two reports of the same generation
//! are byte-identical.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::{CartographError, Result};
use crate::generation::Generation;
use crate::model::{Component, Finding, Relationship, Topology};
use crate::scan::ScanStats;

/// How many findings the text summary lists.
pub const TOP_FINDINGS: usize = 10;

/// Counts by category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    /// Total components.
    pub components: usize,
    /// Components per dialect.
    pub by_dialect: BTreeMap<&'static str, usize>,
    /// Components per capability tag.
    pub by_capability: BTreeMap<String, usize>,
    /// Relationships per kind.
    pub relationships: BTreeMap<&'static str, usize>,
    /// Findings per severity.
    pub findings: BTreeMap<String, usize>,
    /// Topology validity.
    pub valid: bool,
    /// Selected services.
    pub services: usize,
    /// Proxy routes.
    pub routes: usize,
    /// Port conflicts.
    pub conflicts: usize,
}

impl Summary {
    /// Tallies a generation.
    #[must_use]
    pub fn of(generation: &Generation) -> Self {
        let mut by_dialect = BTreeMap::new();
        let mut by_capability = BTreeMap::new();
        for c in &generation.components {
            *by_dialect.entry(c.dialect.as_str()).or_insert(0) += 1;
            for cap in &c.capabilities {
                *by_capability.entry(cap.clone()).or_insert(0) += 1;
            }
        }
        let mut relationships = BTreeMap::new();
        for r in &generation.relationships {
            *relationships.entry(r.kind.as_str()).or_insert(0) += 1;
        }
        let mut findings = BTreeMap::new();
        for f in &generation.findings {
            *findings.entry(f.severity.to_string()).or_insert(0) += 1;
        }
        let topology = &generation.topology;
        Self {
            components: generation.components.len(),
            by_dialect,
            by_capability,
            relationships,
            findings,
            valid: topology.valid,
            services: topology.services.len(),
            routes: topology.routes.len(),
            conflicts: topology.conflicts.len(),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Report<'a> {
    generation: &'a str,
    created_at: String,
    root: &'a str,
    stats: &'a ScanStats,
    components: &'a [Component],
    relationships: &'a [Relationship],
    findings: &'a [Finding],
    topology: &'a Topology,
    summary: Summary,
}

/// Full structured report as pretty-printed JSON.
///
/// # Errors
///
/// Returns [`CartographError::Serialization`] if encoding fails.
pub fn render_json(generation: &Generation) -> Result<String> {
    let report = Report {
        generation: &generation.id,
        created_at: generation.created_at.to_rfc3339(),
        root: &generation.root,
        stats: &generation.stats,
        components: &generation.components,
        relationships: &generation.relationships,
        findings: &generation.findings,
        topology: &generation.topology,
        summary: Summary::of(generation),
    };
    serde_json::to_string_pretty(&report)
        .map_err(|e| CartographError::serialization("report", e))
}

/// Human summary: counts by category, top findings, topology status.
#[must_use]
pub fn render_text(generation: &Generation) -> String {
    let summary = Summary::of(generation);
    let stats = &generation.stats;
    let mut lines = vec![
        format!(
            "Generation {} ({})",
            generation.id,
            generation.created_at.format("%Y-%m-%d %H:%M:%S UTC")
        ),
        format!("Root: {}", generation.root),
        format!(
            "Files: {} visited, {} extracted, {} skipped, {} unreadable, {} incomplete",
            stats.files_visited,
            stats.files_extracted,
            stats.files_skipped,
            stats.io_errors.len(),
            stats.incomplete
        ),
        String::new(),
        format!("Components: {}", summary.components),
    ];
    lines.extend(counts(&summary.by_dialect));
    if !summary.by_capability.is_empty() {
        lines.push("Capabilities:".to_string());
        lines.extend(counts(&summary.by_capability));
    }
    lines.push(format!("Relationships: {}", generation.relationships.len()));
    lines.extend(counts(&summary.relationships));

    lines.push(String::new());
    lines.push(format!("Findings: {}", generation.findings.len()));
    lines.extend(counts(&summary.findings));
    for f in generation.findings.iter().take(TOP_FINDINGS) {
        lines.push(format!("  [{}] {}: {}", f.severity, f.kind, f.message));
        let paths: Vec<&str> = f
            .evidence
            .iter()
            .filter_map(|id| generation.component(id))
            .map(|c| c.path.as_str())
            .collect();
        if !paths.is_empty() {
            lines.push(format!("      {}", paths.join(", ")));
        }
    }
    if generation.findings.len() > TOP_FINDINGS {
        let rest = generation.findings.len() - TOP_FINDINGS;
        lines.push(format!("  ... and {rest} more"));
    }

    lines.push(String::new());
    let status = if summary.valid { "valid" } else { "INVALID" };
    lines.push(format!(
        "Topology: {status}, {} services, {} routes",
        summary.services, summary.routes
    ));
    for s in &generation.topology.services {
        let n = s.start_order + 1;
        lines.push(format!("  {n}. {} :{} ({})", s.name, s.port, s.path));
    }
    for c in &generation.topology.conflicts {
        lines.push(format!("  conflict on port {}: {}", c.port, c.services.join(", ")));
    }
    lines.join("\n")
}

fn counts<K: std::fmt::Display>(
    map: &BTreeMap<K, usize>,
) -> impl Iterator<Item = String> + '_ {
    map.iter().map(|(k, n)| format!("  {k}: {n}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::fixtures::generation;
    use crate::model::fixtures::{component, service};
    use crate::model::{Dialect, FindingKind, PortConflict, Severity};

    fn sample() -> Generation {
        let a = service("a.py", &[8080], &["monitoring"]);
        let b = service("b.py", &[8080], &[]);
        let mut doc = component("README.md", "docs");
        doc.dialect = Dialect::Markup;
        let conflict = Finding::new(
            FindingKind::PortConflict,
            Severity::Error,
            [a.id.clone(), b.id.clone()],
            "port 8080 is bound by a.py, b.py",
        );
        let mut gen = generation("g1", vec![a, b, doc], vec![conflict]);
        gen.topology.valid = false;
        gen.topology.conflicts = vec![PortConflict {
            port: 8080,
            services: vec!["a".into(), "b".into()],
            components: Vec::new(),
        }];
        gen
    }

    #[test]
    fn summary_counts_by_category() {
        let summary = Summary::of(&sample());
        assert_eq!(summary.components, 3);
        assert_eq!(summary.by_dialect["script"], 2);
        assert_eq!(summary.by_dialect["markup"], 1);
        assert_eq!(summary.by_capability["monitoring"], 1);
        assert_eq!(summary.findings["error"], 1);
        assert!(!summary.valid);
    }

    #[test]
    fn text_lists_findings_with_paths() {
        let text = render_text(&sample());
        assert!(text.contains("[error] port-conflict: port 8080"));
        assert!(text.contains("a.py, b.py"));
        assert!(text.contains("Topology: INVALID"));
        assert!(text.contains("conflict on port 8080: a, b"));
    }

    #[test]
    fn text_truncates_to_top_findings() {
        let findings = (0..15)
            .map(|i| {
                Finding::new(
                    FindingKind::MissingCapability,
                    Severity::Warn,
                    Vec::new(),
                    format!("m{i:02}"),
                )
            })
            .collect();
        let text = render_text(&generation("g", Vec::new(), findings));
        assert!(text.contains("m09"));
        assert!(!text.contains("m10"));
        assert!(text.contains("... and 5 more"));
    }

    #[test]
    fn json_has_every_section_and_is_stable() {
        let gen = sample();
        let json = render_json(&gen).unwrap();
        assert_eq!(json, render_json(&gen).unwrap());

        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        for key in [
            "generation",
            "createdAt",
            "root",
            "stats",
            "components",
            "relationships",
            "findings",
            "topology",
            "summary",
        ] {
            assert!(value.get(key).is_some(), "missing {key}");
        }
        assert_eq!(value["summary"]["byDialect"]["script"], 2);
        assert_eq!(value["topology"]["valid"], false);
    }
}
