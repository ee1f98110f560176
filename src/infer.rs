//! Relationship inference over a completed metadata store.
//!
//! Three passes: import resolution by export name or file stem, port sharing
//! per unordered pair, and capability grouping. Unresolved imports are
//! silently dropped.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use tracing::debug;

use crate::capability::is_role;
use crate::model::{Component, Relationship, RelationshipKind};
use crate::store::MetadataStore;

/// Confidence of an import that names an exported symbol.
pub const EXPORT_MATCH_CONFIDENCE: f64 = 0.8;
/// Confidence of an import that only matches a file stem.
pub const STEM_MATCH_CONFIDENCE: f64 = 0.6;
/// Confidence of a shared-port edge.
pub const SHARED_PORT_CONFIDENCE: f64 = 0.5;
/// Confidence of a capability-overlap edge.
pub const CAPABILITY_OVERLAP_CONFIDENCE: f64 = 0.3;

/// Output of [`infer`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Inference {
    /// Every edge, sorted by `(kind, from, to)`.
    pub relationships: Vec<Relationship>,
    /// Over-populated capability groups: capability to member ids, members
    /// ordered by path.
    pub capability_groups: BTreeMap<String, Vec<String>>,
}

/// Infers relationships between the stored components.
#[must_use]
pub fn infer(store: &MetadataStore, capability_threshold: usize) -> Inference {
    let mut relationships = import_edges(store);
    relationships.extend(shared_port_edges(store));

    let capability_groups = capability_groups(store, capability_threshold);
    relationships.extend(overlap_edges(&capability_groups));

    relationships.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
    debug!(
        edges = relationships.len(),
        groups = capability_groups.len(),
        "relationships inferred"
    );
    Inference {
        relationships,
        capability_groups,
    }
}

/// Names an import string could refer to: the string itself, its last path
/// segment without extension, and its last `.` or `::` segment.
#[must_use]
pub fn import_keys(import: &str) -> Vec<String> {
    let mut keys = Vec::with_capacity(3);
    let mut push = |key: &str| {
        let key = key.trim();
        let meaningful = !key.is_empty() && key.chars().any(char::is_alphanumeric);
        if meaningful && !keys.iter().any(|k| k == key) {
            keys.push(key.to_string());
        }
    };

    push(import);
    let segment = import
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or(import);
    if is_file_like(segment) {
        push(stem_of(segment));
    } else {
        push(segment);
        let symbol = segment.rsplit("::").next().unwrap_or(segment);
        push(symbol.rsplit('.').next().unwrap_or(symbol));
    }
    keys
}

fn is_file_like(segment: &str) -> bool {
    const SOURCE_EXTENSIONS: &[&str] = &[
        "py", "js", "mjs", "cjs", "jsx", "ts", "tsx", "sh", "rb", "go", "rs", "html", "css", "md",
    ];
    segment
        .rsplit_once('.')
        .is_some_and(|(_, ext)| SOURCE_EXTENSIONS.contains(&ext))
}

fn stem_of(segment: &str) -> &str {
    match segment.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => segment,
    }
}

fn import_edges(store: &MetadataStore) -> Vec<Relationship> {
    let mut by_export: HashMap<&str, BTreeSet<&str>> = HashMap::new();
    let mut by_stem: HashMap<&str, BTreeSet<&str>> = HashMap::new();
    for c in store.iter() {
        for export in &c.exports {
            by_export
                .entry(export.as_str())
                .or_default()
                .insert(c.id.as_str());
        }
        for path in c.all_paths() {
            let name = path.rsplit('/').next().unwrap_or(path);
            by_stem
                .entry(stem_of(name))
                .or_default()
                .insert(c.id.as_str());
        }
    }

    let mut edges: Vec<Relationship> = Vec::new();
    for from in store.iter() {
        let mut best: BTreeMap<&str, (f64, &str)> = BTreeMap::new();
        for import in &from.imports {
            for key in import_keys(import) {
                let matches = [
                    (by_export.get(key.as_str()), EXPORT_MATCH_CONFIDENCE),
                    (by_stem.get(key.as_str()), STEM_MATCH_CONFIDENCE),
                ];
                for (ids, confidence) in matches {
                    for to in ids.into_iter().flatten() {
                        let entry = best.entry(*to).or_insert((confidence, import.as_str()));
                        if confidence > entry.0 {
                            *entry = (confidence, import.as_str());
                        }
                    }
                }
            }
        }
        edges.extend(best.into_iter().filter_map(|(to, (confidence, via))| {
            Relationship::new(&from.id, to, RelationshipKind::Imports, confidence)
                .map(|r| r.via(via))
        }));
    }
    edges
}

fn shared_port_edges(store: &MetadataStore) -> Vec<Relationship> {
    let mut pairs: BTreeMap<(&str, &str), BTreeSet<u16>> = BTreeMap::new();
    for (port, ids) in store.ports() {
        let ids: Vec<&str> = ids.iter().map(String::as_str).collect();
        for (i, a) in ids.iter().enumerate() {
            for b in &ids[i + 1..] {
                pairs.entry((*a, *b)).or_default().insert(port);
            }
        }
    }

    pairs
        .into_iter()
        .filter_map(|((a, b), ports)| {
            let (ca, cb) = (store.get(a)?, store.get(b)?);
            let client_server = ports.iter().all(|p| is_client_server(ca, cb, *p));
            let port = *ports.first()?;
            let mut edge =
                Relationship::new(a, b, RelationshipKind::SharesPort, SHARED_PORT_CONFIDENCE)?
                    .on_port(port);
            edge.client_server = client_server;
            Some(edge)
        })
        .collect()
}

/// Exactly one side binds `port`; the other only refers to it.
#[must_use]
pub fn is_client_server(a: &Component, b: &Component, port: u16) -> bool {
    a.listen_ports.contains(&port) != b.listen_ports.contains(&port)
}

fn capability_groups(store: &MetadataStore, threshold: usize) -> BTreeMap<String, Vec<String>> {
    store
        .capabilities()
        .filter(|(cap, ids)| !is_role(cap) && ids.len() > threshold)
        .map(|(cap, ids)| {
            let mut members: Vec<&Component> = ids.iter().filter_map(|id| store.get(id)).collect();
            members.sort_by(|a, b| a.path.cmp(&b.path));
            (cap.to_string(), members.into_iter().map(|c| c.id.clone()).collect())
        })
        .collect()
}

/// Star from the first member (by path) to every other member of each group.
fn overlap_edges(groups: &BTreeMap<String, Vec<String>>) -> Vec<Relationship> {
    groups
        .iter()
        .flat_map(|(cap, members)| {
            let hub = members.first();
            members.iter().skip(1).filter_map(move |other| {
                Relationship::new(
                    hub?,
                    other,
                    RelationshipKind::DuplicatesCapability,
                    CAPABILITY_OVERLAP_CONFIDENCE,
                )
                .map(|r| r.via(cap.clone()))
            })
        })
        .collect()
}
