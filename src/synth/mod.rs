//! Deployment synthesis: services, start order, routes, port conflicts.
//!
//! [`synthesize`] is total. Conflicts make the topology invalid but never
//! stop it from being built, and import cycles are broken by dropping their
//! weakest edge.

pub mod manifest;
pub mod proxy;
pub mod routes;

use std::collections::{BTreeMap, BTreeSet, HashMap};

use tracing::{info, warn};

use crate::capability::SERVICE;
use crate::error::CartographError;
use crate::model::{
    BrokenEdge, Component, Finding, FindingKind, PortConflict, Relationship, RelationshipKind,
    Service, Severity, Topology,
};
use routes::RouteTable;

/// Builds the deployment plan for every port-bearing component tagged `service`.
pub fn synthesize<'a>(
    components: impl IntoIterator<Item = &'a Component>,
    relationships: &[Relationship],
    routes: &RouteTable,
) -> Topology {
    let mut candidates: Vec<&Component> = components
        .into_iter()
        .filter(|c| !c.declared_ports.is_empty() && c.has_capability(SERVICE))
        .collect();
    candidates.sort_by(|a, b| a.path.cmp(&b.path).then_with(|| a.id.cmp(&b.id)));
    candidates.dedup_by(|a, b| a.id == b.id);

    let names = assign_names(&candidates);
    let by_id: HashMap<&str, &str> = candidates
        .iter()
        .zip(&names)
        .map(|(c, n)| (c.id.as_str(), n.as_str()))
        .collect();

    let conflicts = find_conflicts(&candidates, &names);
    for conflict in &conflicts {
        let err = CartographError::Conflict {
            port: conflict.port,
            claimants: conflict.services.clone(),
        };
        warn!("{err}");
    }

    let mut deps = dependency_graph(&names, relationships, &by_id);
    let (order, broken_edges) = start_order(&mut deps);

    let mut services: Vec<Service> = Vec::with_capacity(candidates.len());
    let mut route_list = Vec::with_capacity(candidates.len());
    for (component, name) in candidates.iter().zip(&names) {
        let Some(start_order) = order.iter().position(|n| n == name) else {
            continue;
        };
        services.push(Service {
            name: name.clone(),
            component: component.id.clone(),
            path: component.path.clone(),
            port: primary_port(component),
            start_order,
            command: launch_command(component),
            depends_on: deps
                .get(name)
                .map(|d| d.keys().cloned().collect())
                .unwrap_or_default(),
        });
        route_list.push(routes.route(name, component));
    }
    services.sort_by_key(|s| s.start_order);
    route_list.sort_by(|a, b| a.path_prefix.cmp(&b.path_prefix));

    Topology {
        valid: conflicts.is_empty(),
        services,
        routes: route_list,
        conflicts,
        broken_edges,
    }
}

/// One `dependency-cycle-broken` finding per edge the synthesizer dropped.
#[must_use]
pub fn cycle_findings(topology: &Topology) -> Vec<Finding> {
    topology
        .broken_edges
        .iter()
        .map(|edge| {
            let evidence = edge
                .cycle
                .iter()
                .filter_map(|name| topology.service(name).map(|s| s.component.clone()));
            Finding::new(
                FindingKind::DependencyCycleBroken,
                Severity::Warn,
                evidence,
                format!(
                    "import cycle {} broken by dropping {} -> {} (confidence {:.2})",
                    edge.cycle.join(" -> "),
                    edge.from,
                    edge.to,
                    edge.confidence
                ),
            )
        })
        .collect()
}

/// Lowercase slug of a file stem: runs of non-alphanumerics become one `-`.
#[must_use]
pub fn slugify(stem: &str) -> String {
    let mut slug = String::with_capacity(stem.len());
    for ch in stem.chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch.to_ascii_lowercase());
        } else if !slug.ends_with('-') {
            slug.push('-');
        }
    }
    let slug = slug.trim_matches('-');
    if slug.is_empty() { "service".to_string() } else { slug.to_string() }
}

fn assign_names(candidates: &[&Component]) -> Vec<String> {
    let mut taken = BTreeSet::new();
    candidates
        .iter()
        .map(|c| {
            let base = slugify(c.stem());
            let mut name = base.clone();
            let mut n = 2;
            while !taken.insert(name.clone()) {
                name = format!("{base}-{n}");
                n += 1;
            }
            name
        })
        .collect()
}

fn primary_port(component: &Component) -> u16 {
    component
        .listen_ports
        .first()
        .or_else(|| component.declared_ports.first())
        .copied()
        .unwrap_or_default()
}

fn find_conflicts(candidates: &[&Component], names: &[String]) -> Vec<PortConflict> {
    let mut claims: BTreeMap<u16, Vec<(&str, &str)>> = BTreeMap::new();
    for (component, name) in candidates.iter().zip(names) {
        let claimed: BTreeSet<u16> = if component.listen_ports.is_empty() {
            BTreeSet::from([primary_port(component)])
        } else {
            component.listen_ports.clone()
        };
        for port in claimed {
            claims
                .entry(port)
                .or_default()
                .push((name.as_str(), component.id.as_str()));
        }
    }
    claims
        .into_iter()
        .filter(|(_, claimants)| claimants.len() > 1)
        .map(|(port, claimants)| {
            let mut services: Vec<String> =
                claimants.iter().map(|(n, _)| (*n).to_string()).collect();
            let mut components: Vec<String> =
                claimants.iter().map(|(_, id)| (*id).to_string()).collect();
            services.sort();
            components.sort();
            components.dedup();
            PortConflict {
                port,
                services,
                components,
            }
        })
        .collect()
}

/// `name -> (dependency -> confidence)` over import edges between services.
type DependencyGraph = BTreeMap<String, BTreeMap<String, f64>>;

fn dependency_graph(
    names: &[String],
    relationships: &[Relationship],
    by_id: &HashMap<&str, &str>,
) -> DependencyGraph {
    let mut graph: DependencyGraph = names.iter().map(|n| (n.clone(), BTreeMap::new())).collect();
    for edge in relationships.iter().filter(|r| r.kind == RelationshipKind::Imports) {
        let (Some(from), Some(to)) = (by_id.get(edge.from.as_str()), by_id.get(edge.to.as_str()))
        else {
            continue;
        };
        if from == to {
            continue;
        }
        if let Some(deps) = graph.get_mut(*from) {
            let confidence = deps.entry((*to).to_string()).or_insert(edge.confidence);
            *confidence = confidence.max(edge.confidence);
        }
    }
    graph
}

/// Kahn's algorithm, always taking the smallest ready name. When nothing is
/// ready, walks from the smallest remaining node to a cycle and drops its
/// lowest-confidence edge (ties: smallest `(from, to)`), then continues.
fn start_order(deps: &mut DependencyGraph) -> (Vec<String>, Vec<BrokenEdge>) {
    let mut remaining: BTreeSet<String> = deps.keys().cloned().collect();
    let mut order = Vec::with_capacity(remaining.len());
    let mut broken = Vec::new();

    while !remaining.is_empty() {
        let ready = remaining.iter().find(|name| {
            deps.get(*name)
                .map_or(true, |d| d.keys().all(|dep| !remaining.contains(dep)))
        });
        if let Some(name) = ready.cloned() {
            remaining.remove(&name);
            order.push(name);
            continue;
        }

        let cycle = find_cycle(deps, &remaining);
        let Some(edge) = weakest_edge(deps, &cycle) else {
            // Unreachable while every blocked node has a remaining dependency.
            order.extend(std::mem::take(&mut remaining));
            break;
        };
        if let Some(d) = deps.get_mut(&edge.from) {
            d.remove(&edge.to);
        }
        let err = CartographError::Cycle {
            members: edge.cycle.clone(),
        };
        info!("{err}; dropping {} -> {}", edge.from, edge.to);
        broken.push(edge);
    }
    (order, broken)
}

fn find_cycle(deps: &DependencyGraph, remaining: &BTreeSet<String>) -> Vec<String> {
    let mut path: Vec<String> = Vec::new();
    let mut current = remaining.iter().next().cloned();
    while let Some(node) = current {
        if let Some(start) = path.iter().position(|n| *n == node) {
            let mut cycle = path.split_off(start);
            cycle.push(node);
            return cycle;
        }
        current = deps
            .get(&node)
            .and_then(|d| d.keys().find(|dep| remaining.contains(*dep)).cloned());
        path.push(node);
    }
    Vec::new()
}

fn weakest_edge(deps: &DependencyGraph, cycle: &[String]) -> Option<BrokenEdge> {
    cycle
        .windows(2)
        .filter_map(|pair| {
            let confidence = *deps.get(&pair[0])?.get(&pair[1])?;
            Some((pair[0].clone(), pair[1].clone(), confidence))
        })
        .min_by(|a, b| {
            a.2.total_cmp(&b.2)
                .then_with(|| (&a.0, &a.1).cmp(&(&b.0, &b.1)))
        })
        .map(|(from, to, confidence)| BrokenEdge {
            from,
            to,
            confidence,
            cycle: cycle.to_vec(),
        })
}

fn launch_command(component: &Component) -> Vec<String> {
    let path = component.path.clone();
    let parts: Vec<&str> = match component.language.as_str() {
        "python" => vec!["python3"],
        "javascript" => vec!["node"],
        "typescript" => vec!["npx", "ts-node"],
        "shell" => vec!["bash"],
        "ruby" => vec!["ruby"],
        "go" => vec!["go", "run"],
        "rust" => return vec!["cargo".into(), "run".into()],
        _ => return vec![format!("./{path}")],
    };
    parts
        .into_iter()
        .map(String::from)
        .chain(std::iter::once(path))
        .collect()
}
