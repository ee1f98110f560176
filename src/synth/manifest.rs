//! Compose-style process manifest rendering.

use std::collections::BTreeMap;

use serde::Serialize;

use super::proxy::conflict_header;
use crate::error::{CartographError, Result};
use crate::model::Topology;

#[derive(Serialize)]
struct Manifest<'a> {
    services: BTreeMap<&'a str, ManifestService<'a>>,
    #[serde(rename = "x-start-order")]
    start_order: Vec<&'a str>,
}

#[derive(Serialize)]
struct ManifestService<'a> {
    command: &'a [String],
    working_dir: &'a str,
    environment: BTreeMap<&'static str, String>,
    ports: Vec<String>,
    #[serde(skip_serializing_if = "no_dependencies")]
    depends_on: &'a [String],
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn no_dependencies(deps: &&[String]) -> bool {
    deps.is_empty()
}

/// Renders `topology` as a compose-style YAML document. Services are keyed
/// by name; `x-start-order` lists them in launch order.
///
/// # Errors
///
/// Returns [`CartographError::Serialization`] if YAML encoding fails.
pub fn render(topology: &Topology) -> Result<String> {
    let manifest = Manifest {
        services: topology
            .services
            .iter()
            .map(|s| {
                let service = ManifestService {
                    command: &s.command,
                    working_dir: ".",
                    environment: BTreeMap::from([("PORT", s.port.to_string())]),
                    ports: vec![format!("{0}:{0}", s.port)],
                    depends_on: &s.depends_on,
                };
                (s.name.as_str(), service)
            })
            .collect(),
        start_order: topology.services.iter().map(|s| s.name.as_str()).collect(),
    };
    let body = serde_yaml::to_string(&manifest)
        .map_err(|e| CartographError::serialization("manifest.yaml", e))?;

    let mut lines = vec!["# Generated by cartograph. Do not edit by hand.".to_string()];
    lines.extend(conflict_header(topology, "#"));
    lines.push(body);
    Ok(lines.join("\n"))
}
