//! nginx reverse-proxy rendering.

use crate::model::Topology;

/// Port the generated proxy listens on.
pub const PROXY_LISTEN_PORT: u16 = 80;

/// Renders `topology` as an nginx configuration fragment: one `upstream` per
/// service and a single `server` with one `location` per route.
#[must_use]
pub fn render(topology: &Topology) -> String {
    let mut lines = vec!["# Generated by cartograph. Do not edit by hand.".to_string()];
    lines.extend(conflict_header(topology, "#"));
    lines.push(String::new());

    for service in &topology.services {
        lines.push(format!("upstream {} {{", service.name));
        lines.push(format!("    server 127.0.0.1:{};", service.port));
        lines.push("}".to_string());
        lines.push(String::new());
    }

    lines.push("server {".to_string());
    lines.push(format!("    listen {PROXY_LISTEN_PORT};"));
    for route in &topology.routes {
        lines.push(String::new());
        lines.push(format!("    location {}/ {{", route.path_prefix));
        lines.push(format!("        proxy_pass http://{}/;", route.target_service));
        lines.push("        proxy_set_header Host $host;".to_string());
        lines.push(
            "        proxy_set_header X-Forwarded-For $proxy_add_x_forwarded_for;".to_string(),
        );
        if route.websocket {
            lines.push("        proxy_http_version 1.1;".to_string());
            lines.push("        proxy_set_header Upgrade $http_upgrade;".to_string());
            lines.push("        proxy_set_header Connection \"upgrade\";".to_string());
        }
        lines.push("    }".to_string());
    }
    lines.push("}".to_string());
    lines.push(String::new());

    lines.join("\n")
}

/// Comment lines describing why a topology is invalid; empty when it is valid.
#[must_use]
pub fn conflict_header(topology: &Topology, marker: &str) -> Vec<String> {
    if topology.valid {
        return Vec::new();
    }
    let mut lines = vec![format!(
        "{marker} INVALID TOPOLOGY: resolve these port conflicts before use"
    )];
    for conflict in &topology.conflicts {
        lines.push(format!(
            "{marker}   port {}: {}",
            conflict.port,
            conflict.services.join(", ")
        ));
    }
    lines
}
