//! Structured configuration: JSON, YAML, TOML, INI, env files, Dockerfiles, Procfiles.

use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

use super::common::{self, CommentStyle};
use super::{Claims, Extractor, FactSet};
use crate::model::Dialect;

fn re(pattern: &str) -> Regex {
    Regex::new(pattern).expect("valid regex")
}

static ASSIGNMENT: Lazy<Regex> =
    Lazy::new(|| re(r"(?m)^[ \t]*(?:export[ \t]+)?([A-Za-z_][\w.-]*)[ \t]*[=:]"));
static INI_SECTION: Lazy<Regex> = Lazy::new(|| re(r"(?m)^[ \t]*\[([^\]\r\n]+)\]"));
static NGINX_LISTEN: Lazy<Regex> =
    Lazy::new(|| re(r"(?m)^[ \t]*listen[ \t]+(?:[\w.\[\]:]*:)?(\d+)"));
static PROCFILE_ENTRY: Lazy<Regex> = Lazy::new(|| re(r"(?m)^([\w-]+):[ \t]*\S"));
static DOCKER_FROM: Lazy<Regex> = Lazy::new(|| re(r"(?im)^[ \t]*FROM[ \t]+(\S+)"));

/// Configuration family of a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Json,
    Yaml,
    Toml,
    Ini,
    Env,
    Dockerfile,
    Procfile,
}

impl Format {
    fn of(path: &Path) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        let dockerfile = name.starts_with("dockerfile.") || name.ends_with(".dockerfile");
        if name == "dockerfile" || dockerfile {
            return Self::Dockerfile;
        }
        if name == "procfile" {
            return Self::Procfile;
        }
        if name == ".env" || name.starts_with(".env.") || name.ends_with(".env") {
            return Self::Env;
        }
        match name.rsplit_once('.').map(|(_, ext)| ext) {
            Some("json") => Self::Json,
            Some("yaml" | "yml") => Self::Yaml,
            Some("toml") => Self::Toml,
            Some("properties") => Self::Env,
            _ => Self::Ini,
        }
    }

    fn language(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Yaml => "yaml",
            Self::Toml => "toml",
            Self::Ini => "ini",
            Self::Env => "env",
            Self::Dockerfile => "dockerfile",
            Self::Procfile => "procfile",
        }
    }
}

/// Key-value and document configuration formats.
pub struct ConfigExtractor;

impl Extractor for ConfigExtractor {
    fn name(&self) -> &'static str {
        "config"
    }

    fn dialect(&self) -> Dialect {
        Dialect::Config
    }

    fn claims(&self) -> Claims {
        Claims {
            extensions: &[
                "json", "yaml", "yml", "toml", "ini", "cfg", "conf", "env", "properties",
                "dockerfile",
            ],
            file_names: &[
                "Dockerfile",
                "Procfile",
                ".env",
                ".env.local",
                ".env.example",
                ".env.development",
                ".env.production",
            ],
            interpreters: &[],
        }
    }

    fn extract(&self, path: &Path, content: &str) -> FactSet {
        let format = Format::of(path);
        let mut facts = FactSet::for_language(format.language());
        match format {
            Format::Json => json(content, &mut facts),
            Format::Yaml => yaml(content, &mut facts),
            Format::Toml | Format::Ini | Format::Env => key_values(content, format, &mut facts),
            Format::Dockerfile => dockerfile(content, &mut facts),
            Format::Procfile => procfile(content, &mut facts),
        }
        common::scan_command_refs(content, &mut facts);
        common::scan_ports(content, &mut facts);
        facts
    }
}

fn json(content: &str, facts: &mut FactSet) {
    let value: serde_json::Value = match serde_json::from_str(content) {
        Ok(value) => value,
        Err(e) => {
            facts.mark_incomplete(format!("invalid JSON: {e}"));
            return;
        }
    };
    let Some(object) = value.as_object() else {
        return;
    };
    if let Some(name) = object.get("name").and_then(serde_json::Value::as_str) {
        facts.add_export(name);
    }
    if let Some(main) = object.get("main").and_then(serde_json::Value::as_str) {
        facts.add_import(main);
    }
    for key in ["dependencies", "devDependencies"] {
        if let Some(deps) = object.get(key).and_then(serde_json::Value::as_object) {
            for dep in deps.keys() {
                facts.add_import(dep);
            }
        }
    }
    facts.purpose = object
        .get("description")
        .and_then(serde_json::Value::as_str)
        .and_then(common::normalize_purpose);
}

fn yaml(content: &str, facts: &mut FactSet) {
    for (index, document) in serde_yaml::Deserializer::from_str(content).enumerate() {
        match serde_yaml::Value::deserialize(document) {
            Ok(value) => compose_services(&value, facts),
            Err(e) => {
                facts.mark_incomplete(format!("invalid YAML in document {}: {e}", index + 1));
                break;
            }
        }
    }
    let purpose = common::leading_comment(content, CommentStyle::Hash, facts);
    facts.purpose = purpose;
}

/// Compose-style `services:` blocks: service names are exports, `depends_on`
/// entries are imports, and the host side of `ports` is a binding.
fn compose_services(document: &serde_yaml::Value, facts: &mut FactSet) {
    let Some(services) = document.get("services").and_then(serde_yaml::Value::as_mapping) else {
        return;
    };
    for (name, service) in services {
        let Some(name) = name.as_str() else { continue };
        facts.add_export(name);

        match service.get("depends_on") {
            Some(serde_yaml::Value::Sequence(deps)) => {
                for dep in deps.iter().filter_map(serde_yaml::Value::as_str) {
                    facts.add_import(dep);
                }
            }
            Some(serde_yaml::Value::Mapping(deps)) => {
                for dep in deps.keys().filter_map(serde_yaml::Value::as_str) {
                    facts.add_import(dep);
                }
            }
            _ => {}
        }

        let Some(ports) = service.get("ports").and_then(serde_yaml::Value::as_sequence) else {
            continue;
        };
        for entry in ports {
            let literal = match entry {
                serde_yaml::Value::Number(n) => n.to_string(),
                serde_yaml::Value::String(s) => s.clone(),
                _ => continue,
            };
            if let Some(port) = host_port(&literal, facts) {
                facts.bind_port(port);
            }
        }
    }
}

/// Host port of a compose mapping: `8080:80`, `127.0.0.1:8080:80`, `8080`, `8080/tcp`.
fn host_port(mapping: &str, facts: &mut FactSet) -> Option<u16> {
    let mapping = mapping.split('/').next().unwrap_or(mapping);
    let parts: Vec<&str> = mapping.split(':').collect();
    let host = match parts.as_slice() {
        [single] => *single,
        [.., host, _container] => *host,
        [] => return None,
    };
    let host = host.split('-').next().unwrap_or(host).trim();
    if host.is_empty() {
        return None;
    }
    common::parse_port(host, facts)
}

fn key_values(content: &str, format: Format, facts: &mut FactSet) {
    if format == Format::Toml {
        if let Err(e) = validate_brackets(content) {
            facts.mark_incomplete(e);
        }
    }
    for cap in INI_SECTION.captures_iter(content) {
        facts.add_export(&format!("[{}]", cap[1].trim()));
    }
    for cap in ASSIGNMENT.captures_iter(content) {
        facts.add_export(&cap[1]);
    }
    for cap in NGINX_LISTEN.captures_iter(content) {
        if let Some(port) = common::parse_port(&cap[1], facts) {
            facts.bind_port(port);
        }
    }
    let purpose = common::leading_comment(content, CommentStyle::Ini, facts);
    facts.purpose = purpose;
}

fn validate_brackets(content: &str) -> Result<(), String> {
    for (n, line) in content.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.starts_with('[') && !trimmed.contains(']') {
            return Err(format!("unclosed table header on line {}", n + 1));
        }
    }
    Ok(())
}

fn dockerfile(content: &str, facts: &mut FactSet) {
    for cap in DOCKER_FROM.captures_iter(content) {
        facts.add_import(&cap[1]);
    }
    let purpose = common::leading_comment(content, CommentStyle::Hash, facts);
    facts.purpose = purpose;
}

fn procfile(content: &str, facts: &mut FactSet) {
    for cap in PROCFILE_ENTRY.captures_iter(content) {
        facts.add_export(&cap[1]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn run(path: &str, content: &str) -> FactSet {
        ConfigExtractor.extract(Path::new(path), content)
    }

    fn ports(facts: &FactSet) -> Vec<u16> {
        facts.listen_ports.iter().copied().collect()
    }

    #[test]
    fn package_json() {
        let facts = run(
            "package.json",
            r#"{"name": "lobby", "description": "Lobby   service", "main": "server.js",
                "dependencies": {"express": "^4"}, "scripts": {"start": "node server.js --port 3000"}}"#,
        );
        assert_eq!(facts.language, "json");
        assert_eq!(facts.exports, vec!["lobby"]);
        assert_eq!(facts.imports, vec!["server.js", "express"]);
        assert_eq!(facts.purpose.as_deref(), Some("Lobby service"));
        assert_eq!(ports(&facts), vec![3000]);
    }

    #[test]
    fn invalid_json_is_partial_but_still_scanned() {
        let facts = run("settings.json", "{\"port\": 8080,");
        assert!(facts.incomplete);
        assert!(facts.notes[0].starts_with("invalid JSON"));
        assert_eq!(ports(&facts), vec![8080]);
    }

    #[test]
    fn compose_services_ports_and_dependencies() {
        let facts = run(
            "docker-compose.yml",
            "# Local stack\nservices:\n  web:\n    ports:\n      - \"8080:80\"\n    depends_on: [api]\n  api:\n    ports:\n      - 127.0.0.1:9000:9000\n      - 5432\n    command: python app.py\n",
        );
        assert_eq!(facts.language, "yaml");
        assert_eq!(facts.exports, vec!["web", "api"]);
        assert_eq!(facts.imports, vec!["api", "app.py"]);
        assert_eq!(ports(&facts), vec![5432, 8080, 9000]);
        assert_eq!(facts.purpose.as_deref(), Some("Local stack"));
    }

    #[test]
    fn multi_document_yaml_and_errors() {
        let ok = run("k8s.yaml", "a: 1\n---\nb: 2\n");
        assert!(!ok.incomplete);

        let bad = run("bad.yml", "key: [unclosed\n");
        assert!(bad.incomplete);
    }

    #[test]
    fn env_and_ini_keys() {
        let env = run(".env", "# secrets\nexport DATABASE_URL=postgres://db:5432/app\nPORT=4000\n");
        assert_eq!(env.language, "env");
        assert_eq!(env.exports, vec!["DATABASE_URL", "PORT"]);
        assert_eq!(ports(&env), vec![4000]);
        assert!(env.declared_ports.contains(&5432));

        let ini = run("setup.cfg", "; tool settings\n[server]\nhost = 0.0.0.0\n");
        assert_eq!(ini.exports, vec!["[server]", "host"]);
        assert_eq!(ini.purpose.as_deref(), Some("tool settings"));
    }

    #[test]
    fn nginx_listen_binds() {
        let facts = run(
            "site.conf",
            "server {\n  listen 80;\n  listen [::]:443 ssl;\n  proxy_pass http://localhost:3000;\n}\n",
        );
        assert_eq!(ports(&facts), vec![80, 443]);
        assert!(facts.declared_ports.contains(&3000));
    }

    #[test]
    fn toml_unclosed_header_is_partial() {
        let facts = run("pyproject.toml", "[tool.poetry\nname = \"x\"\n");
        assert!(facts.incomplete);
    }

    #[test]
    fn dockerfile_and_procfile() {
        let docker = run(
            "Dockerfile",
            "# API image\nFROM python:3.12-slim\nEXPOSE 8000\nCMD [\"python\", \"main.py\"]\n",
        );
        assert_eq!(docker.language, "dockerfile");
        assert_eq!(docker.imports, vec!["python:3.12-slim", "main.py"]);
        assert_eq!(ports(&docker), vec![8000]);
        assert_eq!(docker.purpose.as_deref(), Some("API image"));

        let procfile = run("Procfile", "web: node index.js\nworker: python jobs.py\n");
        assert_eq!(procfile.exports, vec!["web", "worker"]);
        assert_eq!(procfile.imports, vec!["index.js", "jobs.py"]);
    }

    #[test]
    fn host_port_forms() {
        let mut facts = FactSet::default();
        assert_eq!(host_port("8080:80", &mut facts), Some(8080));
        assert_eq!(host_port("127.0.0.1:9000:9000", &mut facts), Some(9000));
        assert_eq!(host_port("3000/udp", &mut facts), Some(3000));
        assert_eq!(host_port("7000-7005:7000-7005", &mut facts), Some(7000));
        assert!(!facts.incomplete);
    }
}
