//! The `Component` record: one scanned source unit, addressed by content.

use std::collections::BTreeSet;
use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::is_false;

/// Coarse family of source text a component was read as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    /// Programming and shell scripts.
    Script,
    /// HTML, Markdown, and other document markup.
    Markup,
    /// Structured configuration (JSON, YAML, TOML, INI, Dockerfile, env).
    Config,
    /// Nothing claimed the file.
    Unknown,
}

impl Dialect {
    /// Lowercase label used in summaries.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Script => "script",
            Self::Markup => "markup",
            Self::Config => "config",
            Self::Unknown => "unknown",
        }
    }
}

/// One scanned source unit.
///
/// `id` is the SHA-256 of the file bytes. Files with identical bytes collapse
/// into a single component: `path` is the lexicographically smallest of them
/// and the rest are listed in `aliases`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Component {
    /// Hex SHA-256 of the file content.
    pub id: String,
    /// Path relative to the scan root, `/`-separated.
    pub path: String,
    /// Other paths with byte-identical content.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,
    /// Dialect of the extractor that claimed the file.
    pub dialect: Dialect,
    /// Finer language label (`python`, `yaml`, ...).
    pub language: String,
    /// File size in bytes.
    pub size_bytes: u64,
    /// Last modification time, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_at: Option<DateTime<Utc>>,
    /// Every port literal found (bindings and URL references).
    pub declared_ports: BTreeSet<u16>,
    /// Ports the file appears to bind or expose.
    #[serde(default)]
    pub listen_ports: BTreeSet<u16>,
    /// Referenced module names, in first-seen order, verbatim.
    pub imports: Vec<String>,
    /// Symbols the file defines.
    pub exports: Vec<String>,
    /// Inferred capability tags.
    pub capabilities: BTreeSet<String>,
    /// Leading comment or docstring, truncated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purpose: Option<String>,
    /// Extraction recovered only part of the file.
    #[serde(default, skip_serializing_if = "is_false")]
    pub incomplete: bool,
    /// Why extraction was partial.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<String>,
}

impl Component {
    /// File name without its last extension (`server` for `api/server.py`).
    #[must_use]
    pub fn stem(&self) -> &str {
        let name = self.path.rsplit('/').next().unwrap_or(&self.path);
        match name.rsplit_once('.') {
            Some((stem, _)) if !stem.is_empty() => stem,
            _ => name,
        }
    }

    /// Returns `true` if the component carries the capability tag.
    #[must_use]
    pub fn has_capability(&self, capability: &str) -> bool {
        self.capabilities.contains(capability)
    }

    /// Canonical path followed by aliases.
    pub fn all_paths(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.path.as_str())
            .chain(self.aliases.iter().map(String::as_str))
    }

    /// Folds another record with the same id into this one.
    ///
    /// The smaller path wins as canonical (its facts are kept); every other
    /// path ends up in `aliases`. The result does not depend on merge order.
    pub fn absorb(&mut self, other: Component) {
        debug_assert_eq!(self.id, other.id);
        let mut paths: BTreeSet<String> = self.aliases.drain(..).collect();
        paths.extend(other.aliases.iter().cloned());
        paths.insert(other.path.clone());
        paths.insert(self.path.clone());

        if other.path < self.path {
            *self = Component {
                aliases: Vec::new(),
                ..other
            };
        }
        paths.remove(&self.path);
        self.aliases = paths.into_iter().collect();
    }
}

/// Hex-encoded SHA-256 of `bytes`; the component id.
#[must_use]
pub fn content_id(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    let mut out = String::with_capacity(digest.len() * 2);
    for b in digest {
        let _ = write!(out, "{b:02x}");
    }
    out
}
