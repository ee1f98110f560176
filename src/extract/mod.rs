//! Dialect extractors and the registry that picks one per file.
//!
//! Extraction is total: every extractor returns a [`FactSet`] for any input,
//! marking it `incomplete` when only part of the text could be understood.

pub mod common;
pub mod config;
pub mod markup;
pub mod script;

use std::collections::BTreeSet;
use std::path::Path;

use crate::capability::{is_role, CapabilityTable, SERVICE};
use crate::model::Dialect;

/// Bytes inspected when sniffing for binary content.
pub const BINARY_SNIFF_LEN: usize = 8192;

/// Facts recovered from one file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FactSet {
    /// Finer language label (`python`, `html`, `yaml`, ...).
    pub language: String,
    /// Every port literal: bindings and references.
    pub declared_ports: BTreeSet<u16>,
    /// Ports the file binds or exposes.
    pub listen_ports: BTreeSet<u16>,
    /// Referenced modules, first-seen order, deduplicated.
    pub imports: Vec<String>,
    /// Defined symbols, first-seen order, deduplicated.
    pub exports: Vec<String>,
    /// Capability tags.
    pub capabilities: BTreeSet<String>,
    /// Leading comment or docstring.
    pub purpose: Option<String>,
    /// Only part of the file was understood.
    pub incomplete: bool,
    /// Why.
    pub notes: Vec<String>,
}

impl FactSet {
    /// Empty fact set labelled with `language`.
    #[must_use]
    pub fn for_language(language: impl Into<String>) -> Self {
        Self {
            language: language.into(),
            ..Self::default()
        }
    }

    /// Adds an import unless it is empty or already present.
    pub fn add_import(&mut self, name: &str) {
        push_unique(&mut self.imports, name);
    }

    /// Adds an export unless it is empty or already present.
    pub fn add_export(&mut self, name: &str) {
        push_unique(&mut self.exports, name);
    }

    /// Records a port the file listens on.
    pub fn bind_port(&mut self, port: u16) {
        self.declared_ports.insert(port);
        self.listen_ports.insert(port);
    }

    /// Records a port the file merely mentions.
    pub fn reference_port(&mut self, port: u16) {
        self.declared_ports.insert(port);
    }

    /// Flags partial extraction with a reason.
    pub fn mark_incomplete(&mut self, note: impl Into<String>) {
        self.incomplete = true;
        let note = note.into();
        if !self.notes.contains(&note) {
            self.notes.push(note);
        }
    }
}

fn push_unique(list: &mut Vec<String>, value: &str) {
    let value = value.trim();
    if !value.is_empty() && !list.iter().any(|v| v == value) {
        list.push(value.to_string());
    }
}

/// What an extractor claims, for registry selection.
#[derive(Debug, Clone, Copy)]
pub struct Claims {
    /// Extensions without the leading dot; compound suffixes like `d.ts` allowed.
    pub extensions: &'static [&'static str],
    /// Exact file names (`Dockerfile`).
    pub file_names: &'static [&'static str],
    /// Interpreter name prefixes matched against a `#!` line.
    pub interpreters: &'static [&'static str],
}

/// Turns the text of one file into facts.
pub trait Extractor: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Dialect recorded on the resulting component.
    fn dialect(&self) -> Dialect;

    /// Files this extractor handles.
    fn claims(&self) -> Claims;

    /// Extracts facts. Never fails; partial results set `incomplete`.
    fn extract(&self, path: &Path, content: &str) -> FactSet;
}

/// Outcome of running the registry over one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    /// Dialect of the chosen extractor, or `Unknown`.
    pub dialect: Dialect,
    /// Extracted facts, capabilities included.
    pub facts: FactSet,
}

/// Ordered set of extractors plus the keyword table applied after them.
///
/// Selection order: exact file name, longest extension suffix (ties go to the
/// earlier extractor), `#!` interpreter, then nothing.
pub struct ExtractorRegistry {
    extractors: Vec<Box<dyn Extractor>>,
    capabilities: CapabilityTable,
}

impl ExtractorRegistry {
    /// Registry with the built-in script, markup, and config extractors, in that priority.
    #[must_use]
    pub fn new(capabilities: CapabilityTable) -> Self {
        Self::with_extractors(
            vec![
                Box::new(script::ScriptExtractor),
                Box::new(markup::MarkupExtractor),
                Box::new(config::ConfigExtractor),
            ],
            capabilities,
        )
    }

    /// Registry over an explicit extractor list, highest priority first.
    #[must_use]
    pub fn with_extractors(
        extractors: Vec<Box<dyn Extractor>>,
        capabilities: CapabilityTable,
    ) -> Self {
        Self {
            extractors,
            capabilities,
        }
    }

    /// Picks the extractor for `path`, peeking at `content` only for a `#!` line.
    #[must_use]
    pub fn select(&self, path: &Path, content: &str) -> Option<&dyn Extractor> {
        let name = path.file_name()?.to_string_lossy();
        let lower = name.to_lowercase();

        let by_name = |ex: &&Box<dyn Extractor>| {
            let names = ex.claims().file_names;
            names.iter().any(|f| f.eq_ignore_ascii_case(&name))
        };
        if let Some(ex) = self.extractors.iter().find(by_name) {
            return Some(ex.as_ref());
        }

        let mut best: Option<(&dyn Extractor, usize)> = None;
        for ex in &self.extractors {
            for ext in ex.claims().extensions {
                let suffix_len = ext.len() + 1;
                let matches = lower.len() > suffix_len
                    && lower.ends_with(ext)
                    && lower.as_bytes()[lower.len() - suffix_len] == b'.';
                if matches && best.map_or(true, |(_, len)| ext.len() > len) {
                    best = Some((ex.as_ref(), ext.len()));
                }
            }
        }
        if let Some((ex, _)) = best {
            return Some(ex);
        }

        let interpreter = common::shebang_interpreter(content)?;
        self.extractors
            .iter()
            .find(|ex| {
                let interpreters = ex.claims().interpreters;
                interpreters.iter().any(|i| interpreter.starts_with(i))
            })
            .map(|ex| ex.as_ref())
    }

    /// Decodes `bytes`, runs the selected extractor, and applies the keyword table.
    ///
    /// Invalid UTF-8 is decoded lossily and marks the result incomplete. Role
    /// tags only stick to scripts; a script that binds a port is a service.
    #[must_use]
    pub fn extract(&self, path: &Path, bytes: &[u8]) -> Extraction {
        let (content, lossy) = match std::str::from_utf8(bytes) {
            Ok(text) => (std::borrow::Cow::Borrowed(text), false),
            Err(_) => (String::from_utf8_lossy(bytes), true),
        };

        let (dialect, mut facts) = match self.select(path, &content) {
            Some(ex) => (ex.dialect(), ex.extract(path, &content)),
            None => {
                let mut facts = FactSet::for_language("unknown");
                common::scan_ports(&content, &mut facts);
                (Dialect::Unknown, facts)
            }
        };
        if lossy {
            facts.mark_incomplete("content is not valid UTF-8");
        }

        let runnable = dialect == Dialect::Script;
        let inferred = self.capabilities.infer(&content);
        let kept = inferred.into_iter().filter(|cap| runnable || !is_role(cap));
        facts.capabilities.extend(kept);
        if dialect == Dialect::Script && !facts.listen_ports.is_empty() {
            facts.capabilities.insert(SERVICE.to_string());
        }
        Extraction { dialect, facts }
    }
}

/// Returns `true` if the first [`BINARY_SNIFF_LEN`] bytes contain a NUL.
#[must_use]
pub fn looks_binary(bytes: &[u8]) -> bool {
    bytes.iter().take(BINARY_SNIFF_LEN).any(|&b| b == 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn registry() -> ExtractorRegistry {
        ExtractorRegistry::new(CapabilityTable::new([
            ("authentication", vec!["login"]),
            ("service", vec!["app.listen("]),
        ]))
    }

    fn selected(path: &str, content: &str) -> Option<&'static str> {
        registry().select(Path::new(path), content).map(|ex| ex.name())
    }

    #[test]
    fn selection_by_extension_name_and_shebang() {
        assert_eq!(selected("a/server.py", ""), Some("script"));
        assert_eq!(selected("index.HTML", ""), Some("markup"));
        assert_eq!(selected("settings.yaml", ""), Some("config"));
        assert_eq!(selected("Dockerfile", ""), Some("config"));
        assert_eq!(selected("bin/run", "#!/usr/bin/env python3\n"), Some("script"));
        assert_eq!(selected("LICENSE", "MIT"), None);
        assert_eq!(selected(".py", ""), None);
    }

    #[test]
    fn compound_suffix_beats_short_one() {
        struct Decl;
        impl Extractor for Decl {
            fn name(&self) -> &'static str {
                "decl"
            }
            fn dialect(&self) -> Dialect {
                Dialect::Config
            }
            fn claims(&self) -> Claims {
                Claims {
                    extensions: &["d.ts"],
                    file_names: &[],
                    interpreters: &[],
                }
            }
            fn extract(&self, _: &Path, _: &str) -> FactSet {
                FactSet::for_language("decl")
            }
        }
        let registry = ExtractorRegistry::with_extractors(
            vec![Box::new(script::ScriptExtractor), Box::new(Decl)],
            CapabilityTable::default(),
        );
        let pick = |p: &str| registry.select(Path::new(p), "").map(|ex| ex.name());
        assert_eq!(pick("types.d.ts"), Some("decl"));
        assert_eq!(pick("types.ts"), Some("script"));
    }

    #[test]
    fn script_binding_a_port_is_a_service() {
        let ex = registry().extract(Path::new("a.py"), b"port=8080\n");
        assert_eq!(ex.dialect, Dialect::Script);
        assert!(ex.facts.capabilities.contains(SERVICE));
        assert_eq!(ex.facts.listen_ports.iter().copied().collect::<Vec<_>>(), vec![8080]);
    }

    #[test]
    fn config_binding_a_port_is_not_a_service() {
        let ex = registry().extract(Path::new("settings.ini"), b"port=8080\n");
        assert_eq!(ex.dialect, Dialect::Config);
        assert!(!ex.facts.capabilities.contains(SERVICE));
    }

    #[test]
    fn documentation_never_carries_role_tags() {
        let readme =
            registry().extract(Path::new("README.md"), b"Start with `app.listen(3000)`.\n");
        assert_eq!(readme.dialect, Dialect::Markup);
        assert!(!readme.facts.capabilities.contains(SERVICE));

        let notes = registry().extract(Path::new("NOTES"), b"app.listen(3000)");
        assert!(!notes.facts.capabilities.contains(SERVICE));

        let server = registry().extract(Path::new("server.js"), b"app.listen(3000);\n");
        assert!(server.facts.capabilities.contains(SERVICE));
    }

    #[test]
    fn unknown_files_still_yield_ports_and_capabilities() {
        let ex = registry().extract(Path::new("NOTES"), b"login at http://localhost:9000");
        assert_eq!(ex.dialect, Dialect::Unknown);
        assert!(ex.facts.declared_ports.contains(&9000));
        assert!(ex.facts.capabilities.contains("authentication"));
    }

    #[test]
    fn invalid_utf8_is_lossy_and_incomplete() {
        let ex = registry().extract(Path::new("a.py"), b"def login():\n    x = '\xff'\n");
        assert!(ex.facts.incomplete);
        assert!(ex.facts.exports.contains(&"login".to_string()));
    }

    #[test]
    fn binary_sniffing() {
        assert!(looks_binary(b"\x7fELF\0\0"));
        assert!(!looks_binary(b"plain text"));
    }

    #[test]
    fn fact_set_deduplicates() {
        let mut facts = FactSet::default();
        facts.add_import("os");
        facts.add_import(" os ");
        facts.add_import("");
        facts.mark_incomplete("x");
        facts.mark_incomplete("x");
        assert_eq!(facts.imports, vec!["os"]);
        assert_eq!(facts.notes, vec!["x"]);
    }
}
