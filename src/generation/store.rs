//! Generation store: persisted scan output under the `--out` directory.
//!
//! All I/O goes through `ctx.fs`. Layout:
//!
//! ```text
//! <dir>/
//!   ├── components.json
//!   ├── relationships.json
//!   ├── findings.json
//!   ├── topology/
//!   │   ├── proxy.conf
//!   │   └── manifest.yaml
//!   └── generations/
//!       ├── index.json
//!       └── <id>/generation.json
//! ```
//!
//! The top-level files always describe the latest generation and are
//! overwritten on every save.

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info};

use super::{Generation, GenerationEntry};
use crate::context::ServiceContext;
use crate::error::{CartographError, Result};
use crate::synth::{manifest, proxy};

/// Alias for the most recent generation.
pub const LATEST: &str = "latest";
/// Alias for the generation before the most recent one.
pub const PREVIOUS: &str = "previous";

const GENERATIONS_DIR: &str = "generations";
const INDEX_FILE: &str = "index.json";
const GENERATION_FILE: &str = "generation.json";

/// Reads and writes generations below one output directory.
pub struct GenerationStore<'a> {
    ctx: &'a ServiceContext,
    dir: PathBuf,
}

impl<'a> GenerationStore<'a> {
    /// Creates a store rooted at `dir`.
    #[must_use]
    pub fn new(ctx: &'a ServiceContext, dir: &Path) -> Self {
        Self {
            ctx,
            dir: dir.to_path_buf(),
        }
    }

    /// Output directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Writes the latest-state files and appends `generation` to the index.
    ///
    /// # Errors
    ///
    /// Returns [`CartographError::Serialization`] if encoding fails and
    /// [`CartographError::Io`] if a write fails.
    pub fn save(&self, generation: &Generation) -> Result<()> {
        let dir = &self.dir;
        self.write_json(&dir.join("components.json"), &generation.components)?;
        self.write_json(&dir.join("relationships.json"), &generation.relationships)?;
        self.write_json(&dir.join("findings.json"), &generation.findings)?;

        let proxy_conf = proxy::render(&generation.topology);
        let manifest_yaml = manifest::render(&generation.topology)?;
        let topology_dir = dir.join("topology");
        self.write(&topology_dir.join("proxy.conf"), &proxy_conf)?;
        self.write(&topology_dir.join("manifest.yaml"), &manifest_yaml)?;

        self.write_json(&self.generation_path(&generation.id), generation)?;
        let mut index = self.list()?;
        index.retain(|e| e.id != generation.id);
        index.push(generation.entry());
        self.write_json(&self.index_path(), &index)?;

        info!(dir = %self.dir.display(), generation = %generation.id, "artifacts written");
        Ok(())
    }

    /// Every recorded generation, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`CartographError::Serialization`] if the index is corrupt.
    pub fn list(&self) -> Result<Vec<GenerationEntry>> {
        let path = self.index_path();
        if !self.ctx.fs.exists(&path) {
            return Ok(Vec::new());
        }
        self.read_json(&path)
    }

    /// Turns an id, unique id prefix, [`LATEST`], or [`PREVIOUS`] into a
    /// full generation id.
    ///
    /// # Errors
    ///
    /// Returns [`CartographError::State`] when nothing has been recorded or a
    /// prefix is ambiguous, and [`CartographError::UnknownGeneration`] when the
    /// reference matches nothing.
    pub fn resolve(&self, reference: &str) -> Result<String> {
        let index = self.list()?;
        if index.is_empty() {
            return Err(CartographError::State(format!(
                "no generations recorded in {}; run `cartograph scan` first",
                self.dir.display()
            )));
        }

        let by_position = |back: usize| {
            index
                .len()
                .checked_sub(back + 1)
                .and_then(|i| index.get(i))
                .map(|e| e.id.clone())
                .ok_or_else(|| CartographError::UnknownGeneration(reference.to_string()))
        };
        match reference {
            LATEST => return by_position(0),
            PREVIOUS => return by_position(1),
            _ => {}
        }

        if let Some(exact) = index.iter().find(|e| e.id == reference) {
            return Ok(exact.id.clone());
        }
        let matches: Vec<&GenerationEntry> = index
            .iter()
            .filter(|e| e.id.starts_with(reference))
            .collect();
        match matches.as_slice() {
            [one] => Ok(one.id.clone()),
            [] => Err(CartographError::UnknownGeneration(reference.to_string())),
            many => Err(CartographError::State(format!(
                "generation prefix '{reference}' is ambiguous ({} matches)",
                many.len()
            ))),
        }
    }

    /// Loads a generation by reference (see [`GenerationStore::resolve`]).
    ///
    /// # Errors
    ///
    /// Returns the resolution error, or [`CartographError::State`] if the
    /// generation file is missing.
    pub fn load(&self, reference: &str) -> Result<Generation> {
        let id = self.resolve(reference)?;
        let path = self.generation_path(&id);
        if !self.ctx.fs.exists(&path) {
            return Err(CartographError::State(format!(
                "generation {id} is listed but {} is missing",
                path.display()
            )));
        }
        debug!(generation = %id, "loading generation");
        self.read_json(&path)
    }

    fn generation_path(&self, id: &str) -> PathBuf {
        self.dir.join(GENERATIONS_DIR).join(id).join(GENERATION_FILE)
    }

    fn index_path(&self) -> PathBuf {
        self.dir.join(GENERATIONS_DIR).join(INDEX_FILE)
    }

    fn write_json<T: Serialize + ?Sized>(&self, path: &Path, value: &T) -> Result<()> {
        let mut json = serde_json::to_string_pretty(value)
            .map_err(|e| CartographError::serialization(path.display().to_string(), e))?;
        json.push('\n');
        self.write(path, &json)
    }

    fn read_json<T: DeserializeOwned>(&self, path: &Path) -> Result<T> {
        let contents = self
            .ctx
            .fs
            .read_to_string(path)
            .map_err(|e| CartographError::io(path, e))?;
        serde_json::from_str(&contents)
            .map_err(|e| CartographError::serialization(path.display().to_string(), e))
    }

    fn write(&self, path: &Path, contents: &str) -> Result<()> {
        self.ctx
            .fs
            .write(path, contents)
            .map_err(|e| CartographError::io(path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::MemoryFileSystem;
    use crate::generation::fixtures::generation;
    use crate::model::fixtures::component;
    use chrono::Utc;
    use pretty_assertions::assert_eq;

    fn ctx() -> ServiceContext {
        ServiceContext::in_memory(MemoryFileSystem::new(), Utc::now())
    }

    #[test]
    fn save_writes_every_artifact() {
        let ctx = ctx();
        let store = GenerationStore::new(&ctx, Path::new("/out"));
        let gen = generation("g1", vec![component("a.py", "a")], Vec::new());
        store.save(&gen).unwrap();

        for file in [
            "components.json",
            "relationships.json",
            "findings.json",
            "topology/proxy.conf",
            "topology/manifest.yaml",
            "generations/index.json",
            "generations/g1/generation.json",
        ] {
            assert!(ctx.fs.exists(&Path::new("/out").join(file)), "missing {file}");
        }
        let components = ctx.fs.read_to_string(Path::new("/out/components.json")).unwrap();
        assert!(components.ends_with("]\n"));
    }

    #[test]
    fn save_and_load_round_trips() {
        let ctx = ctx();
        let store = GenerationStore::new(&ctx, Path::new("/out"));
        let gen = generation("g1", vec![component("a.py", "a")], Vec::new());
        store.save(&gen).unwrap();

        assert_eq!(store.load("g1").unwrap(), gen);
        assert_eq!(store.load(LATEST).unwrap(), gen);
    }

    #[test]
    fn resolves_aliases_and_prefixes() {
        let ctx = ctx();
        let store = GenerationStore::new(&ctx, Path::new("/out"));
        for id in ["abc-1", "abd-2", "xyz-3"] {
            store.save(&generation(id, Vec::new(), Vec::new())).unwrap();
        }

        assert_eq!(store.resolve(LATEST).unwrap(), "xyz-3");
        assert_eq!(store.resolve(PREVIOUS).unwrap(), "abd-2");
        assert_eq!(store.resolve("x").unwrap(), "xyz-3");
        assert_eq!(store.resolve("abc-1").unwrap(), "abc-1");
        assert!(matches!(store.resolve("ab"), Err(CartographError::State(_))));
        assert!(matches!(
            store.resolve("nope"),
            Err(CartographError::UnknownGeneration(_))
        ));
        assert_eq!(store.list().unwrap().len(), 3);
    }

    #[test]
    fn empty_store_is_a_state_error() {
        let ctx = ctx();
        let store = GenerationStore::new(&ctx, Path::new("/out"));
        assert!(store.list().unwrap().is_empty());
        assert!(matches!(store.load(LATEST), Err(CartographError::State(_))));
    }

    #[test]
    fn previous_needs_two_generations() {
        let ctx = ctx();
        let store = GenerationStore::new(&ctx, Path::new("/out"));
        store.save(&generation("only", Vec::new(), Vec::new())).unwrap();
        assert!(matches!(
            store.resolve(PREVIOUS),
            Err(CartographError::UnknownGeneration(_))
        ));
    }

    #[test]
    fn corrupt_index_is_a_serialization_error() {
        let fs =
            MemoryFileSystem::with_files([("/out/generations/index.json", "{not json")]);
        let ctx = ServiceContext::in_memory(fs, Utc::now());
        let store = GenerationStore::new(&ctx, Path::new("/out"));
        assert!(matches!(
            store.list(),
            Err(CartographError::Serialization { .. })
        ));
    }
}
