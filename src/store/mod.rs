//! Metadata store: the scan's table of components, keyed by content hash.
//!
//! Secondary indexes by port, listening port, capability, and path are kept
//! in step with every upsert, so lookups cost time proportional to the
//! matching subset. The store is written only during the scan; afterwards it
//! is read-only.

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use crate::model::Component;

/// What [`MetadataStore::upsert`] did with a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    /// First record with this id.
    Inserted,
    /// Same id and path already stored; nothing changed.
    Unchanged,
    /// Same id under another path; the paths were merged into one component.
    Merged,
}

/// Components by id plus lookup indexes.
#[derive(Debug, Default, Clone)]
pub struct MetadataStore {
    components: BTreeMap<String, Component>,
    by_port: BTreeMap<u16, BTreeSet<String>>,
    by_listen_port: BTreeMap<u16, BTreeSet<String>>,
    by_capability: BTreeMap<String, BTreeSet<String>>,
    by_path: BTreeMap<String, String>,
}

impl MetadataStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a store from already-extracted components.
    pub fn from_components(components: impl IntoIterator<Item = Component>) -> Self {
        let mut store = Self::new();
        for component in components {
            store.upsert(component);
        }
        store
    }

    /// Inserts a component. Idempotent on `id`: re-inserting the same record is
    /// a no-op, and a record with a known id but a new path is folded in as an alias.
    pub fn upsert(&mut self, component: Component) -> Upsert {
        let Some(existing) = self.components.get_mut(&component.id) else {
            self.index(&component);
            self.components.insert(component.id.clone(), component);
            return Upsert::Inserted;
        };
        if existing.all_paths().any(|p| p == component.path) {
            return Upsert::Unchanged;
        }

        debug!(
            id = %component.id,
            path = %component.path,
            canonical = %existing.path,
            "collapsing duplicate content"
        );
        let id = component.id.clone();
        existing.absorb(component);
        if let Some(merged) = self.components.remove(&id) {
            self.unindex(&merged);
            self.index(&merged);
            self.components.insert(id, merged);
        }
        Upsert::Merged
    }

    /// Looks up a component by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Component> {
        self.components.get(id)
    }

    /// Looks up a component by canonical path or alias.
    #[must_use]
    pub fn by_path(&self, path: &str) -> Option<&Component> {
        self.by_path
            .get(path)
            .and_then(|id| self.components.get(id))
    }

    /// Components mentioning `port`, sorted by id.
    pub fn with_port(&self, port: u16) -> impl Iterator<Item = &Component> {
        self.lookup(self.by_port.get(&port))
    }

    /// Components binding `port`, sorted by id.
    pub fn listening_on(&self, port: u16) -> impl Iterator<Item = &Component> {
        self.lookup(self.by_listen_port.get(&port))
    }

    /// Components tagged with `capability`, sorted by id.
    pub fn with_capability(&self, capability: &str) -> impl Iterator<Item = &Component> {
        self.lookup(self.by_capability.get(capability))
    }

    /// Every port mentioned anywhere, with the ids mentioning it.
    pub fn ports(&self) -> impl Iterator<Item = (u16, &BTreeSet<String>)> {
        self.by_port.iter().map(|(port, ids)| (*port, ids))
    }

    /// Every capability present, with the ids carrying it.
    pub fn capabilities(&self) -> impl Iterator<Item = (&str, &BTreeSet<String>)> {
        self.by_capability.iter().map(|(cap, ids)| (cap.as_str(), ids))
    }

    /// All components, sorted by id.
    pub fn iter(&self) -> impl Iterator<Item = &Component> {
        self.components.values()
    }

    /// Components matching `predicate`, sorted by id.
    pub fn query<'a>(
        &'a self,
        predicate: impl Fn(&Component) -> bool + 'a,
    ) -> impl Iterator<Item = &'a Component> + 'a {
        self.components.values().filter(move |&c| predicate(c))
    }

    /// Number of distinct components.
    #[must_use]
    pub fn len(&self) -> usize {
        self.components.len()
    }

    /// Returns `true` if nothing has been stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Consumes the store, yielding components sorted by id.
    #[must_use]
    pub fn into_components(self) -> Vec<Component> {
        self.components.into_values().collect()
    }

    fn lookup<'a>(
        &'a self,
        ids: Option<&'a BTreeSet<String>>,
    ) -> impl Iterator<Item = &'a Component> + 'a {
        ids.into_iter()
            .flatten()
            .filter_map(|id| self.components.get(id))
    }

    fn index(&mut self, c: &Component) {
        for port in &c.declared_ports {
            self.by_port.entry(*port).or_default().insert(c.id.clone());
        }
        for port in &c.listen_ports {
            self.by_listen_port
                .entry(*port)
                .or_default()
                .insert(c.id.clone());
        }
        for cap in &c.capabilities {
            self.by_capability
                .entry(cap.clone())
                .or_default()
                .insert(c.id.clone());
        }
        for path in c.all_paths() {
            self.by_path.insert(path.to_string(), c.id.clone());
        }
    }

    fn unindex(&mut self, c: &Component) {
        fn remove<K: Ord>(index: &mut BTreeMap<K, BTreeSet<String>>, id: &str) {
            index.retain(|_, ids| {
                ids.remove(id);
                !ids.is_empty()
            });
        }
        remove(&mut self.by_port, &c.id);
        remove(&mut self.by_listen_port, &c.id);
        remove(&mut self.by_capability, &c.id);
        self.by_path.retain(|_, id| *id != c.id);
    }
}
