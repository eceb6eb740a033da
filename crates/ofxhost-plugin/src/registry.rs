//! Plugin registry: lookups by identifier, by identifier and major
//! version, and by label.
//!
//! Several plugins may share an identifier. Lookups pick the "current"
//! one: the highest version, then a statically linked plugin, then the
//! plugin whose binary sits under the earliest search root.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::api::HostedPlugin;

/// A confirmed plugin with its precedence data.
#[derive(Clone)]
pub struct RegistryEntry {
    /// The plugin.
    pub plugin: Arc<dyn HostedPlugin>,
    /// Index of the first search root containing the binary.
    pub rank: usize,
    /// Whether the plugin is linked into the host.
    pub is_static: bool,
}

impl RegistryEntry {
    fn version(&self) -> (u32, u32) {
        let record = self.plugin.record();
        (record.version_major(), record.version_minor())
    }

    fn is_available(&self) -> bool {
        self.plugin.is_usable() && self.plugin.is_enabled()
    }

    /// Whether `self` takes precedence over `other`.
    pub fn trumps(&self, other: &RegistryEntry) -> bool {
        match self.version().cmp(&other.version()) {
            Ordering::Greater => true,
            Ordering::Less => false,
            Ordering::Equal => match (self.is_static, other.is_static) {
                (true, false) => true,
                (false, true) => false,
                _ => self.rank < other.rank,
            },
        }
    }
}

impl fmt::Debug for RegistryEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let record = self.plugin.record();
        f.debug_struct("RegistryEntry")
            .field("identifier", &record.identifier())
            .field("version", &record.version_label())
            .field("rank", &self.rank)
            .field("is_static", &self.is_static)
            .finish()
    }
}

/// Indices over confirmed plugins.
#[derive(Debug, Default)]
pub struct PluginRegistry {
    entries: Vec<RegistryEntry>,
    by_id: BTreeMap<String, Vec<usize>>,
    by_id_major: BTreeMap<(String, u32), Vec<usize>>,
}

impl PluginRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget every plugin.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.by_id.clear();
        self.by_id_major.clear();
    }

    /// Register a confirmed plugin.
    pub fn insert(&mut self, plugin: Arc<dyn HostedPlugin>, rank: usize, is_static: bool) {
        let record = plugin.record();
        let id = record.identifier().to_string();
        let major = record.version_major();
        debug!(plugin_id = %id, version = %record.version_label(), rank, is_static, "Registering plugin");

        let index = self.entries.len();
        self.by_id.entry(id.clone()).or_default().push(index);
        self.by_id_major.entry((id, major)).or_default().push(index);
        self.entries.push(RegistryEntry {
            plugin,
            rank,
            is_static,
        });
    }

    /// Number of registered plugins.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Every registered plugin, in registration order.
    pub fn entries(&self) -> &[RegistryEntry] {
        &self.entries
    }

    /// Every registered plugin that is usable and enabled.
    pub fn plugins(&self) -> Vec<Arc<dyn HostedPlugin>> {
        self.entries
            .iter()
            .filter(|entry| entry.is_available())
            .map(|entry| Arc::clone(&entry.plugin))
            .collect()
    }

    /// The current plugin for `id`.
    ///
    /// `major` and `minor`, when given, must match exactly.
    pub fn get_by_id(
        &self,
        id: &str,
        major: Option<u32>,
        minor: Option<u32>,
    ) -> Option<Arc<dyn HostedPlugin>> {
        let indices = self.by_id.get(id)?;
        self.best(indices.iter().map(|&index| &self.entries[index]), major, minor)
    }

    /// The current plugin whose label is `label`.
    pub fn get_by_label(
        &self,
        label: &str,
        major: Option<u32>,
        minor: Option<u32>,
    ) -> Option<Arc<dyn HostedPlugin>> {
        self.best(
            self.entries
                .iter()
                .filter(|entry| entry.plugin.label() == label),
            major,
            minor,
        )
    }

    /// Identifier → current plugin.
    pub fn current_by_id(&self) -> BTreeMap<String, Arc<dyn HostedPlugin>> {
        self.by_id
            .iter()
            .filter_map(|(id, indices)| {
                self.best(indices.iter().map(|&index| &self.entries[index]), None, None)
                    .map(|plugin| (id.clone(), plugin))
            })
            .collect()
    }

    /// (identifier, major) → current plugin.
    pub fn current_by_id_major(&self) -> BTreeMap<(String, u32), Arc<dyn HostedPlugin>> {
        self.by_id_major
            .iter()
            .filter_map(|(key, indices)| {
                self.best(indices.iter().map(|&index| &self.entries[index]), None, None)
                    .map(|plugin| (key.clone(), plugin))
            })
            .collect()
    }

    /// Every version registered under `id`, current first.
    pub fn versions(&self, id: &str) -> Vec<Arc<dyn HostedPlugin>> {
        let Some(indices) = self.by_id.get(id) else {
            return Vec::new();
        };
        let mut entries: Vec<&RegistryEntry> =
            indices.iter().map(|&index| &self.entries[index]).collect();
        entries.sort_by(|a, b| {
            if a.trumps(b) {
                Ordering::Less
            } else if b.trumps(a) {
                Ordering::Greater
            } else {
                Ordering::Equal
            }
        });
        entries
            .into_iter()
            .map(|entry| Arc::clone(&entry.plugin))
            .collect()
    }

    fn best<'a>(
        &self,
        candidates: impl Iterator<Item = &'a RegistryEntry>,
        major: Option<u32>,
        minor: Option<u32>,
    ) -> Option<Arc<dyn HostedPlugin>> {
        candidates
            .filter(|entry| entry.is_available())
            .filter(|entry| {
                let (entry_major, entry_minor) = entry.version();
                major.is_none_or(|m| m == entry_major) && minor.is_none_or(|m| m == entry_minor)
            })
            .fold(None, |best: Option<&RegistryEntry>, entry| match best {
                Some(current) if !entry.trumps(current) => Some(current),
                _ => Some(entry),
            })
            .map(|entry| Arc::clone(&entry.plugin))
    }
}
