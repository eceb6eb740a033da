//! Plugin discovery, the on-disk cache and the plugin registry.
//!
//! A [`PluginCache`] is built once per process:
//!
//! 1. search roots and API handlers are registered,
//! 2. the cache file is read ([`PluginCache::load_cache_file`]),
//! 3. [`PluginCache::scan_plugin_files`] reconciles the cache with disk,
//!    describing only new or changed binaries,
//! 4. the cache file is rewritten if anything changed
//!    ([`PluginCache::save_cache_file`]).
//!
//! After the scan the cache is only queried.

pub mod scan;
pub mod xml;

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use ofxhost_core::error::{ErrorKind, HostError};
use ofxhost_core::result::HostResult;

use crate::api::{HostedPlugin, PluginApiHandler, find_handler};
use crate::binary::{BinaryInfo, PluginBinary, StaticPlugins};
use crate::image_effect::ImageEffectPlugin;
use crate::library::LibraryBackend;
use crate::plugin::Plugin;
use crate::registry::PluginRegistry;

use self::scan::FoundBinary;
use self::xml::{CacheDocument, CachedBinary, CachedBundle, CachedPlugin, CachedProperty};

/// One search root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchPath {
    /// Directory searched.
    pub path: PathBuf,
    /// Whether sub-directories are searched too.
    pub recursive: bool,
}

/// What a scan did.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScanReport {
    /// Binaries known after the scan.
    pub binaries: usize,
    /// Binaries seen for the first time.
    pub new_binaries: usize,
    /// Cached binaries whose file changed.
    pub changed_binaries: usize,
    /// Cached binaries no longer on disk.
    pub dropped_binaries: usize,
    /// Binaries that cannot be opened or lack an export.
    pub invalid_binaries: Vec<PathBuf>,
    /// Plugins registered for lookup.
    pub plugins: usize,
    /// `(identifier, reason)` for plugins the host refused.
    pub unsupported: Vec<(String, String)>,
}

struct StaticTable {
    plugins: StaticPlugins,
    host_binary: PathBuf,
}

/// Discovered plugin binaries and the registry built from them.
pub struct PluginCache {
    backend: Arc<dyn LibraryBackend>,
    handlers: Vec<Arc<dyn PluginApiHandler>>,
    search_paths: Vec<SearchPath>,
    registry: PluginRegistry,
    binaries: Vec<PluginBinary>,
    known_bin_files: HashSet<PathBuf>,
    cache_version: String,
    dirty: bool,
    scanned: bool,
    static_table: Option<StaticTable>,
    plugin_dirs: Vec<PathBuf>,
    seek_enabled: bool,
}

impl PluginCache {
    /// An empty cache opening libraries through `backend`.
    pub fn new(backend: Arc<dyn LibraryBackend>) -> Self {
        Self {
            backend,
            handlers: Vec::new(),
            search_paths: Vec::new(),
            registry: PluginRegistry::new(),
            binaries: Vec::new(),
            known_bin_files: HashSet::new(),
            cache_version: String::new(),
            dirty: false,
            scanned: false,
            static_table: None,
            plugin_dirs: Vec::new(),
            seek_enabled: false,
        }
    }

    /// Serve plugins of the handler's API.
    pub fn register_api_handler(&mut self, handler: Arc<dyn PluginApiHandler>) {
        debug!(api = %handler.api(), "Registered plugin API handler");
        self.handlers.push(handler);
    }

    /// Version tag written to, and required from, the cache file.
    pub fn set_cache_version(&mut self, version: impl Into<String>) {
        self.cache_version = version.into();
    }

    /// The cache version tag.
    pub fn cache_version(&self) -> &str {
        &self.cache_version
    }

    /// Append a search root.
    pub fn add_search_path(&mut self, path: impl Into<PathBuf>, recursive: bool) {
        self.insert_search_path(path.into(), recursive, false);
    }

    /// Insert a search root ahead of every other.
    pub fn prepend_search_path(&mut self, path: impl Into<PathBuf>, recursive: bool) {
        self.insert_search_path(path.into(), recursive, true);
    }

    /// Append every root listed in the environment variable `var`.
    pub fn add_paths_from_env(&mut self, var: &str) {
        let Ok(value) = std::env::var(var) else {
            debug!(var, "Plugin path variable is not set");
            return;
        };
        for path in scan::split_path_list(&value) {
            self.add_search_path(path, true);
        }
    }

    /// Append the platform-standard plugin directory.
    pub fn add_standard_locations(&mut self) {
        self.add_search_path(scan::standard_location(), true);
    }

    /// Append the plugin directory reserved for `host_id`.
    pub fn set_plugin_host_path(&mut self, host_id: &str) {
        self.add_search_path(scan::host_location(host_id), true);
    }

    /// Plugins linked into the host executable at `host_binary`.
    pub fn set_static_plugins(&mut self, plugins: StaticPlugins, host_binary: impl Into<PathBuf>) {
        self.static_table = Some(StaticTable {
            plugins,
            host_binary: host_binary.into(),
        });
    }

    /// Remember scanned directories for [`seek_plugin_file`](Self::seek_plugin_file).
    pub fn set_plugin_seek(&mut self, enabled: bool) {
        self.seek_enabled = enabled;
    }

    fn insert_search_path(&mut self, path: PathBuf, recursive: bool, front: bool) {
        if self.scanned {
            warn!(path = %path.display(), "Search path added after scanning is ignored");
            return;
        }
        if self.search_paths.iter().any(|existing| existing.path == path) {
            return;
        }
        let entry = SearchPath { path, recursive };
        if front {
            self.search_paths.insert(0, entry);
        } else {
            self.search_paths.push(entry);
        }
    }

    // ── cache file ──────────────────────────────────────────────

    /// Seed binaries and plugins from cache file text.
    ///
    /// Returns whether the cache was used. Malformed text, a different
    /// version tag or more than one static binary make the whole cache
    /// ignored.
    pub fn read_cache(&mut self, text: &str) -> bool {
        let document = match CacheDocument::parse(text) {
            Ok(document) => document,
            Err(e) => {
                warn!(error = %e, "Ignoring malformed plugin cache");
                self.dirty = true;
                return false;
            }
        };
        if document.version != self.cache_version {
            info!(
                found = %document.version,
                expected = %self.cache_version,
                "Ignoring plugin cache written by another version"
            );
            self.dirty = true;
            return false;
        }
        let static_count = document.bundles.iter().filter(|b| b.binary.is_static).count();
        if static_count > 1 {
            warn!(static_count, "Ignoring plugin cache with several static binaries");
            self.dirty = true;
            return false;
        }

        for bundle in document.bundles {
            self.seed_bundle(bundle);
        }
        info!(binaries = self.binaries.len(), "Plugin cache loaded");
        true
    }

    fn seed_bundle(&mut self, bundle: CachedBundle) {
        let CachedBundle { binary, plugins } = bundle;
        let path = PathBuf::from(&binary.path);

        let info = if binary.is_static {
            match &self.static_table {
                Some(table) if table.host_binary == path => {
                    BinaryInfo::statically_linked(path.clone(), table.plugins)
                }
                _ => {
                    debug!(path = %path.display(), "Dropping cached static binary");
                    self.dirty = true;
                    return;
                }
            }
        } else {
            BinaryInfo::dynamic(
                path.clone(),
                PathBuf::from(&binary.bundle_path),
                Arc::clone(&self.backend),
            )
        };
        if self.known_bin_files.contains(&path) {
            return;
        }

        let mut seeded = PluginBinary::from_cache(Arc::new(info), binary.stamp);
        if binary.invalid {
            seeded.restore_invalid();
            if seeded.is_changed() {
                self.dirty = true;
            }
        }
        for cached in plugins {
            let Some(handler) = find_handler(&self.handlers, &cached.api, cached.api_version)
            else {
                debug!(plugin_id = %cached.identifier, api = %cached.api, "No handler for cached plugin");
                self.dirty = true;
                continue;
            };
            let handler = Arc::clone(handler);
            let record = Plugin::new(
                Arc::clone(seeded.info()),
                cached.index,
                cached.api,
                cached.api_version,
                cached.identifier,
                cached.version_major,
                cached.version_minor,
            );
            let plugin = match handler.new_plugin(record) {
                Ok(plugin) => plugin,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Dropping cached plugin");
                    self.dirty = true;
                    continue;
                }
            };
            for property in &cached.properties {
                if let Err(e) = plugin.properties().restore(
                    &property.name,
                    property.kind,
                    property.dimension,
                    &property.values,
                ) {
                    warn!(
                        plugin_id = %plugin.record().identifier(),
                        property = %property.name,
                        error = %e,
                        "Ignoring cached property"
                    );
                }
            }
            seeded.add_plugin(plugin, handler);
        }

        self.known_bin_files.insert(path);
        self.binaries.push(seeded);
    }

    /// Read the cache file at `path`.
    ///
    /// A missing file is not an error; it returns `Ok(false)`.
    pub fn load_cache_file(&mut self, path: &Path) -> HostResult<bool> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No plugin cache file");
                return Ok(false);
            }
            Err(e) => {
                return Err(HostError::with_source(
                    ErrorKind::Cache,
                    format!("cannot read plugin cache '{}'", path.display()),
                    e,
                ));
            }
        };
        Ok(self.read_cache(&text))
    }

    /// The cache as an XML document.
    ///
    /// Invalid binaries are kept, flagged and without plugins, so they
    /// are not opened again until their file changes. Plugins whose
    /// `Load` or `Describe` failed and pointer properties are left out.
    pub fn cache_document(&self) -> CacheDocument {
        let mut document = CacheDocument::new(self.cache_version.clone());
        for binary in &self.binaries {
            let plugins = binary
                .plugins()
                .filter(|plugin| plugin.is_usable())
                .map(|plugin| {
                    let record = plugin.record();
                    CachedPlugin {
                        identifier: record.raw_identifier().to_string(),
                        index: record.index(),
                        api: record.api().to_string(),
                        api_version: record.api_version(),
                        version_major: record.version_major(),
                        version_minor: record.version_minor(),
                        properties: plugin
                            .properties()
                            .snapshot()
                            .into_iter()
                            .filter_map(CachedProperty::from_snapshot)
                            .collect(),
                    }
                })
                .collect();
            document.bundles.push(CachedBundle {
                binary: CachedBinary {
                    is_static: binary.is_static(),
                    path: binary.file_path().to_string_lossy().into_owned(),
                    bundle_path: binary.bundle_path().to_string_lossy().into_owned(),
                    stamp: binary.stamp(),
                    invalid: binary.is_invalid(),
                },
                plugins,
            });
        }
        document
    }

    /// The cache as XML text.
    pub fn write_cache(&self) -> String {
        self.cache_document().to_xml()
    }

    /// Write the cache file if anything changed since it was read.
    ///
    /// Returns whether the file was written.
    pub fn save_cache_file(&mut self, path: &Path) -> HostResult<bool> {
        if !self.dirty {
            debug!(path = %path.display(), "Plugin cache unchanged");
            return Ok(false);
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.write_cache())?;
        self.dirty = false;
        info!(path = %path.display(), binaries = self.binaries.len(), "Plugin cache written");
        Ok(true)
    }

    /// Forget every binary and plugin; the next save rewrites the file.
    pub fn clear(&mut self) {
        self.registry.clear();
        self.binaries.clear();
        self.known_bin_files.clear();
        self.plugin_dirs.clear();
        self.scanned = false;
        self.dirty = true;
    }

    // ── scanning ────────────────────────────────────────────────

    /// Reconcile the cache with the search roots and build the registry.
    ///
    /// Broken binaries and plugins are logged and reported, never
    /// returned as errors.
    pub fn scan_plugin_files(&mut self) -> ScanReport {
        let mut report = ScanReport::default();

        let mut found = Vec::new();
        self.plugin_dirs.clear();
        for root in &self.search_paths {
            scan::scan_directory(&root.path, root.recursive, &mut found, &mut self.plugin_dirs);
        }
        let found_paths: HashSet<PathBuf> =
            found.iter().map(|binary| binary.file_path.clone()).collect();

        let before = self.binaries.len();
        self.binaries
            .retain(|binary| binary.is_static() || found_paths.contains(binary.file_path()));
        report.dropped_binaries = before - self.binaries.len();
        if report.dropped_binaries > 0 {
            self.dirty = true;
        }
        self.known_bin_files = self
            .binaries
            .iter()
            .map(|binary| binary.file_path().to_path_buf())
            .collect();

        for binary in self.binaries.iter_mut().filter(|binary| binary.is_changed()) {
            info!(path = %binary.file_path().display(), "Plugin binary changed, describing again");
            binary.load_plugin_info(&self.handlers);
            describe_all(binary);
            binary.mark_current();
            report.changed_binaries += 1;
            self.dirty = true;
        }

        for FoundBinary {
            file_path,
            bundle_path,
        } in found
        {
            if self.known_bin_files.contains(&file_path) {
                continue;
            }
            let info = BinaryInfo::dynamic(file_path.clone(), bundle_path, Arc::clone(&self.backend));
            let mut binary = PluginBinary::cold(Arc::new(info), &self.handlers);
            describe_all(&binary);
            binary.mark_current();
            self.known_bin_files.insert(file_path);
            self.binaries.push(binary);
            report.new_binaries += 1;
            self.dirty = true;
        }

        let has_static = self.binaries.iter().any(PluginBinary::is_static);
        if let Some(table) = self.static_table.as_ref().filter(|_| !has_static) {
            let info = BinaryInfo::statically_linked(table.host_binary.clone(), table.plugins);
            let mut binary = PluginBinary::cold(Arc::new(info), &self.handlers);
            if binary.is_invalid() {
                warn!(
                    path = %table.host_binary.display(),
                    "Ignoring statically linked plugins, host binary path is wrong"
                );
            } else {
                describe_all(&binary);
                binary.mark_current();
                self.binaries.push(binary);
                report.new_binaries += 1;
                self.dirty = true;
            }
        }

        self.index(&mut report);
        self.scanned = true;

        report.binaries = self.binaries.len();
        report.invalid_binaries = self
            .binaries
            .iter()
            .filter(|binary| binary.is_invalid())
            .map(|binary| binary.file_path().to_path_buf())
            .collect();
        info!(
            binaries = report.binaries,
            new = report.new_binaries,
            changed = report.changed_binaries,
            dropped = report.dropped_binaries,
            invalid = report.invalid_binaries.len(),
            plugins = report.plugins,
            "Plugin scan complete"
        );
        report
    }

    fn index(&mut self, report: &mut ScanReport) {
        self.registry.clear();
        for binary in &self.binaries {
            let rank = self.search_root_rank(binary.bundle_path());
            for (plugin, handler) in binary.plugins_with_handlers() {
                if !plugin.is_usable() {
                    continue;
                }
                if let Err(reason) = handler.plugin_supported(plugin.as_ref()) {
                    warn!(
                        plugin_id = %plugin.record().identifier(),
                        reason = %reason,
                        "Ignoring unsupported plugin"
                    );
                    report
                        .unsupported
                        .push((plugin.record().identifier().to_string(), reason));
                    continue;
                }
                self.registry
                    .insert(Arc::clone(plugin), rank, binary.is_static());
            }
        }
        report.plugins = self.registry.len();
    }

    /// Index of the first search root containing `bundle_path`.
    ///
    /// Roots match whole path components only.
    pub fn search_root_rank(&self, bundle_path: &Path) -> usize {
        self.search_paths
            .iter()
            .position(|root| bundle_path.starts_with(&root.path))
            .unwrap_or(usize::MAX)
    }

    // ── queries ─────────────────────────────────────────────────

    /// The current plugin with identifier `id`.
    pub fn get_plugin_by_id(
        &self,
        id: &str,
        major: Option<u32>,
        minor: Option<u32>,
    ) -> Option<Arc<dyn HostedPlugin>> {
        self.registry.get_by_id(id, major, minor)
    }

    /// The current plugin labelled `label`.
    pub fn get_plugin_by_label(
        &self,
        label: &str,
        major: Option<u32>,
        minor: Option<u32>,
    ) -> Option<Arc<dyn HostedPlugin>> {
        self.registry.get_by_label(label, major, minor)
    }

    /// [`get_plugin_by_id`](Self::get_plugin_by_id) for image effects.
    pub fn get_image_effect(
        &self,
        id: &str,
        major: Option<u32>,
        minor: Option<u32>,
    ) -> Option<Arc<ImageEffectPlugin>> {
        self.get_plugin_by_id(id, major, minor)
            .and_then(ImageEffectPlugin::from_hosted)
    }

    /// Every registered plugin.
    pub fn get_plugins(&self) -> Vec<Arc<dyn HostedPlugin>> {
        self.registry.plugins()
    }

    /// Identifier → current plugin.
    pub fn get_plugins_by_id(&self) -> BTreeMap<String, Arc<dyn HostedPlugin>> {
        self.registry.current_by_id()
    }

    /// (identifier, major) → current plugin.
    pub fn get_plugins_by_id_major(&self) -> BTreeMap<(String, u32), Arc<dyn HostedPlugin>> {
        self.registry.current_by_id_major()
    }

    /// The registry built by the last scan.
    pub fn registry(&self) -> &PluginRegistry {
        &self.registry
    }

    /// Every known binary.
    pub fn binaries(&self) -> &[PluginBinary] {
        &self.binaries
    }

    /// Paths of binaries that cannot be used.
    pub fn invalid_binaries(&self) -> Vec<&Path> {
        self.binaries
            .iter()
            .filter(|binary| binary.is_invalid())
            .map(PluginBinary::file_path)
            .collect()
    }

    /// Search roots in precedence order.
    pub fn search_paths(&self) -> &[SearchPath] {
        &self.search_paths
    }

    /// Whether the cache file is out of date.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Find `name` in the directories visited by the last scan.
    pub fn seek_plugin_file(&self, name: &str) -> Option<PathBuf> {
        if !self.seek_enabled {
            return None;
        }
        self.plugin_dirs
            .iter()
            .map(|dir| dir.join(name))
            .find(|candidate| candidate.exists())
    }
}

fn describe_all(binary: &PluginBinary) {
    for (plugin, handler) in binary.plugins_with_handlers() {
        if let Err(e) = handler.describe_plugin(plugin.as_ref()) {
            debug!(plugin_id = %plugin.record().identifier(), error = %e, "Describe failed");
        }
    }
}

impl fmt::Debug for PluginCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginCache")
            .field("search_paths", &self.search_paths)
            .field("binaries", &self.binaries.len())
            .field("plugins", &self.registry.len())
            .field("cache_version", &self.cache_version)
            .field("dirty", &self.dirty)
            .finish()
    }
}

#[cfg(all(test, feature = "mock"))]
mod tests {
    use super::*;
    use crate::ffi::mock::MockBackend;

    fn new_cache() -> PluginCache {
        let mut cache = PluginCache::new(Arc::new(MockBackend::new()));
        cache.set_cache_version("test_OFXCachev1");
        cache
    }

    #[test]
    fn test_search_path_order_and_dedup() {
        let mut cache = new_cache();
        cache.add_search_path("/opt/OFX", true);
        cache.add_search_path("/opt/OFX2", false);
        cache.prepend_search_path("/first", true);
        cache.add_search_path("/opt/OFX", true);

        let paths: Vec<_> = cache.search_paths().iter().map(|p| p.path.clone()).collect();
        assert_eq!(
            paths,
            vec![
                PathBuf::from("/first"),
                PathBuf::from("/opt/OFX"),
                PathBuf::from("/opt/OFX2")
            ]
        );
        assert!(!cache.search_paths()[2].recursive);
    }

    #[test]
    fn test_rank_matches_whole_segments() {
        let mut cache = new_cache();
        cache.add_search_path("/opt/OFX", true);
        cache.add_search_path("/opt/OFX2", true);

        assert_eq!(cache.search_root_rank(Path::new("/opt/OFX/Foo.ofx.bundle")), 0);
        assert_eq!(cache.search_root_rank(Path::new("/opt/OFX2/Foo.ofx.bundle")), 1);
        assert_eq!(cache.search_root_rank(Path::new("/elsewhere/Foo.ofx.bundle")), usize::MAX);
    }

    #[test]
    fn test_bad_cache_text_is_ignored() {
        let mut cache = new_cache();
        assert!(!cache.read_cache("<cache version=\"test_OFXCachev1\"><bundle></cache>"));
        assert!(cache.is_dirty());
        assert!(cache.binaries().is_empty());

        let mut cache = new_cache();
        assert!(!cache.read_cache("<cache version=\"other\"></cache>"));
        assert!(cache.read_cache("<cache version=\"test_OFXCachev1\"></cache>"));
    }

    #[test]
    fn test_two_static_binaries_invalidate_cache() {
        let mut cache = new_cache();
        let text = r#"<cache version="test_OFXCachev1">
<bundle><binary static_bin="1" path="/a" bundle_path="/a" mtime="1" size="1"/></bundle>
<bundle><binary static_bin="1" path="/b" bundle_path="/b" mtime="1" size="1"/></bundle>
</cache>"#;
        assert!(!cache.read_cache(text));
        assert!(cache.binaries().is_empty());
    }

    #[test]
    fn test_save_only_when_dirty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("OFXCache_test.xml");

        let mut cache = new_cache();
        assert!(!cache.save_cache_file(&path).unwrap());
        assert!(!path.exists());

        cache.clear();
        assert!(cache.save_cache_file(&path).unwrap());
        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("<cache version=\"test_OFXCachev1\">"));
        assert!(!cache.save_cache_file(&path).unwrap());

        let mut reread = new_cache();
        assert!(reread.load_cache_file(&path).unwrap());
        assert!(!reread.load_cache_file(&dir.path().join("absent.xml")).unwrap());
    }

    #[test]
    fn test_seek_requires_opt_in() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("lut.cube"), b"lut").unwrap();

        let mut cache = new_cache();
        cache.add_search_path(dir.path(), false);
        cache.scan_plugin_files();
        assert!(cache.seek_plugin_file("lut.cube").is_none());

        cache.set_plugin_seek(true);
        assert_eq!(
            cache.seek_plugin_file("lut.cube"),
            Some(dir.path().join("lut.cube"))
        );
        assert!(cache.seek_plugin_file("missing.cube").is_none());
    }
}
