//! Plugin binaries: one shared object, or the host's static plugin table.

use std::ffi::c_void;
use std::fmt;
use std::path::{Path, PathBuf};
use std::ptr::NonNull;
use std::sync::Arc;

use tracing::{debug, info, warn};

use ofxhost_core::error::HostError;
use ofxhost_core::result::HostResult;

use crate::api::{HostedPlugin, PluginApiHandler, find_handler};
use crate::ffi::abi::{
    GET_NUMBER_OF_PLUGINS_SYMBOL, GET_PLUGIN_SYMBOL, GetNumberOfPluginsFn, GetPluginFn, OfxPlugin,
};
use crate::library::{DynamicLibrary, FileStamp, LibraryBackend, LibraryGuard};
use crate::plugin::Plugin;

/// Entry points of plugins linked into the host executable.
#[derive(Debug, Clone, Copy)]
pub struct StaticPlugins {
    /// Returns the number of plugins.
    pub count: GetNumberOfPluginsFn,
    /// Returns the nth plugin.
    pub get: GetPluginFn,
}

#[derive(Debug)]
enum BinarySource {
    Dynamic(Arc<DynamicLibrary>),
    Static(StaticPlugins),
}

/// Where a binary lives and how to reach its exports.
///
/// Shared by the binary and every plugin it exports.
#[derive(Debug)]
pub struct BinaryInfo {
    file_path: PathBuf,
    bundle_path: PathBuf,
    source: BinarySource,
}

impl BinaryInfo {
    /// A shared object opened through `backend`.
    pub fn dynamic(
        file_path: impl Into<PathBuf>,
        bundle_path: impl Into<PathBuf>,
        backend: Arc<dyn LibraryBackend>,
    ) -> Self {
        let file_path = file_path.into();
        Self {
            source: BinarySource::Dynamic(Arc::new(DynamicLibrary::new(file_path.clone(), backend))),
            file_path,
            bundle_path: bundle_path.into(),
        }
    }

    /// The static table, identified by the host executable at `exe_path`.
    pub fn statically_linked(exe_path: impl Into<PathBuf>, plugins: StaticPlugins) -> Self {
        let exe_path = exe_path.into();
        Self {
            file_path: exe_path.clone(),
            bundle_path: exe_path,
            source: BinarySource::Static(plugins),
        }
    }

    /// Path of the shared object (or host executable).
    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    /// Path of the enclosing bundle directory.
    pub fn bundle_path(&self) -> &Path {
        &self.bundle_path
    }

    /// Whether the plugins are linked into the host.
    pub fn is_static(&self) -> bool {
        matches!(self.source, BinarySource::Static(_))
    }

    /// The library, for dynamic binaries.
    pub fn library(&self) -> Option<&Arc<DynamicLibrary>> {
        match &self.source {
            BinarySource::Dynamic(library) => Some(library),
            BinarySource::Static(_) => None,
        }
    }

    /// Open the binary and resolve both exports.
    ///
    /// The returned value keeps a dynamic library loaded while it lives.
    pub fn entry_points(&self) -> HostResult<EntryPoints> {
        match &self.source {
            BinarySource::Static(plugins) => Ok(EntryPoints {
                count: plugins.count,
                get: plugins.get,
                guard: None,
            }),
            BinarySource::Dynamic(library) => {
                let guard = library.acquire()?;
                let count = resolve(library, GET_NUMBER_OF_PLUGINS_SYMBOL)?;
                let get = resolve(library, GET_PLUGIN_SYMBOL)?;
                // SAFETY: both exports have these signatures in the OFX ABI.
                let (count, get) = unsafe {
                    (
                        std::mem::transmute::<*mut c_void, GetNumberOfPluginsFn>(count),
                        std::mem::transmute::<*mut c_void, GetPluginFn>(get),
                    )
                };
                Ok(EntryPoints {
                    count,
                    get,
                    guard: Some(guard),
                })
            }
        }
    }
}

fn resolve(library: &DynamicLibrary, symbol: &str) -> HostResult<*mut c_void> {
    library.find_symbol(symbol).ok_or_else(|| {
        HostError::invalid_binary(format!(
            "'{}' does not export {symbol}",
            library.path().display()
        ))
    })
}

/// Resolved exports of an open binary.
#[derive(Debug)]
pub struct EntryPoints {
    count: GetNumberOfPluginsFn,
    get: GetPluginFn,
    guard: Option<LibraryGuard>,
}

impl EntryPoints {
    /// Number of exported plugins.
    pub fn plugin_count(&self) -> usize {
        // SAFETY: resolved from a binary that stays loaded while `self` lives.
        let count = unsafe { (self.count)() };
        usize::try_from(count).unwrap_or(0)
    }

    /// The nth plugin struct.
    pub fn plugin(&self, index: usize) -> HostResult<NonNull<OfxPlugin>> {
        let nth = i32::try_from(index)
            .map_err(|_| HostError::bad_index(format!("plugin index {index} out of range")))?;
        // SAFETY: as above.
        let raw = unsafe { (self.get)(nth) };
        NonNull::new(raw)
            .ok_or_else(|| HostError::invalid_binary(format!("OfxGetPlugin({index}) returned null")))
    }

    /// Keep the library reference beyond this value.
    pub fn into_guard(self) -> Option<LibraryGuard> {
        self.guard
    }
}

struct BinaryPlugin {
    plugin: Arc<dyn HostedPlugin>,
    handler: Arc<dyn PluginApiHandler>,
}

/// One bundle binary and the plugins it exports.
pub struct PluginBinary {
    info: Arc<BinaryInfo>,
    stamp: FileStamp,
    changed: bool,
    invalid: bool,
    plugins: Vec<BinaryPlugin>,
    guard: Option<LibraryGuard>,
}

impl PluginBinary {
    /// A binary read back from the cache file; nothing is loaded.
    ///
    /// The file is stat-ed now: a differing or missing stamp marks the
    /// binary changed.
    pub fn from_cache(info: Arc<BinaryInfo>, cached: FileStamp) -> Self {
        let (stamp, changed) = match DynamicLibrary::stat(info.file_path()) {
            Ok(stamp) => (stamp, stamp != cached),
            Err(_) => (cached, true),
        };
        if changed {
            debug!(path = %info.file_path().display(), "Cached binary has changed");
        }
        Self {
            info,
            stamp,
            changed,
            invalid: false,
            plugins: Vec::new(),
            guard: None,
        }
    }

    /// A binary found on disk: opened and enumerated immediately.
    pub fn cold(info: Arc<BinaryInfo>, handlers: &[Arc<dyn PluginApiHandler>]) -> Self {
        let mut binary = Self {
            stamp: FileStamp::default(),
            info,
            changed: true,
            invalid: false,
            plugins: Vec::new(),
            guard: None,
        };
        match DynamicLibrary::stat(binary.info.file_path()) {
            Ok(stamp) => {
                binary.stamp = stamp;
                binary.load_plugin_info(handlers);
            }
            Err(e) => {
                warn!(path = %binary.info.file_path().display(), error = %e, "Binary is unreadable");
                binary.invalid = true;
            }
        }
        binary
    }

    /// Enumerate exported plugins through their API handlers.
    ///
    /// Replaces any plugins already attached. A binary that cannot be
    /// opened or lacks an export is marked invalid for good. The library
    /// reference taken here is kept until the binary is dropped.
    pub fn load_plugin_info(&mut self, handlers: &[Arc<dyn PluginApiHandler>]) {
        if self.invalid {
            return;
        }
        self.unload_plugins();

        let entry = match self.info.entry_points() {
            Ok(entry) => entry,
            Err(e) => {
                warn!(path = %self.info.file_path().display(), error = %e, "Invalid plugin binary");
                self.invalid = true;
                return;
            }
        };

        let count = entry.plugin_count();
        for index in 0..count {
            let record = entry.plugin(index).and_then(|raw| {
                // SAFETY: non-null and owned by the loaded binary.
                Plugin::from_raw(Arc::clone(&self.info), index, unsafe { raw.as_ref() })
            });
            let record = match record {
                Ok(record) => record,
                Err(e) => {
                    warn!(path = %self.info.file_path().display(), index, error = %e, "Skipping plugin");
                    continue;
                }
            };
            let Some(handler) = find_handler(handlers, record.api(), record.api_version()) else {
                warn!(
                    plugin_id = %record.identifier(),
                    api = %record.api(),
                    api_version = record.api_version(),
                    "No handler for plugin API"
                );
                continue;
            };
            let plugin = match handler.new_plugin(record) {
                Ok(plugin) => plugin,
                Err(e) => {
                    warn!(path = %self.info.file_path().display(), index, error = %e, "Skipping plugin");
                    continue;
                }
            };
            self.plugins.push(BinaryPlugin {
                plugin,
                handler: Arc::clone(handler),
            });
        }

        info!(
            path = %self.info.file_path().display(),
            plugins = self.plugins.len(),
            "Plugin binary enumerated"
        );
        self.guard = entry.into_guard();
    }

    fn unload_plugins(&mut self) {
        for entry in self.plugins.drain(..) {
            entry.handler.unload_plugin(entry.plugin.as_ref());
        }
    }

    /// Keep a cached "invalid" verdict while the file is unchanged.
    ///
    /// A changed file is opened again by the next scan.
    pub fn restore_invalid(&mut self) {
        if !self.changed {
            self.invalid = true;
        }
    }

    /// Attach a plugin restored from the cache.
    pub fn add_plugin(&mut self, plugin: Arc<dyn HostedPlugin>, handler: Arc<dyn PluginApiHandler>) {
        self.plugins.push(BinaryPlugin { plugin, handler });
    }

    /// Shared location data.
    pub fn info(&self) -> &Arc<BinaryInfo> {
        &self.info
    }

    /// Path of the shared object.
    pub fn file_path(&self) -> &Path {
        self.info.file_path()
    }

    /// Path of the bundle directory.
    pub fn bundle_path(&self) -> &Path {
        self.info.bundle_path()
    }

    /// Whether the plugins are linked into the host.
    pub fn is_static(&self) -> bool {
        self.info.is_static()
    }

    /// Stamp taken from disk, or the cached one if the file is gone.
    pub fn stamp(&self) -> FileStamp {
        self.stamp
    }

    /// New, or different from its cache entry.
    pub fn is_changed(&self) -> bool {
        self.changed
    }

    /// Record that the cache now reflects this binary.
    pub fn mark_current(&mut self) {
        self.changed = false;
    }

    /// Unopenable or missing an export.
    pub fn is_invalid(&self) -> bool {
        self.invalid
    }

    /// Exported plugins, in export order.
    pub fn plugins(&self) -> impl Iterator<Item = &Arc<dyn HostedPlugin>> {
        self.plugins.iter().map(|entry| &entry.plugin)
    }

    /// Exported plugins with the handler that wraps each one.
    pub fn plugins_with_handlers(
        &self,
    ) -> impl Iterator<Item = (&Arc<dyn HostedPlugin>, &Arc<dyn PluginApiHandler>)> {
        self.plugins.iter().map(|entry| (&entry.plugin, &entry.handler))
    }

    /// Number of exported plugins.
    pub fn plugin_count(&self) -> usize {
        self.plugins.len()
    }
}

impl Drop for PluginBinary {
    fn drop(&mut self) {
        self.unload_plugins();
        self.guard.take();
    }
}

impl fmt::Debug for PluginBinary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginBinary")
            .field("file_path", &self.info.file_path())
            .field("static", &self.info.is_static())
            .field("changed", &self.changed)
            .field("invalid", &self.invalid)
            .field("plugins", &self.plugins.len())
            .finish()
    }
}
