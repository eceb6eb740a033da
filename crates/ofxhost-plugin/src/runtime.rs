//! A plugin cache wired from [`HostConfig`].

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{info, warn};

use ofxhost_core::config::HostConfig;
use ofxhost_core::result::HostResult;

use crate::cache::{PluginCache, ScanReport};
use crate::host::{DefaultHost, HostContext};
use crate::image_effect::ImageEffectApi;
use crate::library::{LibraryBackend, NativeBackend};

/// The host object and the plugin cache it serves.
#[derive(Debug)]
pub struct HostRuntime {
    config: HostConfig,
    host: Arc<HostContext>,
    cache: PluginCache,
}

impl HostRuntime {
    /// Build from configuration, loading real shared objects.
    pub fn new(config: HostConfig) -> HostResult<Self> {
        Self::with_backend(config, Arc::new(NativeBackend))
    }

    /// Build from configuration with a custom library backend.
    ///
    /// Search roots are added in this order: the path environment
    /// variable, configured recursive roots, configured single-level
    /// roots, the standard location, then per-host directories.
    pub fn with_backend(config: HostConfig, backend: Arc<dyn LibraryBackend>) -> HostResult<Self> {
        let host = HostContext::new(Arc::new(DefaultHost::new(config.host.clone())))?;

        let mut cache = PluginCache::new(backend);
        cache.register_api_handler(Arc::new(ImageEffectApi::new(Arc::clone(&host))));
        cache.set_cache_version(config.cache.version.clone());
        cache.set_plugin_seek(config.plugins.enable_plugin_seek);

        let plugins = &config.plugins;
        if !plugins.path_env_var.is_empty() {
            cache.add_paths_from_env(&plugins.path_env_var);
        }
        for path in &plugins.search_paths {
            cache.add_search_path(path, true);
        }
        for path in &plugins.non_recursive_paths {
            cache.add_search_path(path, false);
        }
        if plugins.use_standard_locations {
            cache.add_standard_locations();
        }
        for host_id in &plugins.host_paths {
            cache.set_plugin_host_path(host_id);
        }

        Ok(Self {
            config,
            host,
            cache,
        })
    }

    /// Build, read the cache file, scan and save in one go.
    pub fn start(config: HostConfig) -> HostResult<(Self, ScanReport)> {
        let mut runtime = Self::new(config)?;
        runtime.load_cache();
        let report = runtime.scan();
        if let Err(e) = runtime.save_cache() {
            warn!(error = %e, "Failed to write plugin cache");
        }
        Ok((runtime, report))
    }

    /// Read the configured cache file, if caching is enabled.
    ///
    /// Returns whether cached entries were used.
    pub fn load_cache(&mut self) -> bool {
        if !self.config.cache.enabled {
            return false;
        }
        let path = self.cache_path();
        match self.cache.load_cache_file(&path) {
            Ok(used) => used,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Plugin cache unreadable, rescanning");
                false
            }
        }
    }

    /// Scan every search root.
    pub fn scan(&mut self) -> ScanReport {
        let report = self.cache.scan_plugin_files();
        info!(
            host = %self.host.host().name(),
            plugins = report.plugins,
            "Plugins available"
        );
        report
    }

    /// Write the cache file if caching is enabled and it changed.
    pub fn save_cache(&mut self) -> HostResult<bool> {
        if !self.config.cache.enabled {
            return Ok(false);
        }
        let path = self.cache_path();
        self.cache.save_cache_file(&path)
    }

    /// Location of the cache file.
    pub fn cache_path(&self) -> PathBuf {
        self.config.cache.file_path()
    }

    /// Configuration the runtime was built from.
    pub fn config(&self) -> &HostConfig {
        &self.config
    }

    /// The host handed to plugins.
    pub fn host(&self) -> &Arc<HostContext> {
        &self.host
    }

    /// The plugin cache.
    pub fn cache(&self) -> &PluginCache {
        &self.cache
    }

    /// The plugin cache, mutably.
    pub fn cache_mut(&mut self) -> &mut PluginCache {
        &mut self.cache
    }
}
