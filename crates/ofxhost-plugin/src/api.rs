//! Seams between the plugin cache and API-specific plugin support.
//!
//! The cache knows nothing about image effects: every exported plugin is
//! wrapped by the [`PluginApiHandler`] registered for its API name and
//! version, and the cache talks to the result through [`HostedPlugin`].

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use tracing::warn;

use ofxhost_core::result::HostResult;

use crate::plugin::Plugin;
use crate::property::PropertySet;

/// A plugin as seen by the cache.
pub trait HostedPlugin: Send + Sync + fmt::Debug {
    /// Identity and version.
    fn record(&self) -> &Plugin;

    /// Properties filled by `Describe` and persisted in the cache file.
    fn properties(&self) -> &PropertySet;

    /// Human-readable label, falling back to the identifier.
    fn label(&self) -> String {
        self.properties()
            .get_string(crate::constants::props::LABEL, 0)
            .ok()
            .filter(|label| !label.is_empty())
            .unwrap_or_else(|| self.record().identifier().to_string())
    }

    /// Run the describe protocol, filling [`properties`](Self::properties).
    fn describe(&self) -> HostResult<()>;

    /// False once `Load` or `Describe` has failed.
    fn is_usable(&self) -> bool;

    /// False while the host has switched the plugin off.
    fn is_enabled(&self) -> bool {
        true
    }

    /// Release runtime resources held by the plugin.
    fn unload(&self) -> HostResult<()>;

    /// Downcasting support.
    fn as_any(&self) -> &dyn Any;

    /// Owned downcasting support.
    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

/// Wraps raw plugins of one API into [`HostedPlugin`] objects.
pub trait PluginApiHandler: Send + Sync + fmt::Debug {
    /// API name served.
    fn api(&self) -> &str;

    /// Whether this handler accepts `api` at `version`.
    fn handles(&self, api: &str, version: i32) -> bool;

    /// Wrap a plugin record.
    fn new_plugin(&self, record: Plugin) -> HostResult<Arc<dyn HostedPlugin>>;

    /// Run the describe protocol of a freshly discovered plugin.
    fn describe_plugin(&self, plugin: &dyn HostedPlugin) -> HostResult<()> {
        plugin.describe()
    }

    /// Host policy check; `Err` carries the reason for refusal.
    fn plugin_supported(&self, plugin: &dyn HostedPlugin) -> Result<(), String>;

    /// Bookkeeping when the owning binary goes away.
    fn unload_plugin(&self, plugin: &dyn HostedPlugin) {
        if let Err(e) = plugin.unload() {
            warn!(
                plugin_id = %plugin.record().identifier(),
                error = %e,
                "Plugin could not be unloaded"
            );
        }
    }
}

/// Find the handler registered for `(api, version)`.
pub fn find_handler<'a>(
    handlers: &'a [Arc<dyn PluginApiHandler>],
    api: &str,
    version: i32,
) -> Option<&'a Arc<dyn PluginApiHandler>> {
    handlers.iter().find(|handler| handler.handles(api, version))
}
