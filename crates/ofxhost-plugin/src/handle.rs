//! Scoped access to a plugin's raw entry points.

use std::ffi::c_void;
use std::fmt;
use std::ptr::NonNull;

use tracing::{debug, warn};

use ofxhost_core::error::HostError;
use ofxhost_core::result::HostResult;
use ofxhost_core::types::status::Status;

use crate::action::{self, Action};
use crate::ffi::abi::OfxPlugin;
use crate::ffi::safety::c_str_to_string;
use crate::host::HostContext;
use crate::library::LibraryGuard;
use crate::plugin::Plugin;
use crate::property::PropertySet;

/// A live `OfxPlugin` struct whose binary stays loaded while the handle
/// exists.
///
/// Creating a handle hands the host descriptor to the plugin through
/// `setHost`.
pub struct PluginHandle {
    raw: NonNull<OfxPlugin>,
    plugin_id: String,
    _guard: Option<LibraryGuard>,
}

// SAFETY: the OfxPlugin struct is immutable static data owned by the
// binary, which the guard keeps loaded. Calls through it are serialized by
// the owning plugin or instance.
unsafe impl Send for PluginHandle {}
unsafe impl Sync for PluginHandle {}

impl PluginHandle {
    /// Load the binary of `plugin` and fetch its `OfxPlugin` struct.
    pub fn new(plugin: &Plugin, host: &HostContext) -> HostResult<Self> {
        let entry = plugin.binary().entry_points()?;
        let raw = entry.plugin(plugin.index())?;
        // SAFETY: non-null and owned by the loaded binary.
        let descriptor = unsafe { raw.as_ref() };

        let exported = c_str_to_string(descriptor.plugin_identifier).unwrap_or_default();
        if exported != plugin.raw_identifier() {
            return Err(HostError::invalid_binary(format!(
                "plugin {} of '{}' is now '{}', expected '{}'",
                plugin.index(),
                plugin.binary().file_path().display(),
                exported,
                plugin.raw_identifier()
            )));
        }

        if let Some(set_host) = descriptor.set_host {
            // SAFETY: the host descriptor outlives every plugin handle.
            unsafe { set_host(host.ofx_host()) };
        }
        debug!(plugin_id = %plugin.identifier(), "Plugin handle created");

        Ok(Self {
            raw,
            plugin_id: plugin.identifier().to_string(),
            _guard: entry.into_guard(),
        })
    }

    /// Identifier of the plugin.
    pub fn plugin_id(&self) -> &str {
        &self.plugin_id
    }

    /// The raw plugin struct.
    pub fn raw(&self) -> NonNull<OfxPlugin> {
        self.raw
    }

    /// Send `action` to the plugin.
    ///
    /// A plugin without a `mainEntry` answers `kOfxStatErrFatal`.
    ///
    /// # Safety
    /// `handle` must be null or an object the plugin may receive for
    /// `action`, alive for the duration of the call.
    pub unsafe fn call(
        &self,
        action: Action,
        handle: *const c_void,
        in_args: Option<&PropertySet>,
        out_args: Option<&PropertySet>,
    ) -> Status {
        // SAFETY: the guard keeps the struct alive.
        match unsafe { self.raw.as_ref() }.main_entry {
            Some(entry) => unsafe {
                action::invoke(entry, action, handle, in_args, out_args, &self.plugin_id)
            },
            None => {
                warn!(plugin_id = %self.plugin_id, action = %action, "Plugin has no main entry");
                Status::ERR_FATAL
            }
        }
    }
}

impl fmt::Debug for PluginHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginHandle")
            .field("plugin_id", &self.plugin_id)
            .field("raw", &self.raw)
            .finish()
    }
}
