//! Image effect plugins and the API handler that creates them.

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, info, warn};

use ofxhost_core::error::HostError;
use ofxhost_core::result::HostResult;

use crate::action::Action;
use crate::api::{HostedPlugin, PluginApiHandler};
use crate::constants::{IMAGE_EFFECT_PLUGIN_API, IMAGE_EFFECT_PLUGIN_API_VERSION, contexts, props};
use crate::handle::PluginHandle;
use crate::host::HostContext;
use crate::plugin::Plugin;
use crate::property::{PropSpec, PropertySet};

use super::descriptor::Descriptor;
use super::instance::Instance;

const DESCRIBE_IN_CONTEXT_ARGS: &[PropSpec] = &[PropSpec::string(props::CONTEXT, 1, true, "")];

/// One image effect exported by a binary.
///
/// The base descriptor is filled once by `Describe` (or restored from the
/// cache). Context descriptors and the runtime handle are created on
/// demand and kept until the plugin is unloaded.
pub struct ImageEffectPlugin {
    record: Plugin,
    host: Arc<HostContext>,
    base: Descriptor,
    contexts: Mutex<BTreeMap<String, Arc<Descriptor>>>,
    runtime: Mutex<Option<Arc<PluginHandle>>>,
    failed: AtomicBool,
    enabled: AtomicBool,
}

impl ImageEffectPlugin {
    /// Wrap `record`; nothing is loaded.
    pub fn new(record: Plugin, host: Arc<HostContext>) -> HostResult<Self> {
        let bundle = record.binary().bundle_path().to_string_lossy().into_owned();
        Ok(Self {
            base: Descriptor::new(&bundle)?,
            record,
            host,
            contexts: Mutex::new(BTreeMap::new()),
            runtime: Mutex::new(None),
            failed: AtomicBool::new(false),
            enabled: AtomicBool::new(true),
        })
    }

    /// Recover the concrete type from the cache's view.
    pub fn from_hosted(plugin: Arc<dyn HostedPlugin>) -> Option<Arc<Self>> {
        plugin.into_any().downcast::<Self>().ok()
    }

    /// Identity and version.
    pub fn record(&self) -> &Plugin {
        &self.record
    }

    /// Identifier.
    pub fn identifier(&self) -> &str {
        self.record.identifier()
    }

    /// The descriptor filled by `Describe`.
    pub fn descriptor(&self) -> &Descriptor {
        &self.base
    }

    /// Contexts declared by the plugin.
    pub fn supported_contexts(&self) -> Vec<String> {
        self.base.supported_contexts()
    }

    /// The host this plugin talks to.
    pub fn host(&self) -> &Arc<HostContext> {
        &self.host
    }

    /// Remove the plugin from runtime lookups.
    pub fn disable(&self) {
        info!(plugin_id = %self.identifier(), "Plugin disabled");
        self.enabled.store(false, Ordering::SeqCst);
    }

    /// Undo [`disable`](Self::disable).
    pub fn enable(&self) {
        self.enabled.store(true, Ordering::SeqCst);
    }

    /// Run `Load`, `Describe` and `Unload` on a temporary handle.
    ///
    /// Failure marks the plugin unusable for the rest of the process.
    pub fn describe(&self) -> HostResult<()> {
        self.loading_status(true);
        let result = PluginHandle::new(&self.record, &self.host).and_then(|handle| {
            self.load_and_describe(&handle)?;
            self.send_unload(&handle);
            Ok(())
        });
        self.loading_status(false);

        if let Err(e) = &result {
            warn!(plugin_id = %self.identifier(), error = %e, "Plugin failed to describe");
            self.failed.store(true, Ordering::SeqCst);
        }
        result
    }

    /// The runtime handle, loading and describing the plugin on first use.
    pub fn plugin_handle(&self) -> HostResult<Arc<PluginHandle>> {
        if self.failed.load(Ordering::SeqCst) {
            return Err(HostError::invalid_state(format!(
                "plugin '{}' failed to load earlier",
                self.identifier()
            )));
        }
        let mut runtime = self.lock_runtime();
        if let Some(handle) = runtime.as_ref() {
            return Ok(Arc::clone(handle));
        }

        self.loading_status(true);
        let handle = PluginHandle::new(&self.record, &self.host).and_then(|handle| {
            self.load_and_describe(&handle)?;
            Ok(Arc::new(handle))
        });
        match handle {
            Ok(handle) => {
                *runtime = Some(Arc::clone(&handle));
                Ok(handle)
            }
            Err(e) => {
                self.loading_status(false);
                warn!(plugin_id = %self.identifier(), error = %e, "Plugin failed to load");
                self.failed.store(true, Ordering::SeqCst);
                Err(e)
            }
        }
    }

    /// Whether a runtime handle is held.
    pub fn is_loaded(&self) -> bool {
        self.lock_runtime().is_some()
    }

    /// The descriptor for `context`, running `DescribeInContext` once.
    pub fn get_context(&self, context: &str) -> HostResult<Arc<Descriptor>> {
        if !contexts::is_known(context)
            || !self.supported_contexts().iter().any(|c| c == context)
        {
            return Err(HostError::not_found(format!(
                "plugin '{}' has no context '{context}'",
                self.identifier()
            )));
        }

        let mut described = self.lock_contexts();
        if let Some(descriptor) = described.get(context) {
            return Ok(Arc::clone(descriptor));
        }

        let handle = self.plugin_handle()?;
        let descriptor = Descriptor::for_context(&self.base, context)?;
        let in_args = PropertySet::from_specs(DESCRIBE_IN_CONTEXT_ARGS);
        in_args.set_string(props::CONTEXT, 0, context)?;

        // SAFETY: the descriptor outlives the call.
        let status = unsafe {
            handle.call(
                Action::DescribeInContext,
                descriptor.handle(),
                Some(&in_args),
                None,
            )
        };
        if !status.is_success() {
            return Err(HostError::action_failed(
                Action::DescribeInContext.as_str(),
                status,
            ));
        }

        debug!(plugin_id = %self.identifier(), context, "Context described");
        let descriptor = Arc::new(descriptor);
        described.insert(context.to_string(), Arc::clone(&descriptor));
        Ok(descriptor)
    }

    /// Contexts described so far.
    pub fn described_contexts(&self) -> Vec<String> {
        self.lock_contexts().keys().cloned().collect()
    }

    /// A new instance in `context`, before `CreateInstance`.
    pub fn create_instance(self: &Arc<Self>, context: &str) -> HostResult<Instance> {
        let descriptor = self.get_context(context)?;
        let handle = self.plugin_handle()?;
        Instance::new(Arc::clone(self), descriptor, handle)
    }

    /// Send `Unload` and release the runtime handle.
    ///
    /// Refused while instances still hold the handle.
    pub fn unload(&self) -> HostResult<()> {
        let handle = {
            let mut runtime = self.lock_runtime();
            if runtime
                .as_ref()
                .is_some_and(|handle| Arc::strong_count(handle) > 1)
            {
                return Err(HostError::invalid_state(format!(
                    "plugin '{}' still has live instances",
                    self.identifier()
                )));
            }
            runtime.take()
        };
        if let Some(handle) = handle {
            self.lock_contexts().clear();
            self.send_unload(&handle);
            self.loading_status(false);
            info!(plugin_id = %self.identifier(), "Plugin unloaded");
        }
        Ok(())
    }

    fn load_and_describe(&self, handle: &PluginHandle) -> HostResult<()> {
        // SAFETY: `Load` takes no handle.
        let status = unsafe { handle.call(Action::Load, std::ptr::null(), None, None) };
        if !status.is_success() {
            return Err(HostError::action_failed(Action::Load.as_str(), status));
        }
        // SAFETY: the base descriptor lives as long as `self`.
        let status = unsafe { handle.call(Action::Describe, self.base.handle(), None, None) };
        if !status.is_success() {
            self.send_unload(handle);
            return Err(HostError::action_failed(Action::Describe.as_str(), status));
        }
        Ok(())
    }

    fn send_unload(&self, handle: &PluginHandle) {
        // SAFETY: `Unload` takes no handle.
        let status = unsafe { handle.call(Action::Unload, std::ptr::null(), None, None) };
        if !status.is_success() {
            warn!(plugin_id = %self.identifier(), status = %status, "Unload action failed");
        }
    }

    fn loading_status(&self, loading: bool) {
        self.host.host().loading_status(
            loading,
            self.record.identifier(),
            self.record.version_major(),
            self.record.version_minor(),
        );
    }

    fn lock_runtime(&self) -> MutexGuard<'_, Option<Arc<PluginHandle>>> {
        self.runtime.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn lock_contexts(&self) -> MutexGuard<'_, BTreeMap<String, Arc<Descriptor>>> {
        self.contexts.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl HostedPlugin for ImageEffectPlugin {
    fn record(&self) -> &Plugin {
        &self.record
    }

    fn properties(&self) -> &PropertySet {
        self.base.properties()
    }

    fn describe(&self) -> HostResult<()> {
        ImageEffectPlugin::describe(self)
    }

    fn is_usable(&self) -> bool {
        !self.failed.load(Ordering::SeqCst)
    }

    fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    fn unload(&self) -> HostResult<()> {
        ImageEffectPlugin::unload(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

impl Drop for ImageEffectPlugin {
    fn drop(&mut self) {
        if let Err(e) = ImageEffectPlugin::unload(self) {
            warn!(plugin_id = %self.identifier(), error = %e, "Plugin dropped while loaded");
        }
    }
}

impl fmt::Debug for ImageEffectPlugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageEffectPlugin")
            .field("record", &self.record)
            .field("failed", &self.failed.load(Ordering::SeqCst))
            .field("enabled", &self.enabled.load(Ordering::SeqCst))
            .finish()
    }
}

/// Handler for `OfxImageEffectPluginAPI` version 1.
#[derive(Debug, Clone)]
pub struct ImageEffectApi {
    host: Arc<HostContext>,
}

impl ImageEffectApi {
    /// A handler creating plugins bound to `host`.
    pub fn new(host: Arc<HostContext>) -> Self {
        Self { host }
    }

    /// The shared host.
    pub fn host(&self) -> &Arc<HostContext> {
        &self.host
    }
}

impl PluginApiHandler for ImageEffectApi {
    fn api(&self) -> &str {
        IMAGE_EFFECT_PLUGIN_API
    }

    fn handles(&self, api: &str, version: i32) -> bool {
        api == IMAGE_EFFECT_PLUGIN_API && version == IMAGE_EFFECT_PLUGIN_API_VERSION
    }

    fn new_plugin(&self, record: Plugin) -> HostResult<Arc<dyn HostedPlugin>> {
        Ok(Arc::new(ImageEffectPlugin::new(record, Arc::clone(&self.host))?))
    }

    fn plugin_supported(&self, plugin: &dyn HostedPlugin) -> Result<(), String> {
        let effect = plugin
            .as_any()
            .downcast_ref::<ImageEffectPlugin>()
            .ok_or_else(|| "not an image effect plugin".to_string())?;
        self.host.host().plugin_supported(effect)
    }
}
