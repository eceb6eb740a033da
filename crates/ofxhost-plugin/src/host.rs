//! The host object plugins see through `setHost`.

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use ofxhost_core::config::host::HostIdentityConfig;
use ofxhost_core::result::HostResult;

use crate::constants::{IMAGE_EFFECT_PLUGIN_API_VERSION, props, types};
use crate::ffi::abi::OfxHost;
use crate::image_effect::ImageEffectPlugin;
use crate::property::{PropSpec, PropertyGetDelegate, PropertySet};
use crate::suites::fetch_suite;

/// Capabilities and policy of the application hosting plugins.
pub trait Host: Send + Sync + fmt::Debug {
    /// Reverse-DNS host name.
    fn name(&self) -> &str;

    /// Human-readable host name.
    fn label(&self) -> &str;

    /// Contexts the host can instantiate effects in.
    fn supported_contexts(&self) -> &[String];

    /// Pixel depths the host can provide.
    fn supported_pixel_depths(&self) -> &[String];

    /// Pixel components the host can provide.
    fn supported_components(&self) -> &[String];

    /// Whether the host accepts `plugin`.
    ///
    /// By default a plugin needs at least one context the host supports.
    fn plugin_supported(&self, plugin: &ImageEffectPlugin) -> Result<(), String> {
        let contexts = plugin.supported_contexts();
        if contexts
            .iter()
            .any(|context| self.supported_contexts().contains(context))
        {
            Ok(())
        } else {
            Err(format!(
                "none of its contexts [{}] is supported",
                contexts.join(", ")
            ))
        }
    }

    /// Called with `loading = true` before a plugin is loaded and
    /// described, and with `false` after it is released.
    fn loading_status(&self, _loading: bool, _plugin_id: &str, _major: u32, _minor: u32) {}
}

/// A [`Host`] whose capabilities come from configuration.
#[derive(Debug, Clone)]
pub struct DefaultHost {
    identity: HostIdentityConfig,
}

impl DefaultHost {
    /// Build from the `[host]` configuration section.
    pub fn new(identity: HostIdentityConfig) -> Self {
        Self { identity }
    }
}

impl Default for DefaultHost {
    fn default() -> Self {
        Self::new(HostIdentityConfig::default())
    }
}

impl Host for DefaultHost {
    fn name(&self) -> &str {
        &self.identity.name
    }

    fn label(&self) -> &str {
        &self.identity.label
    }

    fn supported_contexts(&self) -> &[String] {
        &self.identity.supported_contexts
    }

    fn supported_pixel_depths(&self) -> &[String] {
        &self.identity.supported_pixel_depths
    }

    fn supported_components(&self) -> &[String] {
        &self.identity.supported_components
    }
}

const HOST_PROPERTIES: &[PropSpec] = &[
    PropSpec::string(props::TYPE, 1, true, types::IMAGE_EFFECT_HOST),
    PropSpec::string(props::NAME, 1, true, ""),
    PropSpec::string(props::LABEL, 1, true, ""),
    PropSpec::int(props::API_VERSION, 0, true, 0),
    PropSpec::int(props::VERSION, 0, true, 0),
    PropSpec::string(props::VERSION_LABEL, 1, true, ""),
    PropSpec::int(props::HOST_IS_BACKGROUND, 1, true, 0),
    PropSpec::int(props::SUPPORTS_OVERLAYS, 1, true, 0),
    PropSpec::int(props::SUPPORTS_MULTI_RESOLUTION, 1, true, 0),
    PropSpec::int(props::SUPPORTS_TILES, 1, true, 1),
    PropSpec::int(props::TEMPORAL_CLIP_ACCESS, 1, true, 0),
    PropSpec::string(props::SUPPORTED_COMPONENTS, 0, true, ""),
    PropSpec::string(props::SUPPORTED_CONTEXTS, 0, true, ""),
    PropSpec::string(props::SUPPORTED_PIXEL_DEPTHS, 0, true, ""),
    PropSpec::int(props::SUPPORTS_MULTIPLE_CLIP_DEPTHS, 1, true, 0),
    PropSpec::int(props::SUPPORTS_MULTIPLE_CLIP_PARS, 1, true, 0),
    PropSpec::int(props::SUPPORTS_CUSTOM_ANIMATION, 1, true, 0),
    PropSpec::int(props::MAX_PARAMETERS, 1, true, -1),
    PropSpec::int(props::MAX_PAGES, 1, true, 0),
];

/// Serves the supported pixel depths straight from the host.
struct PixelDepths(Arc<dyn Host>);

impl PropertyGetDelegate for PixelDepths {
    fn get_string(&self, name: &str, index: usize) -> HostResult<String> {
        self.0
            .supported_pixel_depths()
            .get(index)
            .cloned()
            .ok_or_else(|| {
                ofxhost_core::HostError::bad_index(format!("'{name}' has no value {index}"))
            })
    }

    fn dimension(&self, _name: &str) -> HostResult<usize> {
        Ok(self.0.supported_pixel_depths().len())
    }
}

/// A [`Host`] together with the C-facing objects handed to plugins.
pub struct HostContext {
    host: Arc<dyn Host>,
    properties: Box<PropertySet>,
    ofx_host: Box<OfxHost>,
}

// SAFETY: `ofx_host` only points at `properties`, which is owned here and
// synchronized internally; the struct is never written after construction.
unsafe impl Send for HostContext {}
unsafe impl Sync for HostContext {}

impl HostContext {
    /// Build the host property set and descriptor for `host`.
    pub fn new(host: Arc<dyn Host>) -> HostResult<Arc<Self>> {
        let properties = Box::new(PropertySet::from_specs(HOST_PROPERTIES));
        properties.set_string(props::NAME, 0, host.name())?;
        properties.set_string(props::LABEL, 0, host.label())?;
        properties.set_all(props::API_VERSION, &[IMAGE_EFFECT_PLUGIN_API_VERSION, 0])?;
        properties.set_all(props::VERSION, &version_numbers())?;
        properties.set_string(props::VERSION_LABEL, 0, env!("CARGO_PKG_VERSION"))?;
        properties.set_all(props::SUPPORTED_CONTEXTS, host.supported_contexts())?;
        properties.set_all(props::SUPPORTED_COMPONENTS, host.supported_components())?;
        properties.set_delegate(
            props::SUPPORTED_PIXEL_DEPTHS,
            Arc::new(PixelDepths(Arc::clone(&host))),
        )?;

        let ofx_host = Box::new(OfxHost {
            host: properties.handle(),
            fetch_suite,
        });
        debug!(host = %host.name(), "Host descriptor created");

        Ok(Arc::new(Self {
            host,
            properties,
            ofx_host,
        }))
    }

    /// The host policy object.
    pub fn host(&self) -> &Arc<dyn Host> {
        &self.host
    }

    /// The host property set.
    pub fn properties(&self) -> &PropertySet {
        &self.properties
    }

    /// Pointer handed to `setHost`.
    pub fn ofx_host(&self) -> *mut OfxHost {
        &*self.ofx_host as *const OfxHost as *mut OfxHost
    }
}

impl fmt::Debug for HostContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostContext")
            .field("host", &self.host)
            .finish()
    }
}

fn version_numbers() -> Vec<i32> {
    env!("CARGO_PKG_VERSION")
        .split('.')
        .filter_map(|part| part.parse().ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_properties_reflect_identity() {
        let context = HostContext::new(Arc::new(DefaultHost::default())).unwrap();
        let set = context.properties();
        assert_eq!(
            set.get_string(props::TYPE, 0).unwrap(),
            types::IMAGE_EFFECT_HOST
        );
        assert_eq!(set.get_string(props::NAME, 0).unwrap(), "net.ofxhost.host");
        assert_eq!(set.dimension(props::SUPPORTED_CONTEXTS).unwrap(), 6);
        assert_eq!(set.get_all::<i32>(props::API_VERSION).unwrap(), vec![1, 0]);
    }

    #[test]
    fn test_pixel_depths_come_from_the_host() {
        let mut identity = HostIdentityConfig::default();
        identity.supported_pixel_depths = vec!["OfxBitDepthFloat".to_string()];
        let context = HostContext::new(Arc::new(DefaultHost::new(identity))).unwrap();
        let set = context.properties();
        assert_eq!(set.dimension(props::SUPPORTED_PIXEL_DEPTHS).unwrap(), 1);
        assert_eq!(
            set.get_string(props::SUPPORTED_PIXEL_DEPTHS, 0).unwrap(),
            "OfxBitDepthFloat"
        );
        assert!(set.get_string(props::SUPPORTED_PIXEL_DEPTHS, 1).is_err());
    }

    #[test]
    fn test_ofx_host_points_at_host_properties() {
        let context = HostContext::new(Arc::new(DefaultHost::default())).unwrap();
        let ofx_host = unsafe { &*context.ofx_host() };
        let set = unsafe { PropertySet::from_handle(ofx_host.host) }.unwrap();
        assert_eq!(set.get_string(props::LABEL, 0).unwrap(), "ofxhost");
    }
}
