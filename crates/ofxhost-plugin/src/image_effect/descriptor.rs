//! Effect descriptors: the static shape of a plugin, globally and per
//! context.

use std::sync::Arc;

use ofxhost_core::result::HostResult;

use crate::constants::{props, thread_safety, types};
use crate::ffi::abi::OfxImageEffectHandle;
use crate::property::{PropSpec, PropertySet};

use super::effect::{Clip, Effect, EffectKind, Param, ParamSet};

const DESCRIPTOR_PROPERTIES: &[PropSpec] = &[
    PropSpec::string(props::TYPE, 1, true, types::IMAGE_EFFECT),
    PropSpec::string(props::LABEL, 1, false, ""),
    PropSpec::string(props::SHORT_LABEL, 1, false, ""),
    PropSpec::string(props::LONG_LABEL, 1, false, ""),
    PropSpec::int(props::VERSION, 0, false, 0),
    PropSpec::string(props::VERSION_LABEL, 1, false, ""),
    PropSpec::string(props::PLUGIN_DESCRIPTION, 1, false, ""),
    PropSpec::string(props::PLUGIN_FILE_PATH, 1, true, ""),
    PropSpec::string(props::SUPPORTED_CONTEXTS, 0, false, ""),
    PropSpec::string(props::GROUPING, 1, false, ""),
    PropSpec::int(props::SINGLE_INSTANCE, 1, false, 0),
    PropSpec::string(props::RENDER_THREAD_SAFETY, 1, false, thread_safety::INSTANCE_SAFE),
    PropSpec::int(props::HOST_FRAME_THREADING, 1, false, 1),
    PropSpec::int(props::SUPPORTS_MULTI_RESOLUTION, 1, false, 1),
    PropSpec::int(props::SUPPORTS_TILES, 1, false, 1),
    PropSpec::int(props::TEMPORAL_CLIP_ACCESS, 1, false, 0),
    PropSpec::string(props::SUPPORTED_PIXEL_DEPTHS, 0, false, ""),
    PropSpec::int(props::SUPPORTS_MULTIPLE_CLIP_DEPTHS, 1, false, 0),
    PropSpec::int(props::SUPPORTS_MULTIPLE_CLIP_PARS, 1, false, 0),
    PropSpec::int(props::FIELD_RENDER_TWICE_ALWAYS, 1, false, 1),
    PropSpec::string(props::CLIP_PREFERENCES_SLAVE_PARAM, 0, false, ""),
];

/// A plugin descriptor, base or context-specific.
#[derive(Debug)]
pub struct Descriptor {
    effect: Arc<Effect>,
    context: Option<String>,
}

impl Descriptor {
    /// The base descriptor filled by `Describe`.
    pub fn new(bundle_path: &str) -> HostResult<Self> {
        let properties = PropertySet::from_specs(DESCRIPTOR_PROPERTIES);
        properties.set_string(props::PLUGIN_FILE_PATH, 0, bundle_path)?;
        Ok(Self {
            effect: Arc::new(Effect::new(EffectKind::Descriptor, Arc::new(properties))),
            context: None,
        })
    }

    /// A copy of `base` for `DescribeInContext`.
    pub fn for_context(base: &Descriptor, context: &str) -> HostResult<Self> {
        let properties = base.properties().deep_copy();
        let effect = Effect::new(EffectKind::Descriptor, Arc::new(properties));
        effect.copy_layout_from(&base.effect)?;
        Ok(Self {
            effect: Arc::new(effect),
            context: Some(context.to_string()),
        })
    }

    /// Context this descriptor was built for; `None` for the base.
    pub fn context(&self) -> Option<&str> {
        self.context.as_deref()
    }

    /// The underlying effect object.
    pub fn effect(&self) -> &Arc<Effect> {
        &self.effect
    }

    /// Handle passed to describe actions.
    pub fn handle(&self) -> OfxImageEffectHandle {
        self.effect.handle()
    }

    /// Descriptor properties.
    pub fn properties(&self) -> &PropertySet {
        self.effect.properties()
    }

    /// Defined clips.
    pub fn clips(&self) -> Vec<Arc<Clip>> {
        self.effect.clips()
    }

    /// Defined parameters.
    pub fn params(&self) -> Vec<Arc<Param>> {
        self.effect.params().params()
    }

    /// The parameter set.
    pub fn param_set(&self) -> &ParamSet {
        self.effect.params()
    }

    /// Contexts declared by the plugin.
    pub fn supported_contexts(&self) -> Vec<String> {
        self.properties()
            .get_all::<String>(props::SUPPORTED_CONTEXTS)
            .unwrap_or_default()
    }

    /// Label, or an empty string.
    pub fn label(&self) -> String {
        self.properties()
            .get_string(props::LABEL, 0)
            .unwrap_or_default()
    }

    /// Menu grouping, or an empty string.
    pub fn grouping(&self) -> String {
        self.properties()
            .get_string(props::GROUPING, 0)
            .unwrap_or_default()
    }

    /// Declared render thread safety.
    pub fn render_thread_safety(&self) -> String {
        self.properties()
            .get_string(props::RENDER_THREAD_SAFETY, 0)
            .unwrap_or_default()
    }
}
