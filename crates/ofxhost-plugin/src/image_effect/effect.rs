//! Objects plugins reach through opaque handles: effects, clips,
//! parameter sets and parameters.
//!
//! Each is `#[repr(C)]` with a magic tag first so a handle coming back
//! from plugin code can be checked before it is trusted.

use std::fmt;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use ofxhost_core::error::HostError;
use ofxhost_core::result::HostResult;

use crate::constants::{param_types, props, types};
use crate::ffi::abi::{
    OfxImageClipHandle, OfxImageEffectHandle, OfxParamHandle, OfxParamSetHandle,
};
use crate::property::{PropSpec, PropertySet};

const EFFECT_MAGIC: u32 = 0x0f5e_7002;
const CLIP_MAGIC: u32 = 0x0f5e_7003;
const PARAM_SET_MAGIC: u32 = 0x0f5e_7004;
const PARAM_MAGIC: u32 = 0x0f5e_7005;

/// Check the leading magic of a handle and borrow it as `T`.
///
/// # Safety
/// `handle` must be null or point to readable memory of at least the size
/// of a `u32`. `T` must be `#[repr(C)]` with a `u32` magic first.
unsafe fn resolve<'a, T>(handle: *mut std::ffi::c_void, magic: u32, what: &str) -> HostResult<&'a T> {
    if handle.is_null() {
        return Err(HostError::bad_handle(format!("null {what} handle")));
    }
    let found = unsafe { std::ptr::read(handle as *const u32) };
    if found != magic {
        return Err(HostError::bad_handle(format!("not a {what} handle")));
    }
    Ok(unsafe { &*(handle as *const T) })
}

/// Whether an effect object is a descriptor or a live instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectKind {
    /// Built by `Describe` / `DescribeInContext`.
    Descriptor,
    /// Created for `CreateInstance` and later actions.
    Instance,
}

/// An image effect as passed to `mainEntry`.
#[repr(C)]
pub struct Effect {
    magic: u32,
    kind: EffectKind,
    properties: Arc<PropertySet>,
    clips: RwLock<Vec<Arc<Clip>>>,
    params: ParamSet,
}

impl Effect {
    pub(crate) fn new(kind: EffectKind, properties: Arc<PropertySet>) -> Self {
        Self {
            magic: EFFECT_MAGIC,
            kind,
            properties,
            clips: RwLock::new(Vec::new()),
            params: ParamSet::new(kind == EffectKind::Descriptor),
        }
    }

    /// Resolve a handle received from a plugin.
    ///
    /// # Safety
    /// See [`PropertySet::from_handle`].
    pub unsafe fn from_handle<'a>(handle: OfxImageEffectHandle) -> HostResult<&'a Effect> {
        unsafe { resolve(handle, EFFECT_MAGIC, "image effect") }
    }

    /// Opaque handle passed to plugins.
    pub fn handle(&self) -> OfxImageEffectHandle {
        self as *const Self as OfxImageEffectHandle
    }

    /// Descriptor or instance.
    pub fn kind(&self) -> EffectKind {
        self.kind
    }

    /// The effect's property set.
    pub fn properties(&self) -> &PropertySet {
        &self.properties
    }

    /// Shared ownership of the property set.
    pub fn shared_properties(&self) -> &Arc<PropertySet> {
        &self.properties
    }

    /// The effect's parameters.
    pub fn params(&self) -> &ParamSet {
        &self.params
    }

    /// Clips, in definition order.
    pub fn clips(&self) -> Vec<Arc<Clip>> {
        self.read_clips().clone()
    }

    /// Look up a clip by name.
    pub fn clip(&self, name: &str) -> Option<Arc<Clip>> {
        self.read_clips()
            .iter()
            .find(|clip| clip.name == name)
            .cloned()
    }

    /// Define a clip; only descriptors accept new clips.
    pub fn define_clip(&self, name: &str) -> HostResult<Arc<Clip>> {
        if self.kind != EffectKind::Descriptor {
            return Err(HostError::invalid_state(format!(
                "clip '{name}' defined on an instance"
            )));
        }
        let mut clips = self.write_clips();
        if clips.iter().any(|clip| clip.name == name) {
            return Err(HostError::already_exists(format!("clip '{name}' already defined")));
        }
        let clip = Arc::new(Clip::new(name, PropertySet::from_specs(CLIP_PROPERTIES))?);
        clips.push(Arc::clone(&clip));
        Ok(clip)
    }

    /// Copy clips and parameters of `other` into this effect.
    pub(crate) fn copy_layout_from(&self, other: &Effect) -> HostResult<()> {
        let copied: Vec<Arc<Clip>> = other
            .clips()
            .iter()
            .map(|clip| Arc::new(Clip::from_parts(&clip.name, clip.properties.deep_copy())))
            .collect();
        *self.write_clips() = copied;
        self.params.copy_from(&other.params)
    }

    fn read_clips(&self) -> RwLockReadGuard<'_, Vec<Arc<Clip>>> {
        self.clips.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_clips(&self) -> RwLockWriteGuard<'_, Vec<Arc<Clip>>> {
        self.clips.write().unwrap_or_else(|e| e.into_inner())
    }
}

impl Drop for Effect {
    fn drop(&mut self) {
        self.magic = 0;
    }
}

impl fmt::Debug for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Effect")
            .field("kind", &self.kind)
            .field("clips", &self.read_clips().len())
            .field("params", &self.params.len())
            .finish()
    }
}

const CLIP_PROPERTIES: &[PropSpec] = &[
    PropSpec::string(props::TYPE, 1, true, types::CLIP),
    PropSpec::string(props::NAME, 1, true, ""),
    PropSpec::string(props::LABEL, 1, false, ""),
    PropSpec::string(props::SHORT_LABEL, 1, false, ""),
    PropSpec::string(props::LONG_LABEL, 1, false, ""),
    PropSpec::string(props::SUPPORTED_COMPONENTS, 0, false, ""),
    PropSpec::int(props::TEMPORAL_CLIP_ACCESS, 1, false, 0),
    PropSpec::int(props::CLIP_OPTIONAL, 1, false, 0),
    PropSpec::int(props::CLIP_IS_MASK, 1, false, 0),
    PropSpec::string(props::CLIP_FIELD_EXTRACTION, 1, false, "OfxImageFieldDoubled"),
    PropSpec::int(props::SUPPORTS_TILES, 1, false, 1),
];

/// A named image input or output.
#[repr(C)]
pub struct Clip {
    magic: u32,
    name: String,
    properties: PropertySet,
}

impl Clip {
    fn new(name: &str, properties: PropertySet) -> HostResult<Self> {
        properties.set_string(props::NAME, 0, name)?;
        properties.set_string(props::LABEL, 0, name)?;
        properties.set_string(props::SHORT_LABEL, 0, name)?;
        properties.set_string(props::LONG_LABEL, 0, name)?;
        Ok(Self::from_parts(name, properties))
    }

    fn from_parts(name: &str, properties: PropertySet) -> Self {
        Self {
            magic: CLIP_MAGIC,
            name: name.to_string(),
            properties,
        }
    }

    /// Resolve a handle received from a plugin.
    ///
    /// # Safety
    /// See [`PropertySet::from_handle`].
    pub unsafe fn from_handle<'a>(handle: OfxImageClipHandle) -> HostResult<&'a Clip> {
        unsafe { resolve(handle, CLIP_MAGIC, "clip") }
    }

    /// Opaque handle passed to plugins.
    pub fn handle(&self) -> OfxImageClipHandle {
        self as *const Self as OfxImageClipHandle
    }

    /// Clip name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Clip properties.
    pub fn properties(&self) -> &PropertySet {
        &self.properties
    }
}

impl Drop for Clip {
    fn drop(&mut self) {
        self.magic = 0;
    }
}

impl fmt::Debug for Clip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Clip").field("name", &self.name).finish()
    }
}

const PARAM_SET_PROPERTIES: &[PropSpec] = &[PropSpec::string(
    props::TYPE,
    1,
    true,
    types::PARAMETER_SET,
)];

/// The parameters of one effect.
#[repr(C)]
pub struct ParamSet {
    magic: u32,
    defining: bool,
    properties: PropertySet,
    params: RwLock<Vec<Arc<Param>>>,
}

impl ParamSet {
    fn new(defining: bool) -> Self {
        Self {
            magic: PARAM_SET_MAGIC,
            defining,
            properties: PropertySet::from_specs(PARAM_SET_PROPERTIES),
            params: RwLock::new(Vec::new()),
        }
    }

    /// Resolve a handle received from a plugin.
    ///
    /// # Safety
    /// See [`PropertySet::from_handle`].
    pub unsafe fn from_handle<'a>(handle: OfxParamSetHandle) -> HostResult<&'a ParamSet> {
        unsafe { resolve(handle, PARAM_SET_MAGIC, "parameter set") }
    }

    /// Opaque handle passed to plugins.
    pub fn handle(&self) -> OfxParamSetHandle {
        self as *const Self as OfxParamSetHandle
    }

    /// Properties of the set itself.
    pub fn properties(&self) -> &PropertySet {
        &self.properties
    }

    /// Parameters, in definition order.
    pub fn params(&self) -> Vec<Arc<Param>> {
        self.read_params().clone()
    }

    /// Number of parameters.
    pub fn len(&self) -> usize {
        self.read_params().len()
    }

    /// Whether no parameter is defined.
    pub fn is_empty(&self) -> bool {
        self.read_params().is_empty()
    }

    /// Look up a parameter by name.
    pub fn param(&self, name: &str) -> Option<Arc<Param>> {
        self.read_params()
            .iter()
            .find(|param| param.name == name)
            .cloned()
    }

    /// Define a parameter of `param_type`.
    ///
    /// Only a descriptor's set accepts definitions; names are unique.
    pub fn define(&self, param_type: &str, name: &str) -> HostResult<Arc<Param>> {
        if !self.defining {
            return Err(HostError::invalid_state(format!(
                "parameter '{name}' defined on an instance"
            )));
        }
        let specs = param_specs(param_type)
            .ok_or_else(|| HostError::unknown(format!("unknown parameter type '{param_type}'")))?;
        let mut params = self.write_params();
        if params.iter().any(|param| param.name == name) {
            return Err(HostError::already_exists(format!(
                "parameter '{name}' already defined"
            )));
        }

        let properties = PropertySet::from_specs(PARAM_BASE_PROPERTIES);
        properties.add_specs(specs);
        properties.set_string(props::NAME, 0, name)?;
        properties.set_string(props::LABEL, 0, name)?;
        properties.set_string(props::SHORT_LABEL, 0, name)?;
        properties.set_string(props::LONG_LABEL, 0, name)?;
        properties.set_string(props::PARAM_SCRIPT_NAME, 0, name)?;
        properties.set_string(props::PARAM_TYPE, 0, param_type)?;

        let param = Arc::new(Param {
            magic: PARAM_MAGIC,
            name: name.to_string(),
            param_type: param_type.to_string(),
            properties,
        });
        params.push(Arc::clone(&param));
        Ok(param)
    }

    fn copy_from(&self, other: &ParamSet) -> HostResult<()> {
        let copied: Vec<Arc<Param>> = other
            .params()
            .iter()
            .map(|param| {
                Arc::new(Param {
                    magic: PARAM_MAGIC,
                    name: param.name.clone(),
                    param_type: param.param_type.clone(),
                    properties: param.properties.deep_copy(),
                })
            })
            .collect();
        *self.write_params() = copied;
        Ok(())
    }

    fn read_params(&self) -> RwLockReadGuard<'_, Vec<Arc<Param>>> {
        self.params.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_params(&self) -> RwLockWriteGuard<'_, Vec<Arc<Param>>> {
        self.params.write().unwrap_or_else(|e| e.into_inner())
    }
}

impl Drop for ParamSet {
    fn drop(&mut self) {
        self.magic = 0;
    }
}

impl fmt::Debug for ParamSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParamSet")
            .field("defining", &self.defining)
            .field("params", &self.len())
            .finish()
    }
}

/// One parameter.
#[repr(C)]
pub struct Param {
    magic: u32,
    name: String,
    param_type: String,
    properties: PropertySet,
}

impl Param {
    /// Resolve a handle received from a plugin.
    ///
    /// # Safety
    /// See [`PropertySet::from_handle`].
    pub unsafe fn from_handle<'a>(handle: OfxParamHandle) -> HostResult<&'a Param> {
        unsafe { resolve(handle, PARAM_MAGIC, "parameter") }
    }

    /// Opaque handle passed to plugins.
    pub fn handle(&self) -> OfxParamHandle {
        self as *const Self as OfxParamHandle
    }

    /// Parameter name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Parameter type, e.g. `OfxParamTypeDouble`.
    pub fn param_type(&self) -> &str {
        &self.param_type
    }

    /// Parameter properties.
    pub fn properties(&self) -> &PropertySet {
        &self.properties
    }
}

impl Drop for Param {
    fn drop(&mut self) {
        self.magic = 0;
    }
}

impl fmt::Debug for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Param")
            .field("name", &self.name)
            .field("type", &self.param_type)
            .finish()
    }
}

const PARAM_BASE_PROPERTIES: &[PropSpec] = &[
    PropSpec::string(props::TYPE, 1, true, types::PARAMETER),
    PropSpec::string(props::NAME, 1, true, ""),
    PropSpec::string(props::LABEL, 1, false, ""),
    PropSpec::string(props::SHORT_LABEL, 1, false, ""),
    PropSpec::string(props::LONG_LABEL, 1, false, ""),
    PropSpec::string(props::PARAM_TYPE, 1, true, ""),
    PropSpec::int(props::PARAM_SECRET, 1, false, 0),
    PropSpec::string(props::PARAM_HINT, 1, false, ""),
    PropSpec::string(props::PARAM_SCRIPT_NAME, 1, false, ""),
    PropSpec::string(props::PARAM_PARENT, 1, false, ""),
    PropSpec::int(props::PARAM_ENABLED, 1, false, 1),
    PropSpec::pointer(props::INSTANCE_DATA, 1, false),
];

const NO_VALUE: &[PropSpec] = &[];

macro_rules! valued {
    ($name:ident, $default:expr) => {
        const $name: &[PropSpec] = &[PropSpec::int(props::PARAM_ANIMATES, 1, false, 1), $default];
    };
}

valued!(INTEGER_PARAM, PropSpec::int(props::PARAM_DEFAULT, 1, false, 0));
valued!(DOUBLE_PARAM, PropSpec::double(props::PARAM_DEFAULT, 1, false, 0.0));
valued!(INTEGER_2D_PARAM, PropSpec::int(props::PARAM_DEFAULT, 2, false, 0));
valued!(DOUBLE_2D_PARAM, PropSpec::double(props::PARAM_DEFAULT, 2, false, 0.0));
valued!(INTEGER_3D_PARAM, PropSpec::int(props::PARAM_DEFAULT, 3, false, 0));
valued!(DOUBLE_3D_PARAM, PropSpec::double(props::PARAM_DEFAULT, 3, false, 0.0));
valued!(RGB_PARAM, PropSpec::double(props::PARAM_DEFAULT, 3, false, 0.0));
valued!(RGBA_PARAM, PropSpec::double(props::PARAM_DEFAULT, 4, false, 0.0));
valued!(STRING_PARAM, PropSpec::string(props::PARAM_DEFAULT, 1, false, ""));

const CHOICE_PARAM: &[PropSpec] = &[
    PropSpec::int(props::PARAM_ANIMATES, 1, false, 1),
    PropSpec::int(props::PARAM_DEFAULT, 1, false, 0),
    PropSpec::string(props::PARAM_CHOICE_OPTION, 0, false, ""),
];

/// Type-specific property templates, or `None` for an unknown type.
fn param_specs(param_type: &str) -> Option<&'static [PropSpec]> {
    let specs = match param_type {
        param_types::INTEGER | param_types::BOOLEAN => INTEGER_PARAM,
        param_types::DOUBLE => DOUBLE_PARAM,
        param_types::CHOICE => CHOICE_PARAM,
        param_types::RGBA => RGBA_PARAM,
        param_types::RGB => RGB_PARAM,
        param_types::DOUBLE_2D => DOUBLE_2D_PARAM,
        param_types::INTEGER_2D => INTEGER_2D_PARAM,
        param_types::DOUBLE_3D => DOUBLE_3D_PARAM,
        param_types::INTEGER_3D => INTEGER_3D_PARAM,
        param_types::STRING | param_types::CUSTOM => STRING_PARAM,
        param_types::GROUP | param_types::PAGE | param_types::PUSH_BUTTON => NO_VALUE,
        _ => return None,
    };
    Some(specs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ofxhost_core::error::ErrorKind;

    fn descriptor() -> Effect {
        Effect::new(EffectKind::Descriptor, Arc::new(PropertySet::new()))
    }

    #[test]
    fn test_clip_definition_is_unique() {
        let effect = descriptor();
        let clip = effect.define_clip("Source").unwrap();
        assert_eq!(clip.properties().get_string(props::NAME, 0).unwrap(), "Source");
        assert_eq!(
            effect.define_clip("Source").unwrap_err().kind,
            ErrorKind::AlreadyExists
        );
        assert!(effect.clip("Source").is_some());
        assert!(effect.clip("Output").is_none());
    }

    #[test]
    fn test_param_defaults_follow_type() {
        let effect = descriptor();
        let gain = effect.params().define(param_types::RGBA, "gain").unwrap();
        assert_eq!(gain.properties().dimension(props::PARAM_DEFAULT).unwrap(), 4);
        assert_eq!(
            gain.properties().get_string(props::PARAM_SCRIPT_NAME, 0).unwrap(),
            "gain"
        );

        let page = effect.params().define(param_types::PAGE, "main").unwrap();
        assert!(!page.properties().contains(props::PARAM_DEFAULT));

        let err = effect.params().define("OfxParamTypeBogus", "x").unwrap_err();
        assert_eq!(err.kind, ErrorKind::Unknown);
    }

    #[test]
    fn test_instances_refuse_definitions_but_copy_layout() {
        let source = descriptor();
        source.define_clip("Source").unwrap();
        source.params().define(param_types::DOUBLE, "size").unwrap();

        let instance = Effect::new(EffectKind::Instance, Arc::new(PropertySet::new()));
        instance.copy_layout_from(&source).unwrap();
        assert_eq!(instance.clips().len(), 1);
        assert!(instance.params().param("size").is_some());

        assert_eq!(
            instance.define_clip("Matte").unwrap_err().kind,
            ErrorKind::InvalidState
        );
        assert_eq!(
            instance
                .params()
                .define(param_types::DOUBLE, "other")
                .unwrap_err()
                .kind,
            ErrorKind::InvalidState
        );
    }

    #[test]
    fn test_handles_are_checked() {
        let effect = descriptor();
        let resolved = unsafe { Effect::from_handle(effect.handle()) }.unwrap();
        assert_eq!(resolved.kind(), EffectKind::Descriptor);

        let params = effect.params().handle();
        assert!(unsafe { Effect::from_handle(params) }.is_err());
        assert!(unsafe { ParamSet::from_handle(params) }.is_ok());
        assert!(unsafe { Clip::from_handle(std::ptr::null_mut()) }.is_err());
    }
}
