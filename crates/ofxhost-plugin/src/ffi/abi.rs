//! C ABI definitions shared with OFX plugins.
//!
//! Field order and signatures follow the OFX C headers exactly. Suite
//! slots whose C signature is variadic are exposed as nullable untyped
//! function pointers and left empty.

use std::ffi::{c_char, c_double, c_int, c_uint, c_void};

/// Status code returned by every plugin-facing call.
pub type OfxStatus = c_int;
/// Opaque property set handle.
pub type OfxPropertySetHandle = *mut c_void;
/// Opaque image effect (descriptor or instance) handle.
pub type OfxImageEffectHandle = *mut c_void;
/// Opaque clip handle.
pub type OfxImageClipHandle = *mut c_void;
/// Opaque parameter set handle.
pub type OfxParamSetHandle = *mut c_void;
/// Opaque parameter handle.
pub type OfxParamHandle = *mut c_void;
/// Opaque image memory handle.
pub type OfxImageMemoryHandle = *mut c_void;
/// Time in frames.
pub type OfxTime = c_double;

/// Suite lookup function served by the host.
pub type FetchSuiteFn = unsafe extern "C" fn(
    host: OfxPropertySetHandle,
    suite_name: *const c_char,
    suite_version: c_int,
) -> *const c_void;

/// `OfxPlugin::setHost`.
pub type SetHostFn = unsafe extern "C" fn(host: *mut OfxHost);

/// `OfxPlugin::mainEntry`.
pub type MainEntryFn = unsafe extern "C" fn(
    action: *const c_char,
    handle: *const c_void,
    in_args: OfxPropertySetHandle,
    out_args: OfxPropertySetHandle,
) -> OfxStatus;

/// `OfxGetNumberOfPlugins` export.
pub type GetNumberOfPluginsFn = unsafe extern "C" fn() -> c_int;

/// `OfxGetPlugin` export.
pub type GetPluginFn = unsafe extern "C" fn(nth: c_int) -> *mut OfxPlugin;

/// Name of the plugin count export.
pub const GET_NUMBER_OF_PLUGINS_SYMBOL: &str = "OfxGetNumberOfPlugins";
/// Name of the nth-plugin export.
pub const GET_PLUGIN_SYMBOL: &str = "OfxGetPlugin";

/// Host descriptor handed to `setHost`.
#[repr(C)]
pub struct OfxHost {
    /// The host's property set.
    pub host: OfxPropertySetHandle,
    /// Suite lookup.
    pub fetch_suite: FetchSuiteFn,
}

/// Plugin descriptor returned by `OfxGetPlugin`.
#[repr(C)]
pub struct OfxPlugin {
    /// API implemented, e.g. `"OfxImageEffectPluginAPI"`.
    pub plugin_api: *const c_char,
    /// Version of that API.
    pub api_version: c_int,
    /// Reverse-DNS identifier.
    pub plugin_identifier: *const c_char,
    /// Major version.
    pub plugin_version_major: c_uint,
    /// Minor version.
    pub plugin_version_minor: c_uint,
    /// Receives the host descriptor before any action.
    pub set_host: Option<SetHostFn>,
    /// Action entry point.
    pub main_entry: Option<MainEntryFn>,
}

/// Rectangle in canonical coordinates.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct OfxRectD {
    /// Left.
    pub x1: c_double,
    /// Bottom.
    pub y1: c_double,
    /// Right.
    pub x2: c_double,
    /// Top.
    pub y2: c_double,
}

/// Frame range.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct OfxRangeD {
    /// First frame.
    pub min: c_double,
    /// Last frame.
    pub max: c_double,
}

/// Placeholder for a variadic suite slot.
pub type VariadicSlot = Option<unsafe extern "C" fn()>;

/// `OfxPropertySuiteV1`.
#[repr(C)]
pub struct OfxPropertySuiteV1 {
    pub prop_set_pointer: unsafe extern "C" fn(
        OfxPropertySetHandle,
        *const c_char,
        c_int,
        *mut c_void,
    ) -> OfxStatus,
    pub prop_set_string: unsafe extern "C" fn(
        OfxPropertySetHandle,
        *const c_char,
        c_int,
        *const c_char,
    ) -> OfxStatus,
    pub prop_set_double:
        unsafe extern "C" fn(OfxPropertySetHandle, *const c_char, c_int, c_double) -> OfxStatus,
    pub prop_set_int:
        unsafe extern "C" fn(OfxPropertySetHandle, *const c_char, c_int, c_int) -> OfxStatus,
    pub prop_set_pointer_n: unsafe extern "C" fn(
        OfxPropertySetHandle,
        *const c_char,
        c_int,
        *const *mut c_void,
    ) -> OfxStatus,
    pub prop_set_string_n: unsafe extern "C" fn(
        OfxPropertySetHandle,
        *const c_char,
        c_int,
        *const *const c_char,
    ) -> OfxStatus,
    pub prop_set_double_n: unsafe extern "C" fn(
        OfxPropertySetHandle,
        *const c_char,
        c_int,
        *const c_double,
    ) -> OfxStatus,
    pub prop_set_int_n:
        unsafe extern "C" fn(OfxPropertySetHandle, *const c_char, c_int, *const c_int) -> OfxStatus,
    pub prop_get_pointer: unsafe extern "C" fn(
        OfxPropertySetHandle,
        *const c_char,
        c_int,
        *mut *mut c_void,
    ) -> OfxStatus,
    pub prop_get_string: unsafe extern "C" fn(
        OfxPropertySetHandle,
        *const c_char,
        c_int,
        *mut *mut c_char,
    ) -> OfxStatus,
    pub prop_get_double: unsafe extern "C" fn(
        OfxPropertySetHandle,
        *const c_char,
        c_int,
        *mut c_double,
    ) -> OfxStatus,
    pub prop_get_int:
        unsafe extern "C" fn(OfxPropertySetHandle, *const c_char, c_int, *mut c_int) -> OfxStatus,
    pub prop_get_pointer_n: unsafe extern "C" fn(
        OfxPropertySetHandle,
        *const c_char,
        c_int,
        *mut *mut c_void,
    ) -> OfxStatus,
    pub prop_get_string_n: unsafe extern "C" fn(
        OfxPropertySetHandle,
        *const c_char,
        c_int,
        *mut *mut c_char,
    ) -> OfxStatus,
    pub prop_get_double_n: unsafe extern "C" fn(
        OfxPropertySetHandle,
        *const c_char,
        c_int,
        *mut c_double,
    ) -> OfxStatus,
    pub prop_get_int_n:
        unsafe extern "C" fn(OfxPropertySetHandle, *const c_char, c_int, *mut c_int) -> OfxStatus,
    pub prop_reset: unsafe extern "C" fn(OfxPropertySetHandle, *const c_char) -> OfxStatus,
    pub prop_get_dimension:
        unsafe extern "C" fn(OfxPropertySetHandle, *const c_char, *mut c_int) -> OfxStatus,
}

/// `OfxImageEffectSuiteV1`.
#[repr(C)]
pub struct OfxImageEffectSuiteV1 {
    pub get_property_set:
        unsafe extern "C" fn(OfxImageEffectHandle, *mut OfxPropertySetHandle) -> OfxStatus,
    pub get_param_set:
        unsafe extern "C" fn(OfxImageEffectHandle, *mut OfxParamSetHandle) -> OfxStatus,
    pub clip_define: unsafe extern "C" fn(
        OfxImageEffectHandle,
        *const c_char,
        *mut OfxPropertySetHandle,
    ) -> OfxStatus,
    pub clip_get_handle: unsafe extern "C" fn(
        OfxImageEffectHandle,
        *const c_char,
        *mut OfxImageClipHandle,
        *mut OfxPropertySetHandle,
    ) -> OfxStatus,
    pub clip_get_property_set:
        unsafe extern "C" fn(OfxImageClipHandle, *mut OfxPropertySetHandle) -> OfxStatus,
    pub clip_get_image: unsafe extern "C" fn(
        OfxImageClipHandle,
        OfxTime,
        *const OfxRectD,
        *mut OfxPropertySetHandle,
    ) -> OfxStatus,
    pub clip_release_image: unsafe extern "C" fn(OfxPropertySetHandle) -> OfxStatus,
    pub clip_get_region_of_definition:
        unsafe extern "C" fn(OfxImageClipHandle, OfxTime, *mut OfxRectD) -> OfxStatus,
    pub abort: unsafe extern "C" fn(OfxImageEffectHandle) -> c_int,
    pub image_memory_alloc: unsafe extern "C" fn(
        OfxImageEffectHandle,
        usize,
        *mut OfxImageMemoryHandle,
    ) -> OfxStatus,
    pub image_memory_free: unsafe extern "C" fn(OfxImageMemoryHandle) -> OfxStatus,
    pub image_memory_lock:
        unsafe extern "C" fn(OfxImageMemoryHandle, *mut *mut c_void) -> OfxStatus,
    pub image_memory_unlock: unsafe extern "C" fn(OfxImageMemoryHandle) -> OfxStatus,
}

/// `OfxParameterSuiteV1`.
#[repr(C)]
pub struct OfxParameterSuiteV1 {
    pub param_define: unsafe extern "C" fn(
        OfxParamSetHandle,
        *const c_char,
        *const c_char,
        *mut OfxPropertySetHandle,
    ) -> OfxStatus,
    pub param_get_handle: unsafe extern "C" fn(
        OfxParamSetHandle,
        *const c_char,
        *mut OfxParamHandle,
        *mut OfxPropertySetHandle,
    ) -> OfxStatus,
    pub param_set_get_property_set:
        unsafe extern "C" fn(OfxParamSetHandle, *mut OfxPropertySetHandle) -> OfxStatus,
    pub param_get_property_set:
        unsafe extern "C" fn(OfxParamHandle, *mut OfxPropertySetHandle) -> OfxStatus,
    pub param_get_value: VariadicSlot,
    pub param_get_value_at_time: VariadicSlot,
    pub param_get_derivative: VariadicSlot,
    pub param_get_integral: VariadicSlot,
    pub param_set_value: VariadicSlot,
    pub param_set_value_at_time: VariadicSlot,
    pub param_get_num_keys: unsafe extern "C" fn(OfxParamHandle, *mut c_uint) -> OfxStatus,
    pub param_get_key_time:
        unsafe extern "C" fn(OfxParamHandle, c_uint, *mut OfxTime) -> OfxStatus,
    pub param_get_key_index:
        unsafe extern "C" fn(OfxParamHandle, OfxTime, c_int, *mut c_int) -> OfxStatus,
    pub param_delete_key: unsafe extern "C" fn(OfxParamHandle, OfxTime) -> OfxStatus,
    pub param_delete_all_keys: unsafe extern "C" fn(OfxParamHandle) -> OfxStatus,
    pub param_copy:
        unsafe extern "C" fn(OfxParamHandle, OfxParamHandle, OfxTime, *const OfxRangeD) -> OfxStatus,
    pub param_edit_begin: unsafe extern "C" fn(OfxParamSetHandle, *const c_char) -> OfxStatus,
    pub param_edit_end: unsafe extern "C" fn(OfxParamSetHandle) -> OfxStatus,
}
