//! `OfxImageEffectSuiteV1`.
//!
//! Descriptor-time calls are served here; image fetching and image memory
//! belong to the rendering engine and answer `kOfxStatErrUnsupported`.

use std::ffi::{c_char, c_int, c_void};

use ofxhost_core::error::HostError;
use ofxhost_core::types::status::Status;

use crate::ffi::abi::{
    OfxImageClipHandle, OfxImageEffectHandle, OfxImageEffectSuiteV1, OfxImageMemoryHandle,
    OfxParamSetHandle, OfxPropertySetHandle, OfxRectD, OfxStatus, OfxTime,
};
use crate::ffi::safety::{c_name, to_status, write_out};
use crate::image_effect::{Clip, Effect};

/// The image effect suite served through `fetchSuite`.
pub static IMAGE_EFFECT_SUITE_V1: OfxImageEffectSuiteV1 = OfxImageEffectSuiteV1 {
    get_property_set,
    get_param_set,
    clip_define,
    clip_get_handle,
    clip_get_property_set,
    clip_get_image,
    clip_release_image,
    clip_get_region_of_definition,
    abort,
    image_memory_alloc,
    image_memory_free,
    image_memory_lock,
    image_memory_unlock,
};

unsafe extern "C" fn get_property_set(
    effect: OfxImageEffectHandle,
    out: *mut OfxPropertySetHandle,
) -> OfxStatus {
    to_status((|| unsafe {
        let effect = Effect::from_handle(effect)?;
        write_out(out, effect.properties().handle())
    })())
}

unsafe extern "C" fn get_param_set(
    effect: OfxImageEffectHandle,
    out: *mut OfxParamSetHandle,
) -> OfxStatus {
    to_status((|| unsafe {
        let effect = Effect::from_handle(effect)?;
        write_out(out, effect.params().handle())
    })())
}

unsafe extern "C" fn clip_define(
    effect: OfxImageEffectHandle,
    name: *const c_char,
    out: *mut OfxPropertySetHandle,
) -> OfxStatus {
    to_status((|| unsafe {
        let effect = Effect::from_handle(effect)?;
        let clip = effect.define_clip(c_name(name)?)?;
        if out.is_null() {
            return Ok(());
        }
        write_out(out, clip.properties().handle())
    })())
}

unsafe extern "C" fn clip_get_handle(
    effect: OfxImageEffectHandle,
    name: *const c_char,
    clip: *mut OfxImageClipHandle,
    props: *mut OfxPropertySetHandle,
) -> OfxStatus {
    to_status((|| unsafe {
        let effect = Effect::from_handle(effect)?;
        let name = c_name(name)?;
        let found = effect
            .clip(name)
            .ok_or_else(|| HostError::unknown(format!("no clip '{name}'")))?;
        write_out(clip, found.handle())?;
        if !props.is_null() {
            write_out(props, found.properties().handle())?;
        }
        Ok(())
    })())
}

unsafe extern "C" fn clip_get_property_set(
    clip: OfxImageClipHandle,
    out: *mut OfxPropertySetHandle,
) -> OfxStatus {
    to_status((|| unsafe {
        let clip = Clip::from_handle(clip)?;
        write_out(out, clip.properties().handle())
    })())
}

unsafe extern "C" fn clip_get_image(
    _clip: OfxImageClipHandle,
    _time: OfxTime,
    _region: *const OfxRectD,
    _out: *mut OfxPropertySetHandle,
) -> OfxStatus {
    Status::ERR_UNSUPPORTED.0
}

unsafe extern "C" fn clip_release_image(_image: OfxPropertySetHandle) -> OfxStatus {
    Status::ERR_UNSUPPORTED.0
}

unsafe extern "C" fn clip_get_region_of_definition(
    _clip: OfxImageClipHandle,
    _time: OfxTime,
    _out: *mut OfxRectD,
) -> OfxStatus {
    Status::ERR_UNSUPPORTED.0
}

unsafe extern "C" fn abort(_effect: OfxImageEffectHandle) -> c_int {
    0
}

unsafe extern "C" fn image_memory_alloc(
    _effect: OfxImageEffectHandle,
    _bytes: usize,
    _out: *mut OfxImageMemoryHandle,
) -> OfxStatus {
    Status::ERR_UNSUPPORTED.0
}

unsafe extern "C" fn image_memory_free(_memory: OfxImageMemoryHandle) -> OfxStatus {
    Status::ERR_UNSUPPORTED.0
}

unsafe extern "C" fn image_memory_lock(
    _memory: OfxImageMemoryHandle,
    _out: *mut *mut c_void,
) -> OfxStatus {
    Status::ERR_UNSUPPORTED.0
}

unsafe extern "C" fn image_memory_unlock(_memory: OfxImageMemoryHandle) -> OfxStatus {
    Status::ERR_UNSUPPORTED.0
}
