//! `OfxPropertySuiteV1`, the plugin-facing view of [`PropertySet`].
//!
//! Every entry point resolves the handle, then forwards to the typed
//! accessors. Foreign handles report `kOfxStatErrBadHandle`; unknown
//! names and kind mismatches report `kOfxStatErrUnknown`.

use std::ffi::{c_char, c_double, c_int, c_void};

use ofxhost_core::result::HostResult;

use crate::ffi::abi::{OfxPropertySetHandle, OfxPropertySuiteV1, OfxStatus};
use crate::ffi::safety::{c_name, c_str_to_string, to_index, to_status, write_out};

use super::set::PropertySet;
use super::value::{PropertyKind, RawPointer};

/// The property suite served through `fetchSuite`.
pub static PROPERTY_SUITE_V1: OfxPropertySuiteV1 = OfxPropertySuiteV1 {
    prop_set_pointer,
    prop_set_string,
    prop_set_double,
    prop_set_int,
    prop_set_pointer_n,
    prop_set_string_n,
    prop_set_double_n,
    prop_set_int_n,
    prop_get_pointer,
    prop_get_string,
    prop_get_double,
    prop_get_int,
    prop_get_pointer_n,
    prop_get_string_n,
    prop_get_double_n,
    prop_get_int_n,
    prop_reset,
    prop_get_dimension,
};

/// Run `f` against the set behind `handle` and the property `name`.
unsafe fn with_set(
    handle: OfxPropertySetHandle,
    name: *const c_char,
    f: impl FnOnce(&PropertySet, &str) -> HostResult<()>,
) -> OfxStatus {
    to_status((|| {
        let set = unsafe { PropertySet::from_handle(handle)? };
        let name = unsafe { c_name(name)? };
        f(set, name)
    })())
}

unsafe fn set_one<T: PropertyKind>(
    handle: OfxPropertySetHandle,
    name: *const c_char,
    index: c_int,
    value: T,
) -> OfxStatus {
    unsafe {
        with_set(handle, name, |set, name| {
            set.plugin_set(name, to_index(index)?, value)
        })
    }
}

unsafe fn set_many<T: PropertyKind, C: Copy>(
    handle: OfxPropertySetHandle,
    name: *const c_char,
    count: c_int,
    values: *const C,
    convert: impl Fn(C) -> HostResult<T>,
) -> OfxStatus {
    unsafe {
        with_set(handle, name, |set, name| {
            let count = to_index(count)?;
            if count > 0 && values.is_null() {
                return Err(ofxhost_core::HostError::bad_value("null value array"));
            }
            let raw = if count == 0 {
                &[][..]
            } else {
                std::slice::from_raw_parts(values, count)
            };
            let converted = raw
                .iter()
                .map(|value| convert(*value))
                .collect::<HostResult<Vec<T>>>()?;
            set.plugin_set_all(name, &converted)
        })
    }
}

unsafe fn get_one<T: PropertyKind, C>(
    handle: OfxPropertySetHandle,
    name: *const c_char,
    index: c_int,
    out: *mut C,
    convert: impl Fn(T) -> C,
) -> OfxStatus {
    unsafe {
        with_set(handle, name, |set, name| {
            let value = set.get::<T>(name, to_index(index)?)?;
            write_out(out, convert(value))
        })
    }
}

unsafe fn get_many<T: PropertyKind, C>(
    handle: OfxPropertySetHandle,
    name: *const c_char,
    count: c_int,
    out: *mut C,
    convert: impl Fn(T) -> C,
) -> OfxStatus {
    unsafe {
        with_set(handle, name, |set, name| {
            let count = to_index(count)?;
            for index in 0..count {
                let value = set.get::<T>(name, index)?;
                write_out(out.add(index), convert(value))?;
            }
            Ok(())
        })
    }
}

fn string_from_c(ptr: *const c_char) -> HostResult<String> {
    c_str_to_string(ptr).ok_or_else(|| ofxhost_core::HostError::bad_value("invalid string"))
}

unsafe extern "C" fn prop_set_pointer(
    handle: OfxPropertySetHandle,
    name: *const c_char,
    index: c_int,
    value: *mut c_void,
) -> OfxStatus {
    unsafe { set_one(handle, name, index, RawPointer::from_ptr(value)) }
}

unsafe extern "C" fn prop_set_string(
    handle: OfxPropertySetHandle,
    name: *const c_char,
    index: c_int,
    value: *const c_char,
) -> OfxStatus {
    match string_from_c(value) {
        Ok(value) => unsafe { set_one(handle, name, index, value) },
        Err(err) => to_status(Err(err)),
    }
}

unsafe extern "C" fn prop_set_double(
    handle: OfxPropertySetHandle,
    name: *const c_char,
    index: c_int,
    value: c_double,
) -> OfxStatus {
    unsafe { set_one(handle, name, index, value) }
}

unsafe extern "C" fn prop_set_int(
    handle: OfxPropertySetHandle,
    name: *const c_char,
    index: c_int,
    value: c_int,
) -> OfxStatus {
    unsafe { set_one(handle, name, index, value) }
}

unsafe extern "C" fn prop_set_pointer_n(
    handle: OfxPropertySetHandle,
    name: *const c_char,
    count: c_int,
    values: *const *mut c_void,
) -> OfxStatus {
    unsafe { set_many(handle, name, count, values, |v| Ok(RawPointer::from_ptr(v))) }
}

unsafe extern "C" fn prop_set_string_n(
    handle: OfxPropertySetHandle,
    name: *const c_char,
    count: c_int,
    values: *const *const c_char,
) -> OfxStatus {
    unsafe { set_many(handle, name, count, values, string_from_c) }
}

unsafe extern "C" fn prop_set_double_n(
    handle: OfxPropertySetHandle,
    name: *const c_char,
    count: c_int,
    values: *const c_double,
) -> OfxStatus {
    unsafe { set_many(handle, name, count, values, Ok::<f64, _>) }
}

unsafe extern "C" fn prop_set_int_n(
    handle: OfxPropertySetHandle,
    name: *const c_char,
    count: c_int,
    values: *const c_int,
) -> OfxStatus {
    unsafe { set_many(handle, name, count, values, Ok::<i32, _>) }
}

unsafe extern "C" fn prop_get_pointer(
    handle: OfxPropertySetHandle,
    name: *const c_char,
    index: c_int,
    out: *mut *mut c_void,
) -> OfxStatus {
    unsafe { get_one(handle, name, index, out, |p: RawPointer| p.as_ptr()) }
}

unsafe extern "C" fn prop_get_string(
    handle: OfxPropertySetHandle,
    name: *const c_char,
    index: c_int,
    out: *mut *mut c_char,
) -> OfxStatus {
    unsafe {
        with_set(handle, name, |set, name| {
            let ptr = set.c_string(name, to_index(index)?)?;
            write_out(out, ptr as *mut c_char)
        })
    }
}

unsafe extern "C" fn prop_get_double(
    handle: OfxPropertySetHandle,
    name: *const c_char,
    index: c_int,
    out: *mut c_double,
) -> OfxStatus {
    unsafe { get_one(handle, name, index, out, |v: f64| v) }
}

unsafe extern "C" fn prop_get_int(
    handle: OfxPropertySetHandle,
    name: *const c_char,
    index: c_int,
    out: *mut c_int,
) -> OfxStatus {
    unsafe { get_one(handle, name, index, out, |v: i32| v) }
}

unsafe extern "C" fn prop_get_pointer_n(
    handle: OfxPropertySetHandle,
    name: *const c_char,
    count: c_int,
    out: *mut *mut c_void,
) -> OfxStatus {
    unsafe { get_many(handle, name, count, out, |p: RawPointer| p.as_ptr()) }
}

unsafe extern "C" fn prop_get_string_n(
    handle: OfxPropertySetHandle,
    name: *const c_char,
    count: c_int,
    out: *mut *mut c_char,
) -> OfxStatus {
    unsafe {
        with_set(handle, name, |set, name| {
            let count = to_index(count)?;
            for index in 0..count {
                let ptr = set.c_string(name, index)?;
                write_out(out.add(index), ptr as *mut c_char)?;
            }
            Ok(())
        })
    }
}

unsafe extern "C" fn prop_get_double_n(
    handle: OfxPropertySetHandle,
    name: *const c_char,
    count: c_int,
    out: *mut c_double,
) -> OfxStatus {
    unsafe { get_many(handle, name, count, out, |v: f64| v) }
}

unsafe extern "C" fn prop_get_int_n(
    handle: OfxPropertySetHandle,
    name: *const c_char,
    count: c_int,
    out: *mut c_int,
) -> OfxStatus {
    unsafe { get_many(handle, name, count, out, |v: i32| v) }
}

unsafe extern "C" fn prop_reset(handle: OfxPropertySetHandle, name: *const c_char) -> OfxStatus {
    unsafe { with_set(handle, name, |set, name| set.reset(name)) }
}

unsafe extern "C" fn prop_get_dimension(
    handle: OfxPropertySetHandle,
    name: *const c_char,
    out: *mut c_int,
) -> OfxStatus {
    unsafe {
        with_set(handle, name, |set, name| {
            let count = c_int::try_from(set.dimension(name)?).unwrap_or(c_int::MAX);
            write_out(out, count)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::{CStr, CString};

    use ofxhost_core::types::status::Status;

    use crate::property::spec::PropSpec;

    const SPECS: &[PropSpec] = &[
        PropSpec::double("OfxImageEffectPropRenderScale", 2, false, 1.0),
        PropSpec::string("OfxPropLabel", 1, false, ""),
        PropSpec::string("OfxPropType", 1, true, "OfxTypeImageEffect"),
        PropSpec::int("OfxImageEffectPropSupportsTiles", 1, false, 1),
    ];

    fn name(s: &str) -> CString {
        CString::new(s).unwrap()
    }

    #[test]
    fn test_suite_reads_and_writes_through_handle() {
        let set = PropertySet::from_specs(SPECS);
        let suite = &PROPERTY_SUITE_V1;
        let label = name("OfxPropLabel");
        let value = name("Blur");

        unsafe {
            assert_eq!(
                (suite.prop_set_string)(set.handle(), label.as_ptr(), 0, value.as_ptr()),
                Status::OK.0
            );
            let mut out: *mut c_char = std::ptr::null_mut();
            assert_eq!(
                (suite.prop_get_string)(set.handle(), label.as_ptr(), 0, &mut out),
                Status::OK.0
            );
            assert_eq!(CStr::from_ptr(out).to_str().unwrap(), "Blur");
        }
    }

    #[test]
    fn test_suite_status_codes() {
        let set = PropertySet::from_specs(SPECS);
        let suite = &PROPERTY_SUITE_V1;
        let scale = name("OfxImageEffectPropRenderScale");
        let tiles = name("OfxImageEffectPropSupportsTiles");
        let kind = name("OfxPropType");
        let missing = name("NoSuchProperty");
        let text = name("x");

        unsafe {
            assert_eq!(
                (suite.prop_set_double)(set.handle(), scale.as_ptr(), 2, 0.5),
                Status::ERR_BAD_INDEX.0
            );
            assert_eq!(
                (suite.prop_set_double)(set.handle(), scale.as_ptr(), 0, f64::NAN),
                Status::ERR_VALUE.0
            );
            assert_eq!(
                (suite.prop_set_int)(set.handle(), scale.as_ptr(), 0, 1),
                Status::ERR_UNKNOWN.0
            );
            assert_eq!(
                (suite.prop_set_int)(set.handle(), missing.as_ptr(), 0, 1),
                Status::ERR_UNKNOWN.0
            );
            assert_eq!(
                (suite.prop_set_string)(set.handle(), kind.as_ptr(), 0, text.as_ptr()),
                Status::ERR_VALUE.0
            );
            assert_eq!(
                (suite.prop_set_int)(std::ptr::null_mut(), tiles.as_ptr(), 0, 1),
                Status::ERR_BAD_HANDLE.0
            );
        }
    }

    #[test]
    fn test_suite_n_accessors_and_dimension() {
        let set = PropertySet::from_specs(SPECS);
        let suite = &PROPERTY_SUITE_V1;
        let scale = name("OfxImageEffectPropRenderScale");
        let input = [0.25f64, 0.5];
        let mut output = [0.0f64; 2];
        let mut dimension: c_int = 0;

        unsafe {
            assert_eq!(
                (suite.prop_set_double_n)(set.handle(), scale.as_ptr(), 2, input.as_ptr()),
                Status::OK.0
            );
            assert_eq!(
                (suite.prop_get_double_n)(set.handle(), scale.as_ptr(), 2, output.as_mut_ptr()),
                Status::OK.0
            );
            assert_eq!(
                (suite.prop_get_dimension)(set.handle(), scale.as_ptr(), &mut dimension),
                Status::OK.0
            );
        }
        assert_eq!(output, input);
        assert_eq!(dimension, 2);
    }
}
