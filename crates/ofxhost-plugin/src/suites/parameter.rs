//! `OfxParameterSuiteV1`.
//!
//! Definition and property access are served here. Values, keys and
//! animation are owned by the host application's parameter engine; those
//! slots answer `kOfxStatErrUnsupported`, and the variadic ones are left
//! empty.

use std::ffi::{c_char, c_int, c_uint};

use ofxhost_core::error::HostError;
use ofxhost_core::types::status::Status;

use crate::ffi::abi::{
    OfxParamHandle, OfxParamSetHandle, OfxParameterSuiteV1, OfxPropertySetHandle, OfxRangeD,
    OfxStatus, OfxTime,
};
use crate::ffi::safety::{c_name, to_status, write_out};
use crate::image_effect::{Param, ParamSet};

/// The parameter suite served through `fetchSuite`.
pub static PARAMETER_SUITE_V1: OfxParameterSuiteV1 = OfxParameterSuiteV1 {
    param_define,
    param_get_handle,
    param_set_get_property_set,
    param_get_property_set,
    param_get_value: None,
    param_get_value_at_time: None,
    param_get_derivative: None,
    param_get_integral: None,
    param_set_value: None,
    param_set_value_at_time: None,
    param_get_num_keys,
    param_get_key_time,
    param_get_key_index,
    param_delete_key,
    param_delete_all_keys,
    param_copy,
    param_edit_begin,
    param_edit_end,
};

unsafe extern "C" fn param_define(
    param_set: OfxParamSetHandle,
    param_type: *const c_char,
    name: *const c_char,
    out: *mut OfxPropertySetHandle,
) -> OfxStatus {
    to_status((|| unsafe {
        let set = ParamSet::from_handle(param_set)?;
        let param = set.define(c_name(param_type)?, c_name(name)?)?;
        if out.is_null() {
            return Ok(());
        }
        write_out(out, param.properties().handle())
    })())
}

unsafe extern "C" fn param_get_handle(
    param_set: OfxParamSetHandle,
    name: *const c_char,
    param: *mut OfxParamHandle,
    props: *mut OfxPropertySetHandle,
) -> OfxStatus {
    to_status((|| unsafe {
        let set = ParamSet::from_handle(param_set)?;
        let name = c_name(name)?;
        let found = set
            .param(name)
            .ok_or_else(|| HostError::unknown(format!("no parameter '{name}'")))?;
        write_out(param, found.handle())?;
        if !props.is_null() {
            write_out(props, found.properties().handle())?;
        }
        Ok(())
    })())
}

unsafe extern "C" fn param_set_get_property_set(
    param_set: OfxParamSetHandle,
    out: *mut OfxPropertySetHandle,
) -> OfxStatus {
    to_status((|| unsafe {
        let set = ParamSet::from_handle(param_set)?;
        write_out(out, set.properties().handle())
    })())
}

unsafe extern "C" fn param_get_property_set(
    param: OfxParamHandle,
    out: *mut OfxPropertySetHandle,
) -> OfxStatus {
    to_status((|| unsafe {
        let param = Param::from_handle(param)?;
        write_out(out, param.properties().handle())
    })())
}

unsafe extern "C" fn param_get_num_keys(_param: OfxParamHandle, _out: *mut c_uint) -> OfxStatus {
    Status::ERR_UNSUPPORTED.0
}

unsafe extern "C" fn param_get_key_time(
    _param: OfxParamHandle,
    _nth: c_uint,
    _out: *mut OfxTime,
) -> OfxStatus {
    Status::ERR_UNSUPPORTED.0
}

unsafe extern "C" fn param_get_key_index(
    _param: OfxParamHandle,
    _time: OfxTime,
    _direction: c_int,
    _out: *mut c_int,
) -> OfxStatus {
    Status::ERR_UNSUPPORTED.0
}

unsafe extern "C" fn param_delete_key(_param: OfxParamHandle, _time: OfxTime) -> OfxStatus {
    Status::ERR_UNSUPPORTED.0
}

unsafe extern "C" fn param_delete_all_keys(_param: OfxParamHandle) -> OfxStatus {
    Status::ERR_UNSUPPORTED.0
}

unsafe extern "C" fn param_copy(
    _to: OfxParamHandle,
    _from: OfxParamHandle,
    _offset: OfxTime,
    _range: *const OfxRangeD,
) -> OfxStatus {
    Status::ERR_UNSUPPORTED.0
}

unsafe extern "C" fn param_edit_begin(
    _param_set: OfxParamSetHandle,
    _name: *const c_char,
) -> OfxStatus {
    Status::ERR_UNSUPPORTED.0
}

unsafe extern "C" fn param_edit_end(_param_set: OfxParamSetHandle) -> OfxStatus {
    Status::ERR_UNSUPPORTED.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CString;
    use std::sync::Arc;

    use crate::constants::{param_types, props};
    use crate::image_effect::{Effect, EffectKind};
    use crate::property::PropertySet;

    #[test]
    fn test_define_and_fetch_parameter() {
        let effect = Effect::new(EffectKind::Descriptor, Arc::new(PropertySet::new()));
        let set_handle = effect.params().handle();
        let kind = CString::new(param_types::DOUBLE).unwrap();
        let name = CString::new("radius").unwrap();

        let mut props_handle: OfxPropertySetHandle = std::ptr::null_mut();
        let status = unsafe {
            (PARAMETER_SUITE_V1.param_define)(set_handle, kind.as_ptr(), name.as_ptr(), &mut props_handle)
        };
        assert_eq!(status, Status::OK.0);

        let status = unsafe {
            (PARAMETER_SUITE_V1.param_define)(set_handle, kind.as_ptr(), name.as_ptr(), &mut props_handle)
        };
        assert_eq!(status, Status::ERR_EXISTS.0);

        let mut param: OfxParamHandle = std::ptr::null_mut();
        let status = unsafe {
            (PARAMETER_SUITE_V1.param_get_handle)(set_handle, name.as_ptr(), &mut param, std::ptr::null_mut())
        };
        assert_eq!(status, Status::OK.0);

        let mut fetched: OfxPropertySetHandle = std::ptr::null_mut();
        let status = unsafe { (PARAMETER_SUITE_V1.param_get_property_set)(param, &mut fetched) };
        assert_eq!(status, Status::OK.0);
        assert_eq!(fetched, props_handle);

        let props_set = unsafe { PropertySet::from_handle(fetched) }.unwrap();
        assert_eq!(
            props_set.get_string(props::PARAM_TYPE, 0).unwrap(),
            param_types::DOUBLE
        );
    }

    #[test]
    fn test_unknown_type_and_bad_handles() {
        let effect = Effect::new(EffectKind::Descriptor, Arc::new(PropertySet::new()));
        let kind = CString::new("OfxParamTypeBogus").unwrap();
        let name = CString::new("x").unwrap();
        let status = unsafe {
            (PARAMETER_SUITE_V1.param_define)(
                effect.params().handle(),
                kind.as_ptr(),
                name.as_ptr(),
                std::ptr::null_mut(),
            )
        };
        assert_eq!(status, Status::ERR_UNKNOWN.0);

        let mut out: OfxPropertySetHandle = std::ptr::null_mut();
        let status = unsafe {
            (PARAMETER_SUITE_V1.param_set_get_property_set)(effect.handle(), &mut out)
        };
        assert_eq!(status, Status::ERR_BAD_HANDLE.0);
        assert!(PARAMETER_SUITE_V1.param_get_value.is_none());
    }
}
