//! Suite lookup for `OfxHost::fetchSuite`.

pub mod image_effect;
pub mod parameter;

use std::ffi::{c_char, c_int, c_void};

use tracing::debug;

use crate::constants::suites;
use crate::ffi::abi::OfxPropertySetHandle;
use crate::ffi::safety::c_str_to_string;
use crate::property::suite::PROPERTY_SUITE_V1;

pub use image_effect::IMAGE_EFFECT_SUITE_V1;
pub use parameter::PARAMETER_SUITE_V1;

/// Address of the suite `name` at `version`, or null when not served.
pub fn suite(name: &str, version: i32) -> *const c_void {
    match (name, version) {
        (suites::PROPERTY, 1) => &PROPERTY_SUITE_V1 as *const _ as *const c_void,
        (suites::IMAGE_EFFECT, 1) => &IMAGE_EFFECT_SUITE_V1 as *const _ as *const c_void,
        (suites::PARAMETER, 1) => &PARAMETER_SUITE_V1 as *const _ as *const c_void,
        _ => {
            debug!(suite = %name, version, "Suite not provided");
            std::ptr::null()
        }
    }
}

/// The `fetchSuite` function handed to plugins.
///
/// # Safety
/// `suite_name` must be null or a NUL-terminated string.
pub unsafe extern "C" fn fetch_suite(
    _host: OfxPropertySetHandle,
    suite_name: *const c_char,
    suite_version: c_int,
) -> *const c_void {
    match c_str_to_string(suite_name) {
        Some(name) => suite(&name, suite_version),
        None => std::ptr::null(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_suites_are_served() {
        assert!(!suite(suites::PROPERTY, 1).is_null());
        assert!(!suite(suites::IMAGE_EFFECT, 1).is_null());
        assert!(!suite(suites::PARAMETER, 1).is_null());
        assert!(suite(suites::PROPERTY, 2).is_null());
        assert!(suite("OfxMultiThreadSuite", 1).is_null());
    }

    #[test]
    fn test_fetch_suite_reads_c_names() {
        let name = std::ffi::CString::new(suites::PROPERTY).unwrap();
        let found = unsafe { fetch_suite(std::ptr::null_mut(), name.as_ptr(), 1) };
        assert_eq!(found, suite(suites::PROPERTY, 1));
        let missing = unsafe { fetch_suite(std::ptr::null_mut(), std::ptr::null(), 1) };
        assert!(missing.is_null());
    }
}
