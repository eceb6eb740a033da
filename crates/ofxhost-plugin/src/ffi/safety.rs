//! FFI safety wrappers, converting between C and Rust types.

use std::ffi::{CStr, c_char, c_int};

use ofxhost_core::error::HostError;
use ofxhost_core::result::HostResult;
use ofxhost_core::types::status::Status;

use super::abi::OfxStatus;

/// Safely converts a C string pointer to a Rust `String`.
///
/// Returns `None` if the pointer is null or the bytes are not UTF-8.
pub fn c_str_to_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    unsafe { CStr::from_ptr(ptr).to_str().ok().map(|s| s.to_string()) }
}

/// Borrow a NUL-terminated name passed in by a plugin.
///
/// # Safety
/// `ptr` must be null or a valid NUL-terminated string that outlives `'a`.
pub unsafe fn c_name<'a>(ptr: *const c_char) -> HostResult<&'a str> {
    if ptr.is_null() {
        return Err(HostError::bad_value("null name"));
    }
    unsafe { CStr::from_ptr(ptr) }
        .to_str()
        .map_err(|e| HostError::bad_value(format!("name is not UTF-8: {e}")))
}

/// Convert a C index or count, rejecting negatives.
pub fn to_index(value: c_int) -> HostResult<usize> {
    usize::try_from(value).map_err(|_| HostError::bad_index(format!("negative index {value}")))
}

/// Write through an out-pointer supplied by a plugin.
///
/// # Safety
/// `out` must be null or valid for a write of `T`.
pub unsafe fn write_out<T>(out: *mut T, value: T) -> HostResult<()> {
    if out.is_null() {
        return Err(HostError::bad_value("null return pointer"));
    }
    unsafe { out.write(value) };
    Ok(())
}

/// Collapse a suite call result into the status returned to the plugin.
pub fn to_status(result: HostResult<()>) -> OfxStatus {
    match result {
        Ok(()) => Status::OK.0,
        Err(err) => {
            tracing::trace!(error = %err, "Suite call rejected");
            err.status().0
        }
    }
}
