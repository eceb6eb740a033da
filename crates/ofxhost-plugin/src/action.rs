//! The closed set of actions a host sends through `mainEntry`.
//!
//! [`Action::c_name`] is the only place action names are spelled out;
//! call sites use the enum and go through [`invoke`] to cross the ABI.

use std::ffi::{CStr, c_void};
use std::fmt;
use std::str::FromStr;

use tracing::{debug, trace};

use ofxhost_core::error::HostError;
use ofxhost_core::types::status::Status;

use crate::ffi::abi::{MainEntryFn, OfxPropertySetHandle};
use crate::property::PropertySet;

/// An action understood by image effect plugins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Load,
    Describe,
    Unload,
    PurgeCaches,
    SyncPrivateData,
    CreateInstance,
    DestroyInstance,
    InstanceChanged,
    BeginInstanceChanged,
    EndInstanceChanged,
    BeginInstanceEdit,
    EndInstanceEdit,
    DescribeInContext,
    GetRegionOfDefinition,
    GetRegionsOfInterest,
    GetTimeDomain,
    GetFramesNeeded,
    GetClipPreferences,
    IsIdentity,
    Render,
    BeginSequenceRender,
    EndSequenceRender,
}

impl Action {
    /// Every action, in protocol order where one exists.
    pub const ALL: [Action; 22] = [
        Action::Load,
        Action::Describe,
        Action::DescribeInContext,
        Action::CreateInstance,
        Action::BeginInstanceChanged,
        Action::InstanceChanged,
        Action::EndInstanceChanged,
        Action::BeginInstanceEdit,
        Action::EndInstanceEdit,
        Action::PurgeCaches,
        Action::SyncPrivateData,
        Action::GetRegionOfDefinition,
        Action::GetRegionsOfInterest,
        Action::GetTimeDomain,
        Action::GetFramesNeeded,
        Action::GetClipPreferences,
        Action::IsIdentity,
        Action::BeginSequenceRender,
        Action::Render,
        Action::EndSequenceRender,
        Action::DestroyInstance,
        Action::Unload,
    ];

    /// The action string passed to `mainEntry`.
    pub fn c_name(self) -> &'static CStr {
        match self {
            Self::Load => c"OfxActionLoad",
            Self::Describe => c"OfxActionDescribe",
            Self::Unload => c"OfxActionUnload",
            Self::PurgeCaches => c"OfxActionPurgeCaches",
            Self::SyncPrivateData => c"OfxActionSyncPrivateData",
            Self::CreateInstance => c"OfxActionCreateInstance",
            Self::DestroyInstance => c"OfxActionDestroyInstance",
            Self::InstanceChanged => c"OfxActionInstanceChanged",
            Self::BeginInstanceChanged => c"OfxActionBeginInstanceChanged",
            Self::EndInstanceChanged => c"OfxActionEndInstanceChanged",
            Self::BeginInstanceEdit => c"OfxActionBeginInstanceEdit",
            Self::EndInstanceEdit => c"OfxActionEndInstanceEdit",
            Self::DescribeInContext => c"OfxImageEffectActionDescribeInContext",
            Self::GetRegionOfDefinition => c"OfxImageEffectActionGetRegionOfDefinition",
            Self::GetRegionsOfInterest => c"OfxImageEffectActionGetRegionsOfInterest",
            Self::GetTimeDomain => c"OfxImageEffectActionGetTimeDomain",
            Self::GetFramesNeeded => c"OfxImageEffectActionGetFramesNeeded",
            Self::GetClipPreferences => c"OfxImageEffectActionGetClipPreferences",
            Self::IsIdentity => c"OfxImageEffectActionIsIdentity",
            Self::Render => c"OfxImageEffectActionRender",
            Self::BeginSequenceRender => c"OfxImageEffectActionBeginSequenceRender",
            Self::EndSequenceRender => c"OfxImageEffectActionEndSequenceRender",
        }
    }

    /// The action string as UTF-8.
    pub fn as_str(self) -> &'static str {
        // Every literal above is ASCII.
        self.c_name().to_str().unwrap_or_default()
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = HostError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|action| action.as_str() == s)
            .ok_or_else(|| HostError::unknown(format!("unknown action '{s}'")))
    }
}

fn args_handle(args: Option<&PropertySet>) -> OfxPropertySetHandle {
    args.map_or(std::ptr::null_mut(), PropertySet::handle)
}

/// Call `entry` with `action`.
///
/// This is the single crossing point into plugin code for actions. The
/// call blocks for as long as the plugin runs.
///
/// # Safety
/// `entry` must be a live `mainEntry` of a loaded binary, and `handle`
/// must be null or a handle the plugin may receive for `action`.
pub unsafe fn invoke(
    entry: MainEntryFn,
    action: Action,
    handle: *const c_void,
    in_args: Option<&PropertySet>,
    out_args: Option<&PropertySet>,
    plugin_id: &str,
) -> Status {
    trace!(plugin_id = %plugin_id, action = %action, "Dispatching action");
    let status = Status(unsafe {
        entry(
            action.c_name().as_ptr(),
            handle,
            args_handle(in_args),
            args_handle(out_args),
        )
    });
    debug!(plugin_id = %plugin_id, action = %action, status = %status, "Action returned");
    status
}
