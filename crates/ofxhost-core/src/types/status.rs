//! OFX status codes returned across the plugin ABI.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A raw `OfxStatus` value.
///
/// Plugins may return values outside the documented range, so this is a
/// transparent newtype rather than a closed enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(transparent)]
#[serde(transparent)]
pub struct Status(pub i32);

impl Status {
    /// The action completed.
    pub const OK: Self = Self(0);
    /// The action failed.
    pub const FAILED: Self = Self(1);
    /// A fatal error; the host should stop using the plugin.
    pub const ERR_FATAL: Self = Self(2);
    /// Unknown property or suite item.
    pub const ERR_UNKNOWN: Self = Self(3);
    /// The host lacks a feature the plugin requires.
    pub const ERR_MISSING_HOST_FEATURE: Self = Self(4);
    /// The request is not supported.
    pub const ERR_UNSUPPORTED: Self = Self(5);
    /// The object already exists.
    pub const ERR_EXISTS: Self = Self(6);
    /// Incorrect format.
    pub const ERR_FORMAT: Self = Self(7);
    /// Out of memory.
    pub const ERR_MEMORY: Self = Self(8);
    /// Bad or foreign handle.
    pub const ERR_BAD_HANDLE: Self = Self(9);
    /// Index out of range.
    pub const ERR_BAD_INDEX: Self = Self(10);
    /// Illegal value.
    pub const ERR_VALUE: Self = Self(11);
    /// Positive reply to a question action.
    pub const REPLY_YES: Self = Self(12);
    /// Negative reply to a question action.
    pub const REPLY_NO: Self = Self(13);
    /// The plugin asks the host to apply its default behaviour.
    pub const REPLY_DEFAULT: Self = Self(14);

    /// Whether this status lets the calling operation proceed.
    pub fn is_success(self) -> bool {
        self == Self::OK || self == Self::REPLY_DEFAULT
    }

    /// The symbolic OFX name of this status, if it is a known code.
    pub fn name(self) -> Option<&'static str> {
        let name = match self.0 {
            0 => "kOfxStatOK",
            1 => "kOfxStatFailed",
            2 => "kOfxStatErrFatal",
            3 => "kOfxStatErrUnknown",
            4 => "kOfxStatErrMissingHostFeature",
            5 => "kOfxStatErrUnsupported",
            6 => "kOfxStatErrExists",
            7 => "kOfxStatErrFormat",
            8 => "kOfxStatErrMemory",
            9 => "kOfxStatErrBadHandle",
            10 => "kOfxStatErrBadIndex",
            11 => "kOfxStatErrValue",
            12 => "kOfxStatReplyYes",
            13 => "kOfxStatReplyNo",
            14 => "kOfxStatReplyDefault",
            _ => return None,
        };
        Some(name)
    }
}

impl From<i32> for Status {
    fn from(code: i32) -> Self {
        Self(code)
    }
}

impl From<Status> for i32 {
    fn from(status: Status) -> Self {
        status.0
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => f.write_str(name),
            None => write!(f, "OfxStatus({})", self.0),
        }
    }
}
