//! Unified error types for the plugin host.
//!
//! All crates map their internal errors into [`HostError`] for consistent
//! propagation through the ? operator.

use std::fmt;

use thiserror::Error;

use crate::types::status::Status;

/// Top-level error kind categorization used across the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ErrorKind {
    /// A binary is unreadable or lacks the required exports.
    InvalidBinary,
    /// A plugin action returned a non-success status.
    ActionFailed,
    /// A property index is outside the property's dimension.
    BadIndex,
    /// A null, stale or foreign handle was passed in.
    BadHandle,
    /// An illegal value (such as NaN) was read or written.
    BadValue,
    /// An unknown property, or a property accessed with the wrong type.
    Unknown,
    /// The host declined to support a plugin.
    UnsupportedPlugin,
    /// An operation was attempted in the wrong lifecycle state.
    InvalidState,
    /// The requested plugin, context or file was not found.
    NotFound,
    /// An object of that name already exists.
    AlreadyExists,
    /// The plugin cache file could not be read or written.
    Cache,
    /// A configuration error occurred.
    Configuration,
    /// A serialization/deserialization error occurred.
    Serialization,
    /// A filesystem error occurred.
    Io,
    /// An internal error occurred.
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidBinary => write!(f, "INVALID_BINARY"),
            Self::ActionFailed => write!(f, "ACTION_FAILED"),
            Self::BadIndex => write!(f, "BAD_INDEX"),
            Self::BadHandle => write!(f, "BAD_HANDLE"),
            Self::BadValue => write!(f, "BAD_VALUE"),
            Self::Unknown => write!(f, "UNKNOWN"),
            Self::UnsupportedPlugin => write!(f, "UNSUPPORTED_PLUGIN"),
            Self::InvalidState => write!(f, "INVALID_STATE"),
            Self::NotFound => write!(f, "NOT_FOUND"),
            Self::AlreadyExists => write!(f, "ALREADY_EXISTS"),
            Self::Cache => write!(f, "CACHE"),
            Self::Configuration => write!(f, "CONFIGURATION"),
            Self::Serialization => write!(f, "SERIALIZATION"),
            Self::Io => write!(f, "IO"),
            Self::Internal => write!(f, "INTERNAL"),
        }
    }
}

/// The unified error used throughout the host.
///
/// Action failures carry the action name and the status the plugin
/// returned so that callers can decide how to surface them.
#[derive(Debug, Error)]
#[error("{kind}: {message}")]
pub struct HostError {
    /// The category of error.
    pub kind: ErrorKind,
    /// A human-readable error message.
    pub message: String,
    /// The action that failed, for [`ErrorKind::ActionFailed`].
    pub action: Option<String>,
    /// The status returned by the plugin, for [`ErrorKind::ActionFailed`].
    pub status: Option<Status>,
    /// Optional underlying cause.
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl HostError {
    /// Create a new host error.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            action: None,
            status: None,
            source: None,
        }
    }

    /// Create a new host error with an underlying cause.
    pub fn with_source(
        kind: ErrorKind,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            source: Some(Box::new(source)),
            ..Self::new(kind, message)
        }
    }

    /// Create an invalid-binary error.
    pub fn invalid_binary(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidBinary, message)
    }

    /// Create an action failure for `action`, which returned `status`.
    pub fn action_failed(action: impl Into<String>, status: Status) -> Self {
        let action = action.into();
        Self {
            action: Some(action.clone()),
            status: Some(status),
            ..Self::new(
                ErrorKind::ActionFailed,
                format!("{action} returned {status}"),
            )
        }
    }

    /// Create a bad-index error.
    pub fn bad_index(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::BadIndex, message)
    }

    /// Create a bad-handle error.
    pub fn bad_handle(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::BadHandle, message)
    }

    /// Create a bad-value error.
    pub fn bad_value(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::BadValue, message)
    }

    /// Create an unknown-property error.
    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unknown, message)
    }

    /// Create an unsupported-plugin error.
    pub fn unsupported_plugin(reason: impl Into<String>) -> Self {
        Self::new(ErrorKind::UnsupportedPlugin, reason)
    }

    /// Create an invalid-state error.
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidState, message)
    }

    /// Create a not-found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    /// Create an already-exists error.
    pub fn already_exists(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::AlreadyExists, message)
    }

    /// Create a cache error.
    pub fn cache(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Cache, message)
    }

    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Configuration, message)
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    /// The OFX status that best reports this error to a plugin.
    pub fn status(&self) -> Status {
        match self.kind {
            ErrorKind::ActionFailed => self.status.unwrap_or(Status::FAILED),
            ErrorKind::BadIndex => Status::ERR_BAD_INDEX,
            ErrorKind::BadHandle => Status::ERR_BAD_HANDLE,
            ErrorKind::BadValue => Status::ERR_VALUE,
            ErrorKind::Unknown | ErrorKind::NotFound => Status::ERR_UNKNOWN,
            ErrorKind::UnsupportedPlugin => Status::ERR_UNSUPPORTED,
            ErrorKind::AlreadyExists => Status::ERR_EXISTS,
            ErrorKind::Serialization => Status::ERR_FORMAT,
            _ => Status::FAILED,
        }
    }
}

impl Clone for HostError {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind,
            message: self.message.clone(),
            action: self.action.clone(),
            status: self.status,
            source: None,
        }
    }
}

impl From<serde_json::Error> for HostError {
    fn from(err: serde_json::Error) -> Self {
        Self::with_source(
            ErrorKind::Serialization,
            format!("JSON serialization error: {err}"),
            err,
        )
    }
}

impl From<std::io::Error> for HostError {
    fn from(err: std::io::Error) -> Self {
        Self::with_source(ErrorKind::Io, format!("I/O error: {err}"), err)
    }
}

impl From<config::ConfigError> for HostError {
    fn from(err: config::ConfigError) -> Self {
        Self::with_source(
            ErrorKind::Configuration,
            format!("Configuration error: {err}"),
            err,
        )
    }
}
