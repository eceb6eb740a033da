//! Convenience result type alias for the plugin host.

use crate::error::HostError;

/// A specialized `Result` type for host operations.
///
/// This is defined as a convenience so that every crate does not need to
/// write `Result<T, HostError>` explicitly.
pub type HostResult<T> = Result<T, HostError>;
