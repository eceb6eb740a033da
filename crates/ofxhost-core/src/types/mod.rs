//! Shared value types.

pub mod status;
