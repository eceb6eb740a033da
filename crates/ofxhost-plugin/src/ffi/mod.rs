//! C ABI types, conversion helpers and the in-memory library backend.

pub mod abi;
#[cfg(feature = "mock")]
pub mod mock;
pub mod safety;
