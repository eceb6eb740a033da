//! # ofxhost-core
//!
//! Core crate for the OFX plugin host. Contains the configuration schema,
//! the OFX status code type, logging initialization, and the unified
//! error system.
//!
//! This crate has **no** internal dependencies on other ofxhost crates.

pub mod config;
pub mod error;
pub mod logging;
pub mod result;
pub mod types;

pub use error::HostError;
pub use result::HostResult;
pub use types::status::Status;
