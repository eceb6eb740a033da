//! # ofxhost-plugin
//!
//! OFX image effect plugin hosting. Provides:
//!
//! - Reference-counted shared-object loading with file stamping
//! - Plugin binary enumeration through `OfxGetNumberOfPlugins`/`OfxGetPlugin`
//! - Typed property sets shared with plugins through the property suite
//! - The XML plugin cache with staleness detection
//! - A registry resolving plugins by identifier, version and label
//! - The action protocol, from `Load` through instance rendering

pub mod action;
pub mod api;
pub mod binary;
pub mod cache;
pub mod constants;
pub mod ffi;
pub mod handle;
pub mod host;
pub mod image_effect;
pub mod library;
pub mod plugin;
pub mod property;
pub mod registry;
pub mod runtime;
pub mod suites;

pub use action::Action;
pub use api::{HostedPlugin, PluginApiHandler};
pub use binary::{BinaryInfo, PluginBinary, StaticPlugins};
pub use cache::{PluginCache, ScanReport, SearchPath};
pub use handle::PluginHandle;
pub use host::{DefaultHost, Host, HostContext};
pub use image_effect::{Descriptor, ImageEffectApi, ImageEffectPlugin, Instance, InstanceState};
pub use library::{DynamicLibrary, FileStamp, LibraryBackend, LibraryGuard, NativeBackend};
pub use plugin::Plugin;
pub use property::{PropertySet, PropertyType};
pub use registry::PluginRegistry;
pub use runtime::HostRuntime;
