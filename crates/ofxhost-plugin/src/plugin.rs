//! The API-independent record of one exported plugin.

use std::fmt;
use std::sync::Arc;

use ofxhost_core::error::HostError;
use ofxhost_core::result::HostResult;

use crate::binary::BinaryInfo;
use crate::ffi::abi::OfxPlugin;
use crate::ffi::safety::c_str_to_string;

/// Identity of a plugin within its binary.
#[derive(Clone)]
pub struct Plugin {
    binary: Arc<BinaryInfo>,
    index: usize,
    api: String,
    api_version: i32,
    identifier: String,
    raw_identifier: String,
    version_major: u32,
    version_minor: u32,
}

impl Plugin {
    /// Build a record from cached values.
    pub fn new(
        binary: Arc<BinaryInfo>,
        index: usize,
        api: impl Into<String>,
        api_version: i32,
        identifier: impl Into<String>,
        version_major: u32,
        version_minor: u32,
    ) -> Self {
        let raw_identifier = identifier.into();
        Self {
            binary,
            index,
            api: api.into(),
            api_version,
            identifier: raw_identifier.clone(),
            raw_identifier,
            version_major,
            version_minor,
        }
    }

    /// Build a record from the struct returned by `OfxGetPlugin`.
    pub fn from_raw(binary: Arc<BinaryInfo>, index: usize, raw: &OfxPlugin) -> HostResult<Self> {
        let api = c_str_to_string(raw.plugin_api).ok_or_else(|| {
            HostError::invalid_binary(format!("plugin {index} has no API name"))
        })?;
        let identifier = c_str_to_string(raw.plugin_identifier).ok_or_else(|| {
            HostError::invalid_binary(format!("plugin {index} has no identifier"))
        })?;
        Ok(Self::new(
            binary,
            index,
            api,
            raw.api_version,
            identifier,
            raw.plugin_version_major,
            raw.plugin_version_minor,
        ))
    }

    /// The binary exporting this plugin.
    pub fn binary(&self) -> &Arc<BinaryInfo> {
        &self.binary
    }

    /// Position in the binary's export table.
    pub fn index(&self) -> usize {
        self.index
    }

    /// API implemented, e.g. `OfxImageEffectPluginAPI`.
    pub fn api(&self) -> &str {
        &self.api
    }

    /// Version of the API implemented.
    pub fn api_version(&self) -> i32 {
        self.api_version
    }

    /// Lookup key.
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Identifier exactly as exported.
    pub fn raw_identifier(&self) -> &str {
        &self.raw_identifier
    }

    /// Major version.
    pub fn version_major(&self) -> u32 {
        self.version_major
    }

    /// Minor version.
    pub fn version_minor(&self) -> u32 {
        self.version_minor
    }

    /// `major.minor`.
    pub fn version_label(&self) -> String {
        format!("{}.{}", self.version_major, self.version_minor)
    }
}

impl fmt::Debug for Plugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Plugin")
            .field("identifier", &self.identifier)
            .field("version", &self.version_label())
            .field("api", &self.api)
            .field("api_version", &self.api_version)
            .field("index", &self.index)
            .field("binary", &self.binary.file_path())
            .finish()
    }
}
