//! Host configuration schemas.
//!
//! All configuration structs are deserialized from TOML files via the
//! `config` crate. Each sub-module represents a logical configuration
//! section.

pub mod cache;
pub mod host;
pub mod logging;
pub mod plugin;

use serde::{Deserialize, Serialize};

use self::cache::CacheConfig;
use self::host::HostIdentityConfig;
use self::logging::LoggingConfig;
use self::plugin::PluginConfig;

use crate::error::HostError;

/// Root host configuration.
///
/// Every section has defaults, so an empty or missing file yields a
/// usable configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HostConfig {
    /// Identity and capabilities advertised to plugins.
    #[serde(default)]
    pub host: HostIdentityConfig,
    /// Plugin discovery settings.
    #[serde(default)]
    pub plugins: PluginConfig,
    /// Plugin cache file settings.
    #[serde(default)]
    pub cache: CacheConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl HostConfig {
    /// Load configuration from a TOML file.
    ///
    /// The file is optional. Values are overlaid with environment
    /// variables prefixed with `OFXHOST__`, e.g. `OFXHOST__CACHE__ENABLED=false`.
    pub fn load(path: &str) -> Result<Self, HostError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(
                config::Environment::with_prefix("OFXHOST")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| HostError::configuration(format!("Failed to build config: {e}")))?;

        config
            .try_deserialize()
            .map_err(|e| HostError::configuration(format!("Failed to deserialize config: {e}")))
    }
}
