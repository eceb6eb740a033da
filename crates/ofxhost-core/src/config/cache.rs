//! Plugin cache file configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Location and version tag of the on-disk plugin cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Whether the cache file is read at startup and written after scans.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Directory holding the cache file.
    #[serde(default = "default_directory")]
    pub directory: String,
    /// Version tag; a cache written with a different tag is ignored.
    #[serde(default = "default_version")]
    pub version: String,
}

impl CacheConfig {
    /// Full path of the cache file for the configured version.
    pub fn file_path(&self) -> PathBuf {
        PathBuf::from(&self.directory).join(format!("OFXCache_{}.xml", self.version))
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            directory: default_directory(),
            version: default_version(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_directory() -> String {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("ofxhost")
        .join("OFXLoadCache")
        .to_string_lossy()
        .into_owned()
}

fn default_version() -> String {
    format!("ofxhost_{}_OFXCachev1", env!("CARGO_PKG_VERSION"))
}
