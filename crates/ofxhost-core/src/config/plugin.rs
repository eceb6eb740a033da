//! Plugin discovery configuration.

use serde::{Deserialize, Serialize};

/// Where and how plugin bundles are searched for.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginConfig {
    /// Extra search roots, scanned recursively, appended after the
    /// environment variable entries.
    #[serde(default)]
    pub search_paths: Vec<String>,
    /// Search roots that are scanned one level deep only.
    #[serde(default)]
    pub non_recursive_paths: Vec<String>,
    /// Whether the platform-standard OFX plugin directory is searched.
    #[serde(default = "default_true")]
    pub use_standard_locations: bool,
    /// Environment variable holding a path list of search roots.
    #[serde(default = "default_path_env_var")]
    pub path_env_var: String,
    /// Host identifiers whose standard sibling directory is searched too.
    #[serde(default)]
    pub host_paths: Vec<String>,
    /// Whether plugin directories are remembered for file lookups.
    #[serde(default)]
    pub enable_plugin_seek: bool,
}

impl Default for PluginConfig {
    fn default() -> Self {
        Self {
            search_paths: Vec::new(),
            non_recursive_paths: Vec::new(),
            use_standard_locations: true,
            path_env_var: default_path_env_var(),
            host_paths: Vec::new(),
            enable_plugin_seek: false,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_path_env_var() -> String {
    "OFX_PLUGIN_PATH".to_string()
}
