//! Host identity and capability configuration.

use serde::{Deserialize, Serialize};

/// What the host tells plugins about itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostIdentityConfig {
    /// Unique host identifier, e.g. `"com.example.ofxhost"`.
    #[serde(default = "default_name")]
    pub name: String,
    /// Human-readable host label.
    #[serde(default = "default_label")]
    pub label: String,
    /// Image effect contexts the host can instantiate plugins in.
    #[serde(default = "default_contexts")]
    pub supported_contexts: Vec<String>,
    /// Pixel depths the host can hand to plugins.
    #[serde(default = "default_pixel_depths")]
    pub supported_pixel_depths: Vec<String>,
    /// Pixel components the host can hand to plugins.
    #[serde(default = "default_components")]
    pub supported_components: Vec<String>,
}

impl Default for HostIdentityConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            label: default_label(),
            supported_contexts: default_contexts(),
            supported_pixel_depths: default_pixel_depths(),
            supported_components: default_components(),
        }
    }
}

fn default_name() -> String {
    "net.ofxhost.host".to_string()
}

fn default_label() -> String {
    "ofxhost".to_string()
}

fn default_contexts() -> Vec<String> {
    [
        "OfxImageEffectContextGenerator",
        "OfxImageEffectContextFilter",
        "OfxImageEffectContextTransition",
        "OfxImageEffectContextPaint",
        "OfxImageEffectContextGeneral",
        "OfxImageEffectContextRetimer",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_pixel_depths() -> Vec<String> {
    ["OfxBitDepthByte", "OfxBitDepthShort", "OfxBitDepthFloat"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_components() -> Vec<String> {
    ["OfxImageComponentRGBA", "OfxImageComponentRGB", "OfxImageComponentAlpha"]
        .into_iter()
        .map(String::from)
        .collect()
}
