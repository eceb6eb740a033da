//! ofxhost: OFX plugin host bootstrap
//!
//! Loads configuration, discovers plugins, refreshes the plugin cache and
//! reports what is available.

use ofxhost_core::config::HostConfig;
use ofxhost_core::error::HostError;
use ofxhost_plugin::runtime::HostRuntime;

fn main() {
    let config = match load_configuration() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    ofxhost_core::logging::init(&config.logging);

    if let Err(e) = run(config) {
        tracing::error!("Host error: {}", e);
        std::process::exit(1);
    }
}

/// Load configuration from file and environment
fn load_configuration() -> Result<HostConfig, HostError> {
    let config_path =
        std::env::var("OFXHOST_CONFIG").unwrap_or_else(|_| "config/default.toml".to_string());
    HostConfig::load(&config_path)
}

/// Scan for plugins and refresh the cache
fn run(config: HostConfig) -> Result<(), HostError> {
    tracing::info!("Starting ofxhost v{}", env!("CARGO_PKG_VERSION"));

    // ── Step 1: Host and cache ───────────────────────────────────
    let mut runtime = HostRuntime::new(config)?;
    for root in runtime.cache().search_paths() {
        tracing::debug!(path = %root.path.display(), recursive = root.recursive, "Search root");
    }

    // ── Step 2: Seed from the cache file ─────────────────────────
    let cache_path = runtime.cache_path();
    if runtime.load_cache() {
        tracing::info!(path = %cache_path.display(), "Using plugin cache");
    }

    // ── Step 3: Scan ─────────────────────────────────────────────
    let report = runtime.scan();
    for path in &report.invalid_binaries {
        tracing::warn!(path = %path.display(), "Invalid plugin binary");
    }
    for (plugin_id, reason) in &report.unsupported {
        tracing::warn!(plugin_id = %plugin_id, reason = %reason, "Unsupported plugin");
    }

    // ── Step 4: Save ─────────────────────────────────────────────
    if runtime.save_cache()? {
        tracing::info!(path = %cache_path.display(), "Plugin cache updated");
    }

    // ── Step 5: Summary ──────────────────────────────────────────
    for (id, plugin) in runtime.cache().get_plugins_by_id() {
        tracing::info!(
            plugin_id = %id,
            version = %plugin.record().version_label(),
            label = %plugin.label(),
            "Plugin available"
        );
    }
    tracing::info!(
        plugins = report.plugins,
        binaries = report.binaries,
        new = report.new_binaries,
        changed = report.changed_binaries,
        "ofxhost ready"
    );

    Ok(())
}
