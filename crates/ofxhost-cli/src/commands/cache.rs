//! Plugin cache file commands.

use clap::{Args, Subcommand};
use serde::Serialize;
use tabled::Tabled;

use crate::output::{self, OutputFormat};
use ofxhost_core::error::{ErrorKind, HostError};
use ofxhost_plugin::cache::xml::CacheDocument;

/// Arguments for cache commands
#[derive(Debug, Args)]
pub struct CacheArgs {
    /// Cache subcommand
    #[command(subcommand)]
    pub command: CacheCommand,
}

/// Cache subcommands
#[derive(Debug, Subcommand)]
pub enum CacheCommand {
    /// Print the cache file location
    Path,
    /// List the entries recorded in the cache file
    Dump,
    /// Delete the cache file
    Clear {
        /// Skip confirmation
        #[arg(short, long)]
        yes: bool,
    },
}

/// Cached plugin display row
#[derive(Debug, Serialize, Tabled)]
struct CachedPluginRow {
    /// Identifier
    id: String,
    /// Version
    version: String,
    /// Index inside the binary
    index: usize,
    /// Stored properties
    properties: usize,
    /// Binary file
    binary: String,
    /// Binary modification time
    modified: String,
    /// Binary size in bytes
    size: u64,
}

/// Execute cache commands
pub fn execute(args: &CacheArgs, config_path: &str, format: OutputFormat) -> Result<(), HostError> {
    let config = super::load_config(config_path)?;
    let path = config.cache.file_path();

    match &args.command {
        CacheCommand::Path => {
            output::print_kv("Cache file", &path.display().to_string());
            output::print_kv("Version", &config.cache.version);
            output::print_kv("Enabled", &config.cache.enabled.to_string());
            output::print_kv("Exists", &path.is_file().to_string());
        }
        CacheCommand::Dump => {
            let text = std::fs::read_to_string(&path).map_err(|e| {
                HostError::with_source(
                    ErrorKind::Cache,
                    format!("Failed to read {}", path.display()),
                    e,
                )
            })?;
            let document = CacheDocument::parse(&text)?;

            if document.version != config.cache.version {
                output::print_warning(&format!(
                    "Cache version '{}' differs from '{}', it will be ignored",
                    document.version, config.cache.version
                ));
            }

            let rows: Vec<CachedPluginRow> = document
                .bundles
                .iter()
                .flat_map(|bundle| {
                    bundle.plugins.iter().map(move |plugin| CachedPluginRow {
                        id: plugin.identifier.clone(),
                        version: format!("{}.{}", plugin.version_major, plugin.version_minor),
                        index: plugin.index,
                        properties: plugin.properties.len(),
                        binary: bundle.binary.path.clone(),
                        modified: bundle
                            .binary
                            .stamp
                            .modified_at()
                            .map(|at| at.to_rfc3339())
                            .unwrap_or_else(|| bundle.binary.stamp.modified.to_string()),
                        size: bundle.binary.stamp.size,
                    })
                })
                .collect();
            output::print_list(&rows, format, "The cache file lists no plugins.");
        }
        CacheCommand::Clear { yes } => {
            if !path.exists() {
                output::print_warning(&format!("No cache file at {}", path.display()));
                return Ok(());
            }

            if !yes {
                let confirmed = dialoguer::Confirm::new()
                    .with_prompt(format!("Delete {}?", path.display()))
                    .default(false)
                    .interact()
                    .map_err(|e| HostError::internal(format!("Input error: {}", e)))?;
                if !confirmed {
                    output::print_warning("Cancelled");
                    return Ok(());
                }
            }

            std::fs::remove_file(&path)?;
            output::print_success(&format!("Removed {}", path.display()));
        }
    }

    Ok(())
}
