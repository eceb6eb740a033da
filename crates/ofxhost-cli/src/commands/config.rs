//! Configuration management CLI commands.

use clap::{Args, Subcommand};

use crate::output::{self, OutputFormat};
use ofxhost_core::error::HostError;

/// Arguments for config commands
#[derive(Debug, Args)]
pub struct ConfigArgs {
    /// Config subcommand
    #[command(subcommand)]
    pub command: ConfigCommand,
}

/// Config subcommands
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show,
    /// Validate configuration file
    Validate,
    /// Generate a default configuration file
    Generate {
        /// Output file path
        #[arg(short, long, default_value = "config/generated.toml")]
        output: String,
        /// Overwrite an existing file without asking
        #[arg(long)]
        force: bool,
    },
}

/// Execute config commands
pub fn execute(args: &ConfigArgs, config_path: &str, format: OutputFormat) -> Result<(), HostError> {
    match &args.command {
        ConfigCommand::Show => {
            let config = super::load_config(config_path)?;
            output::print_item(&config, format);
        }
        ConfigCommand::Validate => match super::load_config(config_path) {
            Ok(config) => {
                output::print_success(&format!("Configuration '{}' is valid", config_path));
                println!("  Host: {} ({})", config.host.label, config.host.name);
                println!("  Search paths: {}", config.plugins.search_paths.len());
                println!(
                    "  Standard locations: {}",
                    config.plugins.use_standard_locations
                );
                if config.cache.enabled {
                    println!("  Cache: {}", config.cache.file_path().display());
                } else {
                    println!("  Cache: disabled");
                }
                for path in config
                    .plugins
                    .search_paths
                    .iter()
                    .chain(&config.plugins.non_recursive_paths)
                    .filter(|path| !std::path::Path::new(path).is_dir())
                {
                    output::print_warning(&format!("Search path '{}' does not exist", path));
                }
            }
            Err(e) => {
                output::print_error(&format!("Configuration invalid: {}", e));
                return Err(e);
            }
        },
        ConfigCommand::Generate {
            output: out_path,
            force,
        } => {
            let default_config = include_str!("../../../../config/default.toml");
            let target = std::path::Path::new(out_path);

            if target.exists() && !force {
                let overwrite = dialoguer::Confirm::new()
                    .with_prompt(format!("'{}' exists. Overwrite?", out_path))
                    .default(false)
                    .interact()
                    .map_err(|e| HostError::internal(format!("Input error: {}", e)))?;
                if !overwrite {
                    output::print_warning("Cancelled");
                    return Ok(());
                }
            }

            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| HostError::internal(format!("Failed to create dir: {}", e)))?;
            }

            std::fs::write(target, default_config)
                .map_err(|e| HostError::internal(format!("Failed to write config: {}", e)))?;

            output::print_success(&format!("Default config written to '{}'", out_path));
        }
    }

    Ok(())
}
