//! CLI command definitions and dispatch.

pub mod cache;
pub mod config;
pub mod contexts;
pub mod list;
pub mod paths;
pub mod scan;
pub mod show;

use clap::{Parser, Subcommand};

use crate::output::OutputFormat;
use ofxhost_core::config::HostConfig;
use ofxhost_core::error::HostError;
use ofxhost_plugin::runtime::HostRuntime;

/// ofxhost: OFX plugin discovery and inspection
#[derive(Debug, Parser)]
#[command(name = "ofxhost", version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/default.toml")]
    pub config: String,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Scan the search paths and refresh the plugin cache
    Scan(scan::ScanArgs),
    /// List available plugins
    List,
    /// Show one plugin and its described properties
    Show(show::ShowArgs),
    /// Describe a plugin in one context
    Contexts(contexts::ContextsArgs),
    /// Show the effective search paths
    Paths,
    /// Plugin cache file management
    Cache(cache::CacheArgs),
    /// Configuration management
    Config(config::ConfigArgs),
}

impl Cli {
    /// Execute the CLI command
    pub fn execute(&self) -> Result<(), HostError> {
        match &self.command {
            Commands::Scan(args) => scan::execute(args, &self.config, self.format),
            Commands::List => list::execute(&self.config, self.format),
            Commands::Show(args) => show::execute(args, &self.config, self.format),
            Commands::Contexts(args) => contexts::execute(args, &self.config, self.format),
            Commands::Paths => paths::execute(&self.config, self.format),
            Commands::Cache(args) => cache::execute(args, &self.config, self.format),
            Commands::Config(args) => config::execute(args, &self.config, self.format),
        }
    }
}

/// Helper: load configuration from file
pub fn load_config(config_path: &str) -> Result<HostConfig, HostError> {
    tracing::debug!(path = %config_path, "Loading configuration");
    HostConfig::load(config_path)
}

/// Helper: build the runtime without touching the cache or disk
pub fn open_runtime(config_path: &str) -> Result<HostRuntime, HostError> {
    HostRuntime::new(load_config(config_path)?)
}

/// Helper: build the runtime, read the cache, scan and save
pub fn scanned_runtime(config_path: &str) -> Result<HostRuntime, HostError> {
    let (runtime, _report) = HostRuntime::start(load_config(config_path)?)?;
    Ok(runtime)
}
