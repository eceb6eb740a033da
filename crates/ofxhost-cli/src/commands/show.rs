//! Plugin detail command.

use clap::Args;
use serde::Serialize;
use tabled::Tabled;

use crate::output::{self, OutputFormat};
use ofxhost_core::error::HostError;
use ofxhost_plugin::property::PropertySnapshot;

/// Arguments for the show command
#[derive(Debug, Args)]
pub struct ShowArgs {
    /// Plugin identifier
    pub id: String,
    /// Require this major version
    #[arg(long)]
    pub major: Option<u32>,
    /// Require this minor version
    #[arg(long)]
    pub minor: Option<u32>,
}

/// Plugin details for JSON output
#[derive(Debug, Serialize)]
struct PluginDetail {
    identifier: String,
    version: String,
    label: String,
    api: String,
    api_version: i32,
    index: usize,
    binary: String,
    bundle: String,
    is_static: bool,
    properties: Vec<PropertySnapshot>,
}

/// Property display row
#[derive(Debug, Serialize, Tabled)]
struct PropertyRow {
    /// Property name
    name: String,
    /// Value type
    kind: String,
    /// Fixed dimension, 0 for variable
    dimension: usize,
    /// Values
    values: String,
}

/// Execute the show command
pub fn execute(args: &ShowArgs, config_path: &str, format: OutputFormat) -> Result<(), HostError> {
    let runtime = super::scanned_runtime(config_path)?;
    let plugin = runtime
        .cache()
        .get_plugin_by_id(&args.id, args.major, args.minor)
        .ok_or_else(|| HostError::not_found(format!("No plugin '{}'", args.id)))?;

    let record = plugin.record();
    let binary = record.binary();
    let detail = PluginDetail {
        identifier: record.identifier().to_string(),
        version: record.version_label(),
        label: plugin.label(),
        api: record.api().to_string(),
        api_version: record.api_version(),
        index: record.index(),
        binary: binary.file_path().display().to_string(),
        bundle: binary.bundle_path().display().to_string(),
        is_static: binary.is_static(),
        properties: plugin.properties().snapshot(),
    };

    if format == OutputFormat::Json {
        output::print_item(&detail, format);
        return Ok(());
    }

    output::print_heading(&detail.identifier);
    output::print_kv("Version", &detail.version);
    output::print_kv("Label", &detail.label);
    output::print_kv("API", &format!("{} v{}", detail.api, detail.api_version));
    output::print_kv("Binary", &detail.binary);
    output::print_kv("Bundle", &detail.bundle);
    output::print_kv("Index", &detail.index.to_string());
    output::print_kv("Static", &detail.is_static.to_string());
    println!();

    let rows: Vec<PropertyRow> = detail
        .properties
        .into_iter()
        .map(|snapshot| PropertyRow {
            name: snapshot.name,
            kind: snapshot.kind.to_string(),
            dimension: snapshot.dimension,
            values: snapshot.values.join(", "),
        })
        .collect();
    output::print_list(&rows, format, "No properties.");
    Ok(())
}
