//! Plugin listing command.

use serde::Serialize;
use tabled::Tabled;

use crate::output::{self, OutputFormat};
use ofxhost_core::error::HostError;
use ofxhost_plugin::constants::props;

/// Plugin display row
#[derive(Debug, Serialize, Tabled)]
struct PluginRow {
    /// Identifier
    id: String,
    /// Version
    version: String,
    /// Label
    label: String,
    /// Menu grouping
    grouping: String,
    /// Supported contexts
    contexts: String,
    /// Binary file
    binary: String,
}

/// Execute the list command
pub fn execute(config_path: &str, format: OutputFormat) -> Result<(), HostError> {
    let runtime = super::scanned_runtime(config_path)?;

    let rows: Vec<PluginRow> = runtime
        .cache()
        .get_plugins()
        .iter()
        .map(|plugin| {
            let record = plugin.record();
            let properties = plugin.properties();
            let contexts = properties
                .get_all::<String>(props::SUPPORTED_CONTEXTS)
                .unwrap_or_default()
                .iter()
                .map(|context| short_context(context).to_string())
                .collect::<Vec<_>>()
                .join(", ");
            PluginRow {
                id: record.identifier().to_string(),
                version: record.version_label(),
                label: plugin.label(),
                grouping: properties.get_string(props::GROUPING, 0).unwrap_or_default(),
                contexts,
                binary: record.binary().file_path().display().to_string(),
            }
        })
        .collect();

    output::print_list(&rows, format, "No plugins found.");
    Ok(())
}

/// Context name without the common prefix
pub fn short_context(context: &str) -> &str {
    context
        .strip_prefix("OfxImageEffectContext")
        .unwrap_or(context)
}
