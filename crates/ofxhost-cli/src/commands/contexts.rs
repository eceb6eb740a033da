//! Context description command.

use clap::Args;
use serde::Serialize;
use tabled::Tabled;

use crate::output::{self, OutputFormat};
use ofxhost_core::error::HostError;
use ofxhost_plugin::constants::props;

/// Arguments for the contexts command
#[derive(Debug, Args)]
pub struct ContextsArgs {
    /// Plugin identifier
    pub id: String,
    /// Context, either the full name or the short form, e.g. `Filter`
    pub context: String,
}

/// Clip or parameter display row
#[derive(Debug, Serialize, Tabled)]
struct DefinitionRow {
    /// Clip or parameter
    kind: String,
    /// Name
    name: String,
    /// Parameter type, or whether the clip is optional
    detail: String,
    /// Label
    label: String,
}

/// Execute the contexts command
pub fn execute(
    args: &ContextsArgs,
    config_path: &str,
    format: OutputFormat,
) -> Result<(), HostError> {
    let runtime = super::scanned_runtime(config_path)?;
    let plugin = runtime
        .cache()
        .get_image_effect(&args.id, None, None)
        .ok_or_else(|| HostError::not_found(format!("No image effect '{}'", args.id)))?;

    let context = if args.context.starts_with("OfxImageEffectContext") {
        args.context.clone()
    } else {
        format!("OfxImageEffectContext{}", args.context)
    };
    let descriptor = plugin.get_context(&context)?;

    let clips = descriptor.clips().into_iter().map(|clip| {
        let properties = clip.properties();
        let optional = properties.get_int(props::CLIP_OPTIONAL, 0).unwrap_or(0) != 0;
        DefinitionRow {
            kind: "clip".to_string(),
            name: clip.name().to_string(),
            detail: if optional { "optional" } else { "required" }.to_string(),
            label: properties.get_string(props::LABEL, 0).unwrap_or_default(),
        }
    });
    let params = descriptor.params().into_iter().map(|param| DefinitionRow {
        kind: "param".to_string(),
        name: param.name().to_string(),
        detail: param.param_type().to_string(),
        label: param
            .properties()
            .get_string(props::LABEL, 0)
            .unwrap_or_default(),
    });
    let rows: Vec<DefinitionRow> = clips.chain(params).collect();

    if format == OutputFormat::Table {
        output::print_success(&format!(
            "{} described in {}",
            plugin.identifier(),
            super::list::short_context(&context)
        ));
    }
    output::print_list(&rows, format, "No clips or parameters defined.");

    if let Err(e) = plugin.unload() {
        output::print_warning(&format!("Plugin not unloaded: {}", e));
    }
    Ok(())
}
