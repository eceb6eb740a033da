//! Plugin scan command.

use clap::Args;

use crate::output::{self, OutputFormat};
use ofxhost_core::error::HostError;

/// Arguments for the scan command
#[derive(Debug, Args)]
pub struct ScanArgs {
    /// Ignore the existing cache file and describe every plugin again
    #[arg(long)]
    pub fresh: bool,
}

/// Execute the scan command
pub fn execute(args: &ScanArgs, config_path: &str, format: OutputFormat) -> Result<(), HostError> {
    let mut runtime = super::open_runtime(config_path)?;
    if args.fresh {
        runtime.cache_mut().clear();
    } else {
        runtime.load_cache();
    }

    let report = runtime.scan();
    let saved = runtime.save_cache()?;

    if format == OutputFormat::Json {
        output::print_item(&report, format);
        return Ok(());
    }

    output::print_success(&format!(
        "Scanned {} search paths",
        runtime.cache().search_paths().len()
    ));
    output::print_kv("Binaries", &report.binaries.to_string());
    output::print_kv("New", &report.new_binaries.to_string());
    output::print_kv("Changed", &report.changed_binaries.to_string());
    output::print_kv("Dropped", &report.dropped_binaries.to_string());
    output::print_kv("Plugins", &report.plugins.to_string());
    output::print_kv(
        "Cache",
        &if saved {
            format!("written to {}", runtime.cache_path().display())
        } else {
            "unchanged".to_string()
        },
    );

    for path in &report.invalid_binaries {
        output::print_warning(&format!("Invalid binary: {}", path.display()));
    }
    for (plugin_id, reason) in &report.unsupported {
        output::print_warning(&format!("Unsupported plugin {}: {}", plugin_id, reason));
    }

    Ok(())
}
