//! Search path command.

use serde::Serialize;
use tabled::Tabled;

use crate::output::{self, OutputFormat};
use ofxhost_core::error::HostError;

/// Search path display row
#[derive(Debug, Serialize, Tabled)]
struct PathRow {
    /// Precedence, lowest first
    rank: usize,
    /// Directory
    path: String,
    /// Searched recursively
    recursive: bool,
    /// Exists on disk
    exists: bool,
}

/// Execute the paths command
pub fn execute(config_path: &str, format: OutputFormat) -> Result<(), HostError> {
    let runtime = super::open_runtime(config_path)?;

    let rows: Vec<PathRow> = runtime
        .cache()
        .search_paths()
        .iter()
        .enumerate()
        .map(|(rank, root)| PathRow {
            rank,
            path: root.path.display().to_string(),
            recursive: root.recursive,
            exists: root.path.is_dir(),
        })
        .collect();

    output::print_list(&rows, format, "No search paths configured.");
    Ok(())
}
