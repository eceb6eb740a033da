//! Bundle discovery on disk.
//!
//! A plugin bundle is a directory named `<Name>.ofx.bundle` whose binary
//! sits at `Contents/<ARCH>/<Name>.ofx`.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

/// Suffix of bundle directories.
pub const BUNDLE_SUFFIX: &str = ".ofx.bundle";

/// Architecture directories tried inside `Contents`, in order.
#[cfg(target_os = "linux")]
pub const ARCHITECTURES: &[&str] = &["Linux-x86-64", "Linux-x86", "Linux-arm64"];
#[cfg(target_os = "macos")]
pub const ARCHITECTURES: &[&str] = &["MacOS-x86-64", "MacOS"];
#[cfg(target_os = "windows")]
pub const ARCHITECTURES: &[&str] = &["win64", "win32"];
#[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
pub const ARCHITECTURES: &[&str] = &[
    "Linux-x86-64",
    "Linux-x86",
    "Linux-arm64",
    "MacOS-x86-64",
    "MacOS",
    "win64",
    "win32",
];

/// A bundle binary found by a scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FoundBinary {
    /// The `.ofx` file.
    pub file_path: PathBuf,
    /// The `.ofx.bundle` directory.
    pub bundle_path: PathBuf,
}

/// Directory holding the platform's shared OFX folders.
pub fn ofx_root() -> PathBuf {
    if cfg!(target_os = "windows") {
        std::env::var_os("CommonProgramFiles")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(r"C:\Program Files\Common Files"))
            .join("OFX")
    } else if cfg!(target_os = "macos") {
        PathBuf::from("/Library/OFX")
    } else {
        PathBuf::from("/usr/OFX")
    }
}

/// The platform-standard plugin directory.
pub fn standard_location() -> PathBuf {
    ofx_root().join("Plugins")
}

/// The plugin directory reserved for one host.
pub fn host_location(host_id: &str) -> PathBuf {
    ofx_root().join(host_id)
}

/// Split a search path list the way the platform writes it.
///
/// Unix accepts both `:` and `;`; Windows only `;` since `:` appears in
/// drive letters.
pub fn split_path_list(value: &str) -> Vec<PathBuf> {
    let separators: &[char] = if cfg!(windows) { &[';'] } else { &[':', ';'] };
    value
        .split(separators)
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(PathBuf::from)
        .collect()
}

/// The binary inside `bundle`, if one exists for this platform.
pub fn bundle_binary(bundle: &Path) -> Option<PathBuf> {
    let bundle_name = bundle.file_name()?.to_str()?;
    let binary_name = bundle_name.strip_suffix(".bundle")?;
    ARCHITECTURES
        .iter()
        .map(|arch| bundle.join("Contents").join(arch).join(binary_name))
        .find(|candidate| candidate.is_file())
}

/// Whether recursion should descend into a directory named `name`.
pub fn is_searchable_dir(name: &str) -> bool {
    !name.starts_with('@') && !name.ends_with('.')
}

/// Collect bundle binaries under `dir`.
///
/// Every directory visited is appended to `visited`. Bundles are never
/// descended into.
pub fn scan_directory(
    dir: &Path,
    recursive: bool,
    found: &mut Vec<FoundBinary>,
    visited: &mut Vec<PathBuf>,
) {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            debug!(path = %dir.display(), error = %e, "Skipping unreadable search directory");
            return;
        }
    };
    visited.push(dir.to_path_buf());

    let mut entries: Vec<_> = entries.flatten().map(|entry| entry.path()).collect();
    entries.sort();

    for path in entries {
        if !path.is_dir() {
            continue;
        }
        let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
            continue;
        };

        if name.ends_with(BUNDLE_SUFFIX) {
            match bundle_binary(&path) {
                Some(file_path) => {
                    debug!(path = %file_path.display(), "Found plugin binary");
                    found.push(FoundBinary {
                        file_path,
                        bundle_path: path,
                    });
                }
                None => debug!(bundle = %path.display(), "Bundle has no binary for this platform"),
            }
        } else if recursive && is_searchable_dir(name) {
            scan_directory(&path, recursive, found, visited);
        }
    }
}
