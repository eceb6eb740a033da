//! In-memory library backend for development and testing.
//!
//! Simulates the platform loader without shared objects on disk: each
//! registered path maps to a symbol table of function addresses, and
//! opens and closes are counted per path.

use std::collections::HashMap;
use std::ffi::c_void;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use ofxhost_core::error::HostError;
use ofxhost_core::result::HostResult;

use super::abi::{
    GET_NUMBER_OF_PLUGINS_SYMBOL, GET_PLUGIN_SYMBOL, GetNumberOfPluginsFn, GetPluginFn,
};
use crate::library::{LibraryBackend, OpenLibrary};

/// Exported symbols of one simulated library.
#[derive(Debug, Clone, Default)]
pub struct MockLibrary {
    symbols: HashMap<String, usize>,
}

impl MockLibrary {
    /// A library exporting nothing.
    pub fn new() -> Self {
        Self::default()
    }

    /// A library exporting both OFX entry points.
    pub fn with_plugin_exports(count: GetNumberOfPluginsFn, get: GetPluginFn) -> Self {
        Self::new()
            .with_symbol(GET_NUMBER_OF_PLUGINS_SYMBOL, count as *const c_void)
            .with_symbol(GET_PLUGIN_SYMBOL, get as *const c_void)
    }

    /// Export `name` at `address`.
    pub fn with_symbol(mut self, name: &str, address: *const c_void) -> Self {
        self.symbols.insert(name.to_string(), address as usize);
        self
    }
}

#[derive(Debug, Default)]
struct MockState {
    libraries: HashMap<PathBuf, MockLibrary>,
    opens: HashMap<PathBuf, usize>,
    closes: HashMap<PathBuf, usize>,
}

/// Loader that serves [`MockLibrary`] tables instead of files.
#[derive(Debug, Default)]
pub struct MockBackend {
    state: Arc<Mutex<MockState>>,
}

impl MockBackend {
    /// Create a backend with no libraries.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `library` loadable at `path`.
    pub fn register(&self, path: impl Into<PathBuf>, library: MockLibrary) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.libraries.insert(path.into(), library);
    }

    /// Make `path` unloadable again.
    pub fn unregister(&self, path: &Path) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.libraries.remove(path);
    }

    /// How many times `path` has been opened.
    pub fn open_count(&self, path: &Path) -> usize {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.opens.get(path).copied().unwrap_or(0)
    }

    /// How many times `path` has been closed.
    pub fn close_count(&self, path: &Path) -> usize {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.closes.get(path).copied().unwrap_or(0)
    }
}

impl LibraryBackend for MockBackend {
    fn open(&self, path: &Path) -> HostResult<Box<dyn OpenLibrary>> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        let library = state.libraries.get(path).cloned().ok_or_else(|| {
            HostError::invalid_binary(format!("[MockLoader] no library at '{}'", path.display()))
        })?;
        *state.opens.entry(path.to_path_buf()).or_insert(0) += 1;
        tracing::debug!(path = %path.display(), "[MockLoader] Opened");
        Ok(Box::new(MockHandle {
            path: path.to_path_buf(),
            symbols: library.symbols,
            state: Arc::clone(&self.state),
        }))
    }
}

struct MockHandle {
    path: PathBuf,
    symbols: HashMap<String, usize>,
    state: Arc<Mutex<MockState>>,
}

impl OpenLibrary for MockHandle {
    fn symbol(&self, name: &str) -> Option<*mut c_void> {
        self.symbols.get(name).map(|address| *address as *mut c_void)
    }
}

impl Drop for MockHandle {
    fn drop(&mut self) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        *state.closes.entry(self.path.clone()).or_insert(0) += 1;
        tracing::debug!(path = %self.path.display(), "[MockLoader] Closed");
    }
}
