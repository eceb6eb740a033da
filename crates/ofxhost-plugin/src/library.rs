//! Shared-object loading with reference counting and file stamping.
//!
//! A [`DynamicLibrary`] opens its file lazily through a [`LibraryBackend`]
//! and keeps it open while at least one reference is held. References
//! are normally taken through [`DynamicLibrary::acquire`], whose guard
//! releases on drop.

use std::ffi::c_void;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::UNIX_EPOCH;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use ofxhost_core::error::HostError;
use ofxhost_core::result::HostResult;

/// An open OS library handle. Dropping it closes the library.
pub trait OpenLibrary: Send + Sync {
    /// Address of an exported symbol.
    fn symbol(&self, name: &str) -> Option<*mut c_void>;
}

/// Opens shared objects.
pub trait LibraryBackend: Send + Sync + fmt::Debug {
    /// Open the library at `path`.
    fn open(&self, path: &Path) -> HostResult<Box<dyn OpenLibrary>>;
}

/// Backend over the platform loader, via `libloading`.
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeBackend;

struct NativeLibrary(libloading::Library);

impl OpenLibrary for NativeLibrary {
    fn symbol(&self, name: &str) -> Option<*mut c_void> {
        // SAFETY: the symbol is only read as an address, never called here.
        unsafe { self.0.get::<*mut c_void>(name.as_bytes()) }
            .ok()
            .map(|symbol| *symbol)
    }
}

impl LibraryBackend for NativeBackend {
    fn open(&self, path: &Path) -> HostResult<Box<dyn OpenLibrary>> {
        // SAFETY: loading runs the library's initializers; plugin binaries
        // are trusted by whoever configured the search paths.
        let library = unsafe { libloading::Library::new(path) }.map_err(|e| {
            HostError::invalid_binary(format!(
                "Failed to load plugin library '{}': {}",
                path.display(),
                e
            ))
        })?;
        Ok(Box::new(NativeLibrary(library)))
    }
}

/// File identity used to detect stale cache entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct FileStamp {
    /// Modification time, seconds since the Unix epoch.
    pub modified: i64,
    /// File size in bytes.
    pub size: u64,
}

impl FileStamp {
    /// Modification time as a UTC timestamp.
    pub fn modified_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.modified, 0)
    }
}

struct LibraryState {
    handle: Option<Box<dyn OpenLibrary>>,
    ref_count: usize,
    invalid: bool,
}

/// One shared-object file.
pub struct DynamicLibrary {
    path: PathBuf,
    backend: Arc<dyn LibraryBackend>,
    state: Mutex<LibraryState>,
}

impl DynamicLibrary {
    /// Describe a library without opening it.
    pub fn new(path: impl Into<PathBuf>, backend: Arc<dyn LibraryBackend>) -> Self {
        Self {
            path: path.into(),
            backend,
            state: Mutex::new(LibraryState {
                handle: None,
                ref_count: 0,
                invalid: false,
            }),
        }
    }

    /// Path of the shared object.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Modification time and size of `path`.
    pub fn stat(path: &Path) -> HostResult<FileStamp> {
        let metadata = std::fs::metadata(path)?;
        let modified = metadata
            .modified()?
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0);
        Ok(FileStamp {
            modified,
            size: metadata.len(),
        })
    }

    /// Take one reference, opening the library on the first.
    ///
    /// A failed open marks the library invalid; later calls fail without
    /// retrying.
    pub fn load(&self) -> HostResult<()> {
        let mut state = self.lock();
        if state.invalid {
            return Err(HostError::invalid_binary(format!(
                "'{}' previously failed to load",
                self.path.display()
            )));
        }
        if state.handle.is_none() {
            match self.backend.open(&self.path) {
                Ok(handle) => {
                    debug!(path = %self.path.display(), "Library opened");
                    state.handle = Some(handle);
                }
                Err(e) => {
                    warn!(path = %self.path.display(), error = %e, "Library failed to open");
                    state.invalid = true;
                    return Err(e);
                }
            }
        }
        state.ref_count += 1;
        Ok(())
    }

    /// Release one reference, closing the library on the last.
    pub fn unload(&self) {
        let mut state = self.lock();
        if state.ref_count == 0 {
            return;
        }
        state.ref_count -= 1;
        if state.ref_count == 0 && state.handle.take().is_some() {
            debug!(path = %self.path.display(), "Library closed");
        }
    }

    /// Take a reference released when the guard is dropped.
    pub fn acquire(self: &Arc<Self>) -> HostResult<LibraryGuard> {
        self.load()?;
        Ok(LibraryGuard {
            library: Arc::clone(self),
        })
    }

    /// Resolve an exported symbol; `None` when closed or absent.
    pub fn find_symbol(&self, name: &str) -> Option<*mut c_void> {
        self.lock()
            .handle
            .as_ref()
            .and_then(|handle| handle.symbol(name))
            .filter(|ptr| !ptr.is_null())
    }

    /// Whether the library is currently open.
    pub fn is_loaded(&self) -> bool {
        self.lock().handle.is_some()
    }

    /// Number of outstanding references.
    pub fn ref_count(&self) -> usize {
        self.lock().ref_count
    }

    /// Whether opening has failed before.
    pub fn is_invalid(&self) -> bool {
        self.lock().invalid
    }

    fn lock(&self) -> MutexGuard<'_, LibraryState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl fmt::Debug for DynamicLibrary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.lock();
        f.debug_struct("DynamicLibrary")
            .field("path", &self.path)
            .field("loaded", &state.handle.is_some())
            .field("ref_count", &state.ref_count)
            .field("invalid", &state.invalid)
            .finish()
    }
}

/// Keeps a [`DynamicLibrary`] open for as long as it lives.
pub struct LibraryGuard {
    library: Arc<DynamicLibrary>,
}

impl LibraryGuard {
    /// The guarded library.
    pub fn library(&self) -> &Arc<DynamicLibrary> {
        &self.library
    }
}

impl Clone for LibraryGuard {
    fn clone(&self) -> Self {
        // Cannot fail: the library is already open with a live reference.
        let mut state = self.library.lock();
        state.ref_count += 1;
        drop(state);
        Self {
            library: Arc::clone(&self.library),
        }
    }
}

impl Drop for LibraryGuard {
    fn drop(&mut self) {
        self.library.unload();
    }
}

impl fmt::Debug for LibraryGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LibraryGuard")
            .field("path", &self.library.path)
            .finish()
    }
}

#[cfg(all(test, feature = "mock"))]
mod tests {
    use super::*;
    use crate::ffi::mock::{MockBackend, MockLibrary};

    fn library(backend: &Arc<MockBackend>, path: &str) -> Arc<DynamicLibrary> {
        Arc::new(DynamicLibrary::new(path, backend.clone()))
    }

    #[test]
    fn test_load_is_counted() {
        let backend = Arc::new(MockBackend::new());
        backend.register("/plugins/a.ofx", MockLibrary::new());
        let lib = library(&backend, "/plugins/a.ofx");

        for _ in 0..3 {
            lib.load().unwrap();
        }
        assert_eq!(backend.open_count(Path::new("/plugins/a.ofx")), 1);

        lib.unload();
        lib.unload();
        assert!(lib.is_loaded());
        lib.unload();
        assert!(!lib.is_loaded());
        assert_eq!(backend.close_count(Path::new("/plugins/a.ofx")), 1);

        lib.unload();
        assert_eq!(lib.ref_count(), 0);
    }

    #[test]
    fn test_failed_open_is_permanent() {
        let backend = Arc::new(MockBackend::new());
        let lib = library(&backend, "/plugins/missing.ofx");

        assert!(lib.load().is_err());
        assert!(lib.is_invalid());

        backend.register("/plugins/missing.ofx", MockLibrary::new());
        let err = lib.load().unwrap_err();
        assert_eq!(err.kind, ofxhost_core::error::ErrorKind::InvalidBinary);
        assert_eq!(backend.open_count(Path::new("/plugins/missing.ofx")), 0);
    }

    #[test]
    fn test_guard_keeps_library_open() {
        let backend = Arc::new(MockBackend::new());
        backend.register(
            "/plugins/b.ofx",
            MockLibrary::new().with_symbol("OfxGetPlugin", 0x1000 as *const c_void),
        );
        let lib = library(&backend, "/plugins/b.ofx");

        assert!(lib.find_symbol("OfxGetPlugin").is_none());
        let guard = lib.acquire().unwrap();
        let second = guard.clone();
        assert_eq!(lib.ref_count(), 2);
        assert_eq!(
            lib.find_symbol("OfxGetPlugin"),
            Some(0x1000 as *mut c_void)
        );
        assert!(lib.find_symbol("OfxGetNumberOfPlugins").is_none());

        drop(guard);
        assert!(lib.is_loaded());
        drop(second);
        assert!(!lib.is_loaded());
    }

    #[test]
    fn test_stat_reports_size() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Foo.ofx");
        std::fs::write(&path, b"12345").unwrap();
        let stamp = DynamicLibrary::stat(&path).unwrap();
        assert_eq!(stamp.size, 5);
        assert!(stamp.modified > 0);
        assert!(stamp.modified_at().is_some());
        assert!(DynamicLibrary::stat(&dir.path().join("absent.ofx")).is_err());
    }
}
