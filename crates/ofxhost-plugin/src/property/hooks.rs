//! Per-property read delegates and write observers.

use ofxhost_core::error::HostError;
use ofxhost_core::result::HostResult;

use super::value::RawPointer;

/// Serves "live" property values computed by the owning object.
///
/// A property with a delegate never answers reads from its stored values;
/// only [`PropertySet::get_raw`](super::PropertySet::get_raw) bypasses it.
/// Implement only the getter matching the property's kind.
pub trait PropertyGetDelegate: Send + Sync {
    /// Read an int value.
    fn get_int(&self, name: &str, _index: usize) -> HostResult<i32> {
        Err(HostError::unknown(format!("no int delegate for '{name}'")))
    }

    /// Read a double value.
    fn get_double(&self, name: &str, _index: usize) -> HostResult<f64> {
        Err(HostError::unknown(format!("no double delegate for '{name}'")))
    }

    /// Read a string value.
    fn get_string(&self, name: &str, _index: usize) -> HostResult<String> {
        Err(HostError::unknown(format!("no string delegate for '{name}'")))
    }

    /// Read a pointer value.
    fn get_pointer(&self, name: &str, _index: usize) -> HostResult<RawPointer> {
        Err(HostError::unknown(format!("no pointer delegate for '{name}'")))
    }

    /// Current number of values.
    fn dimension(&self, name: &str) -> HostResult<usize>;

    /// Restore the owner's default for `name`.
    fn reset(&self, _name: &str) -> HostResult<()> {
        Ok(())
    }
}

/// Observes writes to a property.
pub trait PropertyWriteObserver: Send + Sync {
    /// Called after a write has been stored.
    ///
    /// `single` is true for a one-index write, in which case
    /// `index_or_count` is that index; otherwise it is the number of values
    /// written.
    fn notify(&self, name: &str, single: bool, index_or_count: usize);
}
