//! Typed reflective property sets.
//!
//! A [`PropertySet`] is handed to plugins as an opaque
//! `OfxPropertySetHandle`, so every operation takes `&self` and the map
//! lives behind a lock. Delegates and observers are always invoked after
//! the lock is released, so they may read the set they belong to.

use std::collections::BTreeMap;
use std::ffi::{CString, c_char};
use std::fmt;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::Serialize;

use ofxhost_core::error::HostError;
use ofxhost_core::result::HostResult;

use crate::ffi::abi::OfxPropertySetHandle;

use super::hooks::{PropertyGetDelegate, PropertyWriteObserver};
use super::spec::{PropDefault, PropSpec};
use super::value::{PropertyKind, PropertyType, RawPointer, Values, to_c_string};

const PROPERTY_SET_MAGIC: u32 = 0x0f5e_7001;

/// A single named, typed property.
pub struct Property {
    name: String,
    dimension: usize,
    plugin_read_only: bool,
    values: Values,
    defaults: Values,
    delegate: Option<Arc<dyn PropertyGetDelegate>>,
    observers: Vec<Arc<dyn PropertyWriteObserver>>,
    /// NUL-terminated strings handed out for delegate-backed values.
    scratch: Vec<CString>,
}

impl Property {
    /// Create a property holding the kind's zero value in each fixed slot.
    pub fn new(name: impl Into<String>, kind: PropertyType, dimension: usize) -> Self {
        let mut values = Values::empty(kind);
        values.resize(dimension);
        Self {
            name: name.into(),
            dimension,
            plugin_read_only: false,
            defaults: values.clone(),
            values,
            delegate: None,
            observers: Vec::new(),
            scratch: Vec::new(),
        }
    }

    /// Create a property from a static template.
    pub fn from_spec(spec: &PropSpec) -> Self {
        let values = match spec.default {
            PropDefault::Int(v) => Values::Int(vec![v; spec.dimension]),
            PropDefault::Double(v) => Values::Double(vec![v; spec.dimension]),
            PropDefault::String(v) => {
                Values::String(vec![CString::new(v).unwrap_or_default(); spec.dimension])
            }
            PropDefault::Pointer => Values::Pointer(vec![RawPointer::NULL; spec.dimension]),
        };
        Self {
            name: spec.name.to_string(),
            dimension: spec.dimension,
            plugin_read_only: spec.plugin_read_only,
            defaults: values.clone(),
            values,
            delegate: None,
            observers: Vec::new(),
            scratch: Vec::new(),
        }
    }

    /// Property name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Value kind.
    pub fn kind(&self) -> PropertyType {
        self.values.kind()
    }

    /// Fixed dimension, or zero for a variable-dimension property.
    pub fn fixed_dimension(&self) -> usize {
        self.dimension
    }

    /// Whether plugins may write it through the property suite.
    pub fn is_plugin_read_only(&self) -> bool {
        self.plugin_read_only
    }

    fn check_kind(&self, kind: PropertyType) -> HostResult<()> {
        if self.kind() != kind {
            return Err(HostError::unknown(format!(
                "property '{}' is {}, not {}",
                self.name,
                self.kind(),
                kind
            )));
        }
        Ok(())
    }

    fn check_index(&self, index: usize) -> HostResult<()> {
        if index >= self.values.len() {
            return Err(HostError::bad_index(format!(
                "index {index} out of range for '{}' (dimension {})",
                self.name,
                self.values.len()
            )));
        }
        Ok(())
    }

    fn lookup<T: PropertyKind>(&self, index: usize, raw: bool) -> HostResult<Lookup<T>> {
        self.check_kind(T::KIND)?;
        if !raw {
            if let Some(delegate) = &self.delegate {
                return Ok(Lookup::Delegate(Arc::clone(delegate)));
            }
        }
        self.check_index(index)?;
        T::value_at(&self.values, index)
            .map(Lookup::Value)
            .ok_or_else(|| HostError::bad_index(format!("no value at {index} for '{}'", self.name)))
    }

    /// Copy without delegate, observers or scratch strings.
    fn detached(&self) -> Self {
        Self {
            name: self.name.clone(),
            dimension: self.dimension,
            plugin_read_only: self.plugin_read_only,
            values: self.values.clone(),
            defaults: self.defaults.clone(),
            delegate: None,
            observers: Vec::new(),
            scratch: Vec::new(),
        }
    }
}

impl fmt::Debug for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Property")
            .field("name", &self.name)
            .field("kind", &self.kind())
            .field("dimension", &self.dimension)
            .field("values", &self.values.to_texts())
            .field("delegated", &self.delegate.is_some())
            .field("observers", &self.observers.len())
            .finish()
    }
}

enum Lookup<T> {
    Value(T),
    Delegate(Arc<dyn PropertyGetDelegate>),
}

enum Dimension {
    Known(usize),
    Delegate(Arc<dyn PropertyGetDelegate>),
}

enum CStringLookup {
    Stored(*const c_char),
    Delegate(Arc<dyn PropertyGetDelegate>),
}

/// Raw stored state of one property, used for the cache file and display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PropertySnapshot {
    /// Property name.
    pub name: String,
    /// Value kind.
    pub kind: PropertyType,
    /// Fixed dimension, or zero for variable.
    pub dimension: usize,
    /// Stored values as text, in index order.
    pub values: Vec<String>,
}

/// A name → property map, optionally chained to a read-only parent set.
///
/// Reads and dimension queries fall back to the parent when a name is
/// not found locally; writes never do.
#[repr(C)]
pub struct PropertySet {
    magic: u32,
    properties: RwLock<BTreeMap<String, Property>>,
    parent: Option<Arc<PropertySet>>,
}

impl PropertySet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self {
            magic: PROPERTY_SET_MAGIC,
            properties: RwLock::new(BTreeMap::new()),
            parent: None,
        }
    }

    /// Create a set populated from templates.
    pub fn from_specs(specs: &[PropSpec]) -> Self {
        let set = Self::new();
        set.add_specs(specs);
        set
    }

    /// Create an empty set whose reads fall back to `parent`.
    pub fn with_parent(parent: Arc<PropertySet>) -> Self {
        Self {
            magic: PROPERTY_SET_MAGIC,
            properties: RwLock::new(BTreeMap::new()),
            parent: Some(parent),
        }
    }

    /// Add (or replace) properties from templates.
    pub fn add_specs(&self, specs: &[PropSpec]) {
        let mut props = self.write_props();
        for spec in specs {
            props.insert(spec.name.to_string(), Property::from_spec(spec));
        }
    }

    /// Add (or replace) one property.
    pub fn add_property(&self, property: Property) {
        self.write_props().insert(property.name.clone(), property);
    }

    /// The parent set, if chained.
    pub fn parent(&self) -> Option<&Arc<PropertySet>> {
        self.parent.as_ref()
    }

    /// Opaque handle passed to plugins.
    pub fn handle(&self) -> OfxPropertySetHandle {
        self as *const Self as OfxPropertySetHandle
    }

    /// Resolve a handle received from a plugin.
    ///
    /// # Safety
    /// `handle` must be null or point to readable memory of at least the
    /// size of a `u32`; the returned reference must not outlive the set.
    pub unsafe fn from_handle<'a>(handle: OfxPropertySetHandle) -> HostResult<&'a PropertySet> {
        if handle.is_null() {
            return Err(HostError::bad_handle("null property set handle"));
        }
        let set = handle as *const PropertySet;
        // SAFETY: `magic` is the first field of a #[repr(C)] struct.
        let magic = unsafe { std::ptr::read(set as *const u32) };
        if magic != PROPERTY_SET_MAGIC {
            return Err(HostError::bad_handle("not a property set handle"));
        }
        Ok(unsafe { &*set })
    }

    /// Whether `name` exists locally.
    pub fn contains(&self, name: &str) -> bool {
        self.read_props().contains_key(name)
    }

    /// Names of the local properties, sorted.
    pub fn names(&self) -> Vec<String> {
        self.read_props().keys().cloned().collect()
    }

    /// Kind of `name`, following the parent chain.
    pub fn kind(&self, name: &str) -> HostResult<PropertyType> {
        let kind = self.read_props().get(name).map(Property::kind);
        match (kind, &self.parent) {
            (Some(kind), _) => Ok(kind),
            (None, Some(parent)) => parent.kind(name),
            (None, None) => Err(unknown_property(name)),
        }
    }

    /// Whether plugins may not write `name`.
    pub fn is_plugin_read_only(&self, name: &str) -> HostResult<bool> {
        self.read_props()
            .get(name)
            .map(Property::is_plugin_read_only)
            .ok_or_else(|| unknown_property(name))
    }

    /// Read one value, through the delegate if one is installed.
    pub fn get<T: PropertyKind>(&self, name: &str, index: usize) -> HostResult<T> {
        self.read_value(name, index, false)
    }

    /// Read one stored value, bypassing any delegate.
    pub fn get_raw<T: PropertyKind>(&self, name: &str, index: usize) -> HostResult<T> {
        self.read_value(name, index, true)
    }

    /// Read every value of `name`.
    pub fn get_all<T: PropertyKind>(&self, name: &str) -> HostResult<Vec<T>> {
        let count = self.dimension(name)?;
        (0..count).map(|index| self.get(name, index)).collect()
    }

    /// Read an int.
    pub fn get_int(&self, name: &str, index: usize) -> HostResult<i32> {
        self.get(name, index)
    }

    /// Read a double.
    pub fn get_double(&self, name: &str, index: usize) -> HostResult<f64> {
        self.get(name, index)
    }

    /// Read a string.
    pub fn get_string(&self, name: &str, index: usize) -> HostResult<String> {
        self.get(name, index)
    }

    /// Read a pointer.
    pub fn get_pointer(&self, name: &str, index: usize) -> HostResult<RawPointer> {
        self.get(name, index)
    }

    /// Write one value and notify observers.
    ///
    /// Fixed-dimension properties reject `index >= dimension`;
    /// variable-dimension properties grow to fit.
    pub fn set<T: PropertyKind>(&self, name: &str, index: usize, value: T) -> HostResult<()> {
        self.store(name, index, value, false)
    }

    /// Replace the leading values of `name` and notify observers once.
    ///
    /// A variable-dimension property is resized to exactly `values.len()`.
    pub fn set_all<T: PropertyKind>(&self, name: &str, values: &[T]) -> HostResult<()> {
        self.store_all(name, values, false)
    }

    /// Write an int.
    pub fn set_int(&self, name: &str, index: usize, value: i32) -> HostResult<()> {
        self.set(name, index, value)
    }

    /// Write a double.
    pub fn set_double(&self, name: &str, index: usize, value: f64) -> HostResult<()> {
        self.set(name, index, value)
    }

    /// Write a string.
    pub fn set_string(&self, name: &str, index: usize, value: &str) -> HostResult<()> {
        self.set(name, index, value.to_string())
    }

    /// Write a pointer.
    pub fn set_pointer(&self, name: &str, index: usize, value: RawPointer) -> HostResult<()> {
        self.set(name, index, value)
    }

    /// Write on behalf of a plugin, honouring the read-only flag.
    pub(crate) fn plugin_set<T: PropertyKind>(
        &self,
        name: &str,
        index: usize,
        value: T,
    ) -> HostResult<()> {
        self.store(name, index, value, true)
    }

    /// Write several values on behalf of a plugin.
    pub(crate) fn plugin_set_all<T: PropertyKind>(
        &self,
        name: &str,
        values: &[T],
    ) -> HostResult<()> {
        self.store_all(name, values, true)
    }

    /// Restore the default of `name`.
    ///
    /// Delegated properties reset through the delegate and re-read every
    /// value from it without notifying. Local properties restore their
    /// constructor values (empty for variable dimension) and notify.
    pub fn reset(&self, name: &str) -> HostResult<()> {
        let (delegate, kind, observers, count) = {
            let mut props = self.write_props();
            let prop = props.get_mut(name).ok_or_else(|| unknown_property(name))?;
            match &prop.delegate {
                Some(delegate) => (Some(Arc::clone(delegate)), prop.kind(), Vec::new(), 0),
                None => {
                    prop.values = prop.defaults.clone();
                    let count = prop.values.len();
                    (None, prop.kind(), prop.observers.clone(), count)
                }
            }
        };

        if let Some(delegate) = delegate {
            delegate.reset(name)?;
            let count = delegate.dimension(name)?;
            let refreshed = read_delegate(delegate.as_ref(), name, kind, count)?;
            if let Some(prop) = self.write_props().get_mut(name) {
                prop.values = refreshed;
            }
            return Ok(());
        }

        for observer in observers {
            observer.notify(name, false, count);
        }
        Ok(())
    }

    /// Current number of values of `name`.
    ///
    /// Fixed properties report their declared dimension; variable ones
    /// ask their delegate if present, else count stored values.
    pub fn dimension(&self, name: &str) -> HostResult<usize> {
        let found = self.read_props().get(name).map(|prop| {
            if prop.dimension > 0 {
                Dimension::Known(prop.dimension)
            } else if let Some(delegate) = &prop.delegate {
                Dimension::Delegate(Arc::clone(delegate))
            } else {
                Dimension::Known(prop.values.len())
            }
        });
        match (found, &self.parent) {
            (Some(Dimension::Known(count)), _) => Ok(count),
            (Some(Dimension::Delegate(delegate)), _) => delegate.dimension(name),
            (None, Some(parent)) => parent.dimension(name),
            (None, None) => Err(unknown_property(name)),
        }
    }

    /// Install the read delegate of `name`.
    pub fn set_delegate(
        &self,
        name: &str,
        delegate: Arc<dyn PropertyGetDelegate>,
    ) -> HostResult<()> {
        let mut props = self.write_props();
        let prop = props.get_mut(name).ok_or_else(|| unknown_property(name))?;
        prop.delegate = Some(delegate);
        Ok(())
    }

    /// Attach a write observer to `name`.
    pub fn add_observer(
        &self,
        name: &str,
        observer: Arc<dyn PropertyWriteObserver>,
    ) -> HostResult<()> {
        let mut props = self.write_props();
        let prop = props.get_mut(name).ok_or_else(|| unknown_property(name))?;
        prop.observers.push(observer);
        Ok(())
    }

    /// A NUL-terminated string for the C suite.
    ///
    /// The pointer stays valid until `name[index]` is next written or
    /// read through this call.
    pub(crate) fn c_string(&self, name: &str, index: usize) -> HostResult<*const c_char> {
        let found = {
            let props = self.read_props();
            match props.get(name) {
                None => None,
                Some(prop) => {
                    prop.check_kind(PropertyType::String)?;
                    Some(match (&prop.delegate, &prop.values) {
                        (Some(delegate), _) => CStringLookup::Delegate(Arc::clone(delegate)),
                        (None, Values::String(values)) => {
                            prop.check_index(index)?;
                            CStringLookup::Stored(values[index].as_ptr())
                        }
                        (None, _) => return Err(unknown_property(name)),
                    })
                }
            }
        };

        match (found, &self.parent) {
            (Some(CStringLookup::Stored(ptr)), _) => Ok(ptr),
            (Some(CStringLookup::Delegate(delegate)), _) => {
                let value = to_c_string(delegate.get_string(name, index)?)?;
                let mut props = self.write_props();
                let prop = props.get_mut(name).ok_or_else(|| unknown_property(name))?;
                if prop.scratch.len() <= index {
                    prop.scratch.resize(index + 1, CString::default());
                }
                prop.scratch[index] = value;
                Ok(prop.scratch[index].as_ptr())
            }
            (None, Some(parent)) => parent.c_string(name, index),
            (None, None) => Err(unknown_property(name)),
        }
    }

    /// Copy every local property, without delegates or observers.
    ///
    /// The copy shares this set's parent.
    pub fn deep_copy(&self) -> Self {
        let props = self
            .read_props()
            .iter()
            .map(|(name, prop)| (name.clone(), prop.detached()))
            .collect();
        Self {
            magic: PROPERTY_SET_MAGIC,
            properties: RwLock::new(props),
            parent: self.parent.clone(),
        }
    }

    /// Raw stored state of every local property.
    pub fn snapshot(&self) -> Vec<PropertySnapshot> {
        self.read_props()
            .values()
            .map(|prop| PropertySnapshot {
                name: prop.name.clone(),
                kind: prop.kind(),
                dimension: prop.dimension,
                values: prop.values.to_texts(),
            })
            .collect()
    }

    /// Apply stored values read back from the cache file.
    ///
    /// An existing property of the same kind takes the values without
    /// notification; otherwise the property is created.
    pub fn restore(
        &self,
        name: &str,
        kind: PropertyType,
        dimension: usize,
        values: &[(usize, String)],
    ) -> HostResult<()> {
        let mut props = self.write_props();
        if props.get(name).is_none_or(|prop| prop.kind() != kind) {
            props.insert(name.to_string(), Property::new(name, kind, dimension));
        }
        let prop = props.get_mut(name).ok_or_else(|| unknown_property(name))?;

        let len = values.iter().map(|(index, _)| index + 1).max().unwrap_or(0);
        let mut parsed = Values::empty(kind);
        let mut ordered: Vec<&(usize, String)> = values.iter().collect();
        ordered.sort_by_key(|(index, _)| *index);
        for expected in 0..len {
            match ordered.iter().find(|(index, _)| *index == expected) {
                Some((_, text)) => parsed.push_text(text)?,
                None => parsed.resize(expected + 1),
            }
        }

        if prop.dimension > 0 {
            if len > prop.dimension {
                return Err(HostError::bad_index(format!(
                    "cached '{name}' has {len} values, dimension is {}",
                    prop.dimension
                )));
            }
            let mut merged = prop.values.clone();
            copy_prefix(&mut merged, &parsed);
            prop.values = merged;
        } else {
            prop.values = parsed;
        }
        Ok(())
    }

    fn read_value<T: PropertyKind>(&self, name: &str, index: usize, raw: bool) -> HostResult<T> {
        let found = self
            .read_props()
            .get(name)
            .map(|prop| prop.lookup::<T>(index, raw));
        let value = match (found, &self.parent) {
            (Some(lookup), _) => match lookup? {
                Lookup::Value(value) => value,
                Lookup::Delegate(delegate) => T::delegate_get(delegate.as_ref(), name, index)?,
            },
            (None, Some(parent)) => return parent.read_value(name, index, raw),
            (None, None) => return Err(unknown_property(name)),
        };
        value.validate(name)?;
        Ok(value)
    }

    fn store<T: PropertyKind>(
        &self,
        name: &str,
        index: usize,
        value: T,
        from_plugin: bool,
    ) -> HostResult<()> {
        value.validate(name)?;
        let observers = {
            let mut props = self.write_props();
            let prop = props.get_mut(name).ok_or_else(|| unknown_property(name))?;
            prop.check_kind(T::KIND)?;
            check_writable(prop, from_plugin)?;
            if prop.dimension > 0 && index >= prop.dimension {
                return Err(HostError::bad_index(format!(
                    "index {index} out of range for '{name}' (dimension {})",
                    prop.dimension
                )));
            }
            if index >= prop.values.len() {
                prop.values.resize(index + 1);
            }
            T::store_at(&mut prop.values, index, value);
            prop.observers.clone()
        };

        for observer in observers {
            observer.notify(name, true, index);
        }
        Ok(())
    }

    fn store_all<T: PropertyKind>(
        &self,
        name: &str,
        values: &[T],
        from_plugin: bool,
    ) -> HostResult<()> {
        for value in values {
            value.validate(name)?;
        }
        let observers = {
            let mut props = self.write_props();
            let prop = props.get_mut(name).ok_or_else(|| unknown_property(name))?;
            prop.check_kind(T::KIND)?;
            check_writable(prop, from_plugin)?;
            if prop.dimension > 0 && values.len() > prop.dimension {
                return Err(HostError::bad_index(format!(
                    "{} values given for '{name}' (dimension {})",
                    values.len(),
                    prop.dimension
                )));
            }
            if prop.dimension == 0 {
                prop.values.resize(values.len());
            }
            for (index, value) in values.iter().enumerate() {
                T::store_at(&mut prop.values, index, value.clone());
            }
            prop.observers.clone()
        };

        for observer in observers {
            observer.notify(name, false, values.len());
        }
        Ok(())
    }

    fn read_props(&self) -> RwLockReadGuard<'_, BTreeMap<String, Property>> {
        self.properties.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_props(&self) -> RwLockWriteGuard<'_, BTreeMap<String, Property>> {
        self.properties.write().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for PropertySet {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for PropertySet {
    fn drop(&mut self) {
        self.magic = 0;
    }
}

impl fmt::Debug for PropertySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertySet")
            .field("properties", &self.names())
            .field("chained", &self.parent.is_some())
            .finish()
    }
}

fn unknown_property(name: &str) -> HostError {
    HostError::unknown(format!("unknown property '{name}'"))
}

fn check_writable(prop: &Property, from_plugin: bool) -> HostResult<()> {
    if from_plugin && prop.plugin_read_only {
        return Err(HostError::bad_value(format!(
            "property '{}' is read-only for plugins",
            prop.name
        )));
    }
    Ok(())
}

fn read_delegate(
    delegate: &dyn PropertyGetDelegate,
    name: &str,
    kind: PropertyType,
    count: usize,
) -> HostResult<Values> {
    Ok(match kind {
        PropertyType::Int => Values::Int(
            (0..count)
                .map(|i| delegate.get_int(name, i))
                .collect::<HostResult<_>>()?,
        ),
        PropertyType::Double => Values::Double(
            (0..count)
                .map(|i| delegate.get_double(name, i))
                .collect::<HostResult<_>>()?,
        ),
        PropertyType::String => Values::String(
            (0..count)
                .map(|i| delegate.get_string(name, i).and_then(to_c_string))
                .collect::<HostResult<_>>()?,
        ),
        PropertyType::Pointer => Values::Pointer(
            (0..count)
                .map(|i| delegate.get_pointer(name, i))
                .collect::<HostResult<_>>()?,
        ),
    })
}

fn copy_prefix(target: &mut Values, source: &Values) {
    match (target, source) {
        (Values::Int(t), Values::Int(s)) => t[..s.len()].copy_from_slice(s),
        (Values::Double(t), Values::Double(s)) => t[..s.len()].copy_from_slice(s),
        (Values::String(t), Values::String(s)) => t[..s.len()].clone_from_slice(s),
        (Values::Pointer(t), Values::Pointer(s)) => t[..s.len()].copy_from_slice(s),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use ofxhost_core::error::ErrorKind;

    const SPECS: &[PropSpec] = &[
        PropSpec::double("scale", 2, false, 1.0),
        PropSpec::string("label", 1, false, "untitled"),
        PropSpec::string("contexts", 0, false, ""),
        PropSpec::int("locked", 1, true, 0),
    ];

    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<(String, bool, usize)>>,
    }

    impl PropertyWriteObserver for Recorder {
        fn notify(&self, name: &str, single: bool, index_or_count: usize) {
            self.calls
                .lock()
                .unwrap()
                .push((name.to_string(), single, index_or_count));
        }
    }

    struct Depths {
        depths: Mutex<Vec<String>>,
        resets: AtomicUsize,
    }

    impl PropertyGetDelegate for Depths {
        fn get_string(&self, _name: &str, index: usize) -> HostResult<String> {
            self.depths
                .lock()
                .unwrap()
                .get(index)
                .cloned()
                .ok_or_else(|| HostError::bad_index("depth"))
        }

        fn dimension(&self, _name: &str) -> HostResult<usize> {
            Ok(self.depths.lock().unwrap().len())
        }

        fn reset(&self, _name: &str) -> HostResult<()> {
            self.resets.fetch_add(1, Ordering::SeqCst);
            *self.depths.lock().unwrap() = vec!["OfxBitDepthFloat".to_string()];
            Ok(())
        }
    }

    struct NanSource;

    impl PropertyGetDelegate for NanSource {
        fn get_double(&self, _name: &str, _index: usize) -> HostResult<f64> {
            Ok(f64::NAN)
        }

        fn dimension(&self, _name: &str) -> HostResult<usize> {
            Ok(2)
        }
    }

    #[test]
    fn test_fixed_dimension_rejects_write_at_dimension() {
        let set = PropertySet::from_specs(SPECS);
        set.set_double("scale", 1, 0.5).unwrap();
        let err = set.set_double("scale", 2, 0.5).unwrap_err();
        assert_eq!(err.kind, ErrorKind::BadIndex);
        assert_eq!(set.dimension("scale").unwrap(), 2);
        assert_eq!(set.get_all::<f64>("scale").unwrap(), vec![1.0, 0.5]);
    }

    #[test]
    fn test_variable_dimension_grows_on_write() {
        let set = PropertySet::from_specs(SPECS);
        assert_eq!(set.dimension("contexts").unwrap(), 0);
        set.set_string("contexts", 2, "OfxImageEffectContextFilter")
            .unwrap();
        assert_eq!(set.dimension("contexts").unwrap(), 3);
        assert_eq!(set.get_string("contexts", 0).unwrap(), "");
        assert_eq!(
            set.get_string("contexts", 2).unwrap(),
            "OfxImageEffectContextFilter"
        );
        assert_eq!(
            set.get_string("contexts", 3).unwrap_err().kind,
            ErrorKind::BadIndex
        );
    }

    #[test]
    fn test_nan_is_rejected_on_write_and_read() {
        let set = PropertySet::from_specs(SPECS);
        assert_eq!(
            set.set_double("scale", 0, f64::NAN).unwrap_err().kind,
            ErrorKind::BadValue
        );
        assert_eq!(set.get_double("scale", 0).unwrap(), 1.0);

        set.restore("scale", PropertyType::Double, 2, &[(0, "NaN".to_string())])
            .unwrap();
        assert_eq!(
            set.get_double("scale", 0).unwrap_err().kind,
            ErrorKind::BadValue
        );

        set.set_delegate("scale", Arc::new(NanSource)).unwrap();
        assert_eq!(
            set.get_double("scale", 1).unwrap_err().kind,
            ErrorKind::BadValue
        );
    }

    #[test]
    fn test_wrong_type_and_unknown_name() {
        let set = PropertySet::from_specs(SPECS);
        assert_eq!(set.get_int("scale", 0).unwrap_err().kind, ErrorKind::Unknown);
        assert_eq!(
            set.set_int("missing", 0, 1).unwrap_err().kind,
            ErrorKind::Unknown
        );
    }

    #[test]
    fn test_observers_see_single_and_multi_writes() {
        let set = PropertySet::from_specs(SPECS);
        let recorder = Arc::new(Recorder::default());
        set.add_observer("scale", recorder.clone()).unwrap();

        set.set_double("scale", 1, 2.0).unwrap();
        set.set_all("scale", &[3.0, 4.0]).unwrap();
        set.reset("scale").unwrap();

        let calls = recorder.calls.lock().unwrap().clone();
        assert_eq!(
            calls,
            vec![
                ("scale".to_string(), true, 1),
                ("scale".to_string(), false, 2),
                ("scale".to_string(), false, 2),
            ]
        );
        assert_eq!(set.get_all::<f64>("scale").unwrap(), vec![1.0, 1.0]);
    }

    #[test]
    fn test_set_all_on_fixed_property_checks_count() {
        let set = PropertySet::from_specs(SPECS);
        assert_eq!(
            set.set_all("scale", &[1.0, 2.0, 3.0]).unwrap_err().kind,
            ErrorKind::BadIndex
        );
        set.set_all("scale", &[7.0]).unwrap();
        assert_eq!(set.get_all::<f64>("scale").unwrap(), vec![7.0, 1.0]);
    }

    #[test]
    fn test_delegate_answers_reads_and_dimension() {
        let set = PropertySet::from_specs(SPECS);
        let depths = Arc::new(Depths {
            depths: Mutex::new(vec![
                "OfxBitDepthByte".to_string(),
                "OfxBitDepthShort".to_string(),
            ]),
            resets: AtomicUsize::new(0),
        });
        set.set_delegate("contexts", depths.clone()).unwrap();

        assert_eq!(set.dimension("contexts").unwrap(), 2);
        assert_eq!(set.get_string("contexts", 1).unwrap(), "OfxBitDepthShort");
        assert!(set.get_raw::<String>("contexts", 0).is_err());

        set.reset("contexts").unwrap();
        assert_eq!(depths.resets.load(Ordering::SeqCst), 1);
        assert_eq!(set.dimension("contexts").unwrap(), 1);
        assert_eq!(
            set.get_raw::<String>("contexts", 0).unwrap(),
            "OfxBitDepthFloat"
        );
    }

    #[test]
    fn test_reset_variable_property_truncates() {
        let set = PropertySet::from_specs(SPECS);
        set.set_all(
            "contexts",
            &["a".to_string(), "b".to_string(), "c".to_string()],
        )
        .unwrap();
        set.reset("contexts").unwrap();
        assert_eq!(set.dimension("contexts").unwrap(), 0);
    }

    #[test]
    fn test_chained_reads_fall_back_but_writes_do_not() {
        let parent = Arc::new(PropertySet::from_specs(SPECS));
        parent.set_string("label", 0, "parent").unwrap();
        let child = PropertySet::with_parent(parent.clone());

        assert_eq!(child.get_string("label", 0).unwrap(), "parent");
        assert_eq!(child.dimension("scale").unwrap(), 2);
        assert_eq!(
            child.set_string("label", 0, "child").unwrap_err().kind,
            ErrorKind::Unknown
        );
    }

    #[test]
    fn test_plugin_writes_honour_read_only() {
        let set = PropertySet::from_specs(SPECS);
        assert_eq!(
            set.plugin_set("locked", 0, 1i32).unwrap_err().kind,
            ErrorKind::BadValue
        );
        set.set_int("locked", 0, 1).unwrap();
        assert_eq!(set.get_int("locked", 0).unwrap(), 1);
    }

    #[test]
    fn test_deep_copy_drops_hooks() {
        let set = PropertySet::from_specs(SPECS);
        let recorder = Arc::new(Recorder::default());
        set.add_observer("label", recorder.clone()).unwrap();
        set.set_string("label", 0, "one").unwrap();

        let copy = set.deep_copy();
        copy.set_string("label", 0, "two").unwrap();

        assert_eq!(recorder.calls.lock().unwrap().len(), 1);
        assert_eq!(set.get_string("label", 0).unwrap(), "one");
        assert_eq!(copy.get_string("label", 0).unwrap(), "two");
    }

    #[test]
    fn test_handle_round_trip_and_foreign_handle() {
        let set = PropertySet::from_specs(SPECS);
        let resolved = unsafe { PropertySet::from_handle(set.handle()) }.unwrap();
        assert_eq!(resolved.get_string("label", 0).unwrap(), "untitled");

        let mut not_a_set = 42u64;
        let handle = &mut not_a_set as *mut u64 as OfxPropertySetHandle;
        assert_eq!(
            unsafe { PropertySet::from_handle(handle) }.unwrap_err().kind,
            ErrorKind::BadHandle
        );
        assert!(unsafe { PropertySet::from_handle(std::ptr::null_mut()) }.is_err());
    }

    #[test]
    fn test_restore_creates_missing_properties() {
        let set = PropertySet::new();
        set.restore(
            "OfxImageEffectPropSupportedContexts",
            PropertyType::String,
            0,
            &[
                (1, "OfxImageEffectContextGeneral".to_string()),
                (0, "OfxImageEffectContextFilter".to_string()),
            ],
        )
        .unwrap();
        assert_eq!(
            set.get_all::<String>("OfxImageEffectPropSupportedContexts")
                .unwrap(),
            vec!["OfxImageEffectContextFilter", "OfxImageEffectContextGeneral"]
        );
    }
}
