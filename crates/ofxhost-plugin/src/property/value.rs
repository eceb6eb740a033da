//! Property value kinds and their typed storage.

use std::ffi::{CString, c_void};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use ofxhost_core::error::HostError;
use ofxhost_core::result::HostResult;

use super::hooks::PropertyGetDelegate;

/// The four value kinds a property can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertyType {
    /// 32-bit signed integers.
    Int,
    /// 64-bit floats.
    Double,
    /// NUL-free UTF-8 strings.
    String,
    /// Opaque addresses owned by whoever set them.
    Pointer,
}

impl PropertyType {
    /// The name used for this kind in the cache file.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Int => "int",
            Self::Double => "double",
            Self::String => "string",
            Self::Pointer => "pointer",
        }
    }
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PropertyType {
    type Err = HostError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "int" => Ok(Self::Int),
            "double" => Ok(Self::Double),
            "string" => Ok(Self::String),
            "pointer" => Ok(Self::Pointer),
            other => Err(HostError::unknown(format!("unknown property type '{other}'"))),
        }
    }
}

/// An address stored in a pointer property.
///
/// Kept as an integer so property sets stay `Send + Sync`; the host never
/// dereferences it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct RawPointer(pub usize);

impl RawPointer {
    /// The null pointer.
    pub const NULL: Self = Self(0);

    /// Wrap a raw address.
    pub fn from_ptr<T>(ptr: *const T) -> Self {
        Self(ptr as usize)
    }

    /// The address as a mutable void pointer.
    pub fn as_ptr(self) -> *mut c_void {
        self.0 as *mut c_void
    }

    /// Whether this is the null pointer.
    pub fn is_null(self) -> bool {
        self.0 == 0
    }
}

/// Stored values of a property, one vector per kind.
#[derive(Debug, Clone, PartialEq)]
pub enum Values {
    /// Integer values.
    Int(Vec<i32>),
    /// Double values.
    Double(Vec<f64>),
    /// String values, kept NUL-terminated for the C suite.
    String(Vec<CString>),
    /// Pointer values.
    Pointer(Vec<RawPointer>),
}

impl Values {
    /// An empty value list of the given kind.
    pub fn empty(kind: PropertyType) -> Self {
        match kind {
            PropertyType::Int => Self::Int(Vec::new()),
            PropertyType::Double => Self::Double(Vec::new()),
            PropertyType::String => Self::String(Vec::new()),
            PropertyType::Pointer => Self::Pointer(Vec::new()),
        }
    }

    /// Kind of the stored values.
    pub fn kind(&self) -> PropertyType {
        match self {
            Self::Int(_) => PropertyType::Int,
            Self::Double(_) => PropertyType::Double,
            Self::String(_) => PropertyType::String,
            Self::Pointer(_) => PropertyType::Pointer,
        }
    }

    /// Number of stored values.
    pub fn len(&self) -> usize {
        match self {
            Self::Int(v) => v.len(),
            Self::Double(v) => v.len(),
            Self::String(v) => v.len(),
            Self::Pointer(v) => v.len(),
        }
    }

    /// Whether no values are stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Truncate or pad with the kind's zero value.
    pub fn resize(&mut self, len: usize) {
        match self {
            Self::Int(v) => v.resize(len, 0),
            Self::Double(v) => v.resize(len, 0.0),
            Self::String(v) => v.resize(len, CString::default()),
            Self::Pointer(v) => v.resize(len, RawPointer::NULL),
        }
    }

    /// Parse one textual value and append it.
    pub fn push_text(&mut self, text: &str) -> HostResult<()> {
        match self {
            Self::Int(v) => v.push(i32::parse_text(text)?),
            Self::Double(v) => v.push(f64::parse_text(text)?),
            Self::String(v) => v.push(to_c_string(text.to_string())?),
            Self::Pointer(v) => v.push(RawPointer::parse_text(text)?),
        }
        Ok(())
    }

    /// Render every value as text, in index order.
    pub fn to_texts(&self) -> Vec<String> {
        match self {
            Self::Int(v) => v.iter().map(|x| x.to_string()).collect(),
            Self::Double(v) => v.iter().map(|x| x.to_string()).collect(),
            Self::String(v) => v.iter().map(|x| x.to_string_lossy().into_owned()).collect(),
            Self::Pointer(v) => v.iter().map(|x| format!("{:#x}", x.0)).collect(),
        }
    }
}

/// A Rust type that maps onto one property kind.
pub trait PropertyKind: Clone + fmt::Debug + Send + Sync + 'static {
    /// The property kind this type reads and writes.
    const KIND: PropertyType;

    /// Typed view of stored values, if the kinds match.
    fn values(values: &Values) -> Option<Vec<Self>>;

    /// Read one stored value, if the kinds match and the index exists.
    fn value_at(values: &Values, index: usize) -> Option<Self>;

    /// Store a value, if the kinds match and the index exists.
    fn store_at(values: &mut Values, index: usize, value: Self) -> bool;

    /// Ask a delegate for the live value.
    fn delegate_get(
        delegate: &dyn PropertyGetDelegate,
        name: &str,
        index: usize,
    ) -> HostResult<Self>;

    /// Reject values that must not cross the plugin boundary.
    fn validate(&self, _name: &str) -> HostResult<()> {
        Ok(())
    }

    /// Parse the textual form used by specs and the cache file.
    fn parse_text(text: &str) -> HostResult<Self>;
}

impl PropertyKind for i32 {
    const KIND: PropertyType = PropertyType::Int;

    fn values(values: &Values) -> Option<Vec<Self>> {
        match values {
            Values::Int(v) => Some(v.clone()),
            _ => None,
        }
    }

    fn value_at(values: &Values, index: usize) -> Option<Self> {
        match values {
            Values::Int(v) => v.get(index).copied(),
            _ => None,
        }
    }

    fn store_at(values: &mut Values, index: usize, value: Self) -> bool {
        match values {
            Values::Int(v) => v.get_mut(index).map(|slot| *slot = value).is_some(),
            _ => false,
        }
    }

    fn delegate_get(
        delegate: &dyn PropertyGetDelegate,
        name: &str,
        index: usize,
    ) -> HostResult<Self> {
        delegate.get_int(name, index)
    }

    fn parse_text(text: &str) -> HostResult<Self> {
        text.trim()
            .parse()
            .map_err(|_| HostError::bad_value(format!("'{text}' is not an int")))
    }
}

impl PropertyKind for f64 {
    const KIND: PropertyType = PropertyType::Double;

    fn values(values: &Values) -> Option<Vec<Self>> {
        match values {
            Values::Double(v) => Some(v.clone()),
            _ => None,
        }
    }

    fn value_at(values: &Values, index: usize) -> Option<Self> {
        match values {
            Values::Double(v) => v.get(index).copied(),
            _ => None,
        }
    }

    fn store_at(values: &mut Values, index: usize, value: Self) -> bool {
        match values {
            Values::Double(v) => v.get_mut(index).map(|slot| *slot = value).is_some(),
            _ => false,
        }
    }

    fn delegate_get(
        delegate: &dyn PropertyGetDelegate,
        name: &str,
        index: usize,
    ) -> HostResult<Self> {
        delegate.get_double(name, index)
    }

    fn validate(&self, name: &str) -> HostResult<()> {
        if self.is_nan() {
            return Err(HostError::bad_value(format!("NaN in double property '{name}'")));
        }
        Ok(())
    }

    fn parse_text(text: &str) -> HostResult<Self> {
        text.trim()
            .parse()
            .map_err(|_| HostError::bad_value(format!("'{text}' is not a double")))
    }
}

impl PropertyKind for String {
    const KIND: PropertyType = PropertyType::String;

    fn values(values: &Values) -> Option<Vec<Self>> {
        match values {
            Values::String(v) => Some(
                v.iter()
                    .map(|s| s.to_string_lossy().into_owned())
                    .collect(),
            ),
            _ => None,
        }
    }

    fn value_at(values: &Values, index: usize) -> Option<Self> {
        match values {
            Values::String(v) => v.get(index).map(|s| s.to_string_lossy().into_owned()),
            _ => None,
        }
    }

    fn store_at(values: &mut Values, index: usize, value: Self) -> bool {
        let Ok(value) = CString::new(value) else {
            return false;
        };
        match values {
            Values::String(v) => v.get_mut(index).map(|slot| *slot = value).is_some(),
            _ => false,
        }
    }

    fn delegate_get(
        delegate: &dyn PropertyGetDelegate,
        name: &str,
        index: usize,
    ) -> HostResult<Self> {
        delegate.get_string(name, index)
    }

    fn validate(&self, name: &str) -> HostResult<()> {
        if self.contains('\0') {
            return Err(HostError::bad_value(format!(
                "interior NUL in string property '{name}'"
            )));
        }
        Ok(())
    }

    fn parse_text(text: &str) -> HostResult<Self> {
        Ok(text.to_string())
    }
}

impl PropertyKind for RawPointer {
    const KIND: PropertyType = PropertyType::Pointer;

    fn values(values: &Values) -> Option<Vec<Self>> {
        match values {
            Values::Pointer(v) => Some(v.clone()),
            _ => None,
        }
    }

    fn value_at(values: &Values, index: usize) -> Option<Self> {
        match values {
            Values::Pointer(v) => v.get(index).copied(),
            _ => None,
        }
    }

    fn store_at(values: &mut Values, index: usize, value: Self) -> bool {
        match values {
            Values::Pointer(v) => v.get_mut(index).map(|slot| *slot = value).is_some(),
            _ => false,
        }
    }

    fn delegate_get(
        delegate: &dyn PropertyGetDelegate,
        name: &str,
        index: usize,
    ) -> HostResult<Self> {
        delegate.get_pointer(name, index)
    }

    fn parse_text(text: &str) -> HostResult<Self> {
        let text = text.trim();
        let parsed = match text.strip_prefix("0x") {
            Some(hex) => usize::from_str_radix(hex, 16),
            None => text.parse(),
        };
        parsed
            .map(RawPointer)
            .map_err(|_| HostError::bad_value(format!("'{text}' is not a pointer")))
    }
}

/// Convert to a C string, rejecting interior NULs.
pub(crate) fn to_c_string(value: String) -> HostResult<CString> {
    CString::new(value).map_err(|e| HostError::bad_value(format!("interior NUL in string: {e}")))
}
