//! Static property templates used to populate property sets.

use super::value::PropertyType;

/// Constructor-time default of a property.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PropDefault {
    /// Int default, repeated across every fixed dimension.
    Int(i32),
    /// Double default, repeated across every fixed dimension.
    Double(f64),
    /// String default, repeated across every fixed dimension.
    String(&'static str),
    /// Null pointer default.
    Pointer,
}

impl PropDefault {
    /// Kind of property this default initializes.
    pub fn kind(self) -> PropertyType {
        match self {
            Self::Int(_) => PropertyType::Int,
            Self::Double(_) => PropertyType::Double,
            Self::String(_) => PropertyType::String,
            Self::Pointer => PropertyType::Pointer,
        }
    }
}

/// Template for one property.
///
/// A `dimension` of zero declares a variable-dimension property, which
/// starts empty regardless of its default.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PropSpec {
    /// Property name.
    pub name: &'static str,
    /// Fixed dimension, or zero for variable.
    pub dimension: usize,
    /// Whether plugins are refused write access through the suite.
    pub plugin_read_only: bool,
    /// Default value.
    pub default: PropDefault,
}

impl PropSpec {
    /// An int property template.
    pub const fn int(name: &'static str, dimension: usize, read_only: bool, value: i32) -> Self {
        Self {
            name,
            dimension,
            plugin_read_only: read_only,
            default: PropDefault::Int(value),
        }
    }

    /// A double property template.
    pub const fn double(name: &'static str, dimension: usize, read_only: bool, value: f64) -> Self {
        Self {
            name,
            dimension,
            plugin_read_only: read_only,
            default: PropDefault::Double(value),
        }
    }

    /// A string property template.
    pub const fn string(
        name: &'static str,
        dimension: usize,
        read_only: bool,
        value: &'static str,
    ) -> Self {
        Self {
            name,
            dimension,
            plugin_read_only: read_only,
            default: PropDefault::String(value),
        }
    }

    /// A pointer property template, defaulting to null.
    pub const fn pointer(name: &'static str, dimension: usize, read_only: bool) -> Self {
        Self {
            name,
            dimension,
            plugin_read_only: read_only,
            default: PropDefault::Pointer,
        }
    }
}
