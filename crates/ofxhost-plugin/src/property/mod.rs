//! Typed reflective property sets and the C property suite.

pub mod hooks;
pub mod set;
pub mod spec;
pub mod suite;
pub mod value;

pub use hooks::{PropertyGetDelegate, PropertyWriteObserver};
pub use set::{Property, PropertySet, PropertySnapshot};
pub use spec::{PropDefault, PropSpec};
pub use value::{PropertyKind, PropertyType, RawPointer};
