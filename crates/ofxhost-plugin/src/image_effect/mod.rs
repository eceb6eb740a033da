//! The image effect API: descriptors, instances and the plugin type.

pub mod descriptor;
pub mod effect;
pub mod instance;
pub mod plugin;

pub use descriptor::Descriptor;
pub use effect::{Clip, Effect, EffectKind, Param, ParamSet};
pub use instance::{Instance, InstanceState, RenderArgs, SequenceRenderArgs};
pub use plugin::{ImageEffectApi, ImageEffectPlugin};
