//! Live effect instances and their action sequence.
//!
//! An instance moves through
//! `Instantiated → Created → (Changing | Rendering)* → Destroyed`; every
//! action is checked against the current state and dispatches hold the
//! state lock, so one instance never runs two actions at once.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, warn};

use ofxhost_core::error::HostError;
use ofxhost_core::result::HostResult;

use crate::action::Action;
use crate::constants::{props, types};
use crate::ffi::abi::OfxImageEffectHandle;
use crate::handle::PluginHandle;
use crate::property::{PropSpec, PropertySet};

use super::descriptor::Descriptor;
use super::effect::{Clip, Effect, EffectKind, Param};
use super::plugin::ImageEffectPlugin;

/// Lifecycle position of an [`Instance`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstanceState {
    /// Built, `CreateInstance` not yet sent.
    Instantiated,
    /// Ready for changes and renders.
    Created,
    /// Between `BeginInstanceChanged` and `EndInstanceChanged`.
    Changing,
    /// Between `BeginSequenceRender` and `EndSequenceRender`.
    Rendering,
    /// `DestroyInstance` has been sent.
    Destroyed,
}

impl fmt::Display for InstanceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Instantiated => "instantiated",
            Self::Created => "created",
            Self::Changing => "changing",
            Self::Rendering => "rendering",
            Self::Destroyed => "destroyed",
        };
        f.write_str(name)
    }
}

/// Arguments of `BeginSequenceRender` and `EndSequenceRender`.
#[derive(Debug, Clone, PartialEq)]
pub struct SequenceRenderArgs {
    /// First and last frame.
    pub frame_range: [f64; 2],
    /// Frame increment.
    pub frame_step: f64,
    /// Whether a user is waiting on the result.
    pub interactive: bool,
    /// Horizontal and vertical scale.
    pub render_scale: [f64; 2],
    /// Frames are rendered in order.
    pub sequential: bool,
    /// Draft quality is acceptable.
    pub draft: bool,
}

impl Default for SequenceRenderArgs {
    fn default() -> Self {
        Self {
            frame_range: [0.0, 0.0],
            frame_step: 1.0,
            interactive: false,
            render_scale: [1.0, 1.0],
            sequential: false,
            draft: false,
        }
    }
}

/// Arguments of `Render`.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderArgs {
    /// Frame to render.
    pub time: f64,
    /// Field to render, e.g. `OfxImageFieldNone`.
    pub field: String,
    /// Pixel window `x1, y1, x2, y2`.
    pub window: [i32; 4],
    /// Horizontal and vertical scale.
    pub render_scale: [f64; 2],
    /// Frames are rendered in order.
    pub sequential: bool,
    /// Whether a user is waiting on the result.
    pub interactive: bool,
    /// Draft quality is acceptable.
    pub draft: bool,
}

impl Default for RenderArgs {
    fn default() -> Self {
        Self {
            time: 0.0,
            field: "OfxImageFieldNone".to_string(),
            window: [0, 0, 0, 0],
            render_scale: [1.0, 1.0],
            sequential: false,
            interactive: false,
            draft: false,
        }
    }
}

const INSTANCE_PROPERTIES: &[PropSpec] = &[
    PropSpec::string(props::TYPE, 1, true, types::IMAGE_EFFECT_INSTANCE),
    PropSpec::string(props::CONTEXT, 1, true, ""),
    PropSpec::int(props::IS_INTERACTIVE, 1, true, 0),
    PropSpec::double(props::PROJECT_SIZE, 2, true, 0.0),
    PropSpec::double(props::PROJECT_OFFSET, 2, true, 0.0),
    PropSpec::double(props::PROJECT_EXTENT, 2, true, 0.0),
    PropSpec::double(props::PROJECT_PIXEL_ASPECT_RATIO, 1, true, 1.0),
    PropSpec::double(props::FRAME_RATE, 1, true, 24.0),
    PropSpec::double(props::INSTANCE_EFFECT_DURATION, 1, true, 1.0),
    PropSpec::int(props::SEQUENTIAL_RENDER, 1, false, 0),
    PropSpec::int(props::SUPPORTS_TILES, 1, false, 1),
    PropSpec::pointer(props::INSTANCE_DATA, 1, false),
];

const BEGIN_CHANGED_ARGS: &[PropSpec] = &[PropSpec::string(props::CHANGE_REASON, 1, true, "")];

const INSTANCE_CHANGED_ARGS: &[PropSpec] = &[
    PropSpec::string(props::TYPE, 1, true, ""),
    PropSpec::string(props::NAME, 1, true, ""),
    PropSpec::string(props::CHANGE_REASON, 1, true, ""),
    PropSpec::double(props::TIME, 1, true, 0.0),
    PropSpec::double(props::RENDER_SCALE, 2, true, 1.0),
];

const SEQUENCE_RENDER_ARGS: &[PropSpec] = &[
    PropSpec::double(props::FRAME_RANGE, 2, true, 0.0),
    PropSpec::double(props::FRAME_STEP, 1, true, 1.0),
    PropSpec::int(props::IS_INTERACTIVE, 1, true, 0),
    PropSpec::double(props::RENDER_SCALE, 2, true, 1.0),
    PropSpec::int(props::SEQUENTIAL_RENDER_STATUS, 1, true, 0),
    PropSpec::int(props::INTERACTIVE_RENDER_STATUS, 1, true, 0),
    PropSpec::int(props::RENDER_QUALITY_DRAFT, 1, true, 0),
];

const RENDER_ARGS: &[PropSpec] = &[
    PropSpec::double(props::TIME, 1, true, 0.0),
    PropSpec::string(props::FIELD_TO_RENDER, 1, true, "OfxImageFieldNone"),
    PropSpec::int(props::RENDER_WINDOW, 4, true, 0),
    PropSpec::double(props::RENDER_SCALE, 2, true, 1.0),
    PropSpec::int(props::SEQUENTIAL_RENDER_STATUS, 1, true, 0),
    PropSpec::int(props::INTERACTIVE_RENDER_STATUS, 1, true, 0),
    PropSpec::int(props::RENDER_QUALITY_DRAFT, 1, true, 0),
];

/// One live effect.
pub struct Instance {
    plugin: Arc<ImageEffectPlugin>,
    descriptor: Arc<Descriptor>,
    context: String,
    effect: Box<Effect>,
    handle: Arc<PluginHandle>,
    state: Mutex<InstanceState>,
}

impl Instance {
    /// Build an instance of `descriptor`, copying its clips and parameters.
    pub(crate) fn new(
        plugin: Arc<ImageEffectPlugin>,
        descriptor: Arc<Descriptor>,
        handle: Arc<PluginHandle>,
    ) -> HostResult<Self> {
        let context = descriptor
            .context()
            .ok_or_else(|| HostError::invalid_state("instances need a context descriptor"))?
            .to_string();

        let properties = PropertySet::with_parent(Arc::clone(descriptor.effect().shared_properties()));
        properties.add_specs(INSTANCE_PROPERTIES);
        properties.set_string(props::CONTEXT, 0, &context)?;

        let effect = Box::new(Effect::new(EffectKind::Instance, Arc::new(properties)));
        effect.copy_layout_from(descriptor.effect())?;

        Ok(Self {
            plugin,
            descriptor,
            context,
            effect,
            handle,
            state: Mutex::new(InstanceState::Instantiated),
        })
    }

    /// The plugin this is an instance of.
    pub fn plugin(&self) -> &Arc<ImageEffectPlugin> {
        &self.plugin
    }

    /// The context descriptor it was built from.
    pub fn descriptor(&self) -> &Arc<Descriptor> {
        &self.descriptor
    }

    /// The context it runs in.
    pub fn context(&self) -> &str {
        &self.context
    }

    /// Instance properties; reads fall back to the descriptor.
    pub fn properties(&self) -> &PropertySet {
        self.effect.properties()
    }

    /// Handle passed with instance actions.
    pub fn handle(&self) -> OfxImageEffectHandle {
        self.effect.handle()
    }

    /// Clip by name.
    pub fn clip(&self, name: &str) -> Option<Arc<Clip>> {
        self.effect.clip(name)
    }

    /// Parameter by name.
    pub fn param(&self, name: &str) -> Option<Arc<Param>> {
        self.effect.params().param(name)
    }

    /// Current lifecycle state.
    pub fn state(&self) -> InstanceState {
        *self.lock_state()
    }

    /// Send `CreateInstance`.
    pub fn create(&self) -> HostResult<()> {
        self.transition(
            Action::CreateInstance,
            &[InstanceState::Instantiated],
            InstanceState::Created,
            None,
        )
    }

    /// Open a batch of changes.
    pub fn begin_instance_changed(&self, reason: &str) -> HostResult<()> {
        let args = PropertySet::from_specs(BEGIN_CHANGED_ARGS);
        args.set_string(props::CHANGE_REASON, 0, reason)?;
        self.transition(
            Action::BeginInstanceChanged,
            &[InstanceState::Created],
            InstanceState::Changing,
            Some(&args),
        )
    }

    /// Report a changed parameter.
    pub fn param_changed(
        &self,
        name: &str,
        reason: &str,
        time: f64,
        render_scale: [f64; 2],
    ) -> HostResult<()> {
        if self.param(name).is_none() {
            return Err(HostError::not_found(format!("no parameter '{name}'")));
        }
        self.instance_changed(types::PARAMETER, name, reason, time, render_scale)
    }

    /// Report a changed clip.
    pub fn clip_changed(
        &self,
        name: &str,
        reason: &str,
        time: f64,
        render_scale: [f64; 2],
    ) -> HostResult<()> {
        if self.clip(name).is_none() {
            return Err(HostError::not_found(format!("no clip '{name}'")));
        }
        self.instance_changed(types::CLIP, name, reason, time, render_scale)
    }

    /// Close a batch of changes.
    pub fn end_instance_changed(&self, reason: &str) -> HostResult<()> {
        let args = PropertySet::from_specs(BEGIN_CHANGED_ARGS);
        args.set_string(props::CHANGE_REASON, 0, reason)?;
        self.transition(
            Action::EndInstanceChanged,
            &[InstanceState::Changing],
            InstanceState::Created,
            Some(&args),
        )
    }

    /// Start a render sequence.
    pub fn begin_render(&self, args: &SequenceRenderArgs) -> HostResult<()> {
        let args = sequence_args(args)?;
        self.transition(
            Action::BeginSequenceRender,
            &[InstanceState::Created],
            InstanceState::Rendering,
            Some(&args),
        )
    }

    /// Render one frame inside a sequence.
    pub fn render(&self, args: &RenderArgs) -> HostResult<()> {
        let in_args = PropertySet::from_specs(RENDER_ARGS);
        in_args.set_double(props::TIME, 0, args.time)?;
        in_args.set_string(props::FIELD_TO_RENDER, 0, &args.field)?;
        in_args.set_all(props::RENDER_WINDOW, &args.window)?;
        in_args.set_all(props::RENDER_SCALE, &args.render_scale)?;
        in_args.set_int(props::SEQUENTIAL_RENDER_STATUS, 0, args.sequential as i32)?;
        in_args.set_int(props::INTERACTIVE_RENDER_STATUS, 0, args.interactive as i32)?;
        in_args.set_int(props::RENDER_QUALITY_DRAFT, 0, args.draft as i32)?;
        self.transition(
            Action::Render,
            &[InstanceState::Rendering],
            InstanceState::Rendering,
            Some(&in_args),
        )
    }

    /// End a render sequence.
    pub fn end_render(&self, args: &SequenceRenderArgs) -> HostResult<()> {
        let args = sequence_args(args)?;
        self.transition(
            Action::EndSequenceRender,
            &[InstanceState::Rendering],
            InstanceState::Created,
            Some(&args),
        )
    }

    /// Ask the plugin to free cached data.
    pub fn purge_caches(&self) -> HostResult<()> {
        self.in_created_state(Action::PurgeCaches)
    }

    /// Ask the plugin to flush private data into parameters.
    pub fn sync_private_data(&self) -> HostResult<()> {
        self.in_created_state(Action::SyncPrivateData)
    }

    /// A user started editing the instance.
    pub fn begin_instance_edit(&self) -> HostResult<()> {
        self.in_created_state(Action::BeginInstanceEdit)
    }

    /// A user stopped editing the instance.
    pub fn end_instance_edit(&self) -> HostResult<()> {
        self.in_created_state(Action::EndInstanceEdit)
    }

    /// Send `DestroyInstance`.
    pub fn destroy(&self) -> HostResult<()> {
        self.transition(
            Action::DestroyInstance,
            &[InstanceState::Created],
            InstanceState::Destroyed,
            None,
        )
    }

    fn instance_changed(
        &self,
        kind: &str,
        name: &str,
        reason: &str,
        time: f64,
        render_scale: [f64; 2],
    ) -> HostResult<()> {
        let args = PropertySet::from_specs(INSTANCE_CHANGED_ARGS);
        args.set_string(props::TYPE, 0, kind)?;
        args.set_string(props::NAME, 0, name)?;
        args.set_string(props::CHANGE_REASON, 0, reason)?;
        args.set_double(props::TIME, 0, time)?;
        args.set_all(props::RENDER_SCALE, &render_scale)?;
        self.transition(
            Action::InstanceChanged,
            &[InstanceState::Changing],
            InstanceState::Changing,
            Some(&args),
        )
    }

    fn in_created_state(&self, action: Action) -> HostResult<()> {
        self.transition(action, &[InstanceState::Created], InstanceState::Created, None)
    }

    fn transition(
        &self,
        action: Action,
        from: &[InstanceState],
        to: InstanceState,
        in_args: Option<&PropertySet>,
    ) -> HostResult<()> {
        let mut state = self.lock_state();
        if !from.contains(&*state) {
            return Err(HostError::invalid_state(format!(
                "{action} is not allowed while the instance is {}",
                *state
            )));
        }
        self.send(action, in_args)?;
        *state = to;
        Ok(())
    }

    fn send(&self, action: Action, in_args: Option<&PropertySet>) -> HostResult<()> {
        // SAFETY: the effect lives as long as `self`.
        let status = unsafe { self.handle.call(action, self.effect.handle(), in_args, None) };
        if status.is_success() {
            Ok(())
        } else {
            Err(HostError::action_failed(action.as_str(), status))
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, InstanceState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn sequence_args(args: &SequenceRenderArgs) -> HostResult<PropertySet> {
    let in_args = PropertySet::from_specs(SEQUENCE_RENDER_ARGS);
    in_args.set_all(props::FRAME_RANGE, &args.frame_range)?;
    in_args.set_double(props::FRAME_STEP, 0, args.frame_step)?;
    in_args.set_int(props::IS_INTERACTIVE, 0, args.interactive as i32)?;
    in_args.set_all(props::RENDER_SCALE, &args.render_scale)?;
    in_args.set_int(props::SEQUENTIAL_RENDER_STATUS, 0, args.sequential as i32)?;
    in_args.set_int(props::INTERACTIVE_RENDER_STATUS, 0, args.interactive as i32)?;
    in_args.set_int(props::RENDER_QUALITY_DRAFT, 0, args.draft as i32)?;
    Ok(in_args)
}

impl Drop for Instance {
    fn drop(&mut self) {
        let state = *self.lock_state();
        if matches!(
            state,
            InstanceState::Created | InstanceState::Changing | InstanceState::Rendering
        ) {
            debug!(plugin_id = %self.plugin.identifier(), %state, "Destroying dropped instance");
            if let Err(e) = self.send(Action::DestroyInstance, None) {
                warn!(plugin_id = %self.plugin.identifier(), error = %e, "DestroyInstance failed");
            }
        }
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("plugin_id", &self.plugin.identifier())
            .field("context", &self.context)
            .field("state", &self.state())
            .finish()
    }
}
