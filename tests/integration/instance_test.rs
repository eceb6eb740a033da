//! Integration tests for the image effect instance lifecycle.

mod helpers;

use std::sync::Arc;

use helpers::{FOO_ID, FUSSY_ID, TestHost};
use ofxhost_core::error::ErrorKind;
use ofxhost_core::types::status::Status;
use ofxhost_plugin::action::Action;
use ofxhost_plugin::constants::{change_reasons, contexts, props};
use ofxhost_plugin::image_effect::{
    ImageEffectPlugin, InstanceState, RenderArgs, SequenceRenderArgs,
};
use ofxhost_plugin::runtime::HostRuntime;

fn scanned(host: &TestHost) -> (HostRuntime, Arc<ImageEffectPlugin>) {
    let root = host.path("OFX");
    host.install(&root, "Foo", helpers::foo_library());
    let mut runtime = host.runtime(host.config(&[&root]));
    runtime.scan();
    let effect = runtime.cache().get_image_effect(FOO_ID, None, None).unwrap();
    helpers::clear_actions();
    (runtime, effect)
}

#[test]
fn test_full_instance_lifecycle() {
    let host = TestHost::new();
    let (_runtime, effect) = scanned(&host);

    let instance = effect.create_instance(contexts::FILTER).unwrap();
    assert_eq!(instance.state(), InstanceState::Instantiated);

    instance.create().unwrap();
    instance
        .begin_instance_changed(change_reasons::USER_EDITED)
        .unwrap();
    instance
        .param_changed("gain", change_reasons::USER_EDITED, 0.0, [1.0, 1.0])
        .unwrap();
    instance
        .end_instance_changed(change_reasons::USER_EDITED)
        .unwrap();

    let sequence = SequenceRenderArgs {
        frame_range: [0.0, 1.0],
        ..Default::default()
    };
    instance.begin_render(&sequence).unwrap();
    instance
        .render(&RenderArgs {
            window: [0, 0, 64, 64],
            ..Default::default()
        })
        .unwrap();
    instance.end_render(&sequence).unwrap();
    instance.destroy().unwrap();
    assert_eq!(instance.state(), InstanceState::Destroyed);

    assert_eq!(
        helpers::actions(),
        vec![
            Action::Load,
            Action::Describe,
            Action::DescribeInContext,
            Action::CreateInstance,
            Action::BeginInstanceChanged,
            Action::InstanceChanged,
            Action::EndInstanceChanged,
            Action::BeginSequenceRender,
            Action::Render,
            Action::EndSequenceRender,
            Action::DestroyInstance,
        ]
    );
}

#[test]
fn test_actions_out_of_order_are_refused() {
    let host = TestHost::new();
    let (_runtime, effect) = scanned(&host);

    let instance = effect.create_instance(contexts::FILTER).unwrap();
    let err = instance.render(&RenderArgs::default()).unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidState);

    instance.create().unwrap();
    let err = instance
        .end_instance_changed(change_reasons::USER_EDITED)
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidState);
    assert_eq!(instance.state(), InstanceState::Created);
    assert!(!helpers::actions().contains(&Action::Render));
}

#[test]
fn test_instance_copies_context_layout() {
    let host = TestHost::new();
    let (_runtime, effect) = scanned(&host);

    let instance = effect.create_instance(contexts::GENERAL).unwrap();
    assert_eq!(instance.context(), contexts::GENERAL);
    assert!(instance.clip("Source").is_some());
    assert!(instance.clip("Output").is_some());
    let gain = instance.param("gain").unwrap();
    assert_eq!(
        gain.properties().get_string(props::LABEL, 0).unwrap(),
        "Gain"
    );
    assert_eq!(
        instance.properties().get_string(props::CONTEXT, 0).unwrap(),
        contexts::GENERAL
    );
    assert_eq!(instance.properties().get_string(props::LABEL, 0).unwrap(), "Foo");

    instance.create().unwrap();
    instance
        .begin_instance_changed(change_reasons::USER_EDITED)
        .unwrap();
    let err = instance
        .param_changed("missing", change_reasons::USER_EDITED, 0.0, [1.0, 1.0])
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);
}

#[test]
fn test_unsupported_context_is_not_found() {
    let host = TestHost::new();
    let (_runtime, effect) = scanned(&host);

    let err = effect.create_instance(contexts::GENERATOR).unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);
    assert!(helpers::actions().is_empty());
}

#[test]
fn test_unload_waits_for_instances() {
    let host = TestHost::new();
    let (_runtime, effect) = scanned(&host);

    let instance = effect.create_instance(contexts::FILTER).unwrap();
    instance.create().unwrap();
    let err = effect.unload().unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidState);

    drop(instance);
    assert_eq!(helpers::count(Action::DestroyInstance), 1);

    effect.unload().unwrap();
    assert!(!effect.is_loaded());
    assert_eq!(helpers::count(Action::Unload), 1);
    assert!(effect.described_contexts().is_empty());
}

#[test]
fn test_failed_actions_report_status_and_keep_state() {
    let host = TestHost::new();
    let root = host.path("OFX");
    host.install(&root, "Fussy", helpers::fussy_library());
    let mut runtime = host.runtime(host.config(&[&root]));
    runtime.scan();
    let effect = runtime.cache().get_image_effect(FUSSY_ID, None, None).unwrap();

    let instance = effect.create_instance(contexts::FILTER).unwrap();
    instance.create().unwrap();

    instance
        .begin_instance_changed(change_reasons::USER_EDITED)
        .unwrap();
    let err = instance
        .param_changed("gain", change_reasons::USER_EDITED, 0.0, [1.0, 1.0])
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::ActionFailed);
    assert_eq!(err.status, Some(Status::FAILED));
    assert_eq!(err.action.as_deref(), Some(Action::InstanceChanged.as_str()));
    assert_eq!(instance.state(), InstanceState::Changing);
    instance
        .end_instance_changed(change_reasons::USER_EDITED)
        .unwrap();

    let sequence = SequenceRenderArgs::default();
    instance.begin_render(&sequence).unwrap();
    let err = instance.render(&RenderArgs::default()).unwrap_err();
    assert_eq!(err.kind, ErrorKind::ActionFailed);
    assert_eq!(err.status(), Status::ERR_MEMORY);
    assert_eq!(instance.state(), InstanceState::Rendering);

    instance.end_render(&sequence).unwrap();
    assert_eq!(instance.state(), InstanceState::Created);
    instance.destroy().unwrap();
    assert_eq!(instance.state(), InstanceState::Destroyed);
}
