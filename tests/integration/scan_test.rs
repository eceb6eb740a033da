//! Integration tests for discovering plugin binaries.

mod helpers;

use std::fs;

use helpers::{CONTEXTLESS_ID, FOO_ID, NO_DESCRIBE_ID, NO_LOAD_ID, TestHost};
use ofxhost_plugin::action::Action;
use ofxhost_plugin::constants::{contexts, props};

#[test]
fn test_scan_reports_invalid_binary_next_to_valid_one() {
    let host = TestHost::new();
    let root = host.path("OFX");
    host.install(&root, "Foo", helpers::foo_library());
    let bar = host.install(&root, "Bar", helpers::bar_library());

    let mut runtime = host.runtime(host.config(&[&root]));
    let report = runtime.scan();

    assert_eq!(report.binaries, 2);
    assert_eq!(report.new_binaries, 2);
    assert_eq!(report.invalid_binaries, vec![bar.clone()]);
    assert_eq!(report.plugins, 1);
    assert_eq!(runtime.cache().invalid_binaries(), vec![bar.as_path()]);

    let foo = runtime.cache().get_plugin_by_id(FOO_ID, None, None).unwrap();
    assert_eq!(foo.label(), "Foo");
    assert_eq!(foo.record().version_label(), "1.0");
    assert_eq!(
        foo.properties().get_string(props::GROUPING, 0).unwrap(),
        "Example"
    );
    assert_eq!(
        helpers::actions(),
        vec![Action::Load, Action::Describe, Action::Unload]
    );
}

#[test]
fn test_plugins_failing_load_or_describe_are_dropped() {
    let host = TestHost::new();
    let root = host.path("OFX");
    host.install(&root, "Foo", helpers::foo_library());
    host.install(&root, "Broken", helpers::failing_library());

    let mut runtime = host.runtime(host.config(&[&root]));
    let report = runtime.scan();

    assert!(report.invalid_binaries.is_empty());
    assert_eq!(report.plugins, 1);
    assert!(runtime.cache().get_plugin_by_id(NO_LOAD_ID, None, None).is_none());
    assert!(runtime.cache().get_plugin_by_id(NO_DESCRIBE_ID, None, None).is_none());
    let ids: Vec<_> = runtime
        .cache()
        .get_plugins()
        .iter()
        .map(|plugin| plugin.record().identifier().to_string())
        .collect();
    assert_eq!(ids, vec![FOO_ID.to_string()]);

    // A failed Load gets no Unload; a failed Describe does.
    assert_eq!(helpers::count(Action::Load), 3);
    assert_eq!(helpers::count(Action::Describe), 2);
    assert_eq!(helpers::count(Action::Unload), 2);

    assert!(runtime.save_cache().unwrap());
    let text = fs::read_to_string(runtime.cache_path()).unwrap();
    assert!(text.contains("Broken.ofx"));
    assert!(text.contains(FOO_ID));
    assert!(!text.contains(NO_LOAD_ID));
    assert!(!text.contains(NO_DESCRIBE_ID));
}

#[test]
fn test_plugin_without_supported_context_is_not_indexed() {
    let host = TestHost::new();
    let root = host.path("OFX");
    host.install(&root, "Mixed", helpers::mixed_library());

    let mut runtime = host.runtime(host.config(&[&root]));
    let report = runtime.scan();

    assert_eq!(report.plugins, 1);
    assert_eq!(report.unsupported.len(), 1);
    assert_eq!(report.unsupported[0].0, CONTEXTLESS_ID);
    assert!(runtime.cache().get_plugin_by_id(CONTEXTLESS_ID, None, None).is_none());
    assert_eq!(helpers::count(Action::Describe), 2);

    let effect = runtime.cache().get_image_effect(FOO_ID, None, None).unwrap();
    assert_eq!(
        effect.supported_contexts(),
        vec![contexts::FILTER.to_string(), contexts::GENERAL.to_string()]
    );
}

#[test]
fn test_single_level_root_skips_nested_bundles() {
    let host = TestHost::new();
    let root = host.path("OFX");
    host.install(&root, "Foo", helpers::foo_library());
    host.install(&root.join("vendor"), "Nested", helpers::foo_newer_library());

    let mut config = host.config(&[]);
    config.plugins.non_recursive_paths = vec![root.to_string_lossy().into_owned()];
    let mut runtime = host.runtime(config);
    let report = runtime.scan();

    assert_eq!(report.binaries, 1);
    let foo = runtime.cache().get_plugin_by_id(FOO_ID, None, None).unwrap();
    assert_eq!(foo.record().version_minor(), 0);
}

#[test]
fn test_rescan_drops_removed_bundle() {
    let host = TestHost::new();
    let root = host.path("OFX");
    host.install(&root, "Foo", helpers::foo_library());
    host.install(&root, "Mixed", helpers::mixed_library());

    let mut runtime = host.runtime(host.config(&[&root]));
    assert_eq!(runtime.scan().binaries, 2);

    fs::remove_dir_all(root.join("Mixed.ofx.bundle")).unwrap();
    let report = runtime.scan();

    assert_eq!(report.dropped_binaries, 1);
    assert_eq!(report.new_binaries, 0);
    assert_eq!(report.binaries, 1);
    assert!(runtime.cache().is_dirty());
    assert_eq!(runtime.cache().get_plugins().len(), 1);
}

#[test]
fn test_missing_root_yields_empty_scan() {
    let host = TestHost::new();
    let missing = host.path("nowhere");

    let mut runtime = host.runtime(host.config(&[&missing]));
    let report = runtime.scan();

    assert_eq!(report.binaries, 0);
    assert_eq!(report.plugins, 0);
    assert!(runtime.cache().get_plugins_by_id().is_empty());
}
